//! Versioned configuration propagation across nodes: broadcast, receive,
//! and conflict resolution by a pluggable strategy.

pub mod error;
pub mod manager;
pub mod sender;
pub mod types;

pub use error::ConfigSyncError;
pub use manager::{ConfigSynchronizer, PENDING_RETRY_AFTER_SECS};
pub use sender::ChangeSender;
pub use types::{
    ConfigChangeType, ConfigConflict, ConfigScope, ConfigurationChange, ConfigurationItem,
    ConflictResolutionStrategy, SyncStats,
};
