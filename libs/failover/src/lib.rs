//! Backup worker activation, graceful degradation, and block
//! redistribution for recovering from worker and network failures.

pub mod catalog;
pub mod error;
pub mod manager;
pub mod types;

pub use catalog::{BackupActivator, BackupWorkerCatalog, BlockTransporter};
pub use error::FailoverError;
pub use manager::{FailoverManager, FAILOVER_TIMEOUT_SECS, MAX_CONCURRENT_FAILOVERS};
pub use types::{
    BackupStatus, BackupWorker, BlockAssignment, BlockRedistribution, DegradationLevel,
    FailoverEvent, FailoverStrategy, WorkloadTransfer,
};
