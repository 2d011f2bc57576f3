//! Network creation, discovery filtering, and the join/approve workflow.

pub mod error;
pub mod manager;
pub mod types;

pub use error::NetworkError;
pub use manager::{NetworkManager, NetworkStatistics};
pub use types::{
    is_tier_compatible, model_chain_order, network_limit_for, AdminNodeRef, JoinRequest,
    JoinResponse, LicenseRequirements, NetworkConfig, NetworkInfo, NetworkStatus, NetworkType,
};
