//! Heartbeat scheduling and status-transition rules for networks and
//! workers, plus the aggregate health summary consumed by admin nodes.

pub mod error;
pub mod monitor;
pub mod types;

pub use error::HealthCheckError;
pub use monitor::{
    spawn_heartbeat_loop, HealthMonitor, HealthPinger, FAILURE_THRESHOLD, HEARTBEAT_INTERVAL_SECS,
    LICENSE_REVALIDATION_INTERVAL_SECS, PING_TIMEOUT_SECS, WARNING_THRESHOLD,
};
pub use types::{
    HealthInfo, HealthNotification, HealthStatus, NotificationSeverity, ServiceLifecycleState,
};
