use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

/// Severity attached to an admin notification, derived from the target
/// status of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationSeverity {
    Info,
    Warning,
    Critical,
}

impl From<HealthStatus> for NotificationSeverity {
    fn from(status: HealthStatus) -> Self {
        match status {
            HealthStatus::Healthy => NotificationSeverity::Info,
            HealthStatus::Warning => NotificationSeverity::Warning,
            HealthStatus::Critical | HealthStatus::Unknown => NotificationSeverity::Critical,
        }
    }
}

/// Lifecycle states a monitored service can self-report, mapped directly
/// onto a `HealthStatus` rather than re-deriving one from counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifecycleState {
    Starting,
    Running,
    Stopped,
    Unrecognized,
}

impl From<ServiceLifecycleState> for HealthStatus {
    fn from(state: ServiceLifecycleState) -> Self {
        match state {
            ServiceLifecycleState::Starting => HealthStatus::Warning,
            ServiceLifecycleState::Running => HealthStatus::Healthy,
            ServiceLifecycleState::Stopped => HealthStatus::Critical,
            ServiceLifecycleState::Unrecognized => HealthStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthInfo {
    pub member_id: String,
    pub status: HealthStatus,
    pub last_heartbeat: DateTime<Utc>,
    pub response_time_ms: u64,
    pub consecutive_failures: u32,
    pub error_count: u64,
    pub request_count: u64,
}

impl HealthInfo {
    pub fn new(member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            status: HealthStatus::Unknown,
            last_heartbeat: Utc::now(),
            response_time_ms: 0,
            consecutive_failures: 0,
            error_count: 0,
            request_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthNotification {
    pub member_id: String,
    pub previous_status: HealthStatus,
    pub new_status: HealthStatus,
    pub severity: NotificationSeverity,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}
