use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::HealthCheckError;
use crate::types::{HealthInfo, HealthNotification, HealthStatus, ServiceLifecycleState};

pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const PING_TIMEOUT_SECS: u64 = 30;
pub const WARNING_THRESHOLD: u32 = 2;
pub const FAILURE_THRESHOLD: u32 = 3;
pub const LICENSE_REVALIDATION_INTERVAL_SECS: u64 = 5 * 60;

/// Pings a single monitored member (a network's admin, or a worker) and
/// reports the measured round-trip time.
pub trait HealthPinger: Send + Sync {
    fn ping<'a>(&'a self, member_id: &'a str) -> BoxFuture<'a, Result<Duration, HealthCheckError>>;
}

type StatusCallback = Arc<dyn Fn(&HealthNotification) + Send + Sync>;

/// Tracks `HealthInfo` per monitored member and applies the transition
/// rules after each heartbeat tick.
pub struct HealthMonitor {
    members: RwLock<HashMap<String, HealthInfo>>,
    callbacks: RwLock<Vec<StatusCallback>>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self {
            members: RwLock::new(HashMap::new()),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    pub fn register_member(&self, member_id: impl Into<String>) {
        let member_id = member_id.into();
        self.members
            .write()
            .entry(member_id.clone())
            .or_insert_with(|| HealthInfo::new(member_id));
    }

    pub fn on_status_change(&self, callback: impl Fn(&HealthNotification) + Send + Sync + 'static) {
        self.callbacks.write().push(Arc::new(callback));
    }

    pub fn health_info(&self, member_id: &str) -> Option<HealthInfo> {
        self.members.read().get(member_id).cloned()
    }

    /// Runs one heartbeat tick against `pinger` for `member_id` and applies
    /// the success/failure status rules of the monitor's transition table.
    #[instrument(skip(self, pinger))]
    pub async fn tick(&self, member_id: &str, pinger: &dyn HealthPinger) {
        self.register_member(member_id);
        let outcome = tokio::time::timeout(
            Duration::from_secs(PING_TIMEOUT_SECS),
            pinger.ping(member_id),
        )
        .await;

        match outcome {
            Ok(Ok(response_time)) => self.record_success(member_id, response_time),
            Ok(Err(err)) => self.record_failure(member_id, err.to_string()),
            Err(_) => self.record_failure(member_id, format!("ping to {member_id} timed out")),
        }
    }

    pub fn record_success(&self, member_id: &str, response_time: Duration) {
        let notification = {
            let mut members = self.members.write();
            let entry = members
                .entry(member_id.to_string())
                .or_insert_with(|| HealthInfo::new(member_id));
            let previous = entry.status;
            entry.consecutive_failures = 0;
            entry.request_count += 1;
            entry.response_time_ms = response_time.as_millis() as u64;
            entry.last_heartbeat = Utc::now();
            entry.status = HealthStatus::Healthy;
            self.transition_notification(member_id, previous, entry.status, "heartbeat succeeded")
        };
        self.apply_transition(notification);
    }

    pub fn record_failure(&self, member_id: &str, reason: impl Into<String>) {
        let reason = reason.into();
        let notification = {
            let mut members = self.members.write();
            let entry = members
                .entry(member_id.to_string())
                .or_insert_with(|| HealthInfo::new(member_id));
            let previous = entry.status;
            entry.consecutive_failures += 1;
            entry.error_count += 1;
            entry.request_count += 1;
            entry.last_heartbeat = Utc::now();
            entry.status = if entry.consecutive_failures >= FAILURE_THRESHOLD {
                HealthStatus::Critical
            } else if entry.consecutive_failures >= WARNING_THRESHOLD {
                HealthStatus::Warning
            } else {
                HealthStatus::Healthy
            };
            self.transition_notification(member_id, previous, entry.status, &reason)
        };
        self.apply_transition(notification);
    }

    /// Maps a self-reported service lifecycle state directly onto a status,
    /// bypassing the failure-counter rules.
    pub fn apply_lifecycle_state(&self, member_id: &str, state: ServiceLifecycleState) {
        let new_status: HealthStatus = state.into();
        let notification = {
            let mut members = self.members.write();
            let entry = members
                .entry(member_id.to_string())
                .or_insert_with(|| HealthInfo::new(member_id));
            let previous = entry.status;
            entry.status = new_status;
            entry.last_heartbeat = Utc::now();
            self.transition_notification(member_id, previous, new_status, "lifecycle state reported")
        };
        self.apply_transition(notification);
    }

    /// A worker's periodic license re-validation failed; this always
    /// forces a CRITICAL transition regardless of the failure counters.
    pub fn report_license_invalid(&self, member_id: &str) {
        let notification = {
            let mut members = self.members.write();
            let entry = members
                .entry(member_id.to_string())
                .or_insert_with(|| HealthInfo::new(member_id));
            let previous = entry.status;
            entry.status = HealthStatus::Critical;
            entry.last_heartbeat = Utc::now();
            self.transition_notification(member_id, previous, HealthStatus::Critical, "license re-validation failed")
        };
        self.apply_transition(notification);
    }

    fn transition_notification(
        &self,
        member_id: &str,
        previous: HealthStatus,
        new_status: HealthStatus,
        reason: &str,
    ) -> Option<HealthNotification> {
        if previous == new_status {
            return None;
        }
        Some(HealthNotification {
            member_id: member_id.to_string(),
            previous_status: previous,
            new_status,
            severity: new_status.into(),
            reason: reason.to_string(),
            occurred_at: Utc::now(),
        })
    }

    fn apply_transition(&self, notification: Option<HealthNotification>) {
        let Some(notification) = notification else {
            return;
        };
        debug!(member_id = %notification.member_id, ?notification.new_status, "health status transition");
        for callback in self.callbacks.read().iter() {
            callback(&notification);
        }
    }

    /// Aggregates overall status: CRITICAL if any member is CRITICAL, else
    /// WARNING if any is WARNING, else HEALTHY if all HEALTHY, else UNKNOWN.
    pub fn get_health_summary(&self) -> HealthStatus {
        let members = self.members.read();
        if members.is_empty() {
            return HealthStatus::Unknown;
        }
        let mut any_warning = false;
        let mut all_healthy = true;
        for info in members.values() {
            match info.status {
                HealthStatus::Critical => return HealthStatus::Critical,
                HealthStatus::Warning => {
                    any_warning = true;
                    all_healthy = false;
                }
                HealthStatus::Healthy => {}
                HealthStatus::Unknown => all_healthy = false,
            }
        }
        if any_warning {
            HealthStatus::Warning
        } else if all_healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unknown
        }
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `monitor.tick` against every registered member on a fixed
/// interval until the returned handle is dropped or aborted.
pub fn spawn_heartbeat_loop(
    monitor: Arc<HealthMonitor>,
    pinger: Arc<dyn HealthPinger>,
    member_ids: Vec<String>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            for member_id in &member_ids {
                monitor.tick(member_id, pinger.as_ref()).await;
            }
            info!(members = member_ids.len(), "heartbeat tick complete");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AlwaysOk;
    impl HealthPinger for AlwaysOk {
        fn ping<'a>(&'a self, _member_id: &'a str) -> BoxFuture<'a, Result<Duration, HealthCheckError>> {
            Box::pin(async { Ok(Duration::from_millis(5)) })
        }
    }

    struct AlwaysFail;
    impl HealthPinger for AlwaysFail {
        fn ping<'a>(&'a self, member_id: &'a str) -> BoxFuture<'a, Result<Duration, HealthCheckError>> {
            let member_id = member_id.to_string();
            Box::pin(async move { Err(HealthCheckError::PingFailed(member_id, "refused".into())) })
        }
    }

    #[tokio::test]
    async fn successful_ping_resets_failure_counter_and_marks_healthy() {
        let monitor = HealthMonitor::new();
        monitor.record_failure("worker-1", "warm up failure");
        monitor.tick("worker-1", &AlwaysOk).await;
        let info = monitor.health_info("worker-1").unwrap();
        assert_eq!(info.status, HealthStatus::Healthy);
        assert_eq!(info.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn repeated_failures_escalate_warning_then_critical() {
        let monitor = HealthMonitor::new();
        monitor.tick("worker-1", &AlwaysFail).await;
        assert_eq!(monitor.health_info("worker-1").unwrap().status, HealthStatus::Healthy);
        monitor.tick("worker-1", &AlwaysFail).await;
        assert_eq!(monitor.health_info("worker-1").unwrap().status, HealthStatus::Warning);
        monitor.tick("worker-1", &AlwaysFail).await;
        assert_eq!(monitor.health_info("worker-1").unwrap().status, HealthStatus::Critical);
    }

    #[test]
    fn lifecycle_states_map_directly_onto_status() {
        let monitor = HealthMonitor::new();
        monitor.apply_lifecycle_state("admin-1", ServiceLifecycleState::Starting);
        assert_eq!(monitor.health_info("admin-1").unwrap().status, HealthStatus::Warning);
        monitor.apply_lifecycle_state("admin-1", ServiceLifecycleState::Stopped);
        assert_eq!(monitor.health_info("admin-1").unwrap().status, HealthStatus::Critical);
        monitor.apply_lifecycle_state("admin-1", ServiceLifecycleState::Unrecognized);
        assert_eq!(monitor.health_info("admin-1").unwrap().status, HealthStatus::Unknown);
    }

    #[test]
    fn health_summary_escalates_to_the_worst_member_status() {
        let monitor = HealthMonitor::new();
        monitor.apply_lifecycle_state("a", ServiceLifecycleState::Running);
        monitor.apply_lifecycle_state("b", ServiceLifecycleState::Running);
        assert_eq!(monitor.get_health_summary(), HealthStatus::Healthy);
        monitor.apply_lifecycle_state("b", ServiceLifecycleState::Starting);
        assert_eq!(monitor.get_health_summary(), HealthStatus::Warning);
        monitor.apply_lifecycle_state("b", ServiceLifecycleState::Stopped);
        assert_eq!(monitor.get_health_summary(), HealthStatus::Critical);
    }

    #[test]
    fn status_transition_triggers_registered_callback_exactly_once() {
        let monitor = HealthMonitor::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        monitor.on_status_change(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        monitor.apply_lifecycle_state("worker-1", ServiceLifecycleState::Running);
        monitor.apply_lifecycle_state("worker-1", ServiceLifecycleState::Running);
        monitor.apply_lifecycle_state("worker-1", ServiceLifecycleState::Stopped);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn license_invalidation_forces_critical_regardless_of_failure_count() {
        let monitor = HealthMonitor::new();
        monitor.record_success("worker-1", Duration::from_millis(1));
        monitor.report_license_invalid("worker-1");
        assert_eq!(monitor.health_info("worker-1").unwrap().status, HealthStatus::Critical);
    }
}
