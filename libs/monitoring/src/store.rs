use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{
    EventSeverity, EventType, LicenseUsageRecord, PerformanceMetric, ResourceUsage, SystemEvent,
};

pub const RECENT_RING_CAPACITY: usize = 10_000;

const CPU_ALERT_THRESHOLD: f64 = 90.0;
const MEMORY_ALERT_THRESHOLD: f64 = 85.0;
const DISK_ALERT_THRESHOLD: f64 = 90.0;
const GPU_ALERT_THRESHOLD: f64 = 95.0;

#[derive(Debug, Default, Clone)]
pub struct MonitoringStats {
    pub total_events: u64,
    pub total_metrics: u64,
    pub total_errors: u64,
}

/// In-memory equivalent of the four-table relational store: bounded
/// rings for events/metrics (fast recent-query path), unbounded tables
/// for resource usage and license usage history.
pub struct MonitoringStore {
    events: RwLock<VecDeque<SystemEvent>>,
    metrics: RwLock<VecDeque<PerformanceMetric>>,
    resource_usage: RwLock<Vec<ResourceUsage>>,
    license_usage: RwLock<Vec<LicenseUsageRecord>>,
    counters: RwLock<HashMap<String, i64>>,
    gauges: RwLock<HashMap<String, f64>>,
    stats: RwLock<MonitoringStats>,
    started_at: chrono::DateTime<Utc>,
}

impl MonitoringStore {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(VecDeque::with_capacity(RECENT_RING_CAPACITY)),
            metrics: RwLock::new(VecDeque::with_capacity(RECENT_RING_CAPACITY)),
            resource_usage: RwLock::new(Vec::new()),
            license_usage: RwLock::new(Vec::new()),
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            stats: RwLock::new(MonitoringStats::default()),
            started_at: Utc::now(),
        }
    }

    pub fn started_at(&self) -> chrono::DateTime<Utc> {
        self.started_at
    }

    pub fn stats(&self) -> MonitoringStats {
        self.stats.read().clone()
    }

    pub fn log_event(
        &self,
        event_type: EventType,
        severity: EventSeverity,
        component: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> SystemEvent {
        let event = SystemEvent {
            event_id: Uuid::new_v4().to_string(),
            event_type,
            severity,
            timestamp: Utc::now(),
            component: component.into(),
            message: message.into(),
            worker_id: None,
            model_id: None,
            license_hash: None,
            duration_ms: None,
            details,
        };
        self.push_ring(&self.events, event.clone());
        let mut stats = self.stats.write();
        stats.total_events += 1;
        if severity >= EventSeverity::Error {
            stats.total_errors += 1;
        }
        debug!(component = %event.component, ?severity, "system event logged");
        event
    }

    pub fn record_metric(&self, metric: PerformanceMetric) {
        self.push_ring(&self.metrics, metric);
        self.stats.write().total_metrics += 1;
    }

    pub fn increment_counter(&self, name: &str, delta: i64) {
        *self.counters.write().entry(name.to_string()).or_insert(0) += delta;
    }

    pub fn set_gauge(&self, name: &str, value: f64) {
        self.gauges.write().insert(name.to_string(), value);
    }

    pub fn counters(&self) -> HashMap<String, i64> {
        self.counters.read().clone()
    }

    pub fn gauges(&self) -> HashMap<String, f64> {
        self.gauges.read().clone()
    }

    /// Records resource usage and emits a `ResourceAlert` event for any
    /// threshold crossed.
    pub fn collect_resource_usage(&self, usage: ResourceUsage) {
        self.check_resource_alerts(&usage);
        self.resource_usage.write().push(usage);
    }

    fn check_resource_alerts(&self, usage: &ResourceUsage) {
        if usage.cpu_percent > CPU_ALERT_THRESHOLD {
            self.emit_alert("cpu_percent", usage.cpu_percent);
        }
        if usage.memory_percent > MEMORY_ALERT_THRESHOLD {
            self.emit_alert("memory_percent", usage.memory_percent);
        }
        if usage.disk_usage_percent > DISK_ALERT_THRESHOLD {
            self.emit_alert("disk_usage_percent", usage.disk_usage_percent);
        }
        if let Some(gpu) = usage.gpu_usage_percent {
            if gpu > GPU_ALERT_THRESHOLD {
                self.emit_alert("gpu_usage_percent", gpu);
            }
        }
    }

    fn emit_alert(&self, metric_name: &str, value: f64) {
        warn!(metric_name, value, "resource usage crossed alert threshold");
        self.log_event(
            EventType::ResourceAlert,
            EventSeverity::Warning,
            "resource_monitor",
            format!("high {metric_name}: {value:.1}%"),
            serde_json::json!({ metric_name: value }),
        );
    }

    pub fn record_license_usage(&self, record: LicenseUsageRecord) {
        self.license_usage.write().push(record);
    }

    pub fn events_between(&self, start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> Vec<SystemEvent> {
        self.events.read().iter().filter(|e| e.timestamp >= start && e.timestamp <= end).cloned().collect()
    }

    pub fn metrics_between(&self, start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> Vec<PerformanceMetric> {
        self.metrics.read().iter().filter(|m| m.timestamp >= start && m.timestamp <= end).cloned().collect()
    }

    pub fn license_usage_between(&self, start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>, license_hash: &str) -> Vec<LicenseUsageRecord> {
        self.license_usage
            .read()
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end && r.license_hash == license_hash)
            .cloned()
            .collect()
    }

    fn push_ring<T>(&self, ring: &RwLock<VecDeque<T>>, item: T) {
        let mut ring = ring.write();
        if ring.len() >= RECENT_RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(item);
    }
}

impl Default for MonitoringStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricType;

    #[test]
    fn high_cpu_usage_emits_a_resource_alert_event() {
        let store = MonitoringStore::new();
        store.collect_resource_usage(ResourceUsage {
            timestamp: Utc::now(),
            cpu_percent: 95.0,
            memory_percent: 10.0,
            disk_usage_percent: 10.0,
            gpu_usage_percent: None,
            active_connections: 1,
        });
        let now = Utc::now();
        let events = store.events_between(now - chrono::Duration::minutes(1), now + chrono::Duration::minutes(1));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::ResourceAlert);
    }

    #[test]
    fn below_threshold_usage_emits_no_alert() {
        let store = MonitoringStore::new();
        store.collect_resource_usage(ResourceUsage {
            timestamp: Utc::now(),
            cpu_percent: 10.0,
            memory_percent: 10.0,
            disk_usage_percent: 10.0,
            gpu_usage_percent: Some(10.0),
            active_connections: 1,
        });
        assert_eq!(store.stats().total_events, 0);
    }

    #[test]
    fn event_ring_evicts_oldest_once_over_capacity() {
        let store = MonitoringStore::new();
        for i in 0..(RECENT_RING_CAPACITY + 5) {
            store.log_event(EventType::SystemStart, EventSeverity::Info, "test", format!("event {i}"), serde_json::Value::Null);
        }
        assert_eq!(store.events.read().len(), RECENT_RING_CAPACITY);
    }

    #[test]
    fn metric_recording_increments_total_count() {
        let store = MonitoringStore::new();
        store.record_metric(PerformanceMetric {
            metric_name: "latency".to_string(),
            metric_type: MetricType::Timer,
            value: 12.5,
            timestamp: Utc::now(),
            unit: "ms".to_string(),
        });
        assert_eq!(store.stats().total_metrics, 1);
    }
}
