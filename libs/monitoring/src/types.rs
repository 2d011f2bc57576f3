use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SystemStart,
    SystemStop,
    WorkerConnected,
    WorkerDisconnected,
    ModelLoaded,
    ModelUnloaded,
    InferenceRequest,
    InferenceResponse,
    LicenseCheck,
    LicenseExpired,
    QuotaExceeded,
    ErrorOccurred,
    NetworkEvent,
    ResourceAlert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Timer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEvent {
    pub event_id: String,
    pub event_type: EventType,
    pub severity: EventSeverity,
    pub timestamp: DateTime<Utc>,
    pub component: String,
    pub message: String,
    pub worker_id: Option<String>,
    pub model_id: Option<String>,
    pub license_hash: Option<String>,
    pub duration_ms: Option<u64>,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub metric_name: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub disk_usage_percent: f64,
    pub gpu_usage_percent: Option<f64>,
    pub active_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseUsageRecord {
    pub timestamp: DateTime<Utc>,
    pub license_hash: String,
    pub operation: String,
    pub resource_type: String,
    pub quota_consumed: i64,
    pub quota_remaining: i64,
    pub subscription_tier: String,
    pub success: bool,
}
