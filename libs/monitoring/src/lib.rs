//! Event, metric, resource, and license-usage recording with a bounded
//! in-memory ring for recent events/metrics, alert thresholds, and
//! report generation.

pub mod error;
pub mod report;
pub mod store;
pub mod types;

pub use error::MonitoringError;
pub use report::{generate_performance_report, PerformanceReport, ReportType};
pub use store::{MonitoringStats, MonitoringStore, RECENT_RING_CAPACITY};
pub use types::{
    EventSeverity, EventType, LicenseUsageRecord, MetricType, PerformanceMetric, ResourceUsage,
    SystemEvent,
};
