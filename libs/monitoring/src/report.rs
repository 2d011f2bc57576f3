use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::MonitoringError;
use crate::store::MonitoringStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Summary,
    Detailed,
    LicenseUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub report_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub body: serde_json::Value,
}

/// Generates a summary, detailed, or license-usage report over
/// `[start, end]`, defaulting to the last 24 hours when omitted.
pub fn generate_performance_report(
    store: &MonitoringStore,
    report_type: ReportType,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    license_hash: Option<&str>,
) -> Result<PerformanceReport, MonitoringError> {
    let end_time = end.unwrap_or_else(Utc::now);
    let start_time = start.unwrap_or(end_time - Duration::hours(24));

    let body = match report_type {
        ReportType::Summary => summary_body(store, start_time, end_time),
        ReportType::Detailed => detailed_body(store, start_time, end_time),
        ReportType::LicenseUsage => license_usage_body(store, start_time, end_time, license_hash)?,
    };

    Ok(PerformanceReport {
        report_type: match report_type {
            ReportType::Summary => "summary".to_string(),
            ReportType::Detailed => "detailed".to_string(),
            ReportType::LicenseUsage => "license_usage".to_string(),
        },
        start_time,
        end_time,
        generated_at: Utc::now(),
        body,
    })
}

fn summary_body(store: &MonitoringStore, start: DateTime<Utc>, end: DateTime<Utc>) -> serde_json::Value {
    let events = store.events_between(start, end);
    let mut by_type: std::collections::HashMap<String, u64> = std::collections::HashMap::new();
    let mut by_severity: std::collections::HashMap<String, u64> = std::collections::HashMap::new();
    for event in &events {
        *by_type.entry(format!("{:?}", event.event_type)).or_insert(0) += 1;
        *by_severity.entry(format!("{:?}", event.severity)).or_insert(0) += 1;
    }

    let stats = store.stats();
    json!({
        "events_summary": {
            "by_type": by_type,
            "by_severity": by_severity,
            "total_events": events.len(),
        },
        "counters": store.counters(),
        "gauges": store.gauges(),
        "uptime_hours": (Utc::now() - store.started_at()).num_seconds() as f64 / 3600.0,
        "total_events": stats.total_events,
        "total_metrics": stats.total_metrics,
        "total_errors": stats.total_errors,
    })
}

fn detailed_body(store: &MonitoringStore, start: DateTime<Utc>, end: DateTime<Utc>) -> serde_json::Value {
    let mut summary = summary_body(store, start, end);
    let mut events = store.events_between(start, end);
    events.truncate(100);
    let mut metrics = store.metrics_between(start, end);
    metrics.truncate(100);

    if let serde_json::Value::Object(ref mut map) = summary {
        map.insert("detailed_events".to_string(), json!(events));
        map.insert("detailed_metrics".to_string(), json!(metrics));
    }
    summary
}

fn license_usage_body(
    store: &MonitoringStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    license_hash: Option<&str>,
) -> Result<serde_json::Value, MonitoringError> {
    let license_hash = license_hash.ok_or(MonitoringError::NoLicenseInfo)?;
    let records = store.license_usage_between(start, end, license_hash);

    let mut by_operation: std::collections::HashMap<(String, String), (u64, i64, u64)> = std::collections::HashMap::new();
    for record in &records {
        let entry = by_operation
            .entry((record.operation.clone(), record.resource_type.clone()))
            .or_insert((0, 0, 0));
        entry.0 += 1;
        entry.1 += record.quota_consumed;
        if record.success {
            entry.2 += 1;
        }
    }

    let usage_by_operation: Vec<serde_json::Value> = by_operation
        .into_iter()
        .map(|((operation, resource_type), (count, total_quota, successful))| {
            json!({
                "operation": operation,
                "resource_type": resource_type,
                "count": count,
                "total_quota_consumed": total_quota,
                "successful_operations": successful,
                "success_rate": if count > 0 { successful as f64 / count as f64 * 100.0 } else { 0.0 },
            })
        })
        .collect();

    Ok(json!({
        "license_hash": license_hash,
        "usage_by_operation": usage_by_operation,
        "total_records": records.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventSeverity, EventType, LicenseUsageRecord};

    #[test]
    fn summary_report_counts_events_by_type() {
        let store = MonitoringStore::new();
        store.log_event(EventType::WorkerConnected, EventSeverity::Info, "c", "m", serde_json::Value::Null);
        store.log_event(EventType::WorkerConnected, EventSeverity::Info, "c", "m", serde_json::Value::Null);
        let report = generate_performance_report(&store, ReportType::Summary, None, None, None).unwrap();
        assert_eq!(report.body["events_summary"]["total_events"], json!(2));
    }

    #[test]
    fn license_usage_report_without_a_hash_errors() {
        let store = MonitoringStore::new();
        let err = generate_performance_report(&store, ReportType::LicenseUsage, None, None, None).unwrap_err();
        assert!(matches!(err, MonitoringError::NoLicenseInfo));
    }

    #[test]
    fn license_usage_report_aggregates_by_operation() {
        let store = MonitoringStore::new();
        store.record_license_usage(LicenseUsageRecord {
            timestamp: Utc::now(),
            license_hash: "abc".to_string(),
            operation: "check_access".to_string(),
            resource_type: "models".to_string(),
            quota_consumed: 1,
            quota_remaining: 9,
            subscription_tier: "PRO".to_string(),
            success: true,
        });
        let report = generate_performance_report(&store, ReportType::LicenseUsage, None, None, Some("abc")).unwrap();
        assert_eq!(report.body["total_records"], json!(1));
    }
}
