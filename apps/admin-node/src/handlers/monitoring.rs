//! Performance/usage reporting endpoint (spec C14).

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tiktrue_monitoring::{generate_performance_report, PerformanceReport, ReportType};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub report_type: ReportKind,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub license_hash: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    #[default]
    Summary,
    Detailed,
    LicenseUsage,
}

impl From<ReportKind> for ReportType {
    fn from(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Summary => ReportType::Summary,
            ReportKind::Detailed => ReportType::Detailed,
            ReportKind::LicenseUsage => ReportType::LicenseUsage,
        }
    }
}

pub async fn report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<PerformanceReport>, ApiError> {
    let report = generate_performance_report(
        &state.monitoring,
        query.report_type.into(),
        query.start,
        query.end,
        query.license_hash.as_deref(),
    )?;
    Ok(Json(report))
}
