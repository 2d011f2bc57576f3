//! Health summary endpoint (spec C11): aggregate status across every
//! registered network peer and worker.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tiktrue_health_monitor::HealthStatus;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthSummaryResponse {
    pub status: HealthStatus,
}

pub async fn summary(State(state): State<AppState>) -> Json<HealthSummaryResponse> {
    Json(HealthSummaryResponse {
        status: state.health_monitor.get_health_summary(),
    })
}
