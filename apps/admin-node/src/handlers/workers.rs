//! Worker registration and heartbeat intake, feeding both the health
//! monitor (spec C11) and the resource optimizer (spec C15).

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tiktrue_monitoring::{EventSeverity, EventType};
use tiktrue_protocol::{HeartbeatPayload, ModelSyncPayload, WorkerRegistrationPayload};
use tiktrue_resource_optimizer::WorkerNode;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn register_worker(
    State(state): State<AppState>,
    Json(payload): Json<WorkerRegistrationPayload>,
) -> Result<(), ApiError> {
    let errors = payload.validate();
    if !errors.is_empty() {
        return Err(ApiError::bad_request(format!("{errors:?}")));
    }

    state.health_monitor.register_member(&payload.worker_id);

    let cpu_cores = payload
        .capabilities
        .iter()
        .find_map(|c| c.strip_prefix("cpu_cores:"))
        .and_then(|n| n.parse::<u32>().ok())
        .unwrap_or(1);
    let gpu_available = payload.capabilities.iter().any(|c| c == "gpu");

    let mut worker = WorkerNode::new(&payload.worker_id, 1.0, cpu_cores);
    worker.gpu_available = gpu_available;
    state.resource_optimizer.register_worker(worker);

    state.monitoring.log_event(
        EventType::WorkerConnected,
        EventSeverity::Info,
        "worker_handlers",
        format!("worker {} registered", payload.worker_id),
        json!({ "worker_id": payload.worker_id }),
    );
    Ok(())
}

pub async fn heartbeat(
    State(state): State<AppState>,
    Json(payload): Json<HeartbeatPayload>,
) -> Result<(), ApiError> {
    let errors = payload.validate();
    if !errors.is_empty() {
        return Err(ApiError::bad_request(format!("{errors:?}")));
    }

    state
        .health_monitor
        .record_success(&payload.worker_id, std::time::Duration::from_millis(0));
    state.resource_optimizer.update_worker_status(
        &payload.worker_id,
        payload.cpu_percent / 100.0,
        0,
    );
    state.monitoring.collect_resource_usage(tiktrue_monitoring::ResourceUsage {
        timestamp: Utc::now(),
        cpu_percent: payload.cpu_percent,
        memory_percent: payload.memory_percent,
        disk_usage_percent: 0.0,
        gpu_usage_percent: None,
        active_connections: payload.active_sessions.max(0) as u32,
    });
    Ok(())
}

pub async fn model_sync(
    State(state): State<AppState>,
    Json(payload): Json<ModelSyncPayload>,
) -> Result<(), ApiError> {
    let errors = payload.validate();
    if !errors.is_empty() {
        return Err(ApiError::bad_request(format!("{errors:?}")));
    }

    state.monitoring.log_event(
        EventType::ModelLoaded,
        EventSeverity::Info,
        "worker_handlers",
        format!("model {} synced ({} blocks)", payload.model_id, payload.block_count),
        json!({ "model_id": payload.model_id, "block_count": payload.block_count }),
    );
    Ok(())
}
