//! Local configuration read/write endpoints (spec C13). This single-admin
//! deployment applies changes locally and lets `ConfigSynchronizer` track
//! conflicts/retries; it does not broadcast to peer admin nodes, since
//! that requires a node-to-node transport outside this HTTP surface.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tiktrue_config_sync::ConfigScope;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateConfigRequest {
    pub key: String,
    pub value: Value,
    #[serde(default = "default_scope")]
    pub scope: ConfigScope,
    #[serde(default)]
    pub license_requirements: Vec<String>,
}

fn default_scope() -> ConfigScope {
    ConfigScope::Worker
}

pub async fn update_configuration(
    State(state): State<AppState>,
    Json(request): Json<UpdateConfigRequest>,
) -> Json<tiktrue_config_sync::ConfigurationChange> {
    let change = state.config_sync.update_configuration(
        request.key,
        request.value,
        request.scope,
        request.license_requirements,
    );
    Json(change)
}

pub async fn get_configuration(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .config_sync
        .get_configuration(&key)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no configuration for key {key}")))
}
