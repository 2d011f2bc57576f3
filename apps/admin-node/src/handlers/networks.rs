//! Network lifecycle and join/approve endpoints (spec C6).

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tiktrue_network::{JoinRequest, JoinResponse, NetworkInfo, NetworkType};

use crate::error::ApiError;
use crate::multi_network::MultiNetworkService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateNetworkRequest {
    pub network_name: String,
    pub model_id: String,
    pub network_type: NetworkType,
    #[serde(default)]
    pub description: String,
}

pub async fn create_network(
    State(state): State<AppState>,
    Json(request): Json<CreateNetworkRequest>,
) -> Result<Json<NetworkInfo>, ApiError> {
    let service = MultiNetworkService::new(state);
    let network = service.create_network(
        &request.network_name,
        &request.model_id,
        request.network_type,
        &request.description,
    )?;
    Ok(Json(network))
}

pub async fn delete_network(
    State(state): State<AppState>,
    Path(network_id): Path<String>,
) -> Result<(), ApiError> {
    MultiNetworkService::new(state).delete_network(&network_id)
}

pub async fn list_networks(State(state): State<AppState>) -> Json<Vec<NetworkInfo>> {
    Json(state.network_manager.managed_networks())
}

pub async fn pending_join_requests(State(state): State<AppState>) -> Json<Vec<JoinRequest>> {
    Json(state.network_manager.pending_join_requests())
}

/// Receives a worker's join request over the wire and resolves it
/// synchronously, per [`crate::config::AdminNodeConfig::auto_approve_joins`].
pub async fn join_network(
    State(state): State<AppState>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let request_id = request.request_id.clone();
    state.network_manager.receive_join_request(request);

    let response = if state.config.auto_approve_joins {
        state
            .network_manager
            .approve_join_request(&request_id, true, "auto-approved on arrival")?
    } else {
        JoinResponse {
            request_id,
            approved: false,
            network_config: None,
            reason: "pending manual admin review".to_string(),
            admin_message: String::new(),
        }
    };
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ApproveJoinRequest {
    pub request_id: String,
    pub approve: bool,
    #[serde(default)]
    pub admin_message: String,
}

pub async fn approve_join(
    State(state): State<AppState>,
    Json(request): Json<ApproveJoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let response = state.network_manager.approve_join_request(
        &request.request_id,
        request.approve,
        &request.admin_message,
    )?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct DiscoveredNetworksResponse {
    pub networks: Vec<NetworkInfo>,
}

pub async fn discovered_networks(
    State(state): State<AppState>,
) -> Result<Json<DiscoveredNetworksResponse>, ApiError> {
    let license = state.license.read().require_valid()?.clone();
    let allowed_models = license.allowed_models.clone();
    let networks = state
        .network_manager
        .compatible_networks(&license, move |id| allowed_models.is_empty() || allowed_models.contains(id));
    Ok(Json(DiscoveredNetworksResponse { networks }))
}
