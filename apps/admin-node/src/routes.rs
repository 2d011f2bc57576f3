//! Axum router wiring: worker-facing routes behind the bearer-token guard,
//! admin-facing routes open on the local network, CORS for browser-based
//! admin consoles.

use axum::middleware as axum_middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{config_sync, health, models, monitoring, networks, optimizer, workers};
use crate::middleware::require_worker_token;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let worker_routes = Router::new()
        .route("/api/v1/network/join", post(networks::join_network))
        .route("/api/v1/worker/register", post(workers::register_worker))
        .route("/api/v1/worker/heartbeat", post(workers::heartbeat))
        .route("/api/v1/worker/model-sync", post(workers::model_sync))
        .route("/api/v1/models/:model_id/manifest", get(models::get_manifest))
        .route("/api/v1/models/:model_id/blocks/:file_name", get(models::get_block))
        .route("/api/v1/models/:model_id/key-exchange", post(models::key_exchange))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_worker_token));

    let admin_routes = Router::new()
        .route("/api/v1/network/create", post(networks::create_network))
        .route("/api/v1/network/list", get(networks::list_networks))
        .route("/api/v1/network/pending", get(networks::pending_join_requests))
        .route("/api/v1/network/approve", post(networks::approve_join))
        .route("/api/v1/network/:network_id", delete(networks::delete_network))
        .route("/api/v1/discovery/networks", get(networks::discovered_networks))
        .route("/api/v1/models/:model_id/fetch", post(models::fetch_and_publish_model))
        .route("/api/v1/health/summary", get(health::summary))
        .route("/api/v1/monitoring/report", get(monitoring::report))
        .route("/api/v1/optimizer/recommendations", get(optimizer::recommendations))
        .route("/api/v1/optimizer/rebalance", post(optimizer::rebalance))
        .route("/api/v1/config/update", post(config_sync::update_configuration))
        .route("/api/v1/config/:key", get(config_sync::get_configuration));

    Router::new()
        .merge(worker_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
