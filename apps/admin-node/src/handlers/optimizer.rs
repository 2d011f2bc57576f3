//! Optimization recommendation and load-balancing endpoints (spec C15).

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tiktrue_resource_optimizer::{OptimizationRecommendation, OptimizationStrategy};

use crate::state::AppState;

pub async fn recommendations(State(state): State<AppState>) -> Json<Vec<OptimizationRecommendation>> {
    Json(state.resource_optimizer.generate_optimization_suggestions())
}

#[derive(Debug, Deserialize)]
pub struct RebalanceRequest {
    #[serde(default = "default_strategy")]
    pub strategy: OptimizationStrategy,
}

fn default_strategy() -> OptimizationStrategy {
    OptimizationStrategy::Balanced
}

#[derive(Debug, serde::Serialize)]
pub struct RebalanceResponse {
    pub rebalanced: bool,
}

pub async fn rebalance(
    State(state): State<AppState>,
    Json(request): Json<RebalanceRequest>,
) -> Json<RebalanceResponse> {
    let rebalanced = state.resource_optimizer.dynamic_load_balancing(request.strategy);
    Json(RebalanceResponse { rebalanced })
}
