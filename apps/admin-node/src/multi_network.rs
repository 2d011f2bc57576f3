//! Multi-network service composition root (spec C16): composes license
//! enforcement, the resource ledger, and the network manager behind a single
//! `create_network`/`delete_network` sequence so a single admin node can
//! run several networks against one shared resource budget.

use axum::http::StatusCode;
use serde_json::json;
use tiktrue_access_control::ResourceType;
use tiktrue_monitoring::{EventSeverity, EventType};
use tiktrue_network::{NetworkInfo, NetworkType};

use crate::error::ApiError;
use crate::resources::{estimate_requirements, ResourceAllocation};
use crate::state::AppState;

pub struct MultiNetworkService {
    state: AppState,
}

impl MultiNetworkService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Validates license + quota, delegates to the network manager to mint
    /// the network, then wires a resource allocation to the resulting id.
    pub fn create_network(
        &self,
        network_name: &str,
        model_id: &str,
        network_type: NetworkType,
        description: &str,
    ) -> Result<NetworkInfo, ApiError> {
        let license = self.state.license.read().require_valid()?.clone();

        if !self.state.access_control.consume_quota(ResourceType::Network, 1, 0) {
            return Err(ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                "network quota exceeded for this license tier",
            ));
        }

        let allowed_models = license.allowed_models.clone();
        let create_result = self.state.network_manager.create_network(
            &license,
            network_name,
            model_id,
            network_type,
            description,
            move |id| allowed_models.is_empty() || allowed_models.contains(id),
            &self.state.config.bind_host,
            self.state.config.bind_port,
        );

        let network_info = match create_result {
            Ok(info) => info,
            Err(err) => {
                self.state.access_control.release_quota(ResourceType::Network, 1, 0);
                return Err(err.into());
            }
        };

        let estimate = estimate_requirements(model_id, network_info.max_clients, 1.0);
        let requested = ResourceAllocation {
            network_id: network_info.network_id.clone(),
            cpu_cores: estimate.cpu_cores,
            memory_mb: estimate.memory_mb,
        };
        if let Err(err) = self.state.resources.allocate(&network_info.network_id, requested) {
            self.state.network_manager.remove_managed_network(&network_info.network_id);
            self.state.access_control.release_quota(ResourceType::Network, 1, 0);
            return Err(err.into());
        }

        self.state.monitoring.log_event(
            EventType::NetworkEvent,
            EventSeverity::Info,
            "multi_network_service",
            format!("network {} created", network_info.network_id),
            json!({ "network_id": network_info.network_id, "model_id": model_id }),
        );

        Ok(network_info)
    }

    /// Tears down a managed network in reverse of creation order.
    pub fn delete_network(&self, network_id: &str) -> Result<(), ApiError> {
        self.state
            .network_manager
            .remove_managed_network(network_id)
            .ok_or_else(|| ApiError::not_found(format!("network {network_id} not found")))?;

        let _ = self.state.resources.deallocate(network_id);
        self.state.access_control.release_quota(ResourceType::Network, 1, 0);

        self.state.monitoring.log_event(
            EventType::NetworkEvent,
            EventSeverity::Info,
            "multi_network_service",
            format!("network {network_id} deleted"),
            json!({ "network_id": network_id }),
        );
        Ok(())
    }
}
