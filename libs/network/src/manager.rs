//! Network lifecycle state machine: create, discover, join, approve (spec C6).

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tiktrue_license::{LicenseRecord, Tier};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::NetworkError;
use crate::types::{
    is_tier_compatible, model_chain_order, network_limit_for, AdminNodeRef, JoinRequest,
    JoinResponse, LicenseRequirements, NetworkConfig, NetworkInfo, NetworkStatus, NetworkType,
};

/// Manages this node's view of networks: ones it discovered, ones it has
/// joined as a worker, and ones it administers.
pub struct NetworkManager {
    node_id: String,
    managed_networks: RwLock<HashMap<String, NetworkInfo>>,
    discovered_networks: RwLock<HashMap<String, NetworkInfo>>,
    joined_networks: RwLock<HashMap<String, NetworkConfig>>,
    pending_join_requests: RwLock<HashMap<String, JoinRequest>>,
}

impl NetworkManager {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            managed_networks: RwLock::new(HashMap::new()),
            discovered_networks: RwLock::new(HashMap::new()),
            joined_networks: RwLock::new(HashMap::new()),
            pending_join_requests: RwLock::new(HashMap::new()),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Creates and starts administering a new network, subject to license
    /// gating: license must be valid, the model must be allowed, enterprise
    /// networks require an ENT license, and the per-tier network count limit
    /// must not already be reached.
    #[instrument(skip(self, license, model_allowed))]
    pub fn create_network(
        &self,
        license: &LicenseRecord,
        network_name: &str,
        model_id: &str,
        network_type: NetworkType,
        description: &str,
        model_allowed: impl Fn(&str) -> bool,
        admin_host: &str,
        admin_port: u16,
    ) -> Result<NetworkInfo, NetworkError> {
        if !license.is_valid() {
            return Err(NetworkError::InvalidLicense);
        }
        if !model_allowed(model_id) {
            return Err(NetworkError::ModelAccessDenied(model_id.to_string()));
        }
        if matches!(network_type, NetworkType::Enterprise) && license.plan != Tier::Ent {
            return Err(NetworkError::EnterpriseLicenseRequired);
        }

        let current_managed = self.managed_networks.read().len();
        let max_networks = network_limit_for(license.plan);
        if max_networks != -1 && current_managed as i64 >= max_networks {
            return Err(NetworkError::NetworkLimitReached {
                current: current_managed,
                max: max_networks,
            });
        }

        let max_clients = if license.max_clients != -1 {
            license.max_clients.min(100)
        } else {
            100
        };

        let now = Utc::now();
        let network_info = NetworkInfo {
            network_id: format!("net_{}", &Uuid::new_v4().simple().to_string()[..12]),
            network_name: network_name.to_string(),
            network_type,
            admin_node_id: self.node_id.clone(),
            admin_host: admin_host.to_string(),
            admin_port,
            model_id: model_id.to_string(),
            model_name: model_id.to_string(),
            required_license_tier: license.plan,
            max_clients,
            current_clients: 0,
            status: NetworkStatus::Active,
            created_at: now,
            last_seen: now,
            description: description.to_string(),
            version: "1.0".to_string(),
        };

        self.managed_networks
            .write()
            .insert(network_info.network_id.clone(), network_info.clone());
        info!(network_id = %network_info.network_id, network_name, "network created");
        Ok(network_info)
    }

    /// Records a network seen over the discovery channel, replacing any
    /// earlier sighting of the same id.
    pub fn record_discovery(&self, network_info: NetworkInfo) {
        self.discovered_networks
            .write()
            .insert(network_info.network_id.clone(), network_info);
    }

    pub fn clear_discoveries(&self) {
        self.discovered_networks.write().clear();
    }

    /// Narrows discovered networks to those this license can actually use
    /// (spec §4.3 discovery filtering).
    pub fn compatible_networks(
        &self,
        license: &LicenseRecord,
        model_allowed: impl Fn(&str) -> bool,
    ) -> Vec<NetworkInfo> {
        self.discovered_networks
            .read()
            .values()
            .filter(|n| is_tier_compatible(license.plan, n.required_license_tier))
            .filter(|n| model_allowed(&n.model_id))
            .cloned()
            .collect()
    }

    /// Builds the join request this node would send to a discovered
    /// network's admin, gated the same way as `create_network`.
    #[instrument(skip(self, license, model_allowed))]
    pub fn begin_join(
        &self,
        license: &LicenseRecord,
        network_id: &str,
        message: &str,
        client_host: &str,
        client_port: u16,
    ) -> Result<JoinRequest, NetworkError> {
        if !license.is_valid() {
            return Err(NetworkError::InvalidLicense);
        }

        let network_info = self
            .discovered_networks
            .read()
            .get(network_id)
            .cloned()
            .ok_or_else(|| NetworkError::NotFound(network_id.to_string()))?;

        if !is_tier_compatible(license.plan, network_info.required_license_tier) {
            return Err(NetworkError::TierIncompatible {
                have: license.plan.as_str().to_string(),
                need: network_info.required_license_tier.as_str().to_string(),
            });
        }

        let join_request = JoinRequest {
            request_id: format!("req_{}", &Uuid::new_v4().simple().to_string()[..8]),
            client_id: self.node_id.clone(),
            client_host: client_host.to_string(),
            client_port,
            network_id: network_id.to_string(),
            license_tier: license.plan,
            requested_at: Utc::now(),
            message: message.to_string(),
        };

        self.pending_join_requests
            .write()
            .insert(join_request.request_id.clone(), join_request.clone());
        Ok(join_request)
    }

    /// Records the outcome of a join request this node sent, persisting the
    /// resulting config if approved.
    pub fn complete_join(&self, response: JoinResponse) -> Result<(), NetworkError> {
        if !response.approved {
            return Err(NetworkError::AtCapacity);
        }
        let config = response
            .network_config
            .ok_or(NetworkError::AtCapacity)?;
        self.joined_networks
            .write()
            .insert(config.network_id.clone(), config);
        Ok(())
    }

    pub fn joined_networks(&self) -> Vec<NetworkConfig> {
        self.joined_networks.read().values().cloned().collect()
    }

    pub fn pending_join_requests(&self) -> Vec<JoinRequest> {
        self.pending_join_requests.read().values().cloned().collect()
    }

    /// Admin-side counterpart of a worker submitting a `JoinRequest` over
    /// the wire: records it as pending until `approve_join_request` resolves it.
    pub fn receive_join_request(&self, request: JoinRequest) {
        self.pending_join_requests
            .write()
            .insert(request.request_id.clone(), request);
    }

    /// The admin-side counterpart of `begin_join`: approves or denies a
    /// pending request against a managed network's current capacity.
    #[instrument(skip(self))]
    pub fn approve_join_request(
        &self,
        request_id: &str,
        approve: bool,
        admin_message: &str,
    ) -> Result<JoinResponse, NetworkError> {
        let join_request = self
            .pending_join_requests
            .write()
            .remove(request_id)
            .ok_or_else(|| NetworkError::JoinRequestNotFound(request_id.to_string()))?;

        let mut managed = self.managed_networks.write();
        let network_info = managed
            .get_mut(&join_request.network_id)
            .ok_or_else(|| NetworkError::NotFound(join_request.network_id.clone()))?;

        let mut response = JoinResponse {
            request_id: request_id.to_string(),
            approved: approve,
            network_config: None,
            reason: if approve {
                "approved by admin".to_string()
            } else {
                "denied by admin".to_string()
            },
            admin_message: admin_message.to_string(),
        };

        if approve {
            if network_info.current_clients >= network_info.max_clients {
                response.approved = false;
                response.reason = "network at capacity".to_string();
                warn!(network_id = %network_info.network_id, "join request denied: at capacity");
            } else {
                response.network_config = Some(build_network_config(network_info, true));
                network_info.current_clients += 1;
                info!(network_id = %network_info.network_id, request_id, "join request approved");
            }
        }

        Ok(response)
    }

    /// Tears down a network this node administers, per the C16
    /// `delete_network` teardown sequence (spec §4.13).
    pub fn remove_managed_network(&self, network_id: &str) -> Option<NetworkInfo> {
        let removed = self.managed_networks.write().remove(network_id);
        if removed.is_some() {
            info!(network_id, "network removed");
        }
        removed
    }

    pub fn managed_networks(&self) -> Vec<NetworkInfo> {
        self.managed_networks.read().values().cloned().collect()
    }

    pub fn network_statistics(&self) -> NetworkStatistics {
        NetworkStatistics {
            node_id: self.node_id.clone(),
            discovered_networks: self.discovered_networks.read().len(),
            joined_networks: self.joined_networks.read().len(),
            managed_networks: self.managed_networks.read().len(),
            pending_requests: self.pending_join_requests.read().len(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NetworkStatistics {
    pub node_id: String,
    pub discovered_networks: usize,
    pub joined_networks: usize,
    pub managed_networks: usize,
    pub pending_requests: usize,
}

fn build_network_config(network_info: &NetworkInfo, for_client: bool) -> NetworkConfig {
    NetworkConfig {
        network_id: network_info.network_id.clone(),
        network_name: network_info.network_name.clone(),
        network_type: network_info.network_type,
        model_id: network_info.model_id.clone(),
        model_chain_order: model_chain_order(&network_info.model_id),
        admin_node: AdminNodeRef {
            node_id: network_info.admin_node_id.clone(),
            host: network_info.admin_host.clone(),
            port: network_info.admin_port,
        },
        license_requirements: LicenseRequirements {
            required_tier: network_info.required_license_tier,
            max_clients: network_info.max_clients,
        },
        created_at: network_info.created_at,
        version: network_info.version.clone(),
        description: network_info.description.clone(),
        joined_at: if for_client { Some(Utc::now()) } else { None },
        client_role: if for_client { Some("worker".to_string()) } else { None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiktrue_license::LicenseRecord;

    fn pro_license() -> LicenseRecord {
        LicenseRecord::issue(
            "TIKT-PRO-12M-ABC123",
            Default::default(),
            Tier::Pro.features().into_iter().map(String::from).collect(),
            20,
            String::new(),
        )
        .unwrap()
    }

    #[test]
    fn create_network_is_denied_without_a_valid_license() {
        let manager = NetworkManager::new("node1");
        let mut license = pro_license();
        license.status = tiktrue_license::LicenseStatus::Expired;
        let result = manager.create_network(&license, "net", "llama-7b", NetworkType::Public, "", |_| true, "localhost", 8702);
        assert!(result.is_err());
    }

    #[test]
    fn create_network_succeeds_and_counts_toward_the_tier_limit() {
        let manager = NetworkManager::new("node1");
        let license = pro_license();
        for _ in 0..5 {
            assert!(manager.create_network(&license, "net", "llama-7b", NetworkType::Public, "", |_| true, "localhost", 8702).is_ok());
        }
        let result = manager.create_network(&license, "net", "llama-7b", NetworkType::Public, "", |_| true, "localhost", 8702);
        assert!(matches!(result, Err(NetworkError::NetworkLimitReached { .. })));
    }

    #[test]
    fn enterprise_network_requires_ent_license() {
        let manager = NetworkManager::new("node1");
        let license = pro_license();
        let result = manager.create_network(&license, "net", "llama-7b", NetworkType::Enterprise, "", |_| true, "localhost", 8702);
        assert!(matches!(result, Err(NetworkError::EnterpriseLicenseRequired)));
    }

    #[test]
    fn join_then_approve_round_trips_to_a_joined_network_config() {
        let admin = NetworkManager::new("admin");
        let worker = NetworkManager::new("worker");
        let license = pro_license();

        let network = admin
            .create_network(&license, "net", "llama-7b", NetworkType::Public, "", |_| true, "localhost", 8702)
            .unwrap();
        worker.record_discovery(network.clone());

        let join_request = worker.begin_join(&license, &network.network_id, "hi", "localhost", 9000).unwrap();
        admin.pending_join_requests.write().insert(join_request.request_id.clone(), join_request.clone());
        // simulate admin receiving the network's own managed copy
        admin.managed_networks.write().insert(network.network_id.clone(), network.clone());

        let response = admin.approve_join_request(&join_request.request_id, true, "welcome").unwrap();
        assert!(response.approved);
        worker.complete_join(response).unwrap();
        assert_eq!(worker.joined_networks().len(), 1);
    }

    #[test]
    fn approve_join_request_fails_once_network_is_at_capacity() {
        let admin = NetworkManager::new("admin");
        let license = pro_license();
        let mut network = admin
            .create_network(&license, "net", "llama-7b", NetworkType::Public, "", |_| true, "localhost", 8702)
            .unwrap();
        network.max_clients = 0;
        admin.managed_networks.write().insert(network.network_id.clone(), network.clone());

        let join_request = JoinRequest {
            request_id: "req_1".to_string(),
            client_id: "worker".to_string(),
            client_host: "localhost".to_string(),
            client_port: 9000,
            network_id: network.network_id.clone(),
            license_tier: Tier::Pro,
            requested_at: Utc::now(),
            message: String::new(),
        };
        admin.pending_join_requests.write().insert(join_request.request_id.clone(), join_request);

        let response = admin.approve_join_request("req_1", true, "").unwrap();
        assert!(!response.approved);
        assert_eq!(response.reason, "network at capacity");
    }
}
