use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiktrue_license::Tier;
use tiktrue_network::{is_tier_compatible, NetworkInfo, NetworkType};

pub const DISCOVERY_PORT: u16 = 8700;
pub const DISCOVERY_MULTICAST_GROUP: &str = "239.255.255.250";
pub const DISCOVERY_TIMEOUT_SECS: u64 = 5;
pub const DISCOVERY_RETRY_COUNT: u32 = 3;
pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum DiscoveryMessage {
    DiscoveryRequest {
        protocol_version: String,
        node_id: String,
        timestamp: DateTime<Utc>,
        license_tier: Tier,
        requested_network_types: Vec<NetworkType>,
        supported_models: Vec<String>,
    },
    DiscoveryResponse {
        protocol_version: String,
        node_id: String,
        networks: Vec<NetworkInfo>,
        timestamp: DateTime<Utc>,
    },
    Heartbeat {
        protocol_version: String,
        node_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl DiscoveryMessage {
    pub fn request(
        node_id: impl Into<String>,
        license_tier: Tier,
        requested_network_types: Vec<NetworkType>,
        supported_models: Vec<String>,
    ) -> Self {
        DiscoveryMessage::DiscoveryRequest {
            protocol_version: PROTOCOL_VERSION.to_string(),
            node_id: node_id.into(),
            timestamp: Utc::now(),
            license_tier,
            requested_network_types,
            supported_models,
        }
    }

    pub fn response(node_id: impl Into<String>, networks: Vec<NetworkInfo>) -> Self {
        DiscoveryMessage::DiscoveryResponse {
            protocol_version: PROTOCOL_VERSION.to_string(),
            node_id: node_id.into(),
            networks,
            timestamp: Utc::now(),
        }
    }

    pub fn heartbeat(node_id: impl Into<String>) -> Self {
        DiscoveryMessage::Heartbeat {
            protocol_version: PROTOCOL_VERSION.to_string(),
            node_id: node_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn sender_node_id(&self) -> &str {
        match self {
            DiscoveryMessage::DiscoveryRequest { node_id, .. }
            | DiscoveryMessage::DiscoveryResponse { node_id, .. }
            | DiscoveryMessage::Heartbeat { node_id, .. } => node_id,
        }
    }
}

/// Narrows `managed` to the networks a responder should disclose to a given
/// discovery request, per spec §4.4: the network's required tier must be
/// at or below the requester's tier, the network's type must be among the
/// requester's requested types (an empty list matches anything), and the
/// network's model must be in the requester's supported-models list (an
/// empty list again matches anything, for requesters that don't filter by
/// model yet).
pub fn networks_for_request(managed: &[NetworkInfo], request: &DiscoveryMessage) -> Vec<NetworkInfo> {
    let DiscoveryMessage::DiscoveryRequest {
        license_tier,
        requested_network_types,
        supported_models,
        ..
    } = request
    else {
        return Vec::new();
    };

    managed
        .iter()
        .filter(|network| is_tier_compatible(*license_tier, network.required_license_tier))
        .filter(|network| {
            requested_network_types.is_empty() || requested_network_types.contains(&network.network_type)
        })
        .filter(|network| supported_models.is_empty() || supported_models.contains(&network.model_id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc as ChronoUtc;
    use tiktrue_network::NetworkStatus;

    fn network(id: &str, tier: Tier, ty: NetworkType, model: &str) -> NetworkInfo {
        NetworkInfo {
            network_id: id.to_string(),
            network_name: id.to_string(),
            network_type: ty,
            admin_node_id: "admin-1".to_string(),
            admin_host: "127.0.0.1".to_string(),
            admin_port: 9000,
            model_id: model.to_string(),
            model_name: model.to_string(),
            required_license_tier: tier,
            max_clients: 10,
            current_clients: 0,
            status: NetworkStatus::Active,
            created_at: ChronoUtc::now(),
            last_seen: ChronoUtc::now(),
            description: String::new(),
            version: "1.0".to_string(),
        }
    }

    #[test]
    fn scenario_7_free_tier_sees_only_free_required_network() {
        let managed = vec![
            network("n1", Tier::Free, NetworkType::Public, "m"),
            network("n2", Tier::Pro, NetworkType::Public, "m"),
            network("n3", Tier::Ent, NetworkType::Public, "m"),
        ];
        let request = DiscoveryMessage::request("client-1", Tier::Free, vec![], vec![]);
        let visible = networks_for_request(&managed, &request);
        assert_eq!(visible.iter().map(|n| n.network_id.as_str()).collect::<Vec<_>>(), vec!["n1"]);
    }

    #[test]
    fn scenario_7_pro_tier_sees_free_and_pro_networks() {
        let managed = vec![
            network("n1", Tier::Free, NetworkType::Public, "m"),
            network("n2", Tier::Pro, NetworkType::Public, "m"),
            network("n3", Tier::Ent, NetworkType::Public, "m"),
        ];
        let request = DiscoveryMessage::request("client-1", Tier::Pro, vec![], vec![]);
        let mut visible: Vec<_> = networks_for_request(&managed, &request)
            .into_iter()
            .map(|n| n.network_id)
            .collect();
        visible.sort();
        assert_eq!(visible, vec!["n1".to_string(), "n2".to_string()]);
    }

    #[test]
    fn network_type_filter_excludes_non_matching_types() {
        let managed = vec![
            network("n1", Tier::Free, NetworkType::Public, "m"),
            network("n2", Tier::Free, NetworkType::Private, "m"),
        ];
        let request = DiscoveryMessage::request("client-1", Tier::Free, vec![NetworkType::Private], vec![]);
        let visible = networks_for_request(&managed, &request);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].network_id, "n2");
    }

    #[test]
    fn model_filter_excludes_unsupported_models() {
        let managed = vec![network("n1", Tier::Free, NetworkType::Public, "llama-7b")];
        let request = DiscoveryMessage::request("client-1", Tier::Free, vec![], vec!["mistral-7b".to_string()]);
        assert!(networks_for_request(&managed, &request).is_empty());
    }

    #[test]
    fn response_is_never_filterable_and_returns_empty() {
        let response = DiscoveryMessage::response("admin-1", vec![]);
        assert!(networks_for_request(&[], &response).is_empty());
    }
}
