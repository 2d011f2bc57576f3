use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiktrue_license::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    Public,
    Private,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    Active,
    Inactive,
    Maintenance,
    Restricted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub network_id: String,
    pub network_name: String,
    pub network_type: NetworkType,
    pub admin_node_id: String,
    pub admin_host: String,
    pub admin_port: u16,
    pub model_id: String,
    pub model_name: String,
    pub required_license_tier: Tier,
    pub max_clients: i64,
    pub current_clients: i64,
    pub status: NetworkStatus,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub request_id: String,
    pub client_id: String,
    pub client_host: String,
    pub client_port: u16,
    pub network_id: String,
    pub license_tier: Tier,
    pub requested_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub request_id: String,
    pub approved: bool,
    pub network_config: Option<NetworkConfig>,
    pub reason: String,
    pub admin_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminNodeRef {
    pub node_id: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseRequirements {
    pub required_tier: Tier,
    pub max_clients: i64,
}

/// The persisted configuration handed to a worker once its join is approved
/// (spec §4.3's network config file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network_id: String,
    pub network_name: String,
    pub network_type: NetworkType,
    pub model_id: String,
    pub model_chain_order: Vec<String>,
    pub admin_node: AdminNodeRef,
    pub license_requirements: LicenseRequirements,
    pub created_at: DateTime<Utc>,
    pub version: String,
    pub description: String,
    pub joined_at: Option<DateTime<Utc>>,
    pub client_role: Option<String>,
}

/// Derives a model's expected block chain length from its name. A stand-in
/// for real model metadata, following the same per-family heuristic as
/// `original_source`.
pub fn model_chain_order(model_id: &str) -> Vec<String> {
    let lower = model_id.to_lowercase();
    let block_count = if lower.contains("llama") {
        33
    } else if lower.contains("mistral") {
        32
    } else {
        24
    };
    (1..=block_count).map(|i| format!("block_{i}")).collect()
}

pub fn tier_level(tier: Tier) -> u8 {
    match tier {
        Tier::Free => 1,
        Tier::Pro => 2,
        Tier::Ent => 3,
    }
}

pub fn is_tier_compatible(license_tier: Tier, required_tier: Tier) -> bool {
    tier_level(license_tier) >= tier_level(required_tier)
}

pub fn network_limit_for(tier: Tier) -> i64 {
    match tier {
        Tier::Free => 1,
        Tier::Pro => 5,
        Tier::Ent => -1,
    }
}
