use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigChangeType {
    Create,
    Update,
    Delete,
    /// Treated identically to `Update` with the incoming value.
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolutionStrategy {
    TimestampWins,
    VersionWins,
    ManualResolution,
    ConsensusVote,
    LicensePriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigScope {
    Global,
    Network,
    Worker,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationItem {
    pub key: String,
    pub value: serde_json::Value,
    pub scope: ConfigScope,
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub license_requirements: Vec<String>,
    pub checksum: String,
}

impl ConfigurationItem {
    pub fn new(key: impl Into<String>, value: serde_json::Value, scope: ConfigScope, version: u64, author: impl Into<String>) -> Self {
        let key = key.into();
        let checksum = Self::calculate_checksum(&key, &value, version);
        Self {
            key,
            value,
            scope,
            version,
            timestamp: Utc::now(),
            author: author.into(),
            license_requirements: Vec::new(),
            checksum,
        }
    }

    pub fn calculate_checksum(key: &str, value: &serde_json::Value, version: u64) -> String {
        let data = format!("{key}:{value}:{version}");
        let digest = Sha256::digest(data.as_bytes());
        hex::encode(digest)[..16].to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationChange {
    pub change_id: String,
    pub change_type: ConfigChangeType,
    pub config_item: ConfigurationItem,
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub license_hash: Option<String>,
    pub applied: bool,
}

impl ConfigurationChange {
    pub fn new(change_type: ConfigChangeType, config_item: ConfigurationItem, node_id: impl Into<String>) -> Self {
        Self {
            change_id: Uuid::new_v4().to_string(),
            change_type,
            config_item,
            timestamp: Utc::now(),
            node_id: node_id.into(),
            license_hash: None,
            applied: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigConflict {
    pub conflict_id: String,
    pub config_key: String,
    pub conflicting_changes: Vec<ConfigurationChange>,
    pub resolution_strategy: ConflictResolutionStrategy,
    pub resolved: bool,
    pub resolution_result: Option<ConfigurationItem>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ConfigConflict {
    pub fn new(config_key: impl Into<String>, conflicting_changes: Vec<ConfigurationChange>, strategy: ConflictResolutionStrategy) -> Self {
        Self {
            conflict_id: Uuid::new_v4().to_string(),
            config_key: config_key.into(),
            conflicting_changes,
            resolution_strategy: strategy,
            resolved: false,
            resolution_result: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    pub broadcasts_sent: u64,
    pub updates_received: u64,
    pub conflicts_resolved: u64,
}
