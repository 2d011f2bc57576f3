use std::collections::HashMap;

use chrono::{Duration, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tiktrue_license::{LicenseRecord, Tier};
use tracing::{info, instrument, warn};

use crate::error::ConfigSyncError;
use crate::sender::ChangeSender;
use crate::types::{
    ConfigChangeType, ConfigConflict, ConfigScope, ConfigurationChange, ConfigurationItem,
    ConflictResolutionStrategy, SyncStats,
};

/// Pending changes unapplied after this long are retried on the next sweep.
pub const PENDING_RETRY_AFTER_SECS: i64 = 5 * 60;

pub struct ConfigSynchronizer {
    node_id: String,
    license: Option<LicenseRecord>,
    default_strategy: ConflictResolutionStrategy,
    configurations: RwLock<HashMap<String, ConfigurationItem>>,
    pending_changes: RwLock<HashMap<String, ConfigurationChange>>,
    conflicts: RwLock<HashMap<String, ConfigConflict>>,
    stats: RwLock<SyncStats>,
}

impl ConfigSynchronizer {
    pub fn new(node_id: impl Into<String>, license: Option<LicenseRecord>) -> Self {
        Self {
            node_id: node_id.into(),
            license,
            default_strategy: ConflictResolutionStrategy::ConsensusVote,
            configurations: RwLock::new(HashMap::new()),
            pending_changes: RwLock::new(HashMap::new()),
            conflicts: RwLock::new(HashMap::new()),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    pub fn set_default_strategy(&mut self, strategy: ConflictResolutionStrategy) {
        self.default_strategy = strategy;
    }

    pub fn get_configuration(&self, key: &str) -> Option<serde_json::Value> {
        self.configurations.read().get(key).map(|item| item.value.clone())
    }

    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Global configuration version: sha256 over the sorted list of
    /// per-item checksums.
    pub fn configuration_version(&self) -> String {
        let configurations = self.configurations.read();
        let mut checksums: Vec<&str> = configurations.values().map(|i| i.checksum.as_str()).collect();
        checksums.sort_unstable();
        let digest = Sha256::digest(checksums.join(",").as_bytes());
        hex::encode(digest)
    }

    /// Creates (bumping the local monotonic version) and locally applies a
    /// configuration change.
    pub fn update_configuration(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
        scope: ConfigScope,
        license_requirements: Vec<String>,
    ) -> ConfigurationChange {
        let key = key.into();
        let next_version = self.configurations.read().get(&key).map(|i| i.version + 1).unwrap_or(1);
        let mut item = ConfigurationItem::new(key.clone(), value, scope, next_version, self.node_id.clone());
        item.license_requirements = license_requirements;

        let change_type = if self.configurations.read().contains_key(&key) {
            ConfigChangeType::Update
        } else {
            ConfigChangeType::Create
        };
        let mut change = ConfigurationChange::new(change_type, item.clone(), self.node_id.clone());
        change.applied = true;
        self.configurations.write().insert(key, item);
        change
    }

    fn validate_license_compatibility(&self, item: &ConfigurationItem) -> Result<(), ConfigSyncError> {
        if item.license_requirements.is_empty() {
            return Ok(());
        }
        let Some(license) = &self.license else {
            return Err(ConfigSyncError::MissingFeature(item.license_requirements.join(",")));
        };
        for requirement in &item.license_requirements {
            if !license.allowed_features.contains(requirement) {
                return Err(ConfigSyncError::MissingFeature(requirement.clone()));
            }
        }
        if item.scope == ConfigScope::Global && license.plan == Tier::Free {
            return Err(ConfigSyncError::GlobalRequiresHigherTier);
        }
        Ok(())
    }

    /// Validates license compatibility for each change, sends compatible
    /// ones to every target node, and records them as pending.
    #[instrument(skip(self, changes, sender))]
    pub async fn broadcast_config_updates(
        &self,
        changes: &[ConfigurationChange],
        targets: &[String],
        sender: &dyn ChangeSender,
    ) -> usize {
        let mut sent = 0;
        for change in changes {
            if let Err(err) = self.validate_license_compatibility(&change.config_item) {
                warn!(key = %change.config_item.key, %err, "skipping incompatible configuration change");
                continue;
            }
            let mut any_target_succeeded = false;
            for target in targets {
                match sender.send(target, change).await {
                    Ok(()) => any_target_succeeded = true,
                    Err(err) => warn!(target, %err, "failed to send configuration change"),
                }
            }
            if any_target_succeeded {
                sent += 1;
            }
            self.pending_changes.write().insert(change.change_id.clone(), change.clone());
            self.stats.write().broadcasts_sent += 1;
        }
        sent
    }

    /// Returns pending changes that have remained unapplied for longer
    /// than `PENDING_RETRY_AFTER_SECS`, for the caller to retry sending.
    pub fn pending_changes_due_for_retry(&self) -> Vec<ConfigurationChange> {
        let cutoff = Utc::now() - Duration::seconds(PENDING_RETRY_AFTER_SECS);
        self.pending_changes
            .read()
            .values()
            .filter(|c| !c.applied && c.timestamp < cutoff)
            .cloned()
            .collect()
    }

    pub fn mark_applied(&self, change_id: &str) {
        if let Some(change) = self.pending_changes.write().get_mut(change_id) {
            change.applied = true;
        }
    }

    /// Applies or conflicts an incoming change against the local item for
    /// the same key, per the receive-side rules.
    #[instrument(skip(self, incoming))]
    pub fn handle_incoming_config_update(&self, incoming: ConfigurationChange) -> Result<bool, ConfigSyncError> {
        self.stats.write().updates_received += 1;
        let key = incoming.config_item.key.clone();
        let local_version = self.configurations.read().get(&key).map(|i| i.version);

        let should_apply = match local_version {
            None => true,
            Some(local_version) if local_version < incoming.config_item.version => true,
            Some(local_version) => {
                let local_checksum = self.configurations.read().get(&key).map(|i| i.checksum.clone());
                if local_version >= incoming.config_item.version
                    && local_checksum.as_deref() != Some(incoming.config_item.checksum.as_str())
                {
                    let mut local_change = ConfigurationChange::new(
                        ConfigChangeType::Update,
                        self.configurations.read().get(&key).unwrap().clone(),
                        self.node_id.clone(),
                    );
                    local_change.applied = true;
                    let conflict = ConfigConflict::new(key.clone(), vec![local_change, incoming.clone()], self.default_strategy);
                    self.conflicts.write().insert(conflict.conflict_id.clone(), conflict);
                    false
                } else {
                    false
                }
            }
        };

        if should_apply {
            self.validate_license_compatibility(&incoming.config_item)?;
            info!(key = %key, version = incoming.config_item.version, "applying incoming configuration change");
            self.configurations.write().insert(key, incoming.config_item);
        }
        Ok(should_apply)
    }

    /// Resolves every open conflict using the strategy recorded on it,
    /// applying resolutions locally and updating stats.
    pub fn handle_config_conflicts(&self) -> Vec<ConfigConflict> {
        let open_conflicts: Vec<ConfigConflict> = self
            .conflicts
            .read()
            .values()
            .filter(|c| !c.resolved)
            .cloned()
            .collect();

        let mut resolved = Vec::new();
        for mut conflict in open_conflicts {
            let resolution = resolve_conflict(&conflict, self.license.as_ref());
            if let Some(item) = resolution {
                conflict.resolution_result = Some(item.clone());
                conflict.resolved = true;
                conflict.resolved_at = Some(Utc::now());
                self.configurations.write().insert(item.key.clone(), item);
                self.stats.write().conflicts_resolved += 1;
                resolved.push(conflict.clone());
            }
            self.conflicts.write().insert(conflict.conflict_id.clone(), conflict);
        }
        resolved
    }
}

fn resolve_conflict(conflict: &ConfigConflict, license: Option<&LicenseRecord>) -> Option<ConfigurationItem> {
    match conflict.resolution_strategy {
        ConflictResolutionStrategy::TimestampWins => conflict
            .conflicting_changes
            .iter()
            .max_by_key(|c| c.timestamp)
            .map(|c| c.config_item.clone()),
        ConflictResolutionStrategy::VersionWins => conflict
            .conflicting_changes
            .iter()
            .max_by_key(|c| c.config_item.version)
            .map(|c| c.config_item.clone()),
        ConflictResolutionStrategy::LicensePriority => {
            // Mirrors the original's shortcut: a change is only "priced in"
            // at the evaluating node's own tier if it carries a license
            // hash at all; there is no per-author tier lookup.
            let own_tier_priority = license.map(|l| tier_level(l.plan)).unwrap_or(0);
            conflict
                .conflicting_changes
                .iter()
                .max_by_key(|c| (if c.license_hash.is_some() { own_tier_priority } else { 0 }, c.timestamp))
                .map(|c| c.config_item.clone())
        }
        ConflictResolutionStrategy::ConsensusVote => consensus_resolution(&conflict.conflicting_changes),
        ConflictResolutionStrategy::ManualResolution => None,
    }
}

fn tier_level(tier: Tier) -> u8 {
    match tier {
        Tier::Free => 1,
        Tier::Pro => 2,
        Tier::Ent => 3,
    }
}

fn consensus_resolution(changes: &[ConfigurationChange]) -> Option<ConfigurationItem> {
    let mut buckets: HashMap<String, Vec<&ConfigurationChange>> = HashMap::new();
    for change in changes {
        buckets.entry(change.config_item.value.to_string()).or_default().push(change);
    }
    let winning_bucket = buckets.values().max_by_key(|bucket| bucket.len())?;
    winning_bucket.iter().max_by_key(|c| c.timestamp).map(|c| c.config_item.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConfigScope;
    use futures::future::BoxFuture;
    use serde_json::json;

    struct RecordingSender;
    impl ChangeSender for RecordingSender {
        fn send<'a>(&'a self, _target_node: &'a str, _change: &'a ConfigurationChange) -> BoxFuture<'a, Result<(), ConfigSyncError>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn ent_license() -> LicenseRecord {
        LicenseRecord::issue(
            "TIKT-ENT-12M-ABC123",
            Default::default(),
            Tier::Ent.features().into_iter().map(String::from).collect(),
            -1,
            String::new(),
        )
        .unwrap()
    }

    #[test]
    fn configuration_version_changes_when_an_item_changes() {
        let sync = ConfigSynchronizer::new("node1", None);
        let before = sync.configuration_version();
        sync.update_configuration("max_clients", json!(5), ConfigScope::Network, Vec::new());
        let after = sync.configuration_version();
        assert_ne!(before, after);
    }

    #[test]
    fn global_scope_change_is_rejected_without_a_paid_license() {
        let sync = ConfigSynchronizer::new("node1", None);
        let item = ConfigurationItem::new("feature_x", json!(true), ConfigScope::Global, 1, "node1");
        let mut incoming = ConfigurationChange::new(ConfigChangeType::Create, item, "node2");
        incoming.config_item.license_requirements = vec!["multi_network".to_string()];
        let err = sync.handle_incoming_config_update(incoming).unwrap_err();
        assert!(matches!(err, ConfigSyncError::MissingFeature(_)));
    }

    #[test]
    fn newer_incoming_version_applies_without_conflict() {
        let sync = ConfigSynchronizer::new("node1", None);
        sync.update_configuration("key1", json!(1), ConfigScope::Worker, Vec::new());
        let item = ConfigurationItem::new("key1", json!(2), ConfigScope::Worker, 2, "node2");
        let incoming = ConfigurationChange::new(ConfigChangeType::Update, item, "node2");
        let applied = sync.handle_incoming_config_update(incoming).unwrap();
        assert!(applied);
        assert_eq!(sync.get_configuration("key1").unwrap(), json!(2));
    }

    #[test]
    fn stale_incoming_version_with_different_checksum_creates_a_conflict() {
        let sync = ConfigSynchronizer::new("node1", None);
        sync.update_configuration("key1", json!("local"), ConfigScope::Worker, Vec::new());
        sync.update_configuration("key1", json!("local2"), ConfigScope::Worker, Vec::new());
        let item = ConfigurationItem::new("key1", json!("remote"), ConfigScope::Worker, 1, "node2");
        let incoming = ConfigurationChange::new(ConfigChangeType::Update, item, "node2");
        let applied = sync.handle_incoming_config_update(incoming).unwrap();
        assert!(!applied);
        assert_eq!(sync.conflicts.read().len(), 1);
    }

    #[test]
    fn consensus_vote_resolves_to_the_most_voted_value() {
        let sync = ConfigSynchronizer::new("node1", None);
        sync.update_configuration("key1", json!("a"), ConfigScope::Worker, Vec::new());
        let conflicting = vec![
            ConfigurationChange::new(ConfigChangeType::Update, ConfigurationItem::new("key1", json!("b"), ConfigScope::Worker, 1, "n2"), "n2"),
            ConfigurationChange::new(ConfigChangeType::Update, ConfigurationItem::new("key1", json!("b"), ConfigScope::Worker, 1, "n3"), "n3"),
            ConfigurationChange::new(ConfigChangeType::Update, ConfigurationItem::new("key1", json!("c"), ConfigScope::Worker, 1, "n4"), "n4"),
        ];
        let conflict = ConfigConflict::new("key1", conflicting, ConflictResolutionStrategy::ConsensusVote);
        sync.conflicts.write().insert(conflict.conflict_id.clone(), conflict);

        let resolved = sync.handle_config_conflicts();
        assert_eq!(resolved.len(), 1);
        assert_eq!(sync.get_configuration("key1").unwrap(), json!("b"));
    }

    #[tokio::test]
    async fn broadcast_records_changes_as_pending() {
        let sync = ConfigSynchronizer::new("node1", Some(ent_license()));
        let change = sync.update_configuration("key1", json!(1), ConfigScope::Worker, Vec::new());
        let sent = sync.broadcast_config_updates(&[change], &["node2".to_string()], &RecordingSender).await;
        assert_eq!(sent, 1);
        assert_eq!(sync.stats().broadcasts_sent, 1);
    }
}
