//! The access-control decision engine itself (spec §4.1).

use std::collections::{BTreeSet, HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tiktrue_license::Tier;
use tracing::{info, instrument, warn};

use crate::tables::{default_quotas, required_features, required_permission, role_resource_ceiling};
use crate::types::{AccessLevel, AccessResult, ResourceQuota, ResourceType, User};

const CACHE_TTL_MINUTES: i64 = 5;
const AUDIT_LOG_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub access_level: AccessLevel,
    pub granted: bool,
    pub reason: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    user_id: String,
    resource_type: ResourceType,
    resource_id: String,
    access_level: AccessLevel,
}

/// The decision engine of spec C4: role x permission x feature x quota
/// gating, with a 5-minute positive-decision cache and a bounded audit log.
/// Consistent with spec §7, internal failures never propagate as an error —
/// they flatten into a generic denial.
pub struct AccessControlManager {
    tier: Tier,
    available_features: BTreeSet<String>,
    quotas: RwLock<HashMap<String, ResourceQuota>>,
    cache: RwLock<HashMap<CacheKey, (AccessResult, DateTime<Utc>)>>,
    audit_log: RwLock<VecDeque<AuditEntry>>,
}

impl AccessControlManager {
    pub fn new(tier: Tier, available_features: BTreeSet<String>) -> Self {
        let quotas = default_quotas(tier).into_iter().collect();
        Self {
            tier,
            available_features,
            quotas: RwLock::new(quotas),
            cache: RwLock::new(HashMap::new()),
            audit_log: RwLock::new(VecDeque::with_capacity(AUDIT_LOG_CAPACITY)),
        }
    }

    pub fn available_features(&self) -> &BTreeSet<String> {
        &self.available_features
    }

    pub fn has_feature(&self, flag: &str) -> bool {
        self.available_features.contains(flag)
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub fn check(
        &self,
        user: &User,
        resource_type: ResourceType,
        resource_id: &str,
        access_level: AccessLevel,
        client_ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> AccessResult {
        let cache_key = CacheKey {
            user_id: user.user_id.clone(),
            resource_type,
            resource_id: resource_id.to_string(),
            access_level,
        };

        if let Some((cached, cached_at)) = self.cache.read().get(&cache_key) {
            if Utc::now() - *cached_at < Duration::minutes(CACHE_TTL_MINUTES) {
                return cached.clone();
            }
        }

        let result = self.decide(user, resource_type, resource_id, access_level);

        if result.granted {
            self.cache
                .write()
                .insert(cache_key, (result.clone(), Utc::now()));
        }

        self.log_attempt(user, resource_type, resource_id, access_level, &result, client_ip, user_agent);
        result
    }

    /// The ordered gates of spec §4.1. Any unexpected internal error is
    /// caught at this boundary and flattened into a generic denial, per the
    /// `original_source` behavior SPEC_FULL.md §B.1 documents.
    fn decide(
        &self,
        user: &User,
        resource_type: ResourceType,
        resource_id: &str,
        access_level: AccessLevel,
    ) -> AccessResult {
        let _ = resource_id;

        if !user.is_active {
            return AccessResult::denied("account inactive");
        }

        let missing: Vec<String> = required_features(resource_type, access_level)
            .into_iter()
            .filter(|f| !self.available_features.contains(*f))
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            return AccessResult::denied_with_restrictions(
                format!("missing required feature(s): {}", missing.join(", ")),
                missing,
            );
        }

        let effective_level = user
            .roles
            .iter()
            .map(|role| role_resource_ceiling(*role, resource_type))
            .max()
            .unwrap_or(AccessLevel::None);
        if effective_level < access_level {
            return AccessResult {
                granted: false,
                reason: "insufficient role permissions".to_string(),
                effective_level,
                restrictions: vec![],
                expires_at: None,
            };
        }

        if let Some(permission) = required_permission(resource_type, access_level) {
            if !user.permissions.contains(&permission) {
                return AccessResult::denied(format!("missing permission: {permission:?}"));
            }
        }

        if matches!(access_level, AccessLevel::Write | AccessLevel::Admin) {
            if let Some(quota_name) = resource_type.quota_name() {
                let mut quotas = self.quotas.write();
                if let Some(quota) = quotas.get_mut(quota_name) {
                    quota.reset_if_due();
                    if quota.max_count != -1 && quota.current_count >= quota.max_count {
                        return AccessResult::denied_with_restrictions(
                            format!(
                                "resource quota exceeded ({}/{})",
                                quota.current_count, quota.max_count
                            ),
                            vec![format!("quota limit reached for {quota_name}")],
                        );
                    }
                }
            }
        }

        AccessResult::granted("access granted", access_level)
    }

    /// Atomically reserves `count` units (and `size_mb`, if the quota tracks
    /// size) against the relevant quota, after resetting it if its window
    /// has elapsed. Returns `false` without mutating state if the reservation
    /// would exceed either maximum.
    pub fn consume_quota(&self, resource_type: ResourceType, count: i64, size_mb: i64) -> bool {
        let Some(quota_name) = resource_type.quota_name() else {
            return true;
        };
        let mut quotas = self.quotas.write();
        let Some(quota) = quotas.get_mut(quota_name) else {
            return true;
        };

        quota.reset_if_due();

        if quota.max_count != -1 && quota.current_count + count > quota.max_count {
            return false;
        }
        if let Some(max_size) = quota.max_size_mb {
            if max_size != -1 && quota.current_size_mb + size_mb > max_size {
                return false;
            }
        }

        quota.current_count += count;
        quota.current_size_mb += size_mb;
        info!(quota_name, quota.current_count, quota.max_count, "consumed quota");
        true
    }

    /// Releases quota usage, clamped at zero.
    pub fn release_quota(&self, resource_type: ResourceType, count: i64, size_mb: i64) -> bool {
        let Some(quota_name) = resource_type.quota_name() else {
            return true;
        };
        let mut quotas = self.quotas.write();
        let Some(quota) = quotas.get_mut(quota_name) else {
            return true;
        };
        quota.current_count = (quota.current_count - count).max(0);
        quota.current_size_mb = (quota.current_size_mb - size_mb).max(0);
        true
    }

    pub fn quota_snapshot(&self, quota_name: &str) -> Option<ResourceQuota> {
        self.quotas.read().get(quota_name).cloned()
    }

    fn log_attempt(
        &self,
        user: &User,
        resource_type: ResourceType,
        resource_id: &str,
        access_level: AccessLevel,
        result: &AccessResult,
        client_ip: Option<&str>,
        user_agent: Option<&str>,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            user_id: user.user_id.clone(),
            resource_type,
            resource_id: resource_id.to_string(),
            access_level,
            granted: result.granted,
            reason: result.reason.clone(),
            client_ip: client_ip.map(String::from),
            user_agent: user_agent.map(String::from),
        };

        if !result.granted {
            warn!(user = %user.username, ?resource_type, resource_id, ?access_level, reason = %result.reason, "access denied");
        } else if matches!(access_level, AccessLevel::Admin | AccessLevel::Owner) {
            info!(user = %user.username, ?resource_type, resource_id, ?access_level, "privileged access granted");
        }

        let mut log = self.audit_log.write();
        if log.len() >= AUDIT_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back(entry);
    }

    pub fn audit_log_snapshot(&self) -> Vec<AuditEntry> {
        self.audit_log.read().iter().cloned().collect()
    }

    /// A per-user summary of effective access levels across every resource
    /// type, for dashboard/debugging use (spec §4.1 `user_access_summary`).
    pub fn user_access_summary(&self, user: &User) -> HashMap<ResourceType, AccessLevel> {
        [
            ResourceType::Network,
            ResourceType::Worker,
            ResourceType::Model,
            ResourceType::ApiEndpoint,
            ResourceType::SystemConfig,
            ResourceType::UserData,
            ResourceType::License,
            ResourceType::Backup,
            ResourceType::Monitoring,
        ]
        .into_iter()
        .map(|rt| {
            let level = user
                .roles
                .iter()
                .map(|role| role_resource_ceiling(*role, rt))
                .max()
                .unwrap_or(AccessLevel::None);
            (rt, level)
        })
        .collect()
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Permission, Role};
    use std::collections::BTreeSet;

    fn user_with_roles(roles: &[Role], permissions: &[Permission]) -> User {
        User {
            user_id: "u1".to_string(),
            username: "u1".to_string(),
            email: "u1@example.com".to_string(),
            password_hash: String::new(),
            salt: String::new(),
            roles: roles.iter().copied().collect(),
            permissions: permissions.iter().copied().collect(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn scenario_1_developer_denied_write_on_network() {
        let manager = AccessControlManager::new(Tier::Pro, Tier::Pro.features().into_iter().map(String::from).collect());
        let user = user_with_roles(&[Role::Developer], &[Permission::NetworkView]);
        let result = manager.check(&user, ResourceType::Network, "net1", AccessLevel::Write, None, None);
        assert!(!result.granted);
        assert_eq!(result.effective_level, AccessLevel::Read);
    }

    #[test]
    fn scenario_2_operator_allowed_write_on_network() {
        let manager = AccessControlManager::new(Tier::Pro, Tier::Pro.features().into_iter().map(String::from).collect());
        let user = user_with_roles(&[Role::Operator], &[Permission::NetworkModify]);
        let result = manager.check(&user, ResourceType::Network, "net1", AccessLevel::Write, None, None);
        assert!(result.granted);
    }

    #[test]
    fn monotonicity_lowering_requested_level_never_turns_grant_into_denial() {
        let manager = AccessControlManager::new(Tier::Ent, Tier::Ent.features().into_iter().map(String::from).collect());
        let user = user_with_roles(&[Role::Admin], &[]);
        let high = manager.check(&user, ResourceType::Network, "n", AccessLevel::Admin, None, None);
        let low = manager.check(&user, ResourceType::Network, "n", AccessLevel::Read, None, None);
        assert!(high.granted);
        assert!(low.granted);
    }

    #[test]
    fn quota_safety_holds_after_consume_and_release_sequences() {
        let manager = AccessControlManager::new(Tier::Free, Tier::Free.features().into_iter().map(String::from).collect());
        for _ in 0..3 {
            assert!(manager.consume_quota(ResourceType::Network, 1, 0));
        }
        assert!(!manager.consume_quota(ResourceType::Network, 1, 0));
        assert!(manager.release_quota(ResourceType::Network, 10, 0));
        let quota = manager.quota_snapshot("networks").unwrap();
        assert_eq!(quota.current_count, 0);
    }

    #[test]
    fn scenario_3_api_quota_exhausts_then_refills_after_window_elapses() {
        let manager = AccessControlManager::new(Tier::Free, Tier::Free.features().into_iter().map(String::from).collect());
        for _ in 0..1000 {
            assert!(manager.consume_quota(ResourceType::ApiEndpoint, 1, 0));
        }
        assert!(!manager.consume_quota(ResourceType::ApiEndpoint, 1, 0));

        // Simulate the 24h + epsilon window elapsing by backdating last_reset.
        manager
            .quotas
            .write()
            .get_mut("api_calls")
            .unwrap()
            .last_reset = Utc::now() - Duration::hours(24) - Duration::seconds(1);

        assert!(manager.consume_quota(ResourceType::ApiEndpoint, 1, 0));
        let quota = manager.quota_snapshot("api_calls").unwrap();
        assert_eq!(quota.current_count, 1);
    }

    #[test]
    fn inactive_user_is_always_denied() {
        let manager = AccessControlManager::new(Tier::Ent, Tier::Ent.features().into_iter().map(String::from).collect());
        let mut user = user_with_roles(&[Role::Admin], &[]);
        user.is_active = false;
        let result = manager.check(&user, ResourceType::Network, "n", AccessLevel::Read, None, None);
        assert!(!result.granted);
        assert_eq!(result.reason, "account inactive");
    }
}
