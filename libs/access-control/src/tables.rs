//! Static role/feature/quota tables (spec §6.3-6.5). Loaded once; never
//! mutated at runtime.

use tiktrue_license::Tier;

use crate::types::{AccessLevel, Permission, ResourceQuota, ResourceType, Role};

/// Role x resource_type -> max access level (spec §6.3).
pub fn role_resource_ceiling(role: Role, resource_type: ResourceType) -> AccessLevel {
    use AccessLevel::*;
    use ResourceType::*;
    match role {
        Role::Admin => Admin,
        Role::Operator => match resource_type {
            Network | Worker => Write,
            Model | ApiEndpoint | SystemConfig | UserData | License | Monitoring => Read,
            Backup => Execute,
        },
        Role::Developer => match resource_type {
            ApiEndpoint => Execute,
            Network | Worker | Model | SystemConfig | UserData | License | Monitoring => Read,
            Backup => None,
        },
        Role::Client => match resource_type {
            Network | Model | UserData => Read,
            ApiEndpoint => Execute,
            Worker | SystemConfig | License | Backup | Monitoring => None,
        },
        Role::Guest => match resource_type {
            Network | Model => Read,
            Worker | ApiEndpoint | SystemConfig | UserData | License | Backup | Monitoring => None,
        },
    }
}

/// `(resource_type, access_level) -> specific permission required`, for the
/// subset of combinations spec §4.1 step 4 gates on a concrete [`Permission`]
/// beyond the role ceiling.
pub fn required_permission(resource_type: ResourceType, access_level: AccessLevel) -> Option<Permission> {
    use AccessLevel::*;
    use ResourceType::*;
    match (resource_type, access_level) {
        (Network, Write) | (Network, Admin) => Some(Permission::NetworkModify),
        (Worker, Write) | (Worker, Admin) => Some(Permission::WorkerManage),
        (Model, Write) | (Model, Admin) => Some(Permission::ModelUpload),
        (ApiEndpoint, Execute) => Some(Permission::ApiInference),
        (UserData, Write) | (UserData, Admin) => Some(Permission::UserManage),
        (Backup, Execute) | (Backup, Admin) => Some(Permission::SystemBackup),
        _ => None,
    }
}

/// `(resource_type, access_level) -> required feature set` (spec §6.4).
pub fn required_features(resource_type: ResourceType, access_level: AccessLevel) -> Vec<&'static str> {
    use AccessLevel::*;
    use ResourceType::*;
    match resource_type {
        Network => {
            if matches!(access_level, Write | Admin | Owner) {
                vec!["multi_network"]
            } else {
                vec!["single_network"]
            }
        }
        ApiEndpoint => vec!["api_access"],
        Monitoring => {
            if matches!(access_level, Admin | Owner) {
                vec!["advanced_monitoring"]
            } else {
                vec!["basic_monitoring"]
            }
        }
        Backup => vec!["backup_restore"],
        _ => vec![],
    }
}

/// Tier -> default quotas (spec §6.5).
pub fn default_quotas(tier: Tier) -> Vec<(&'static str, ResourceQuota)> {
    let (networks, workers, models, models_mb, api_calls) = match tier {
        Tier::Free => (1, 3, 3, 2048, 1000),
        Tier::Pro => (5, 20, 10, 10240, 10000),
        Tier::Ent => (-1, -1, -1, -1, -1),
    };

    vec![
        ("networks", ResourceQuota::new(ResourceType::Network, networks, None, 24)),
        ("workers", ResourceQuota::new(ResourceType::Worker, workers, None, 24)),
        (
            "models",
            ResourceQuota::new(ResourceType::Model, models, Some(models_mb), 24),
        ),
        (
            "api_calls",
            ResourceQuota::new(ResourceType::ApiEndpoint, api_calls, None, 24),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_ceiling_is_always_admin() {
        for rt in [ResourceType::Network, ResourceType::Backup, ResourceType::License] {
            assert_eq!(role_resource_ceiling(Role::Admin, rt), AccessLevel::Admin);
        }
    }

    #[test]
    fn guest_has_no_worker_access() {
        assert_eq!(role_resource_ceiling(Role::Guest, ResourceType::Worker), AccessLevel::None);
    }

    #[test]
    fn ent_quotas_are_unlimited() {
        let quotas = default_quotas(Tier::Ent);
        for (_, quota) in quotas {
            assert_eq!(quota.max_count, -1);
        }
    }
}
