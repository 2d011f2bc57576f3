//! Core types for the access-control decision engine (spec C4, §3 "User
//! record", "Resource quota").

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Operator,
    Developer,
    Client,
    Guest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    NetworkView,
    NetworkModify,
    NetworkCreate,
    WorkerView,
    WorkerManage,
    ModelView,
    ModelUpload,
    ModelDelete,
    ApiInference,
    SystemAdmin,
    SystemMonitor,
    SystemBackup,
    UserView,
    UserManage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Network,
    Worker,
    Model,
    ApiEndpoint,
    SystemConfig,
    UserData,
    License,
    Backup,
    Monitoring,
}

impl ResourceType {
    /// Maps to the quota bucket name of spec §4.1 step 5 / SPEC_FULL.md §B.2:
    /// NETWORK->networks, WORKER->workers, MODEL->models,
    /// API_ENDPOINT->api_calls; everything else has no quota.
    pub fn quota_name(&self) -> Option<&'static str> {
        match self {
            ResourceType::Network => Some("networks"),
            ResourceType::Worker => Some("workers"),
            ResourceType::Model => Some("models"),
            ResourceType::ApiEndpoint => Some("api_calls"),
            _ => None,
        }
    }
}

/// Access-level ordering: NONE < READ < WRITE < EXECUTE < ADMIN < OWNER.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    None,
    Read,
    Write,
    Execute,
    Admin,
    Owner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub roles: BTreeSet<Role>,
    pub permissions: BTreeSet<Permission>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessResult {
    pub granted: bool,
    pub reason: String,
    pub effective_level: AccessLevel,
    pub restrictions: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessResult {
    pub fn granted(reason: impl Into<String>, effective_level: AccessLevel) -> Self {
        Self {
            granted: true,
            reason: reason.into(),
            effective_level,
            restrictions: Vec::new(),
            expires_at: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            reason: reason.into(),
            effective_level: AccessLevel::None,
            restrictions: Vec::new(),
            expires_at: None,
        }
    }

    pub fn denied_with_restrictions(reason: impl Into<String>, restrictions: Vec<String>) -> Self {
        Self {
            granted: false,
            reason: reason.into(),
            effective_level: AccessLevel::None,
            restrictions,
            expires_at: None,
        }
    }
}

/// Per-resource quota bucket (spec §3 "Resource quota").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceQuota {
    pub resource_type: ResourceType,
    /// -1 means unlimited.
    pub max_count: i64,
    pub current_count: i64,
    /// -1 means unlimited; `None` means size is not tracked for this resource.
    pub max_size_mb: Option<i64>,
    pub current_size_mb: i64,
    pub reset_period_hours: i64,
    pub last_reset: DateTime<Utc>,
}

impl ResourceQuota {
    pub fn new(resource_type: ResourceType, max_count: i64, max_size_mb: Option<i64>, reset_period_hours: i64) -> Self {
        Self {
            resource_type,
            max_count,
            current_count: 0,
            max_size_mb,
            current_size_mb: 0,
            reset_period_hours,
            last_reset: Utc::now(),
        }
    }

    pub fn reset_if_due(&mut self) {
        let elapsed = Utc::now() - self.last_reset;
        if elapsed.num_seconds() >= self.reset_period_hours * 3600 {
            self.current_count = 0;
            self.current_size_mb = 0;
            self.last_reset = Utc::now();
        }
    }
}
