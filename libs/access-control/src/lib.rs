//! Role/permission/feature/quota access control decision engine (spec C4).

pub mod manager;
pub mod tables;
pub mod types;

pub use manager::{AccessControlManager, AuditEntry};
pub use types::{AccessLevel, AccessResult, Permission, ResourceQuota, ResourceType, Role, User};
