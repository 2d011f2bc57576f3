//! Environment-driven bootstrap configuration, read once at process start.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AdminNodeConfig {
    pub node_id: String,
    pub bind_host: String,
    pub bind_port: u16,
    pub license_storage_dir: PathBuf,
    pub model_storage_dir: PathBuf,
    pub crypto_storage_dir: PathBuf,
    pub worker_auth_token: String,
    pub discovery_enabled: bool,
    pub node_cpu_cores: u32,
    pub node_memory_mb: u64,
    pub heartbeat_interval_secs: u64,
    pub optimizer_interval_secs: u64,
    pub auto_approve_joins: bool,
}

impl AdminNodeConfig {
    pub fn from_env() -> Self {
        Self {
            node_id: std::env::var("NODE_ID").unwrap_or_else(|_| format!("admin-{}", uuid::Uuid::new_v4().simple())),
            bind_host: std::env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            bind_port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8702),
            license_storage_dir: std::env::var("LICENSE_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".tiktrue/license")),
            model_storage_dir: std::env::var("MODEL_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".tiktrue/models")),
            crypto_storage_dir: std::env::var("CRYPTO_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".tiktrue/crypto")),
            worker_auth_token: std::env::var("WORKER_AUTH_TOKEN").unwrap_or_default(),
            discovery_enabled: std::env::var("DISCOVERY_ENABLED")
                .map(|v| v != "0" && v.to_lowercase() != "false")
                .unwrap_or(true),
            node_cpu_cores: std::env::var("NODE_CPU_CORES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| num_cpus::get() as u32),
            node_memory_mb: std::env::var("NODE_MEMORY_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(16384),
            heartbeat_interval_secs: std::env::var("HEARTBEAT_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            optimizer_interval_secs: std::env::var("OPTIMIZER_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            auto_approve_joins: std::env::var("AUTO_APPROVE_JOINS")
                .map(|v| v != "0" && v.to_lowercase() != "false")
                .unwrap_or(true),
        }
    }
}
