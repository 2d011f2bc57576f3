//! The shared application state every handler and background loop closes
//! over: one instance per process, cloned cheaply (every field is an `Arc`).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tiktrue_access_control::AccessControlManager;
use tiktrue_config_sync::ConfigSynchronizer;
use tiktrue_discovery::DiscoveryService;
use tiktrue_failover::FailoverManager;
use tiktrue_health_monitor::HealthMonitor;
use tiktrue_license::LicenseEnforcer;
use tiktrue_model_crypto::AesKeyMaterial;
use tiktrue_monitoring::MonitoringStore;
use tiktrue_network::NetworkManager;
use tiktrue_resource_optimizer::ResourceOptimizer;

use crate::config::AdminNodeConfig;
use crate::resources::ResourceLedger;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AdminNodeConfig>,
    pub license: Arc<RwLock<LicenseEnforcer>>,
    pub access_control: Arc<AccessControlManager>,
    pub network_manager: Arc<NetworkManager>,
    pub discovery: Arc<DiscoveryService>,
    pub health_monitor: Arc<HealthMonitor>,
    pub failover: Arc<FailoverManager>,
    pub config_sync: Arc<ConfigSynchronizer>,
    pub monitoring: Arc<MonitoringStore>,
    pub resource_optimizer: Arc<ResourceOptimizer>,
    pub resources: Arc<ResourceLedger>,
    /// Per-model AES keys this node holds, issued over RSA-OAEP exchange to
    /// workers that present a validly signed request (spec C9).
    pub model_keys: Arc<RwLock<HashMap<String, AesKeyMaterial>>>,
}
