//! Composition root: wires every control-plane library into one
//! `AppState`, spawns the background loops each component needs, and
//! serves the HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tiktrue_access_control::AccessControlManager;
use tiktrue_config_sync::ConfigSynchronizer;
use tiktrue_discovery::{DiscoveryMessage, DiscoveryService};
use tiktrue_failover::FailoverManager;
use tiktrue_health_monitor::HealthMonitor;
use tiktrue_license::LicenseEnforcer;
use tiktrue_monitoring::MonitoringStore;
use tiktrue_network::NetworkManager;
use tiktrue_resource_optimizer::{OptimizationStrategy, ResourceOptimizer};
use tracing::{info, warn};

use crate::config::AdminNodeConfig;
use crate::failover_support::{LoggingBackupActivator, LoggingBlockTransporter};
use crate::resources::ResourceLedger;
use crate::routes::build_router;
use crate::state::AppState;

pub struct AdminKernel {
    config: Arc<AdminNodeConfig>,
    state: AppState,
}

impl AdminKernel {
    pub async fn bootstrap(config: AdminNodeConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let mut enforcer = LicenseEnforcer::new(&config.license_storage_dir)?;
        enforcer.reload()?;
        let tier = enforcer.tier().unwrap_or(tiktrue_license::Tier::Free);
        let available_features = enforcer
            .current()
            .map(|r| r.allowed_features.clone())
            .unwrap_or_default();

        let license_record = enforcer.current().cloned();

        let state = AppState {
            config: config.clone(),
            license: Arc::new(RwLock::new(enforcer)),
            access_control: Arc::new(AccessControlManager::new(tier, available_features)),
            network_manager: Arc::new(NetworkManager::new(config.node_id.clone())),
            discovery: Arc::new(DiscoveryService::bind(config.node_id.clone()).await?),
            health_monitor: Arc::new(HealthMonitor::new()),
            failover: Arc::new(FailoverManager::new(
                Arc::new(LoggingBackupActivator),
                Arc::new(LoggingBlockTransporter),
            )),
            config_sync: Arc::new(ConfigSynchronizer::new(config.node_id.clone(), license_record.clone())),
            monitoring: Arc::new(MonitoringStore::new()),
            resource_optimizer: Arc::new(ResourceOptimizer::new(license_record)),
            resources: Arc::new(ResourceLedger::new(config.node_cpu_cores, config.node_memory_mb)),
            model_keys: Arc::new(RwLock::new(std::collections::HashMap::new())),
        };

        Ok(Self { config, state })
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Spawns the discovery listener, heartbeat-driven failover escalation,
    /// and periodic resource-optimizer/config-sync sweeps, then serves the
    /// HTTP router until the process is terminated.
    pub async fn run(self) -> anyhow::Result<()> {
        if self.config.discovery_enabled {
            self.spawn_discovery_listener();
        }
        self.spawn_health_to_failover_bridge();
        self.spawn_optimizer_loop();
        self.spawn_config_retry_loop();

        let addr: SocketAddr = format!("{}:{}", self.config.bind_host, self.config.bind_port).parse()?;
        let router = build_router(self.state.clone());

        info!(%addr, "admin node listening");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Responds to multicast discovery requests with the networks this node
    /// administers, and records sightings of other admins' responses.
    fn spawn_discovery_listener(&self) {
        let discovery = self.state.discovery.clone();
        let network_manager = self.state.network_manager.clone();
        let node_id = self.config.node_id.clone();

        tiktrue_discovery::spawn_listener(discovery.clone(), move |message, addr| {
            let discovery = discovery.clone();
            let network_manager = network_manager.clone();
            let node_id = node_id.clone();
            tokio::spawn(async move {
                match &message {
                    DiscoveryMessage::DiscoveryRequest { node_id: requester, .. } if *requester != node_id => {
                        let visible = tiktrue_discovery::networks_for_request(
                            &network_manager.managed_networks(),
                            &message,
                        );
                        let response = DiscoveryMessage::response(&node_id, visible);
                        if let Err(err) = discovery.reply(&response, addr).await {
                            warn!(%err, "failed to reply to discovery request");
                        }
                    }
                    DiscoveryMessage::DiscoveryResponse { networks, .. } => {
                        for network in networks {
                            network_manager.record_discovery(network.clone());
                        }
                    }
                    _ => {}
                }
            });
        });
    }

    /// Bridges health-monitor status transitions into failover decisions:
    /// a member going CRITICAL triggers `on_worker_failure`.
    fn spawn_health_to_failover_bridge(&self) {
        let failover = self.state.failover.clone();
        let license = self.state.license.clone();
        self.state.health_monitor.on_status_change(move |notification| {
            if notification.new_status == tiktrue_health_monitor::HealthStatus::Critical {
                let failover = failover.clone();
                let license = license.clone();
                let member_id = notification.member_id.clone();
                let reason = notification.reason.clone();
                tokio::spawn(async move {
                    let license_record = license.read().current().cloned();
                    if let Err(err) = failover
                        .on_worker_failure(&member_id, &member_id, license_record.as_ref(), &reason)
                        .await
                    {
                        warn!(%err, member_id, "failover response to worker failure did not complete");
                    }
                });
            }
        });
    }

    fn spawn_optimizer_loop(&self) {
        let optimizer = self.state.resource_optimizer.clone();
        let interval_secs = self.config.optimizer_interval_secs;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                ticker.tick().await;
                optimizer.run_optimization_pass(OptimizationStrategy::Balanced);
            }
        });
    }

    fn spawn_config_retry_loop(&self) {
        let config_sync = self.state.config_sync.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(
                tiktrue_config_sync::PENDING_RETRY_AFTER_SECS as u64,
            ));
            loop {
                ticker.tick().await;
                let due = config_sync.pending_changes_due_for_retry();
                if !due.is_empty() {
                    info!(count = due.len(), "configuration changes due for retry");
                }
                config_sync.handle_config_conflicts();
            }
        });
    }
}
