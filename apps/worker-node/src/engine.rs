//! Worker orchestration: discover or dial an admin node, join its network,
//! register, pull down and certify the model's encrypted blocks, then keep
//! reporting health until the process is asked to stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use chrono::Utc;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tiktrue_discovery::{DiscoveryMessage, DiscoveryService};
use tiktrue_health_monitor::HealthMonitor;
use tiktrue_license::{LicenseEnforcer, Tier};
use tiktrue_model_crypto::{unwrap_received_key, KeyExchangeRequest, RsaKeyPair};
use tiktrue_network::JoinRequest;
use tiktrue_protocol::{HeartbeatPayload, ModelSyncPayload, WorkerRegistrationPayload};
use tiktrue_worker_client_support::ModelBlockHydrator;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::WorkerNodeConfig;
use crate::resource_sampler;
use crate::state::WorkerState;

/// The admin link is tracked as a synthetic health-monitor member so a
/// worker's own diagnostics (and eventually its own heartbeat response to
/// an operator) reflect whether its uplink is actually healthy.
const ADMIN_LINK_MEMBER_ID: &str = "admin-link";

pub struct WorkerEngine {
    config: Arc<WorkerNodeConfig>,
    state: Arc<WorkerState>,
    license: Arc<RwLock<LicenseEnforcer>>,
    rsa_keypair: Arc<RsaKeyPair>,
    health_monitor: Arc<HealthMonitor>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerEngine {
    /// Loads this node's license and RSA identity, resolves an admin node
    /// (directly or via discovery), and wires the runtime state together.
    /// Does not join a network or sync a model yet — call [`Self::run`].
    pub async fn bootstrap(config: WorkerNodeConfig, shutdown: Arc<AtomicBool>) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let mut enforcer = LicenseEnforcer::new(&config.license_storage_dir)?;
        enforcer.reload()?;

        let rsa_keypair = Arc::new(RsaKeyPair::generate_or_load(
            &config.crypto_storage_dir.join("worker_identity.pem"),
        )?);

        let mut state = WorkerState::new(config.clone());

        if let Some(admin_url) = &config.admin_url {
            info!(admin_url, "using configured admin node");
        } else {
            let discovered = Self::discover_admin_url(&config, enforcer.tier()).await?;
            info!(admin_url = %discovered, "resolved admin node via multicast discovery");
            state.rebind_admin_url(&discovered);
        }

        let health_monitor = Arc::new(HealthMonitor::new());
        health_monitor.register_member(ADMIN_LINK_MEMBER_ID);

        Ok(Self {
            config,
            state: Arc::new(state),
            license: Arc::new(RwLock::new(enforcer)),
            rsa_keypair,
            health_monitor,
            shutdown,
        })
    }

    /// Broadcasts a discovery request and waits up to
    /// `discovery_timeout_secs` for a response naming a network serving
    /// `model_id` (spec C7).
    async fn discover_admin_url(config: &WorkerNodeConfig, tier: Option<Tier>) -> anyhow::Result<String> {
        let probe_id = format!("{}-discovery", config.resolved_worker_id());
        let discovery = DiscoveryService::bind(probe_id).await?;
        let tier = tier.unwrap_or(Tier::Free);

        discovery
            .broadcast(&DiscoveryMessage::request(
                discovery.node_id(),
                tier,
                vec![],
                vec![config.model_id.clone()],
            ))
            .await?;

        let deadline = tokio::time::Instant::now() + Duration::from_secs(config.discovery_timeout_secs);
        while tokio::time::Instant::now() < deadline {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let Ok(Ok(Some((message, _addr)))) = tokio::time::timeout(remaining, discovery.recv()).await else {
                break;
            };
            if let DiscoveryMessage::DiscoveryResponse { networks, .. } = message {
                if let Some(network) = networks.into_iter().find(|n| n.model_id == config.model_id) {
                    return Ok(format!("http://{}:{}", network.admin_host, network.admin_port));
                }
            }
        }

        anyhow::bail!(
            "no admin node discovered serving model '{}' within {}s",
            config.model_id,
            config.discovery_timeout_secs
        )
    }

    /// Sends a signed join request for `network_id` (or whatever network the
    /// admin node resolves this worker's model/tier to, if unset), and
    /// records the returned [`NetworkConfig`] once approved.
    #[instrument(skip(self))]
    async fn join_network(&self) -> anyhow::Result<()> {
        let license_tier = self.license.read().tier().unwrap_or(Tier::Free);
        let network_id = self.config.network_id.clone().unwrap_or_else(|| self.config.model_id.clone());

        let request = JoinRequest {
            request_id: Uuid::new_v4().to_string(),
            client_id: self.config.resolved_worker_id(),
            client_host: "0.0.0.0".to_string(),
            client_port: 0,
            network_id,
            license_tier,
            requested_at: Utc::now(),
            message: format!("worker {} requesting to serve model {}", self.config.resolved_worker_id(), self.config.model_id),
        };

        let response = self.state.client.join_network(&request).await?;
        let network_config = response
            .network_config
            .ok_or_else(|| anyhow::anyhow!("admin node approved the join but returned no network config"))?;
        info!(network_id = %network_config.network_id, "joined network");
        *self.state.network.write() = Some(network_config);
        Ok(())
    }

    /// Registers this node's identity, hardware capabilities, and public
    /// key with the admin node (spec C6/C11 intake).
    #[instrument(skip(self))]
    async fn register(&self) -> anyhow::Result<()> {
        let mut capabilities = vec![format!("cpu_cores:{}", self.config.resolved_cpu_cores())];
        if self.config.gpu_available {
            capabilities.push("gpu".to_string());
        }

        let payload = WorkerRegistrationPayload {
            worker_id: self.config.resolved_worker_id(),
            worker_name: self.config.worker_name.clone(),
            hardware_fingerprint: tiktrue_license::generate_fingerprint(),
            capabilities,
            public_key_pem: self.rsa_keypair.public_key_pem()?,
        };

        self.state.client.register_worker(&payload).await?;
        info!("registered with admin node");
        Ok(())
    }

    /// Fetches the model manifest, negotiates the AES key over RSA-OAEP,
    /// syncs and certifies every block, and reports the sync back to the
    /// admin node (spec C9/C10).
    #[instrument(skip(self))]
    async fn sync_model(&self) -> anyhow::Result<()> {
        let model_id = &self.config.model_id;
        let manifest = self.state.client.fetch_model_manifest(model_id).await?;

        let key_request = KeyExchangeRequest::new(&self.config.resolved_worker_id(), &self.rsa_keypair)?;
        let key_response = self.state.client.request_model_key(model_id, &key_request).await?;

        let wrapped = base64::engine::general_purpose::STANDARD.decode(&key_response.wrapped_key_b64)?;
        let key = unwrap_received_key(&wrapped, &key_response.key_id, false, &self.rsa_keypair.private_key)?;

        let block_dir = self.config.block_storage_dir.join(model_id);
        self.state.client.sync_model_blocks(&manifest, &block_dir).await?;
        let certified = ModelBlockHydrator::certify_blocks(&block_dir, &key)?;

        let manifest_checksum = hex::encode(Sha256::digest(serde_json::to_vec(&certified)?));
        self.state.client
            .report_model_sync(&ModelSyncPayload {
                model_id: model_id.clone(),
                block_count: certified.total_blocks as i64,
                manifest_checksum,
            })
            .await?;

        *self.state.model_key.write() = Some(key);
        info!(total_blocks = certified.total_blocks, "model blocks synced and certified");
        Ok(())
    }

    /// Runs join → register → model sync, then the heartbeat loop, until
    /// `shutdown` is set.
    pub async fn run(self) -> anyhow::Result<()> {
        self.join_network().await?;
        self.register().await?;
        self.sync_model().await?;

        let heartbeat_handle = self.spawn_heartbeat_loop();

        while !self.shutdown.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        heartbeat_handle.abort();
        info!("worker node shutting down");
        Ok(())
    }

    fn spawn_heartbeat_loop(&self) -> tokio::task::JoinHandle<()> {
        let state = self.state.clone();
        let health_monitor = self.health_monitor.clone();
        let config = self.config.clone();
        let worker_id = config.resolved_worker_id();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(config.heartbeat_interval_secs));
            loop {
                ticker.tick().await;
                let sample = resource_sampler::sample(config.resolved_cpu_cores());
                let loaded_models = if state.model_key.read().is_some() {
                    vec![config.model_id.clone()]
                } else {
                    Vec::new()
                };

                let payload = HeartbeatPayload {
                    worker_id: worker_id.clone(),
                    cpu_percent: sample.cpu_percent,
                    memory_percent: sample.memory_percent,
                    active_sessions: state.allocated_page_count() as i64,
                    loaded_models,
                };

                match state.client.send_heartbeat(&payload).await {
                    Ok(()) => health_monitor.record_success(ADMIN_LINK_MEMBER_ID, Duration::from_millis(0)),
                    Err(err) => {
                        warn!(%err, "heartbeat to admin node failed");
                        health_monitor.record_failure(ADMIN_LINK_MEMBER_ID, err.to_string());
                    }
                }
            }
        })
    }
}
