//! The worker process's shared runtime state: the network it has joined,
//! the model key it holds, and its paged KV-cache sessions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tiktrue_kv_cache::{KvCacheError, KvTensor, PageManager, SessionKvCache, SessionKvMetadata};
use tiktrue_model_crypto::AesKeyMaterial;
use tiktrue_network::NetworkConfig;
use tiktrue_worker_client_support::WorkerClient;

use crate::config::WorkerNodeConfig;

#[derive(Debug, Error)]
pub enum KvSessionError {
    #[error("no KV-cache session open with id {0}")]
    UnknownSession(String),
    #[error(transparent)]
    Cache(#[from] KvCacheError),
}

/// Everything a worker node carries for as long as it runs: one HTTP link
/// to its admin node, the network config it joined under, its model key,
/// and the paged KV cache serving whatever sessions land on it.
pub struct WorkerState {
    pub config: Arc<WorkerNodeConfig>,
    pub client: Arc<WorkerClient>,
    pub network: RwLock<Option<NetworkConfig>>,
    pub model_key: RwLock<Option<AesKeyMaterial>>,
    page_manager: RwLock<PageManager<f32>>,
    sessions: RwLock<HashMap<String, SessionKvCache>>,
    assigned_layer_indices: Vec<u32>,
}

impl WorkerState {
    pub fn new(config: Arc<WorkerNodeConfig>) -> Self {
        let admin_url = config.admin_url.clone().unwrap_or_default();
        let client = Arc::new(WorkerClient::new(admin_url, &config.worker_auth_token));
        let page_manager = PageManager::new(
            config.kv_initial_pages,
            config.kv_page_capacity,
            config.kv_num_heads,
            config.kv_head_dim,
            config.kv_batch_size,
        );

        Self {
            assigned_layer_indices: config.assigned_layer_indices.clone(),
            config,
            client,
            network: RwLock::new(None),
            model_key: RwLock::new(None),
            page_manager: RwLock::new(page_manager),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuilds the HTTP client once a network's actual admin address is
    /// known, e.g. after discovery resolves it from a broadcast reply.
    pub fn rebind_admin_url(&mut self, admin_base_url: &str) {
        self.client = Arc::new(WorkerClient::new(admin_base_url, &self.config.worker_auth_token));
    }

    pub fn open_session(&self, session_id: impl Into<String>) {
        let session_id = session_id.into();
        self.sessions
            .write()
            .entry(session_id.clone())
            .or_insert_with(|| SessionKvCache::new(session_id, self.assigned_layer_indices.clone()));
    }

    pub fn close_session(&self, session_id: &str) {
        if let Some(mut session) = self.sessions.write().remove(session_id) {
            session.reset_for_new_prompt(&mut self.page_manager.write());
        }
    }

    pub fn store_kv(
        &self,
        session_id: &str,
        global_layer_idx: u32,
        key: &KvTensor<f32>,
        value: &KvTensor<f32>,
    ) -> Result<(), KvSessionError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| KvSessionError::UnknownSession(session_id.to_string()))?;
        session
            .store_kv_for_layer(&mut self.page_manager.write(), global_layer_idx, key, value)
            .map_err(KvSessionError::from)
    }

    pub fn retrieve_kv(
        &self,
        session_id: &str,
        global_layer_idx: u32,
        length: Option<usize>,
    ) -> Result<(KvTensor<f32>, KvTensor<f32>), KvSessionError> {
        let sessions = self.sessions.read();
        let session = sessions
            .get(session_id)
            .ok_or_else(|| KvSessionError::UnknownSession(session_id.to_string()))?;
        Ok(session.retrieve_kv_for_layer(&self.page_manager.read(), global_layer_idx, length))
    }

    pub fn session_metadata(&self, session_id: &str) -> Option<SessionKvMetadata> {
        self.sessions.read().get(session_id).map(|s| s.metadata())
    }

    pub fn free_page_count(&self) -> usize {
        self.page_manager.read().free_page_count()
    }

    pub fn allocated_page_count(&self) -> usize {
        self.page_manager.read().allocated_page_count()
    }
}
