use std::path::{Path, PathBuf};

use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tiktrue_model_crypto::{KeyExchangeRequest, Manifest, ManifestBlock};
use tiktrue_network::{JoinRequest, JoinResponse};
use tiktrue_protocol::{HeartbeatPayload, ModelSyncPayload, WorkerRegistrationPayload};
use tokio::fs;
use tracing::{error, info, instrument};

use crate::errors::ClientError;

/// Wire shape of the admin node's key-exchange response: the AES model key
/// wrapped under this worker's RSA public key via RSA-OAEP-SHA-256.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyExchangeResponse {
    pub key_id: String,
    pub wrapped_key_b64: String,
}

/// Model blocks are retrieved concurrently in bursts this wide, mirroring
/// the parallel shard-download pattern worker nodes use for everything
/// else they fetch from the admin node.
const BLOCK_DOWNLOAD_CONCURRENCY: usize = 4;

/// HTTP client a worker node uses to join a network, report its health, and
/// pull down a model's encrypted blocks from the admin node.
pub struct WorkerClient {
    http: Client,
    admin_base_url: String,
}

impl WorkerClient {
    pub fn new(admin_base_url: impl Into<String>, auth_token: &str) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        let auth_value = reqwest::header::HeaderValue::from_str(&format!("Bearer {auth_token}"))
            .expect("auth token must be a valid header value");
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        Self {
            http: Client::builder()
                .default_headers(headers)
                .user_agent("tiktrue-worker-node/0.1")
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("worker client must build with static config"),
            admin_base_url: admin_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[instrument(skip(self, request))]
    pub async fn join_network(&self, request: &JoinRequest) -> Result<JoinResponse, ClientError> {
        let url = format!("{}/api/v1/network/join", self.admin_base_url);
        let response = self.http.post(&url).json(request).send().await?;

        if response.status() != StatusCode::OK {
            return Err(ClientError::ServerRejection(format!("HTTP_{}", response.status())));
        }

        let join_response: JoinResponse = response.json().await?;
        if !join_response.approved {
            return Err(ClientError::JoinRejected(join_response.reason));
        }
        Ok(join_response)
    }

    #[instrument(skip(self, payload))]
    pub async fn register_worker(&self, payload: &WorkerRegistrationPayload) -> Result<(), ClientError> {
        let url = format!("{}/api/v1/worker/register", self.admin_base_url);
        let response = self.http.post(&url).json(payload).send().await?;
        if response.status() != StatusCode::OK {
            return Err(ClientError::ServerRejection(format!("HTTP_{}", response.status())));
        }
        Ok(())
    }

    #[instrument(skip(self, payload))]
    pub async fn send_heartbeat(&self, payload: &HeartbeatPayload) -> Result<(), ClientError> {
        let url = format!("{}/api/v1/worker/heartbeat", self.admin_base_url);
        self.http.post(&url).json(payload).send().await?;
        Ok(())
    }

    #[instrument(skip(self, payload))]
    pub async fn report_model_sync(&self, payload: &ModelSyncPayload) -> Result<(), ClientError> {
        let url = format!("{}/api/v1/worker/model-sync", self.admin_base_url);
        self.http.post(&url).json(payload).send().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn fetch_model_manifest(&self, model_id: &str) -> Result<Manifest, ClientError> {
        let url = format!("{}/api/v1/models/{}/manifest", self.admin_base_url, model_id);
        let response = self.http.get(&url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(ClientError::ServerRejection(format!("HTTP_{}", response.status())));
        }
        Ok(response.json::<Manifest>().await?)
    }

    /// Requests the AES key for `model_id` via the RSA-OAEP exchange of
    /// spec C9: the admin node verifies `request`'s PSS signature before
    /// wrapping the key under the public key carried in the request.
    #[instrument(skip(self, request))]
    pub async fn request_model_key(
        &self,
        model_id: &str,
        request: &KeyExchangeRequest,
    ) -> Result<KeyExchangeResponse, ClientError> {
        let url = format!("{}/api/v1/models/{}/key-exchange", self.admin_base_url, model_id);
        let response = self.http.post(&url).json(request).send().await?;
        if response.status() != StatusCode::OK {
            return Err(ClientError::ServerRejection(format!("HTTP_{}", response.status())));
        }
        Ok(response.json::<KeyExchangeResponse>().await?)
    }

    /// Downloads every encrypted block named in `manifest` into `local_block_dir`,
    /// running up to [`BLOCK_DOWNLOAD_CONCURRENCY`] transfers concurrently, then
    /// writes the manifest itself alongside them so the directory is ready for
    /// `ModelBlockHydrator`. Fails the whole sync if any single block fails.
    #[instrument(skip(self, manifest, local_block_dir))]
    pub async fn sync_model_blocks(
        &self,
        manifest: &Manifest,
        local_block_dir: &Path,
    ) -> Result<(), ClientError> {
        fs::create_dir_all(local_block_dir).await?;

        info!(
            model_id = %manifest.model_id,
            total_blocks = manifest.total_blocks,
            "syncing model blocks from admin node"
        );

        for chunk in manifest.blocks.chunks(BLOCK_DOWNLOAD_CONCURRENCY) {
            let downloads = chunk.iter().map(|block| {
                self.download_block(&manifest.model_id, block, local_block_dir.to_path_buf())
            });
            for (block, result) in chunk.iter().zip(join_all(downloads).await) {
                if let Err(fault) = result {
                    error!(block = %block.file_name, error = %fault, "block sync failed");
                    return Err(ClientError::HydrationFailed);
                }
            }
        }

        let manifest_json = serde_json::to_vec_pretty(manifest)?;
        fs::write(local_block_dir.join("manifest.json"), manifest_json).await?;
        Ok(())
    }

    async fn download_block(
        &self,
        model_id: &str,
        block: &ManifestBlock,
        target_dir: PathBuf,
    ) -> Result<(), ClientError> {
        let destination = target_dir.join(&block.file_name);
        if destination.exists() {
            return Ok(());
        }

        let url = format!(
            "{}/api/v1/models/{}/blocks/{}",
            self.admin_base_url, model_id, block.file_name
        );
        let response = self.http.get(&url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(ClientError::ServerRejection(format!("HTTP_{}", response.status())));
        }

        let bytes = response.bytes().await?;
        fs::write(destination, bytes).await?;
        Ok(())
    }
}
