//! Model manifest/block serving and the RSA-OAEP key-exchange endpoint
//! (spec C9) workers use to retrieve a model's AES key before decrypting
//! any blocks they pull down.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::Engine;
use serde::Deserialize;
use tiktrue_model_crypto::{encrypt_file, wrap_key_for_requester, AesKeyMaterial, KeyExchangeRequest, Manifest};
use tiktrue_model_downloader::{DownloadProgress, ModelDownloader, ModelFetchSpec, ProgressObserver};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

fn block_dir(state: &AppState, model_id: &str) -> std::path::PathBuf {
    state.config.model_storage_dir.join(model_id)
}

struct LoggingProgressObserver;
impl ProgressObserver for LoggingProgressObserver {
    fn on_progress(&self, progress: &DownloadProgress) {
        info!(
            model_id = %progress.model_id,
            pct = progress.progress_percentage(),
            "model download progress"
        );
    }
}

pub async fn get_manifest(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> Result<Json<Manifest>, ApiError> {
    let manifest_path = block_dir(&state, &model_id).join("manifest.json");
    let raw = tokio::fs::read(&manifest_path)
        .await
        .map_err(|_| ApiError::not_found(format!("no manifest for model {model_id}")))?;
    let manifest: Manifest = serde_json::from_slice(&raw)
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(manifest))
}

pub async fn get_block(
    State(state): State<AppState>,
    Path((model_id, file_name)): Path<(String, String)>,
) -> Result<Bytes, ApiError> {
    let path = block_dir(&state, &model_id).join(&file_name);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found(format!("block {file_name} not found for model {model_id}")))?;
    Ok(Bytes::from(bytes))
}

/// Verifies the requester's signed [`KeyExchangeRequest`], then wraps this
/// node's key for `model_id` under the requester's RSA public key. Mints a
/// fresh random key on first request for a model that has none yet.
pub async fn key_exchange(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
    Json(request): Json<KeyExchangeRequest>,
) -> Result<Json<KeyExchangeResponseBody>, ApiError> {
    request.verify_signature()?;

    let key = {
        let mut keys = state.model_keys.write();
        keys.entry(model_id.clone())
            .or_insert_with(AesKeyMaterial::generate_random)
            .clone()
    };

    let wrapped = wrap_key_for_requester(&key, &request.public_key_pem)?;
    info!(model_id, node_id = %request.node_id, "issued model key over RSA-OAEP exchange");

    Ok(Json(KeyExchangeResponseBody {
        key_id: key.key_id,
        wrapped_key_b64: base64::engine::general_purpose::STANDARD.encode(wrapped),
    }))
}

#[derive(Debug, serde::Serialize)]
pub struct KeyExchangeResponseBody {
    pub key_id: String,
    pub wrapped_key_b64: String,
}

#[derive(Debug, Deserialize)]
pub struct FetchModelRequest {
    pub source_url: String,
    pub expected_sha256: String,
    #[serde(default)]
    pub hardware_bound: bool,
}

/// Admin-side model onboarding: resumably downloads the raw model artifact
/// from `source_url`, then splits and AES-256-GCM encrypts it into the
/// block directory workers subsequently pull over `get_manifest`/`get_block`.
pub async fn fetch_and_publish_model(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
    Json(request): Json<FetchModelRequest>,
) -> Result<Json<Manifest>, ApiError> {
    let staging_dir = state.config.model_storage_dir.join("_staging");
    let spec = ModelFetchSpec {
        model_id: model_id.clone(),
        source_url: request.source_url,
        expected_sha256: request.expected_sha256,
        destination_dir: staging_dir.clone(),
    };

    let downloader = ModelDownloader::new();
    let raw_path = downloader
        .download(&spec, Arc::new(LoggingProgressObserver))
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, e.to_string()))?;

    let key = {
        let mut keys = state.model_keys.write();
        if let Some(existing) = keys.get(&model_id) {
            existing.clone()
        } else {
            let fresh = if request.hardware_bound {
                let license = state.license.read().require_valid()?.clone();
                AesKeyMaterial::derive_hardware_bound(&license.hardware_signature, &license.license_key)
            } else {
                AesKeyMaterial::generate_random()
            };
            keys.insert(model_id.clone(), fresh.clone());
            fresh
        }
    };

    let manifest = encrypt_file(&raw_path, &block_dir(&state, &model_id), &model_id, &key)?;
    info!(model_id, total_blocks = manifest.total_blocks, "model published in encrypted block form");
    Ok(Json(manifest))
}
