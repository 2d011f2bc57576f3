use std::path::Path;

use tiktrue_model_crypto::{decrypt_block, verify_block_integrity, AesKeyMaterial, EncryptedBlock, Manifest, ManifestBlock};
use tracing::{debug, info, instrument};

use crate::errors::ClientError;

const NONCE_LEN: usize = 12;

/// Certifies blocks synced onto disk before the worker trusts them for
/// inference: the last check between "a file `WorkerClient` wrote" and
/// "a block the KV cache is allowed to decrypt."
pub struct ModelBlockHydrator;

impl ModelBlockHydrator {
    fn load_manifest(block_dir: &Path) -> Result<Manifest, ClientError> {
        let bytes = std::fs::read(block_dir.join("manifest.json"))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn load_encrypted_block(block_dir: &Path, key_id: &str, meta: &ManifestBlock) -> Result<EncryptedBlock, ClientError> {
        let ciphertext = std::fs::read(block_dir.join(&meta.file_name))?;
        let nonce_vec = hex::decode(&meta.nonce_hex)
            .map_err(|e| ClientError::ManifestCorrupt(e.to_string()))?;
        if nonce_vec.len() != NONCE_LEN {
            return Err(ClientError::ManifestCorrupt("nonce length mismatch".to_string()));
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&nonce_vec);

        Ok(EncryptedBlock {
            key_id: key_id.to_string(),
            nonce,
            ciphertext,
            plaintext_sha256: meta.plaintext_sha256.clone(),
            plaintext_len: meta.plaintext_len,
        })
    }

    /// Loads the manifest synced into `block_dir` and verifies every block's
    /// GCM tag and recorded checksum against `key`, without decrypting any
    /// of them. Returns the manifest once every block is certified.
    #[instrument(skip(block_dir, key), fields(block_dir = %block_dir.display()))]
    pub fn certify_blocks(block_dir: &Path, key: &AesKeyMaterial) -> Result<Manifest, ClientError> {
        let manifest = Self::load_manifest(block_dir)?;
        if manifest.key_id != key.key_id {
            return Err(ClientError::ManifestCorrupt(format!(
                "manifest key_id '{}' does not match the loaded key",
                manifest.key_id
            )));
        }

        for meta in &manifest.blocks {
            let block = Self::load_encrypted_block(block_dir, &manifest.key_id, meta)?;
            verify_block_integrity(&block, key)?;
            debug!(block = %meta.file_name, "block certified");
        }

        info!(total_blocks = manifest.total_blocks, "all model blocks certified");
        Ok(manifest)
    }

    /// Decrypts a single certified block on demand. Intended for lazy,
    /// per-block decryption as the KV cache pages blocks in, rather than
    /// materializing the whole model in memory at once.
    pub fn decrypt_one(block_dir: &Path, key_id: &str, meta: &ManifestBlock, key: &AesKeyMaterial) -> Result<Vec<u8>, ClientError> {
        let block = Self::load_encrypted_block(block_dir, key_id, meta)?;
        Ok(decrypt_block(&block, key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tiktrue_model_crypto::encrypt_file;

    #[test]
    fn certifies_all_blocks_synced_from_a_matching_manifest() {
        let key = AesKeyMaterial::generate_random();
        let dir = tempdir().unwrap();

        let input_path = dir.path().join("model.bin");
        std::fs::write(&input_path, vec![9u8; 1024]).unwrap();

        let block_dir = dir.path().join("blocks");
        encrypt_file(&input_path, &block_dir, "model-1", &key).unwrap();

        let manifest = ModelBlockHydrator::certify_blocks(&block_dir, &key).unwrap();
        assert_eq!(manifest.total_blocks, 1);
    }

    #[test]
    fn mismatched_key_id_is_rejected_before_touching_block_files() {
        let key = AesKeyMaterial::generate_random();
        let other_key = AesKeyMaterial::generate_random();
        let dir = tempdir().unwrap();

        let input_path = dir.path().join("model.bin");
        std::fs::write(&input_path, vec![1u8; 128]).unwrap();

        let block_dir = dir.path().join("blocks");
        encrypt_file(&input_path, &block_dir, "model-1", &key).unwrap();

        let err = ModelBlockHydrator::certify_blocks(&block_dir, &other_key).unwrap_err();
        assert!(matches!(err, ClientError::ManifestCorrupt(_)));
    }

    #[test]
    fn decrypts_an_individual_certified_block() {
        let key = AesKeyMaterial::generate_random();
        let dir = tempdir().unwrap();

        let input_path = dir.path().join("model.bin");
        let payload = vec![5u8; 2048];
        std::fs::write(&input_path, &payload).unwrap();

        let block_dir = dir.path().join("blocks");
        let manifest = encrypt_file(&input_path, &block_dir, "model-1", &key).unwrap();

        let plaintext = ModelBlockHydrator::decrypt_one(&block_dir, &manifest.key_id, &manifest.blocks[0], &key).unwrap();
        assert_eq!(plaintext, payload);
    }
}
