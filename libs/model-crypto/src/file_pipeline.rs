use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::block::{decrypt_block, encrypt_block, verify_block_integrity, EncryptedBlock};
use crate::error::CryptoError;
use crate::keys::AesKeyMaterial;

pub const BLOCK_SIZE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestBlock {
    pub index: usize,
    pub file_name: String,
    pub nonce_hex: String,
    pub plaintext_sha256: String,
    pub plaintext_len: usize,
    pub ciphertext_len: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub model_id: String,
    pub total_blocks: usize,
    pub key_id: String,
    pub blocks: Vec<ManifestBlock>,
    pub algorithm: String,
    pub checksum_algorithm: String,
}

fn block_file_name(index: usize) -> String {
    format!("block_{index:04}.enc")
}

fn block_meta_file_name(index: usize) -> String {
    format!("block_{index:04}.meta")
}

/// Splits `input_path` into [`BLOCK_SIZE_BYTES`] plaintext chunks, encrypts
/// each with `key`, and writes each ciphertext plus a top-level manifest
/// into `output_dir`. Returns the manifest.
pub fn encrypt_file(
    input_path: &Path,
    output_dir: &Path,
    model_id: &str,
    key: &AesKeyMaterial,
) -> Result<Manifest, CryptoError> {
    std::fs::create_dir_all(output_dir)?;

    let mut input = File::open(input_path)?;
    let mut blocks = Vec::new();
    let mut buffer = vec![0u8; BLOCK_SIZE_BYTES];
    let mut index = 0usize;

    loop {
        let mut filled = 0usize;
        while filled < buffer.len() {
            let read = input.read(&mut buffer[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        if filled == 0 {
            break;
        }

        let encrypted = encrypt_block(&buffer[..filled], key)?;
        let file_name = block_file_name(index);
        std::fs::write(output_dir.join(&file_name), &encrypted.ciphertext)?;

        let meta = ManifestBlock {
            index,
            file_name,
            nonce_hex: hex::encode(encrypted.nonce),
            plaintext_sha256: encrypted.plaintext_sha256,
            plaintext_len: encrypted.plaintext_len,
            ciphertext_len: encrypted.ciphertext_len(),
        };
        std::fs::write(
            output_dir.join(block_meta_file_name(index)),
            serde_json::to_vec_pretty(&meta)?,
        )?;
        blocks.push(meta);

        index += 1;
        if filled < buffer.len() {
            break;
        }
    }

    let manifest = Manifest {
        model_id: model_id.to_string(),
        total_blocks: blocks.len(),
        key_id: key.key_id.clone(),
        blocks,
        algorithm: "AES-256-GCM".to_string(),
        checksum_algorithm: "SHA-256".to_string(),
    };

    let manifest_json = serde_json::to_vec_pretty(&manifest)?;
    std::fs::write(output_dir.join("manifest.json"), manifest_json)?;

    Ok(manifest)
}

/// Reads a manifest from `block_dir`, verifies every block's integrity
/// before decrypting any of them, then decrypts in index order and streams
/// the plaintext to `output_path`.
pub fn decrypt_file(
    block_dir: &Path,
    output_path: &Path,
    key: &AesKeyMaterial,
) -> Result<(), CryptoError> {
    let manifest_json = std::fs::read(block_dir.join("manifest.json"))?;
    let manifest: Manifest = serde_json::from_slice(&manifest_json)?;

    if manifest.key_id != key.key_id {
        return Err(CryptoError::UnknownKey(manifest.key_id));
    }

    let mut loaded = Vec::with_capacity(manifest.blocks.len());
    for block_meta in &manifest.blocks {
        let ciphertext = std::fs::read(block_dir.join(&block_meta.file_name))?;
        let nonce_vec = hex::decode(&block_meta.nonce_hex)
            .map_err(|e| CryptoError::ManifestCorrupt(e.to_string()))?;
        let mut nonce = [0u8; 12];
        if nonce_vec.len() != nonce.len() {
            return Err(CryptoError::ManifestCorrupt("nonce length mismatch".into()));
        }
        nonce.copy_from_slice(&nonce_vec);

        let block = EncryptedBlock {
            key_id: manifest.key_id.clone(),
            nonce,
            ciphertext,
            plaintext_sha256: block_meta.plaintext_sha256.clone(),
            plaintext_len: block_meta.plaintext_len,
        };
        verify_block_integrity(&block, key)?;
        loaded.push(block);
    }

    let mut output = File::create(output_path)?;
    for block in &loaded {
        let plaintext = decrypt_block(block, key)?;
        output.write_all(&plaintext)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_a_multi_block_file() {
        let key = AesKeyMaterial::generate_random();
        let dir = tempdir().unwrap();

        let input_path = dir.path().join("model.bin");
        let payload = vec![7u8; BLOCK_SIZE_BYTES + 1024];
        std::fs::write(&input_path, &payload).unwrap();

        let block_dir = dir.path().join("blocks");
        let manifest = encrypt_file(&input_path, &block_dir, "model-1", &key).unwrap();
        assert_eq!(manifest.total_blocks, 2);

        let output_path = dir.path().join("restored.bin");
        decrypt_file(&block_dir, &output_path, &key).unwrap();

        let restored = std::fs::read(&output_path).unwrap();
        assert_eq!(restored, payload);
    }

    #[test]
    fn wrong_key_is_rejected_before_any_decryption() {
        let key = AesKeyMaterial::generate_random();
        let other_key = AesKeyMaterial::generate_random();
        let dir = tempdir().unwrap();

        let input_path = dir.path().join("model.bin");
        std::fs::write(&input_path, vec![1u8; 128]).unwrap();

        let block_dir = dir.path().join("blocks");
        encrypt_file(&input_path, &block_dir, "model-1", &key).unwrap();

        let output_path = dir.path().join("restored.bin");
        let err = decrypt_file(&block_dir, &output_path, &other_key).unwrap_err();
        assert!(matches!(err, CryptoError::UnknownKey(_)));
    }
}
