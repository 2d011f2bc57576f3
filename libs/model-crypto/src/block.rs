use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::keys::AesKeyMaterial;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// A single encrypted block: ciphertext (with the 16-byte GCM tag appended,
/// as the `aes-gcm` crate returns it), the nonce used, and a sha256 of the
/// plaintext recorded for an integrity check independent of the tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedBlock {
    pub key_id: String,
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub plaintext_sha256: String,
    pub plaintext_len: usize,
}

impl EncryptedBlock {
    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

fn cipher_for(key: &AesKeyMaterial) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.key_bytes))
}

/// Encrypts `plaintext` under `key` with a fresh CSPRNG nonce.
pub fn encrypt_block(plaintext: &[u8], key: &AesKeyMaterial) -> Result<EncryptedBlock, CryptoError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let cipher = cipher_for(key);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CryptoError::TagMismatch)?;

    let plaintext_sha256 = hex::encode(Sha256::digest(plaintext));

    Ok(EncryptedBlock {
        key_id: key.key_id.clone(),
        nonce: nonce_bytes,
        ciphertext,
        plaintext_sha256,
        plaintext_len: plaintext.len(),
    })
}

/// Decrypts `block` under `key`, verifying both the GCM tag (implicitly, via
/// the decrypt call) and the recorded plaintext checksum. The two failure
/// modes are reported distinctly.
pub fn decrypt_block(block: &EncryptedBlock, key: &AesKeyMaterial) -> Result<Vec<u8>, CryptoError> {
    if block.ciphertext.len() < TAG_LEN {
        return Err(CryptoError::MalformedBlock(format!(
            "ciphertext shorter than tag length: {} bytes",
            block.ciphertext.len()
        )));
    }

    let cipher = cipher_for(key);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&block.nonce), block.ciphertext.as_ref())
        .map_err(|_| CryptoError::TagMismatch)?;

    let actual_sha256 = hex::encode(Sha256::digest(&plaintext));
    if actual_sha256 != block.plaintext_sha256 {
        return Err(CryptoError::ChecksumMismatch);
    }

    Ok(plaintext)
}

/// Verifies a block's integrity (tag + checksum) without returning the
/// plaintext to the caller. Used when receiving blocks over the wire, before
/// committing them to the per-model manifest.
pub fn verify_block_integrity(block: &EncryptedBlock, key: &AesKeyMaterial) -> Result<(), CryptoError> {
    if block.ciphertext.is_empty() || block.ciphertext.len() < TAG_LEN {
        return Err(CryptoError::MalformedBlock("empty or undersized ciphertext".into()));
    }
    decrypt_block(block, key).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = AesKeyMaterial::generate_random();
        let plaintext = b"a quick model block payload".to_vec();
        let block = encrypt_block(&plaintext, &key).unwrap();
        let recovered = decrypt_block(&block, &key).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn tampered_ciphertext_is_a_tag_mismatch() {
        let key = AesKeyMaterial::generate_random();
        let mut block = encrypt_block(b"payload", &key).unwrap();
        let last = block.ciphertext.len() - 1;
        block.ciphertext[last] ^= 0xFF;
        assert!(matches!(decrypt_block(&block, &key), Err(CryptoError::TagMismatch)));
    }

    #[test]
    fn checksum_mismatch_is_distinct_from_tag_mismatch() {
        let key = AesKeyMaterial::generate_random();
        let mut block = encrypt_block(b"payload", &key).unwrap();
        block.plaintext_sha256 = "0".repeat(64);
        assert!(matches!(decrypt_block(&block, &key), Err(CryptoError::ChecksumMismatch)));
    }

    #[test]
    fn wrong_key_fails_as_tag_mismatch() {
        let key_a = AesKeyMaterial::generate_random();
        let key_b = AesKeyMaterial::generate_random();
        let block = encrypt_block(b"payload", &key_a).unwrap();
        assert!(matches!(decrypt_block(&block, &key_b), Err(CryptoError::TagMismatch)));
    }

    #[test]
    fn verify_integrity_accepts_valid_block() {
        let key = AesKeyMaterial::generate_random();
        let block = encrypt_block(b"payload", &key).unwrap();
        assert!(verify_block_integrity(&block, &key).is_ok());
    }
}
