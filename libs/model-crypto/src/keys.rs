use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::CryptoError;

pub const AES_KEY_LEN: usize = 32;
pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const KEY_TTL_DAYS: i64 = 30;
const RSA_KEY_BITS: usize = 2048;

/// A single AES-256 key plus the bookkeeping needed for hardware-bound
/// derivation, advisory expiry, and rotation lineage.
#[derive(Clone)]
pub struct AesKeyMaterial {
    pub key_id: String,
    pub key_bytes: [u8; AES_KEY_LEN],
    pub created_at: DateTime<Utc>,
    pub hardware_bound: bool,
    pub rotated: bool,
    pub rotated_to: Option<String>,
    pub rotation_date: Option<DateTime<Utc>>,
}

impl AesKeyMaterial {
    /// Generates a fresh random key from the OS CSPRNG.
    pub fn generate_random() -> Self {
        let mut bytes = [0u8; AES_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            key_id: Uuid::new_v4().to_string(),
            key_bytes: bytes,
            created_at: Utc::now(),
            hardware_bound: false,
            rotated: false,
            rotated_to: None,
            rotation_date: None,
        }
    }

    /// Derives a hardware-bound key via PBKDF2-HMAC-SHA256: salt is the
    /// sha256 of the hardware fingerprint, password is the license key.
    pub fn derive_hardware_bound(hardware_fingerprint: &str, license_key: &str) -> Self {
        let salt = Sha256::digest(hardware_fingerprint.as_bytes());
        let mut key_bytes = [0u8; AES_KEY_LEN];
        pbkdf2_hmac::<Sha256>(license_key.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key_bytes);
        Self {
            key_id: Uuid::new_v4().to_string(),
            key_bytes,
            created_at: Utc::now(),
            hardware_bound: true,
            rotated: false,
            rotated_to: None,
            rotation_date: None,
        }
    }

    /// Advisory expiry: keys older than [`KEY_TTL_DAYS`] should be rotated,
    /// but remain usable for decrypting blocks already written with them.
    pub fn is_expired(&self) -> bool {
        Utc::now() - self.created_at > Duration::days(KEY_TTL_DAYS)
    }
}

/// A per-node RSA-2048 key pair used for key-exchange requests. Generated
/// once on first use and persisted to disk so a node's public key is stable
/// across restarts.
pub struct RsaKeyPair {
    pub private_key: RsaPrivateKey,
    pub public_key: RsaPublicKey,
}

impl RsaKeyPair {
    pub fn generate() -> Result<Self, CryptoError> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)?;
        let public_key = RsaPublicKey::from(&private_key);
        Ok(Self { private_key, public_key })
    }

    /// Loads a persisted key pair from `private_key_path`, generating and
    /// persisting a fresh one if no file exists there yet.
    pub fn generate_or_load(private_key_path: &Path) -> Result<Self, CryptoError> {
        if private_key_path.exists() {
            let pem = std::fs::read_to_string(private_key_path)?;
            let private_key = RsaPrivateKey::from_pkcs1_pem(&pem)
                .map_err(|e| CryptoError::ManifestCorrupt(e.to_string()))?;
            let public_key = RsaPublicKey::from(&private_key);
            return Ok(Self { private_key, public_key });
        }

        let pair = Self::generate()?;
        if let Some(parent) = private_key_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let pem = pair.private_key.to_pkcs1_pem(Default::default())?;
        std::fs::write(private_key_path, pem.as_bytes())?;
        Ok(pair)
    }

    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        Ok(self.public_key.to_pkcs1_pem(Default::default())?.to_string())
    }

    pub fn public_key_from_pem(pem: &str) -> Result<RsaPublicKey, CryptoError> {
        RsaPublicKey::from_pkcs1_pem(pem).map_err(|e| CryptoError::ManifestCorrupt(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_bound_derivation_is_deterministic() {
        let a = AesKeyMaterial::derive_hardware_bound("hw-123", "TIKT-PRO-12M-AB12CD");
        let b = AesKeyMaterial::derive_hardware_bound("hw-123", "TIKT-PRO-12M-AB12CD");
        assert_eq!(a.key_bytes, b.key_bytes);
        assert!(a.hardware_bound);
    }

    #[test]
    fn different_fingerprints_yield_different_keys() {
        let a = AesKeyMaterial::derive_hardware_bound("hw-123", "license");
        let b = AesKeyMaterial::derive_hardware_bound("hw-456", "license");
        assert_ne!(a.key_bytes, b.key_bytes);
    }

    #[test]
    fn random_keys_are_not_hardware_bound_and_not_expired() {
        let key = AesKeyMaterial::generate_random();
        assert!(!key.hardware_bound);
        assert!(!key.is_expired());
    }
}
