//! RSA-OAEP key exchange between nodes, with PSS-SHA-256 request signing.
//!
//! A node that wants an AES model key sends a [`KeyExchangeRequest`] signed
//! with its RSA private key. The key holder verifies the signature, then
//! wraps the AES key under the requester's public key with RSA-OAEP-SHA-256.

use chrono::{DateTime, Utc};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::CryptoError;
use crate::keys::{AesKeyMaterial, RsaKeyPair, AES_KEY_LEN};

/// A request for an AES model key, signed over `request_id | node_id |
/// iso(timestamp)` with RSA-PSS-SHA-256 over the requester's private key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyExchangeRequest {
    pub request_id: String,
    pub node_id: String,
    pub public_key_pem: String,
    pub method: String,
    pub timestamp: DateTime<Utc>,
    pub signature: Vec<u8>,
}

fn signing_payload(request_id: &str, node_id: &str, timestamp: &DateTime<Utc>) -> Vec<u8> {
    format!("{request_id}|{node_id}|{}", timestamp.to_rfc3339()).into_bytes()
}

impl KeyExchangeRequest {
    /// Builds and signs a request on behalf of `node_id` using `keypair`.
    pub fn new(node_id: &str, keypair: &RsaKeyPair) -> Result<Self, CryptoError> {
        let request_id = Uuid::new_v4().to_string();
        let timestamp = Utc::now();
        let payload = signing_payload(&request_id, node_id, &timestamp);

        let signing_key = rsa::pss::SigningKey::<Sha256>::new(keypair.private_key.clone());
        let mut rng = rand::thread_rng();
        let signature = signing_key.sign_with_rng(&mut rng, &payload);

        Ok(Self {
            request_id,
            node_id: node_id.to_string(),
            public_key_pem: keypair.public_key_pem()?,
            method: "RSA_OAEP".to_string(),
            timestamp,
            signature: signature.to_bytes().to_vec(),
        })
    }

    /// Verifies the PSS-SHA-256 signature over this request's own fields.
    pub fn verify_signature(&self) -> Result<(), CryptoError> {
        let public_key = RsaPublicKey::from_pkcs1_pem(&self.public_key_pem)
            .map_err(|e| CryptoError::ManifestCorrupt(e.to_string()))?;
        let verifying_key = rsa::pss::VerifyingKey::<Sha256>::new(public_key);
        let payload = signing_payload(&self.request_id, &self.node_id, &self.timestamp);
        let signature = rsa::pss::Signature::try_from(self.signature.as_slice())
            .map_err(|_| CryptoError::InvalidSignature)?;
        verifying_key
            .verify(&payload, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

/// Wraps `key`'s raw bytes under `requester_public_key_pem` via RSA-OAEP-SHA-256.
/// Called by the key holder after verifying the requester's signed request.
pub fn wrap_key_for_requester(
    key: &AesKeyMaterial,
    requester_public_key_pem: &str,
) -> Result<Vec<u8>, CryptoError> {
    let public_key = RsaPublicKey::from_pkcs1_pem(requester_public_key_pem)
        .map_err(|e| CryptoError::ManifestCorrupt(e.to_string()))?;
    let mut rng = rand::thread_rng();
    let wrapped = public_key
        .encrypt(&mut rng, Oaep::new::<Sha256>(), &key.key_bytes)
        .map_err(CryptoError::Rsa)?;
    Ok(wrapped)
}

/// Unwraps a key received over the wire using this node's RSA private key,
/// reconstructing an [`AesKeyMaterial`] under the given `key_id`.
pub fn unwrap_received_key(
    wrapped: &[u8],
    key_id: &str,
    hardware_bound: bool,
    keypair: &RsaPrivateKey,
) -> Result<AesKeyMaterial, CryptoError> {
    let decrypted = keypair
        .decrypt(Oaep::new::<Sha256>(), wrapped)
        .map_err(CryptoError::Rsa)?;
    if decrypted.len() != AES_KEY_LEN {
        return Err(CryptoError::ManifestCorrupt(format!(
            "unwrapped key has {} bytes, expected {AES_KEY_LEN}",
            decrypted.len()
        )));
    }
    let mut key_bytes = [0u8; AES_KEY_LEN];
    key_bytes.copy_from_slice(&decrypted);
    Ok(AesKeyMaterial {
        key_id: key_id.to_string(),
        key_bytes,
        created_at: Utc::now(),
        hardware_bound,
        rotated: false,
        rotated_to: None,
        rotation_date: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_request_round_trips_through_verification() {
        let keypair = RsaKeyPair::generate().unwrap();
        let request = KeyExchangeRequest::new("node-a", &keypair).unwrap();
        assert!(request.verify_signature().is_ok());
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let keypair = RsaKeyPair::generate().unwrap();
        let mut request = KeyExchangeRequest::new("node-a", &keypair).unwrap();
        let last = request.signature.len() - 1;
        request.signature[last] ^= 0xFF;
        assert!(matches!(
            request.verify_signature(),
            Err(CryptoError::InvalidSignature)
        ));
    }

    #[test]
    fn wrapped_key_unwraps_to_the_same_bytes() {
        let holder_keypair = RsaKeyPair::generate().unwrap();
        let requester_keypair = RsaKeyPair::generate().unwrap();
        let key = AesKeyMaterial::generate_random();

        let wrapped =
            wrap_key_for_requester(&key, &requester_keypair.public_key_pem().unwrap()).unwrap();
        let recovered = unwrap_received_key(
            &wrapped,
            &key.key_id,
            key.hardware_bound,
            &requester_keypair.private_key,
        )
        .unwrap();

        assert_eq!(recovered.key_bytes, key.key_bytes);
        assert_eq!(recovered.key_id, key.key_id);
    }
}
