//! Model block encryption and key distribution (spec component C9).
//!
//! Covers AES-256-GCM block and file-level encryption, PBKDF2-derived
//! hardware-bound keys, RSA-2048 key pairs, RSA-OAEP/PSS key exchange, and
//! key rotation. Transport and persistence of the resulting artifacts are
//! the caller's responsibility; this crate only defines the cryptographic
//! operations and their on-disk manifest shape.

pub mod block;
pub mod error;
pub mod file_pipeline;
pub mod key_exchange;
pub mod keys;
pub mod rotation;

pub use block::{decrypt_block, encrypt_block, verify_block_integrity, EncryptedBlock};
pub use error::CryptoError;
pub use file_pipeline::{decrypt_file, encrypt_file, Manifest, ManifestBlock, BLOCK_SIZE_BYTES};
pub use key_exchange::{
    unwrap_received_key, wrap_key_for_requester, KeyExchangeRequest,
};
pub use keys::{AesKeyMaterial, RsaKeyPair, AES_KEY_LEN, KEY_TTL_DAYS, PBKDF2_ITERATIONS};
pub use rotation::rotate_keys;
