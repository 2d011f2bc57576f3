use thiserror::Error;

/// Error taxonomy for block/file encryption, key derivation, and RSA key
/// exchange. Tag and checksum failures are reported as distinct variants so
/// callers can tell "someone tampered with this" apart from "this is the
/// wrong key" during integrity verification.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("rsa error: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("rsa pkcs1 encoding error: {0}")]
    Pkcs1(#[from] rsa::pkcs1::Error),

    #[error("gcm tag mismatch: ciphertext failed authentication")]
    TagMismatch,

    #[error("checksum mismatch: decrypted plaintext does not match plaintext_sha256")]
    ChecksumMismatch,

    #[error("unknown key id: {0}")]
    UnknownKey(String),

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("encrypted block failed shape validation: {0}")]
    MalformedBlock(String),

    #[error("manifest is corrupt: {0}")]
    ManifestCorrupt(String),
}
