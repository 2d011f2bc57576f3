use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(String),
    #[error("message failed validation: {0}")]
    InvalidMessage(String),
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}
