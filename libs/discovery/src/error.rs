use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode discovery message: {0}")]
    Encode(#[from] serde_json::Error),
}
