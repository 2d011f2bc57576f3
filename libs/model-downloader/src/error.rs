use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("network request failed: {0}")]
    NetworkFault(#[from] reqwest::Error),
    #[error("disk access failed: {0}")]
    IoFault(#[from] std::io::Error),
    #[error("server rejected the request with status {0}")]
    ServerRejection(String),
    #[error("integrity verification failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("model access denied: {0}")]
    AccessDenied(String),
}
