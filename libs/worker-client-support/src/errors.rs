use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to reach admin node: {0}")]
    NetworkFault(#[from] reqwest::Error),

    #[error("local block storage fault: {0}")]
    IoFault(#[from] std::io::Error),

    #[error("failed to decode admin response: {0}")]
    DecodingFault(#[from] serde_json::Error),

    #[error("admin node rejected the request with status {0}")]
    ServerRejection(String),

    #[error("join request was not approved: {0}")]
    JoinRejected(String),

    #[error("one or more model blocks failed to sync")]
    HydrationFailed,

    #[error("block integrity check failed: {0}")]
    CryptoFault(#[from] tiktrue_model_crypto::CryptoError),

    #[error("local manifest is malformed: {0}")]
    ManifestCorrupt(String),
}
