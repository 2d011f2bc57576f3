use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("license is not valid")]
    InvalidLicense,
    #[error("model access denied for {0}")]
    ModelAccessDenied(String),
    #[error("enterprise networks require an ENT license")]
    EnterpriseLicenseRequired,
    #[error("network limit reached ({current}/{max})")]
    NetworkLimitReached { current: usize, max: i64 },
    #[error("network not found: {0}")]
    NotFound(String),
    #[error("network at capacity")]
    AtCapacity,
    #[error("join request not found: {0}")]
    JoinRequestNotFound(String),
    #[error("license tier {have} incompatible with network requiring {need}")]
    TierIncompatible { have: String, need: String },
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        NetworkError::Io(err.to_string())
    }
}
