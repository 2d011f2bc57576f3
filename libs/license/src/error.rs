use thiserror::Error;

/// License error taxonomy (spec §7 `LicenseError`). Non-recoverable locally;
/// callers decide whether to deny an action, degrade, or stop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LicenseError {
    #[error("no license is loaded")]
    Missing,
    #[error("license expired at {0}")]
    Expired(String),
    #[error("license key does not match the required format: {0}")]
    InvalidFormat(String),
    #[error("license is bound to a different machine")]
    HardwareMismatch,
    #[error("license tier {have} is below the required tier {need}")]
    TierTooLow { have: String, need: String },
    #[error("feature '{0}' is not included in this license")]
    FeatureDisallowed(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("storage is corrupt: {0}")]
    StorageCorrupt(String),
}

impl From<std::io::Error> for LicenseError {
    fn from(e: std::io::Error) -> Self {
        LicenseError::Io(e.to_string())
    }
}
