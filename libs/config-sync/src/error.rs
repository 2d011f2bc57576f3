use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigSyncError {
    #[error("license does not support required feature: {0}")]
    MissingFeature(String),
    #[error("global configuration changes require a PRO or ENT license")]
    GlobalRequiresHigherTier,
    #[error("no configuration item exists for key {0}")]
    NotFound(String),
    #[error("failed to send configuration change to {0}: {1}")]
    SendFailed(String, String),
}
