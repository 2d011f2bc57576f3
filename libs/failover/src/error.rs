use thiserror::Error;

#[derive(Error, Debug)]
pub enum FailoverError {
    #[error("too many concurrent failovers in progress")]
    TooManyConcurrentFailovers,
    #[error("backup workers require a PRO or ENT license")]
    BackupWorkersRequireHigherTier,
    #[error("no standby backup worker available for network {0}")]
    NoBackupAvailable(String),
    #[error("backup worker activation failed: {0}")]
    ActivationFailed(String),
    #[error("no available workers to redistribute blocks onto in network {0}")]
    NoAvailableWorkers(String),
    #[error("workload transfer failed: {0}")]
    TransferFailed(String),
}
