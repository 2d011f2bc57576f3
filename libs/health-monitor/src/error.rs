use thiserror::Error;

#[derive(Error, Debug)]
pub enum HealthCheckError {
    #[error("ping to {0} timed out")]
    Timeout(String),
    #[error("ping to {0} failed: {1}")]
    PingFailed(String, String),
}
