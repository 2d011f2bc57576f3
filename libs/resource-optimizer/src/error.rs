use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("worker '{0}' is not registered")]
    UnknownWorker(String),
}
