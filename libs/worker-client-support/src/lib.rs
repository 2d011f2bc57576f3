//! A worker node's HTTP link to its admin node: network join, heartbeats,
//! worker registration, and parallel retrieval plus certification of a
//! model's encrypted blocks.

pub mod client;
pub mod errors;
pub mod hydrator;

pub use client::{KeyExchangeResponse, WorkerClient};
pub use errors::ClientError;
pub use hydrator::ModelBlockHydrator;
