use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tiktrue_worker_node::config::WorkerNodeConfig;
use tiktrue_worker_node::engine::WorkerEngine;
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tiktrue_telemetry::init_tracing("worker-node");

    let config = WorkerNodeConfig::parse();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handle = shutdown.clone();
    ctrlc::set_handler(move || {
        warn!("shutdown requested, finishing the current heartbeat cycle");
        shutdown_handle.store(true, Ordering::SeqCst);
    })?;

    let engine = WorkerEngine::bootstrap(config, shutdown).await?;
    engine.run().await
}
