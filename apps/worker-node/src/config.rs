//! CLI/environment-driven bootstrap configuration, parsed once at process
//! start (mirrors the admin node's `from_env` convention, but surfaced
//! through `clap` since this binary is meant to be launched by operators
//! directly rather than only by process supervisors).

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "worker-node",
    about = "Joins a network, syncs encrypted model blocks, and serves paged KV-cache sessions"
)]
pub struct WorkerNodeConfig {
    /// Base URL of the admin node to join, e.g. http://10.0.0.5:8702. When
    /// unset, the worker falls back to UDP multicast discovery to find one.
    #[arg(long, env = "ADMIN_URL")]
    pub admin_url: Option<String>,

    /// Bearer token presented on every request to the admin node's
    /// worker-facing routes.
    #[arg(long, env = "WORKER_AUTH_TOKEN", default_value = "")]
    pub worker_auth_token: String,

    #[arg(long, env = "WORKER_ID")]
    pub worker_id: Option<String>,

    #[arg(long, env = "WORKER_NAME", default_value = "unnamed-worker")]
    pub worker_name: String,

    /// Model this worker wants to serve. Used both to filter discovered
    /// networks and to drive the block-sync/key-exchange sequence.
    #[arg(long, env = "MODEL_ID")]
    pub model_id: String,

    /// Network to join directly, skipping discovery's compatibility filter.
    #[arg(long, env = "NETWORK_ID")]
    pub network_id: Option<String>,

    #[arg(long, env = "LICENSE_STORAGE_DIR", default_value = ".tiktrue-worker/license")]
    pub license_storage_dir: PathBuf,

    #[arg(long, env = "CRYPTO_STORAGE_DIR", default_value = ".tiktrue-worker/crypto")]
    pub crypto_storage_dir: PathBuf,

    #[arg(long, env = "BLOCK_STORAGE_DIR", default_value = ".tiktrue-worker/blocks")]
    pub block_storage_dir: PathBuf,

    #[arg(long, env = "CPU_CORES")]
    pub cpu_cores: Option<u32>,

    #[arg(long, env = "GPU_AVAILABLE", default_value_t = false)]
    pub gpu_available: bool,

    /// Global transformer-layer indices this node is assigned to cache, as
    /// handed out by the admin node's model-chain partitioning.
    #[arg(long, env = "ASSIGNED_LAYER_INDICES", value_delimiter = ',', default_value = "0")]
    pub assigned_layer_indices: Vec<u32>,

    #[arg(long, env = "KV_PAGE_CAPACITY", default_value_t = 64)]
    pub kv_page_capacity: usize,

    #[arg(long, env = "KV_INITIAL_PAGES", default_value_t = 8)]
    pub kv_initial_pages: usize,

    #[arg(long, env = "KV_NUM_HEADS", default_value_t = 32)]
    pub kv_num_heads: usize,

    #[arg(long, env = "KV_HEAD_DIM", default_value_t = 128)]
    pub kv_head_dim: usize,

    #[arg(long, env = "KV_BATCH_SIZE", default_value_t = 1)]
    pub kv_batch_size: usize,

    #[arg(long, env = "HEARTBEAT_INTERVAL_SECS", default_value_t = 30)]
    pub heartbeat_interval_secs: u64,

    #[arg(long, env = "DISCOVERY_TIMEOUT_SECS", default_value_t = 5)]
    pub discovery_timeout_secs: u64,
}

impl WorkerNodeConfig {
    /// Resolves the fields `clap` leaves as `None` with a freshly generated
    /// identity and the host's logical CPU count, rather than baking
    /// non-deterministic defaults into the argument parser itself.
    pub fn resolved_worker_id(&self) -> String {
        self.worker_id
            .clone()
            .unwrap_or_else(|| format!("worker-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn resolved_cpu_cores(&self) -> u32 {
        self.cpu_cores.unwrap_or_else(|| num_cpus::get() as u32)
    }
}
