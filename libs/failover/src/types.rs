use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverStrategy {
    Immediate,
    Graceful,
    LoadBalance,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationLevel {
    None = 0,
    ReducedQuality = 1,
    ReducedCapacity = 2,
    EssentialOnly = 3,
    MaintenanceMode = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Standby,
    Activating,
    Active,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupWorker {
    pub worker_id: String,
    pub network_id: String,
    pub host: String,
    pub port: u16,
    pub model_blocks: Vec<String>,
    /// Lower number means higher priority.
    pub priority: u32,
    pub status: BackupStatus,
}

impl BackupWorker {
    pub fn new(worker_id: impl Into<String>, network_id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            worker_id: worker_id.into(),
            network_id: network_id.into(),
            host: host.into(),
            port,
            model_blocks: Vec::new(),
            priority: 1,
            status: BackupStatus::Standby,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub source_id: String,
    pub target_id: Option<String>,
    pub strategy_used: FailoverStrategy,
    pub success: bool,
    pub duration_ms: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadTransfer {
    pub transfer_id: String,
    pub source_worker: String,
    pub target_worker: String,
    pub model_blocks: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub success: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRedistribution {
    pub redistribution_id: String,
    pub network_id: String,
    pub failed_worker: String,
    pub affected_blocks: Vec<String>,
    pub redistribution_plan: HashMap<String, Vec<String>>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub success: bool,
    pub conflicts_resolved: u32,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockAssignment {
    pub block_id: String,
    pub network_id: String,
    pub assigned_worker: String,
}
