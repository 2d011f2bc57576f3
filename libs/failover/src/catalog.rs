use std::collections::HashMap;

use futures::future::BoxFuture;
use parking_lot::RwLock;

use crate::error::FailoverError;
use crate::types::{BackupStatus, BackupWorker};

/// Registered standby backup workers, grouped by network. Populated by
/// explicit registration rather than discovered ad hoc.
#[derive(Default)]
pub struct BackupWorkerCatalog {
    by_network: RwLock<HashMap<String, Vec<BackupWorker>>>,
}

impl BackupWorkerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, backup: BackupWorker) {
        self.by_network
            .write()
            .entry(backup.network_id.clone())
            .or_default()
            .push(backup);
    }

    pub fn for_network(&self, network_id: &str) -> Vec<BackupWorker> {
        self.by_network
            .read()
            .get(network_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the lowest-`priority`-number standby backup for a network.
    pub fn highest_priority_standby(&self, network_id: &str) -> Option<BackupWorker> {
        self.by_network
            .read()
            .get(network_id)?
            .iter()
            .filter(|b| b.status == BackupStatus::Standby)
            .min_by_key(|b| b.priority)
            .cloned()
    }

    pub fn set_status(&self, network_id: &str, worker_id: &str, status: BackupStatus) {
        if let Some(backups) = self.by_network.write().get_mut(network_id) {
            if let Some(backup) = backups.iter_mut().find(|b| b.worker_id == worker_id) {
                backup.status = status;
            }
        }
    }
}

/// Starts a backup worker. The transport used to actually bring the
/// process up is left to the caller's implementation.
pub trait BackupActivator: Send + Sync {
    fn activate<'a>(&'a self, backup: &'a BackupWorker) -> BoxFuture<'a, Result<(), FailoverError>>;
}

/// Moves blocks from one worker to another. Left pluggable for the same
/// reason as `BackupActivator`: the control plane doesn't own the wire
/// transport for model block transfer.
pub trait BlockTransporter: Send + Sync {
    fn transfer<'a>(
        &'a self,
        source_worker: &'a str,
        target_worker: &'a str,
        blocks: &'a [String],
    ) -> BoxFuture<'a, Result<(), FailoverError>>;
}
