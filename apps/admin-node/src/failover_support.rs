//! Default backup-activation and block-transfer primitives for the admin
//! node's `FailoverManager` (spec C12).
//!
//! Spec §1 places "the actual network transport (TCP/WS/UDP sockets) below
//! the message boundary" out of scope: `BackupActivator`/`BlockTransporter`
//! are exactly that boundary. This node's implementation logs the intended
//! action and reports success, which is sufficient to drive the
//! degradation-ladder and redistribution-plan logic end to end; a real
//! deployment would plug in an RPC call to the target worker here.

use futures::future::BoxFuture;
use tiktrue_failover::{BackupActivator, BackupWorker, BlockTransporter, FailoverError};
use tracing::info;

pub struct LoggingBackupActivator;

impl BackupActivator for LoggingBackupActivator {
    fn activate<'a>(&'a self, backup: &'a BackupWorker) -> BoxFuture<'a, Result<(), FailoverError>> {
        Box::pin(async move {
            info!(worker_id = %backup.worker_id, network_id = %backup.network_id, "activating standby backup worker");
            Ok(())
        })
    }
}

pub struct LoggingBlockTransporter;

impl BlockTransporter for LoggingBlockTransporter {
    fn transfer<'a>(
        &'a self,
        source_worker: &'a str,
        target_worker: &'a str,
        blocks: &'a [String],
    ) -> BoxFuture<'a, Result<(), FailoverError>> {
        Box::pin(async move {
            info!(source_worker, target_worker, block_count = blocks.len(), "transferring block workload");
            Ok(())
        })
    }
}
