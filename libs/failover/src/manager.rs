use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tiktrue_license::{LicenseRecord, Tier};
use tracing::{info, instrument, warn};

use crate::catalog::{BackupActivator, BackupWorkerCatalog, BlockTransporter};
use crate::error::FailoverError;
use crate::types::{
    BackupStatus, BlockAssignment, BlockRedistribution, DegradationLevel, FailoverEvent,
    FailoverStrategy, WorkloadTransfer,
};

pub const MAX_CONCURRENT_FAILOVERS: usize = 3;
pub const FAILOVER_TIMEOUT_SECS: u64 = 60;

pub struct FailoverManager {
    catalog: BackupWorkerCatalog,
    activator: Arc<dyn BackupActivator>,
    transporter: Arc<dyn BlockTransporter>,
    active_failovers: RwLock<HashMap<String, FailoverEvent>>,
    failover_history: RwLock<Vec<FailoverEvent>>,
    degradation_level: RwLock<DegradationLevel>,
    degradation_history: RwLock<Vec<(chrono::DateTime<Utc>, DegradationLevel, String)>>,
    block_assignments: RwLock<HashMap<String, BlockAssignment>>,
    redistribution_history: RwLock<Vec<BlockRedistribution>>,
    transfer_history: RwLock<Vec<WorkloadTransfer>>,
}

impl FailoverManager {
    pub fn new(activator: Arc<dyn BackupActivator>, transporter: Arc<dyn BlockTransporter>) -> Self {
        Self {
            catalog: BackupWorkerCatalog::new(),
            activator,
            transporter,
            active_failovers: RwLock::new(HashMap::new()),
            failover_history: RwLock::new(Vec::new()),
            degradation_level: RwLock::new(DegradationLevel::None),
            degradation_history: RwLock::new(Vec::new()),
            block_assignments: RwLock::new(HashMap::new()),
            redistribution_history: RwLock::new(Vec::new()),
            transfer_history: RwLock::new(Vec::new()),
        }
    }

    pub fn register_backup(&self, backup: crate::types::BackupWorker) {
        self.catalog.register(backup);
    }

    pub fn register_block_assignment(&self, block_id: impl Into<String>, network_id: impl Into<String>, assigned_worker: impl Into<String>) {
        let block_id = block_id.into();
        self.block_assignments.write().insert(block_id.clone(), BlockAssignment {
            block_id,
            network_id: network_id.into(),
            assigned_worker: assigned_worker.into(),
        });
    }

    pub fn current_degradation_level(&self) -> DegradationLevel {
        *self.degradation_level.read()
    }

    pub fn failover_history(&self) -> Vec<FailoverEvent> {
        self.failover_history.read().clone()
    }

    /// Handles a worker-failure callback from the health monitor: tries to
    /// activate a standby backup, falling back to graceful degradation.
    #[instrument(skip(self, license))]
    pub async fn on_worker_failure(
        &self,
        worker_id: &str,
        network_id: &str,
        license: Option<&LicenseRecord>,
        reason: &str,
    ) -> Result<FailoverEvent, FailoverError> {
        if self.active_failovers.read().len() >= MAX_CONCURRENT_FAILOVERS {
            warn!(worker_id, "maximum concurrent failovers reached, dropping worker failure");
            return Err(FailoverError::TooManyConcurrentFailovers);
        }

        let event_id = format!("worker_failover_{worker_id}_{}", Utc::now().timestamp_millis());
        let started = Utc::now();
        let mut event = FailoverEvent {
            event_id: event_id.clone(),
            timestamp: started,
            event_type: "worker_failure".to_string(),
            source_id: worker_id.to_string(),
            target_id: None,
            strategy_used: FailoverStrategy::Immediate,
            success: false,
            duration_ms: 0,
            reason: reason.to_string(),
        };
        self.active_failovers.write().insert(event_id.clone(), event.clone());

        match self.activate_backup_worker(network_id, license).await {
            Ok(backup_id) => {
                event.target_id = Some(backup_id.clone());
                event.success = true;
                info!(worker_id, backup_id = %backup_id, "worker failover successful");
            }
            Err(err) => {
                warn!(worker_id, %err, "no backup activated, applying graceful degradation");
                self.graceful_degradation(DegradationLevel::ReducedCapacity, &format!("worker failure: {worker_id}, {err}"));
                event.success = false;
            }
        }
        event.duration_ms = (Utc::now() - started).num_milliseconds();

        self.active_failovers.write().remove(&event_id);
        self.failover_history.write().push(event.clone());
        Ok(event)
    }

    async fn activate_backup_worker(&self, network_id: &str, license: Option<&LicenseRecord>) -> Result<String, FailoverError> {
        if let Some(license) = license {
            if license.plan == Tier::Free {
                return Err(FailoverError::BackupWorkersRequireHigherTier);
            }
        }

        let backup = self
            .catalog
            .highest_priority_standby(network_id)
            .ok_or_else(|| FailoverError::NoBackupAvailable(network_id.to_string()))?;

        self.catalog.set_status(network_id, &backup.worker_id, BackupStatus::Activating);
        match self.activator.activate(&backup).await {
            Ok(()) => {
                self.catalog.set_status(network_id, &backup.worker_id, BackupStatus::Active);
                Ok(backup.worker_id)
            }
            Err(err) => {
                self.catalog.set_status(network_id, &backup.worker_id, BackupStatus::Failed);
                Err(FailoverError::ActivationFailed(err.to_string()))
            }
        }
    }

    /// Handles a network-failure callback: tries a restart first (the
    /// caller supplies the restart outcome, since the actual service
    /// runner is owned elsewhere), then degrades on failure.
    #[instrument(skip(self))]
    pub fn on_network_failure(&self, network_id: &str, restart_succeeded: bool, reason: &str) -> FailoverEvent {
        let started = Utc::now();
        let mut event = FailoverEvent {
            event_id: format!("network_failover_{network_id}_{}", started.timestamp_millis()),
            timestamp: started,
            event_type: "network_failure".to_string(),
            source_id: network_id.to_string(),
            target_id: None,
            strategy_used: FailoverStrategy::Graceful,
            success: restart_succeeded,
            duration_ms: 0,
            reason: reason.to_string(),
        };

        if !restart_succeeded {
            self.graceful_degradation(DegradationLevel::ReducedCapacity, &format!("network failure: {network_id}, restart failed"));
        }
        event.duration_ms = (Utc::now() - started).num_milliseconds();
        self.failover_history.write().push(event.clone());
        event
    }

    /// Idempotent on `level`: re-applying the current level is a no-op.
    pub fn graceful_degradation(&self, level: DegradationLevel, reason: &str) {
        let mut current = self.degradation_level.write();
        if *current == level {
            return;
        }
        let old = *current;
        *current = level;
        drop(current);

        self.degradation_history.write().push((Utc::now(), level, reason.to_string()));
        let effect = match level {
            DegradationLevel::None => "restoring normal operation",
            DegradationLevel::ReducedQuality => "reducing model quality/precision",
            DegradationLevel::ReducedCapacity => "limiting concurrent processing capacity",
            DegradationLevel::EssentialOnly => "disabling non-essential operations",
            DegradationLevel::MaintenanceMode => "entering minimal-functionality maintenance mode",
        };
        info!(?old, ?level, effect, reason, "applying graceful degradation");
    }

    /// Distributes a failed worker's blocks across `available_workers` in
    /// balanced round-robin, resolving any conflicting prior assignments,
    /// then executes the transfers.
    #[instrument(skip(self, available_workers))]
    pub async fn redistribute_blocks(
        &self,
        failed_worker_id: &str,
        network_id: &str,
        available_workers: &[String],
    ) -> Result<BlockRedistribution, FailoverError> {
        let affected_blocks: Vec<String> = self
            .block_assignments
            .read()
            .values()
            .filter(|a| a.assigned_worker == failed_worker_id && a.network_id == network_id)
            .map(|a| a.block_id.clone())
            .collect();

        let started_at = Utc::now();
        let redistribution_id = format!("redist_{failed_worker_id}_{}", started_at.timestamp_millis());

        if affected_blocks.is_empty() {
            let record = BlockRedistribution {
                redistribution_id,
                network_id: network_id.to_string(),
                failed_worker: failed_worker_id.to_string(),
                affected_blocks,
                redistribution_plan: HashMap::new(),
                started_at,
                completed_at: Some(Utc::now()),
                success: true,
                conflicts_resolved: 0,
                error_message: None,
            };
            self.redistribution_history.write().push(record.clone());
            return Ok(record);
        }

        if available_workers.is_empty() {
            return Err(FailoverError::NoAvailableWorkers(network_id.to_string()));
        }

        let plan = balanced_round_robin_plan(&affected_blocks, available_workers);

        let mut conflicts_resolved = 0u32;
        {
            let mut assignments = self.block_assignments.write();
            for (worker_id, blocks) in &plan {
                for block_id in blocks {
                    let entry = assignments.entry(block_id.clone()).or_insert_with(|| BlockAssignment {
                        block_id: block_id.clone(),
                        network_id: network_id.to_string(),
                        assigned_worker: worker_id.clone(),
                    });
                    if entry.assigned_worker != *worker_id {
                        conflicts_resolved += 1;
                        entry.assigned_worker = worker_id.clone();
                    }
                }
            }
        }

        let mut all_succeeded = true;
        for (worker_id, blocks) in &plan {
            let transfer = self.transfer_workload(failed_worker_id, worker_id, blocks.clone()).await;
            if !transfer.success {
                all_succeeded = false;
            }
        }

        let record = BlockRedistribution {
            redistribution_id,
            network_id: network_id.to_string(),
            failed_worker: failed_worker_id.to_string(),
            affected_blocks,
            redistribution_plan: plan,
            started_at,
            completed_at: Some(Utc::now()),
            success: all_succeeded,
            conflicts_resolved,
            error_message: if all_succeeded { None } else { Some("one or more transfers failed".to_string()) },
        };
        self.redistribution_history.write().push(record.clone());
        Ok(record)
    }

    #[instrument(skip(self, blocks))]
    pub async fn transfer_workload(&self, source_worker: &str, target_worker: &str, blocks: Vec<String>) -> WorkloadTransfer {
        let started_at = Utc::now();
        let outcome = self.transporter.transfer(source_worker, target_worker, &blocks).await;
        let mut transfer = WorkloadTransfer {
            transfer_id: format!("transfer_{source_worker}_{target_worker}_{}", started_at.timestamp_millis()),
            source_worker: source_worker.to_string(),
            target_worker: target_worker.to_string(),
            model_blocks: blocks,
            started_at,
            completed_at: Some(Utc::now()),
            success: outcome.is_ok(),
            error_message: outcome.err().map(|e| e.to_string()),
        };
        transfer.completed_at = Some(Utc::now());
        self.transfer_history.write().push(transfer.clone());
        transfer
    }
}

fn balanced_round_robin_plan(blocks: &[String], workers: &[String]) -> HashMap<String, Vec<String>> {
    let total = blocks.len();
    let worker_count = workers.len();
    let base = total / worker_count;
    let remainder = total % worker_count;

    let mut plan = HashMap::new();
    let mut index = 0;
    for (i, worker_id) in workers.iter().enumerate() {
        let take = base + if i < remainder { 1 } else { 0 };
        if take == 0 {
            continue;
        }
        let assigned: Vec<String> = blocks[index..index + take].to_vec();
        index += take;
        plan.insert(worker_id.clone(), assigned);
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackupWorker;
    use futures::future::BoxFuture;

    struct AlwaysActivate;
    impl BackupActivator for AlwaysActivate {
        fn activate<'a>(&'a self, _backup: &'a BackupWorker) -> BoxFuture<'a, Result<(), FailoverError>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct AlwaysFailActivate;
    impl BackupActivator for AlwaysFailActivate {
        fn activate<'a>(&'a self, _backup: &'a BackupWorker) -> BoxFuture<'a, Result<(), FailoverError>> {
            Box::pin(async { Err(FailoverError::ActivationFailed("refused".into())) })
        }
    }

    struct AlwaysTransfer;
    impl BlockTransporter for AlwaysTransfer {
        fn transfer<'a>(&'a self, _source: &'a str, _target: &'a str, _blocks: &'a [String]) -> BoxFuture<'a, Result<(), FailoverError>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn pro_license() -> LicenseRecord {
        LicenseRecord::issue(
            "TIKT-PRO-12M-ABC123",
            Default::default(),
            Tier::Pro.features().into_iter().map(String::from).collect(),
            20,
            String::new(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn worker_failure_activates_highest_priority_standby_backup() {
        let manager = FailoverManager::new(Arc::new(AlwaysActivate), Arc::new(AlwaysTransfer));
        let mut low_priority = BackupWorker::new("backup-2", "net1", "host2", 9000);
        low_priority.priority = 5;
        let mut high_priority = BackupWorker::new("backup-1", "net1", "host1", 9000);
        high_priority.priority = 1;
        manager.register_backup(low_priority);
        manager.register_backup(high_priority);

        let license = pro_license();
        let event = manager.on_worker_failure("worker-x", "net1", Some(&license), "ping timeout").await.unwrap();
        assert!(event.success);
        assert_eq!(event.target_id.as_deref(), Some("backup-1"));
    }

    #[tokio::test]
    async fn free_tier_cannot_activate_backup_workers_and_degrades_instead() {
        let manager = FailoverManager::new(Arc::new(AlwaysActivate), Arc::new(AlwaysTransfer));
        manager.register_backup(BackupWorker::new("backup-1", "net1", "host1", 9000));
        let mut license = pro_license();
        license.plan = Tier::Free;

        let event = manager.on_worker_failure("worker-x", "net1", Some(&license), "ping timeout").await.unwrap();
        assert!(!event.success);
        assert_eq!(manager.current_degradation_level(), DegradationLevel::ReducedCapacity);
    }

    #[tokio::test]
    async fn worker_failure_with_no_backup_falls_back_to_degradation() {
        let manager = FailoverManager::new(Arc::new(AlwaysFailActivate), Arc::new(AlwaysTransfer));
        manager.register_backup(BackupWorker::new("backup-1", "net1", "host1", 9000));
        let license = pro_license();

        let event = manager.on_worker_failure("worker-x", "net1", Some(&license), "ping timeout").await.unwrap();
        assert!(!event.success);
        assert_eq!(manager.current_degradation_level(), DegradationLevel::ReducedCapacity);
    }

    #[test]
    fn graceful_degradation_is_idempotent_on_repeated_same_level() {
        let manager = FailoverManager::new(Arc::new(AlwaysActivate), Arc::new(AlwaysTransfer));
        manager.graceful_degradation(DegradationLevel::EssentialOnly, "first");
        manager.graceful_degradation(DegradationLevel::EssentialOnly, "second");
        assert_eq!(manager.degradation_history.read().len(), 1);
    }

    #[tokio::test]
    async fn redistribute_blocks_splits_evenly_with_remainder_to_first_workers() {
        let manager = FailoverManager::new(Arc::new(AlwaysActivate), Arc::new(AlwaysTransfer));
        for i in 0..5 {
            manager.register_block_assignment(format!("block-{i}"), "net1", "worker-dead");
        }
        let workers = vec!["w1".to_string(), "w2".to_string()];
        let redistribution = manager.redistribute_blocks("worker-dead", "net1", &workers).await.unwrap();
        assert!(redistribution.success);
        assert_eq!(redistribution.redistribution_plan.get("w1").unwrap().len(), 3);
        assert_eq!(redistribution.redistribution_plan.get("w2").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn redistribute_blocks_with_nothing_assigned_is_a_trivial_success() {
        let manager = FailoverManager::new(Arc::new(AlwaysActivate), Arc::new(AlwaysTransfer));
        let redistribution = manager.redistribute_blocks("worker-dead", "net1", &["w1".to_string()]).await.unwrap();
        assert!(redistribution.success);
        assert!(redistribution.affected_blocks.is_empty());
    }

    #[tokio::test]
    async fn redistribute_blocks_with_no_available_workers_errors() {
        let manager = FailoverManager::new(Arc::new(AlwaysActivate), Arc::new(AlwaysTransfer));
        manager.register_block_assignment("block-0", "net1", "worker-dead");
        let err = manager.redistribute_blocks("worker-dead", "net1", &[]).await.unwrap_err();
        assert!(matches!(err, FailoverError::NoAvailableWorkers(_)));
    }
}
