//! Per-network resource allocation against node capacity, with the
//! overcommit headroom multi-network deployments rely on to pack more
//! networks onto a node than its raw capacity would otherwise allow.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tiktrue_network::types::model_chain_order;

/// Nodes are allowed to oversubscribe CPU by this factor: networks rarely
/// peg every worker at once, so admitting more than raw capacity trades a
/// small contention risk for higher utilization.
pub const CPU_OVERCOMMIT_RATIO: f64 = 1.5;
pub const MEMORY_OVERCOMMIT_RATIO: f64 = 1.2;

const BASE_MEMORY_MB_PER_BLOCK: u64 = 64;
const BASE_CPU_CORES_PER_CLIENT: f64 = 0.1;

#[derive(Debug, Error, PartialEq)]
pub enum ResourceError {
    #[error("allocating network would exceed CPU overcommit budget ({requested:.2} requested, {available:.2} available)")]
    InsufficientCpu { requested: f64, available: f64 },

    #[error("allocating network would exceed memory overcommit budget ({requested} MB requested, {available} MB available)")]
    InsufficientMemory { requested: u64, available: u64 },

    #[error("no resource allocation recorded for network {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceAllocation {
    pub network_id: String,
    pub cpu_cores: f64,
    pub memory_mb: u64,
}

/// Estimates the CPU/memory a network will need from its model's expected
/// block count and the number of clients it's provisioned for. A coarse
/// heuristic, not a measurement: real usage is what `ResourceOptimizer`
/// reconciles against once workers start reporting load.
pub fn estimate_requirements(model_id: &str, max_clients: i64, priority_factor: f64) -> ResourceAllocation {
    let block_count = model_chain_order(model_id).len() as u64;
    let memory_mb = (block_count * BASE_MEMORY_MB_PER_BLOCK) as f64 * priority_factor.max(1.0);
    let clients = max_clients.max(0) as f64;
    let cpu_cores = (1.0 + clients * BASE_CPU_CORES_PER_CLIENT) * priority_factor.max(1.0);

    ResourceAllocation {
        network_id: String::new(),
        cpu_cores,
        memory_mb: memory_mb.round() as u64,
    }
}

/// Tracks allocations against a node's declared capacity, admitting new
/// ones only while the running totals stay within the overcommit budget.
pub struct ResourceLedger {
    total_cpu_cores: f64,
    total_memory_mb: u64,
    allocations: RwLock<HashMap<String, ResourceAllocation>>,
}

impl ResourceLedger {
    pub fn new(total_cpu_cores: u32, total_memory_mb: u64) -> Self {
        Self {
            total_cpu_cores: total_cpu_cores as f64,
            total_memory_mb,
            allocations: RwLock::new(HashMap::new()),
        }
    }

    fn used(&self) -> (f64, u64) {
        let allocations = self.allocations.read();
        let cpu: f64 = allocations.values().map(|a| a.cpu_cores).sum();
        let memory: u64 = allocations.values().map(|a| a.memory_mb).sum();
        (cpu, memory)
    }

    /// Admits `requested` against the overcommit budget, or rejects it with
    /// the specific dimension that would be exceeded.
    pub fn allocate(&self, network_id: &str, requested: ResourceAllocation) -> Result<ResourceAllocation, ResourceError> {
        let cpu_budget = self.total_cpu_cores * CPU_OVERCOMMIT_RATIO;
        let memory_budget = (self.total_memory_mb as f64 * MEMORY_OVERCOMMIT_RATIO) as u64;
        let (used_cpu, used_memory) = self.used();

        if used_cpu + requested.cpu_cores > cpu_budget {
            return Err(ResourceError::InsufficientCpu {
                requested: requested.cpu_cores,
                available: (cpu_budget - used_cpu).max(0.0),
            });
        }
        if used_memory + requested.memory_mb > memory_budget {
            return Err(ResourceError::InsufficientMemory {
                requested: requested.memory_mb,
                available: memory_budget.saturating_sub(used_memory),
            });
        }

        let allocation = ResourceAllocation {
            network_id: network_id.to_string(),
            cpu_cores: requested.cpu_cores,
            memory_mb: requested.memory_mb,
        };
        self.allocations.write().insert(network_id.to_string(), allocation.clone());
        Ok(allocation)
    }

    pub fn deallocate(&self, network_id: &str) -> Result<ResourceAllocation, ResourceError> {
        self.allocations
            .write()
            .remove(network_id)
            .ok_or_else(|| ResourceError::NotFound(network_id.to_string()))
    }

    pub fn allocation_for(&self, network_id: &str) -> Option<ResourceAllocation> {
        self.allocations.read().get(network_id).cloned()
    }

    pub fn snapshot(&self) -> Vec<ResourceAllocation> {
        self.allocations.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_with_block_count_and_clients() {
        let small = estimate_requirements("mistral-7b", 3, 1.0);
        let large = estimate_requirements("llama-7b", 20, 1.0);
        assert!(large.memory_mb > small.memory_mb);
        assert!(large.cpu_cores > small.cpu_cores);
    }

    #[test]
    fn allocation_succeeds_within_overcommit_budget() {
        let ledger = ResourceLedger::new(4, 4096);
        let requested = ResourceAllocation { network_id: String::new(), cpu_cores: 5.0, memory_mb: 4000 };
        assert!(ledger.allocate("net1", requested).is_ok());
    }

    #[test]
    fn allocation_rejected_once_cpu_overcommit_budget_is_exhausted() {
        let ledger = ResourceLedger::new(2, 4096);
        let requested = ResourceAllocation { network_id: String::new(), cpu_cores: 3.0, memory_mb: 128 };
        let err = ledger.allocate("net1", requested).unwrap_err();
        assert!(matches!(err, ResourceError::InsufficientCpu { .. }));
    }

    #[test]
    fn deallocate_frees_budget_for_a_later_allocation() {
        let ledger = ResourceLedger::new(2, 4096);
        ledger.allocate("net1", ResourceAllocation { network_id: String::new(), cpu_cores: 2.0, memory_mb: 128 }).unwrap();
        assert!(ledger.deallocate("net1").is_ok());
        assert!(ledger.allocate("net2", ResourceAllocation { network_id: String::new(), cpu_cores: 2.0, memory_mb: 128 }).is_ok());
    }
}
