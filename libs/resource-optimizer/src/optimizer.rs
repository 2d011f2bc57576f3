use std::collections::{HashMap, VecDeque};

use chrono::{Duration, Utc};
use parking_lot::RwLock;
use tiktrue_license::{LicenseRecord, Tier};
use tracing::{debug, info, warn};

use crate::analysis::analyze_workload_patterns;
use crate::balancing::{execute_balancing_plan, generate_balancing_plan, load_distribution, needs_rebalancing};
use crate::error::OptimizerError;
use crate::recommendations::generate_optimization_suggestions;
use crate::types::{
    CurrentUsage, OptimizationRecommendation, OptimizationStrategy, WorkerNode, WorkloadAnalysis,
    WorkloadSample,
};

const WORKLOAD_HISTORY_CAPACITY: usize = 1000;
const MIN_WORKERS_FOR_BALANCING: usize = 2;
const DEFAULT_ANALYSIS_PERIOD_HOURS: i64 = 24;

#[derive(Debug, Default, Clone)]
pub struct OptimizationStats {
    pub total_optimizations: u64,
    pub successful_optimizations: u64,
    pub recommendations_generated: u64,
    pub load_balancing_actions: u64,
}

/// Tracks worker load, classifies workload patterns, rebalances across
/// workers, and produces license/performance/cost optimization
/// recommendations for a network.
pub struct ResourceOptimizer {
    license: Option<LicenseRecord>,
    workers: RwLock<HashMap<String, WorkerNode>>,
    workload_history: RwLock<VecDeque<WorkloadSample>>,
    current_analysis: RwLock<Option<WorkloadAnalysis>>,
    recommendations: RwLock<Vec<OptimizationRecommendation>>,
    stats: RwLock<OptimizationStats>,
}

impl ResourceOptimizer {
    pub fn new(license: Option<LicenseRecord>) -> Self {
        Self {
            license,
            workers: RwLock::new(HashMap::new()),
            workload_history: RwLock::new(VecDeque::with_capacity(WORKLOAD_HISTORY_CAPACITY)),
            current_analysis: RwLock::new(None),
            recommendations: RwLock::new(Vec::new()),
            stats: RwLock::new(OptimizationStats::default()),
        }
    }

    pub fn register_worker(&self, worker: WorkerNode) {
        info!(node_id = %worker.node_id, "registered worker node");
        self.workers.write().insert(worker.node_id.clone(), worker);
    }

    pub fn update_worker_status(&self, node_id: &str, load: f64, available_memory_mb: u64) {
        if let Some(worker) = self.workers.write().get_mut(node_id) {
            worker.current_load = load;
            worker.available_memory_mb = available_memory_mb;
            worker.last_heartbeat = Utc::now();
            debug!(node_id, "updated worker status");
        }
    }

    pub fn record_workload_sample(&self, sample: WorkloadSample) {
        let mut history = self.workload_history.write();
        if history.len() >= WORKLOAD_HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(sample);
    }

    pub fn stats(&self) -> OptimizationStats {
        self.stats.read().clone()
    }

    pub fn current_analysis(&self) -> Option<WorkloadAnalysis> {
        self.current_analysis.read().clone()
    }

    pub fn pending_recommendations(&self) -> Vec<OptimizationRecommendation> {
        self.recommendations.read().clone()
    }

    fn active_workers(&self) -> Vec<WorkerNode> {
        let now = Utc::now();
        self.workers
            .read()
            .values()
            .filter(|w| w.is_active(now))
            .cloned()
            .collect()
    }

    /// Runs pattern analysis over the last `analysis_period` (defaulting to
    /// 24 hours) of recorded workload samples.
    pub fn analyze_workload_patterns(&self, analysis_period: Option<Duration>) -> WorkloadAnalysis {
        let period = analysis_period.unwrap_or_else(|| Duration::hours(DEFAULT_ANALYSIS_PERIOD_HOURS));
        let samples: Vec<WorkloadSample> = self.workload_history.read().iter().cloned().collect();
        let analysis = analyze_workload_patterns(&samples, period);
        info!(pattern = ?analysis.pattern_type, confidence = analysis.confidence, "workload analysis completed");
        *self.current_analysis.write() = Some(analysis.clone());
        analysis
    }

    /// Attempts a rebalancing pass using `strategy`, returning `true` if a
    /// plan was found and its execution moved enough load to count as
    /// successful. Requires at least two active workers.
    pub fn dynamic_load_balancing(&self, strategy: OptimizationStrategy) -> bool {
        let active = self.active_workers();
        if active.len() < MIN_WORKERS_FOR_BALANCING {
            warn!("insufficient active workers for load balancing");
            return false;
        }

        let distribution = load_distribution(&active);
        if !needs_rebalancing(&distribution) {
            info!("load already well balanced");
            return true;
        }

        let Some(plan) = generate_balancing_plan(&active, strategy) else {
            warn!("no viable load balancing plan generated");
            return false;
        };

        let success = {
            let mut workers = self.workers.write();
            execute_balancing_plan(&mut workers, &plan)
        };

        if success {
            self.stats.write().load_balancing_actions += 1;
            info!("dynamic load balancing completed successfully");
        } else {
            warn!("dynamic load balancing failed");
        }
        success
    }

    fn analyze_current_usage(&self) -> CurrentUsage {
        let workers = self.workers.read();
        let active = self.active_workers();

        let mut usage = CurrentUsage {
            total_workers: workers.len(),
            active_workers: active.len(),
            license_tier: self.license.as_ref().map(|l| l.plan),
            ..Default::default()
        };

        if !active.is_empty() {
            let loads: Vec<f64> = active.iter().map(|w| w.utilization()).collect();
            usage.average_load = loads.iter().sum::<f64>() / loads.len() as f64;
            usage.peak_load = loads.iter().cloned().fold(f64::MIN, f64::max);

            let total_load: f64 = active.iter().map(|w| w.current_load).sum();
            let total_capacity: f64 = active.iter().map(|w| w.capacity).sum();
            usage.resource_utilization = if total_capacity > 0.0 { total_load / total_capacity } else { 0.0 };
        }

        usage
    }

    /// Generates tier, performance, and cost recommendations from the
    /// current worker usage, stores them, and returns the priority-sorted
    /// list.
    pub fn generate_optimization_suggestions(&self) -> Vec<OptimizationRecommendation> {
        let usage = self.analyze_current_usage();
        let current_tier = self.license.as_ref().map(|l| l.plan).unwrap_or(Tier::Free);
        let recs = generate_optimization_suggestions(&usage, current_tier);

        let mut stats = self.stats.write();
        stats.recommendations_generated += recs.len() as u64;
        drop(stats);

        info!(count = recs.len(), "generated optimization recommendations");
        *self.recommendations.write() = recs.clone();
        recs
    }

    pub fn worker(&self, node_id: &str) -> Result<WorkerNode, OptimizerError> {
        self.workers
            .read()
            .get(node_id)
            .cloned()
            .ok_or_else(|| OptimizerError::UnknownWorker(node_id.to_string()))
    }

    pub fn worker_count(&self) -> usize {
        self.workers.read().len()
    }

    pub fn active_worker_count(&self) -> usize {
        self.active_workers().len()
    }

    /// Runs one full optimization pass: workload analysis, rebalancing, and
    /// recommendation generation.
    pub fn run_optimization_pass(&self, balancing_strategy: OptimizationStrategy) {
        self.analyze_workload_patterns(None);
        self.dynamic_load_balancing(balancing_strategy);
        self.generate_optimization_suggestions();

        let mut stats = self.stats.write();
        stats.total_optimizations += 1;
        stats.successful_optimizations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(id: &str, capacity: f64, load: f64) -> WorkerNode {
        let mut w = WorkerNode::new(id, capacity, 4);
        w.current_load = load;
        w
    }

    #[test]
    fn registering_and_updating_a_worker_tracks_its_state() {
        let optimizer = ResourceOptimizer::new(None);
        optimizer.register_worker(worker("w1", 100.0, 0.0));
        optimizer.update_worker_status("w1", 42.0, 1024);
        let w = optimizer.worker("w1").unwrap();
        assert_eq!(w.current_load, 42.0);
        assert_eq!(w.available_memory_mb, 1024);
    }

    #[test]
    fn unknown_worker_lookup_fails() {
        let optimizer = ResourceOptimizer::new(None);
        assert!(optimizer.worker("ghost").is_err());
    }

    #[test]
    fn single_active_worker_skips_load_balancing() {
        let optimizer = ResourceOptimizer::new(None);
        optimizer.register_worker(worker("w1", 100.0, 90.0));
        assert!(!optimizer.dynamic_load_balancing(OptimizationStrategy::Balanced));
    }

    #[test]
    fn analysis_with_no_samples_returns_random_pattern() {
        let optimizer = ResourceOptimizer::new(None);
        let analysis = optimizer.analyze_workload_patterns(None);
        assert_eq!(analysis.pattern_type, crate::types::WorkloadPattern::Random);
    }

    #[test]
    fn suggestions_reflect_free_tier_high_load_upgrade() {
        let optimizer = ResourceOptimizer::new(None);
        let mut w = worker("w1", 100.0, 95.0);
        w.last_heartbeat = Utc::now();
        optimizer.register_worker(w);
        let recs = optimizer.generate_optimization_suggestions();
        assert!(recs.iter().any(|r| r.action == "upgrade_to_pro"));
    }
}
