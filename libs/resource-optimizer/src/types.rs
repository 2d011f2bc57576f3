use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tiktrue_license::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStrategy {
    Balanced,
    Performance,
    CostEfficient,
    LicenseAware,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadPattern {
    Steady,
    Bursty,
    Periodic,
    Random,
    Declining,
    Growing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerNode {
    pub node_id: String,
    pub capacity: f64,
    pub current_load: f64,
    pub available_memory_mb: u64,
    pub cpu_cores: u32,
    pub gpu_available: bool,
    pub models_loaded: Vec<String>,
    pub last_heartbeat: DateTime<Utc>,
    pub license_tier: Tier,
    pub performance_score: f64,
}

impl WorkerNode {
    pub fn new(node_id: impl Into<String>, capacity: f64, cpu_cores: u32) -> Self {
        Self {
            node_id: node_id.into(),
            capacity,
            current_load: 0.0,
            available_memory_mb: 0,
            cpu_cores,
            gpu_available: false,
            models_loaded: Vec::new(),
            last_heartbeat: Utc::now(),
            license_tier: Tier::Free,
            performance_score: 1.0,
        }
    }

    pub fn utilization(&self) -> f64 {
        if self.capacity > 0.0 {
            self.current_load / self.capacity
        } else {
            0.0
        }
    }

    /// A worker is active if its last heartbeat is within the last two minutes.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now - self.last_heartbeat < Duration::seconds(120)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadAnalysis {
    pub pattern_type: WorkloadPattern,
    pub confidence: f64,
    pub peak_hours: Vec<u32>,
    pub average_load: f64,
    pub peak_load: f64,
    pub load_variance: f64,
    pub trend_direction: TrendDirection,
    pub recommendations: Vec<String>,
    pub analysis_period_secs: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRecommendation {
    pub recommendation_id: String,
    pub strategy: OptimizationStrategy,
    pub action: String,
    pub target_resources: Vec<String>,
    pub expected_improvement: f64,
    pub implementation_cost: f64,
    pub priority: u8,
    pub license_requirements: Vec<String>,
    pub description: String,
    pub estimated_savings: HashMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkloadSample {
    pub timestamp: DateTime<Utc>,
    pub load: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancingAction {
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancingPlan {
    pub strategy: OptimizationStrategy,
    pub actions: Vec<BalancingAction>,
    pub expected_improvement: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentUsage {
    pub total_workers: usize,
    pub active_workers: usize,
    pub average_load: f64,
    pub peak_load: f64,
    pub resource_utilization: f64,
    pub license_tier: Option<Tier>,
}
