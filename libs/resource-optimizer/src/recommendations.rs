use std::collections::HashMap;

use chrono::Utc;
use tiktrue_license::Tier;
use uuid::Uuid;

use crate::types::{CurrentUsage, OptimizationRecommendation, OptimizationStrategy};

const HIGH_LOAD_THRESHOLD: f64 = 0.8;
const LOW_LOAD_THRESHOLD: f64 = 0.2;
const HIGH_PERFORMANCE_LOAD_THRESHOLD: f64 = 0.85;
const HIGH_UTILIZATION_THRESHOLD: f64 = 0.9;
const COST_LOW_LOAD_THRESHOLD: f64 = 0.3;
const CONSOLIDATION_WORKER_THRESHOLD: usize = 5;
const CONSOLIDATION_LOAD_THRESHOLD: f64 = 0.5;

fn recommendation(
    id_prefix: &str,
    strategy: OptimizationStrategy,
    action: &str,
    target_resources: &[&str],
    expected_improvement: f64,
    implementation_cost: f64,
    priority: u8,
    license_requirements: &[&str],
    description: &str,
    estimated_savings: &[(&str, f64)],
) -> OptimizationRecommendation {
    OptimizationRecommendation {
        recommendation_id: format!("{id_prefix}_{}", Uuid::new_v4()),
        strategy,
        action: action.to_string(),
        target_resources: target_resources.iter().map(|s| s.to_string()).collect(),
        expected_improvement,
        implementation_cost,
        priority,
        license_requirements: license_requirements.iter().map(|s| s.to_string()).collect(),
        description: description.to_string(),
        estimated_savings: estimated_savings.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        timestamp: Utc::now(),
    }
}

pub fn tier_recommendations(usage: &CurrentUsage, current_tier: Tier) -> Vec<OptimizationRecommendation> {
    let mut recs = Vec::new();

    if usage.average_load > HIGH_LOAD_THRESHOLD {
        match current_tier {
            Tier::Free => recs.push(recommendation(
                "tier_upgrade",
                OptimizationStrategy::LicenseAware,
                "upgrade_to_pro",
                &["license"],
                0.3,
                100.0,
                8,
                &["pro_features"],
                "Upgrade to PRO tier for better performance and more workers",
                &[("performance_gain", 30.0), ("capacity_increase", 500.0)],
            )),
            Tier::Pro => recs.push(recommendation(
                "tier_upgrade_ent",
                OptimizationStrategy::LicenseAware,
                "upgrade_to_enterprise",
                &["license"],
                0.5,
                500.0,
                9,
                &["enterprise_features"],
                "Upgrade to Enterprise tier for unlimited capacity",
                &[("performance_gain", 50.0), ("unlimited_capacity", 1000.0)],
            )),
            Tier::Ent => {}
        }
    } else if usage.average_load < LOW_LOAD_THRESHOLD {
        match current_tier {
            Tier::Ent => recs.push(recommendation(
                "tier_downgrade_pro",
                OptimizationStrategy::CostEfficient,
                "downgrade_to_pro",
                &["license"],
                0.0,
                -400.0,
                6,
                &[],
                "Downgrade to PRO tier to reduce costs while maintaining adequate capacity",
                &[("cost_savings", 400.0)],
            )),
            Tier::Pro => recs.push(recommendation(
                "tier_downgrade_free",
                OptimizationStrategy::CostEfficient,
                "downgrade_to_free",
                &["license"],
                0.0,
                -100.0,
                5,
                &[],
                "Downgrade to FREE tier for cost savings with low usage",
                &[("cost_savings", 100.0)],
            )),
            Tier::Free => {}
        }
    }

    recs
}

pub fn performance_recommendations(usage: &CurrentUsage) -> Vec<OptimizationRecommendation> {
    let mut recs = Vec::new();

    if usage.average_load > HIGH_PERFORMANCE_LOAD_THRESHOLD {
        recs.push(recommendation(
            "add_workers",
            OptimizationStrategy::Performance,
            "add_worker_nodes",
            &["workers"],
            0.4,
            50.0,
            7,
            &["worker_scaling"],
            "Add more worker nodes to handle high load",
            &[("latency_reduction", 25.0), ("throughput_increase", 40.0)],
        ));
    }

    if usage.resource_utilization > HIGH_UTILIZATION_THRESHOLD {
        recs.push(recommendation(
            "optimize_models",
            OptimizationStrategy::Performance,
            "optimize_model_loading",
            &["models"],
            0.2,
            20.0,
            6,
            &[],
            "Optimize model loading and caching for better resource utilization",
            &[("memory_savings", 15.0), ("load_time_reduction", 20.0)],
        ));
    }

    recs
}

pub fn cost_recommendations(usage: &CurrentUsage) -> Vec<OptimizationRecommendation> {
    let mut recs = Vec::new();

    if usage.average_load < COST_LOW_LOAD_THRESHOLD {
        recs.push(recommendation(
            "remove_idle_workers",
            OptimizationStrategy::CostEfficient,
            "remove_idle_workers",
            &["workers"],
            0.0,
            -30.0,
            5,
            &[],
            "Remove idle worker nodes to reduce operational costs",
            &[("cost_savings", 30.0)],
        ));
    }

    if usage.active_workers > CONSOLIDATION_WORKER_THRESHOLD && usage.average_load < CONSOLIDATION_LOAD_THRESHOLD {
        recs.push(recommendation(
            "consolidate_resources",
            OptimizationStrategy::CostEfficient,
            "consolidate_workloads",
            &["workers", "resources"],
            0.1,
            -25.0,
            4,
            &[],
            "Consolidate workloads onto fewer workers to reduce resource costs",
            &[("cost_savings", 25.0), ("efficiency_gain", 10.0)],
        ));
    }

    recs
}

/// Runs tier, performance, and cost recommendation generators and returns
/// the combined list sorted by priority, highest first.
pub fn generate_optimization_suggestions(
    usage: &CurrentUsage,
    current_tier: Tier,
) -> Vec<OptimizationRecommendation> {
    let mut recs = Vec::new();
    recs.extend(tier_recommendations(usage, current_tier));
    recs.extend(performance_recommendations(usage));
    recs.extend(cost_recommendations(usage));
    recs.sort_by(|a, b| b.priority.cmp(&a.priority));
    recs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_load_on_free_tier_recommends_pro_upgrade() {
        let usage = CurrentUsage { average_load: 0.9, ..Default::default() };
        let recs = tier_recommendations(&usage, Tier::Free);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].action, "upgrade_to_pro");
    }

    #[test]
    fn low_load_on_enterprise_tier_recommends_pro_downgrade() {
        let usage = CurrentUsage { average_load: 0.05, ..Default::default() };
        let recs = tier_recommendations(&usage, Tier::Ent);
        assert_eq!(recs[0].action, "downgrade_to_pro");
    }

    #[test]
    fn suggestions_are_sorted_by_priority_descending() {
        let usage = CurrentUsage {
            average_load: 0.9,
            resource_utilization: 0.95,
            active_workers: 10,
            ..Default::default()
        };
        let recs = generate_optimization_suggestions(&usage, Tier::Pro);
        let priorities: Vec<u8> = recs.iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
    }
}
