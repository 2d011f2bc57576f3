use std::collections::HashMap;

use crate::types::{BalancingAction, BalancingPlan, OptimizationStrategy, WorkerNode};

const REBALANCE_THRESHOLD: f64 = 0.3;
const OVERLOADED_THRESHOLD: f64 = 0.8;
const UNDERLOADED_THRESHOLD: f64 = 0.5;
const COST_EFFICIENT_TARGET_THRESHOLD: f64 = 0.4;
const LICENSE_AWARE_MAX_MOVE: f64 = 0.2;
const PERFORMANCE_MAX_MOVE: f64 = 0.3;
const COST_EFFICIENT_MAX_MOVE: f64 = 0.25;
const BALANCED_MAX_MOVE: f64 = 0.2;
const OVERLOADED_FLOOR: f64 = 0.7;
const PERFORMANCE_FLOOR: f64 = 0.6;
const EXPECTED_IMPROVEMENT_PER_ACTION: f64 = 0.1;

pub fn load_distribution(workers: &[WorkerNode]) -> HashMap<String, f64> {
    workers.iter().map(|w| (w.node_id.clone(), w.utilization())).collect()
}

/// Rebalancing is needed when the spread between the most and least
/// utilized worker exceeds 30 percentage points of capacity.
pub fn needs_rebalancing(distribution: &HashMap<String, f64>) -> bool {
    if distribution.len() < 2 {
        return false;
    }
    let max_load = distribution.values().cloned().fold(f64::MIN, f64::max);
    let min_load = distribution.values().cloned().fold(f64::MAX, f64::min);
    (max_load - min_load) > REBALANCE_THRESHOLD
}

pub fn generate_balancing_plan(
    workers: &[WorkerNode],
    strategy: OptimizationStrategy,
) -> Option<BalancingPlan> {
    if workers.len() < 2 {
        return None;
    }

    let overloaded: Vec<&WorkerNode> =
        workers.iter().filter(|w| w.utilization() > OVERLOADED_THRESHOLD).collect();
    let underloaded: Vec<&WorkerNode> =
        workers.iter().filter(|w| w.utilization() < UNDERLOADED_THRESHOLD).collect();

    if overloaded.is_empty() || underloaded.is_empty() {
        return None;
    }

    let actions = match strategy {
        OptimizationStrategy::LicenseAware => license_aware_actions(&overloaded, &underloaded),
        OptimizationStrategy::Performance => performance_actions(&overloaded, &underloaded),
        OptimizationStrategy::CostEfficient => cost_efficient_actions(&overloaded, &underloaded),
        OptimizationStrategy::Balanced => balanced_actions(&overloaded, &underloaded),
    };

    if actions.is_empty() {
        return None;
    }

    let expected_improvement = actions.len() as f64 * EXPECTED_IMPROVEMENT_PER_ACTION;
    Some(BalancingPlan { strategy, actions, expected_improvement })
}

fn license_aware_actions(overloaded: &[&WorkerNode], underloaded: &[&WorkerNode]) -> Vec<BalancingAction> {
    let mut overloaded_sorted: Vec<&&WorkerNode> = overloaded.iter().collect();
    overloaded_sorted.sort_by(|a, b| b.license_tier.cmp(&a.license_tier));
    let mut underloaded_sorted: Vec<&&WorkerNode> = underloaded.iter().collect();
    underloaded_sorted.sort_by(|a, b| b.license_tier.cmp(&a.license_tier));

    let mut actions = Vec::new();
    for from in &overloaded_sorted {
        for to in &underloaded_sorted {
            if to.license_tier >= from.license_tier {
                actions.push(BalancingAction {
                    from: from.node_id.clone(),
                    to: to.node_id.clone(),
                    amount: (from.current_load - OVERLOADED_FLOOR).min(LICENSE_AWARE_MAX_MOVE),
                    reason: "license_tier_compatibility".to_string(),
                });
                break;
            }
        }
    }
    actions
}

fn performance_actions(overloaded: &[&WorkerNode], underloaded: &[&WorkerNode]) -> Vec<BalancingAction> {
    let mut underloaded_sorted: Vec<&&WorkerNode> = underloaded.iter().collect();
    underloaded_sorted.sort_by(|a, b| b.performance_score.partial_cmp(&a.performance_score).unwrap_or(std::cmp::Ordering::Equal));

    let Some(best_target) = underloaded_sorted.first() else {
        return Vec::new();
    };

    overloaded
        .iter()
        .map(|from| BalancingAction {
            from: from.node_id.clone(),
            to: best_target.node_id.clone(),
            amount: (from.current_load - PERFORMANCE_FLOOR).min(PERFORMANCE_MAX_MOVE),
            reason: "performance_optimization".to_string(),
        })
        .collect()
}

fn cost_efficient_actions(overloaded: &[&WorkerNode], underloaded: &[&WorkerNode]) -> Vec<BalancingAction> {
    let mut actions = Vec::new();
    for from in overloaded {
        for to in underloaded {
            if to.utilization() < COST_EFFICIENT_TARGET_THRESHOLD {
                actions.push(BalancingAction {
                    from: from.node_id.clone(),
                    to: to.node_id.clone(),
                    amount: (from.current_load - OVERLOADED_FLOOR).min(COST_EFFICIENT_MAX_MOVE),
                    reason: "cost_efficiency".to_string(),
                });
                break;
            }
        }
    }
    actions
}

fn balanced_actions(overloaded: &[&WorkerNode], underloaded: &[&WorkerNode]) -> Vec<BalancingAction> {
    if underloaded.is_empty() {
        return Vec::new();
    }
    overloaded
        .iter()
        .enumerate()
        .map(|(i, from)| {
            let to = underloaded[i % underloaded.len()];
            BalancingAction {
                from: from.node_id.clone(),
                to: to.node_id.clone(),
                amount: (from.current_load - OVERLOADED_FLOOR).min(BALANCED_MAX_MOVE),
                reason: "load_balancing".to_string(),
            }
        })
        .collect()
}

/// Applies a balancing plan's moves to `workers` in place, clamping each
/// worker's load to `[0, capacity]`. Returns `true` if more than half of
/// the actions found both endpoints registered and were applied.
pub fn execute_balancing_plan(workers: &mut HashMap<String, WorkerNode>, plan: &BalancingPlan) -> bool {
    if plan.actions.is_empty() {
        return false;
    }

    let mut successful = 0usize;
    for action in &plan.actions {
        let (Some(from_capacity), Some(from_load)) = (
            workers.get(&action.from).map(|w| w.capacity),
            workers.get(&action.from).map(|w| w.current_load),
        ) else {
            continue;
        };
        if !workers.contains_key(&action.to) {
            continue;
        }

        let load_amount = action.amount * from_capacity;

        if let Some(from) = workers.get_mut(&action.from) {
            from.current_load = (from_load - load_amount).max(0.0);
        }
        if let Some(to) = workers.get_mut(&action.to) {
            to.current_load = (to.current_load + load_amount).min(to.capacity);
        }
        successful += 1;
    }

    let success_rate = successful as f64 / plan.actions.len() as f64;
    success_rate > 0.5
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
    fn single_worker_never_needs_rebalancing() {
        let dist = load_distribution(&[worker("a", 100.0, 90.0)]);
        assert!(!needs_rebalancing(&dist));
    }

    #[test]
    fn large_imbalance_triggers_rebalancing() {
        let workers = vec![worker("a", 100.0, 95.0), worker("b", 100.0, 10.0)];
        let dist = load_distribution(&workers);
        assert!(needs_rebalancing(&dist));
    }

    #[test]
    fn balanced_strategy_moves_load_round_robin() {
        let workers = vec![
            worker("over1", 100.0, 90.0),
            worker("over2", 100.0, 95.0),
            worker("under1", 100.0, 10.0),
        ];
        let plan = generate_balancing_plan(&workers, OptimizationStrategy::Balanced).unwrap();
        assert_eq!(plan.actions.len(), 2);
        assert!(plan.actions.iter().all(|a| a.to == "under1"));
    }

    #[test]
    fn executing_a_plan_clamps_load_within_capacity() {
        let mut workers: HashMap<String, WorkerNode> = HashMap::new();
        workers.insert("a".to_string(), worker("a", 100.0, 90.0));
        workers.insert("b".to_string(), worker("b", 100.0, 10.0));
        let plan = BalancingPlan {
            strategy: OptimizationStrategy::Balanced,
            actions: vec![BalancingAction {
                from: "a".to_string(),
                to: "b".to_string(),
                amount: 0.5,
                reason: "test".to_string(),
            }],
            expected_improvement: 0.1,
        };
        let success = execute_balancing_plan(&mut workers, &plan);
        assert!(success);
        assert!(workers["a"].current_load >= 0.0);
        assert!(workers["b"].current_load <= 100.0);
    }
}
