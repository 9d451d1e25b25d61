//! # Cost Model
//!
//! The engine consumes a cost model only through the [`CostModel`] trait and uses the
//! result for one thing: comparing candidate realizations of the same subset. The model
//! must be a pure function of the operator, the statistics of its output and inputs,
//! and the already-resolved costs of its inputs.
//!
//! ## Default Model
//!
//! `DefaultCostModel` collapses three dimensions into a single scalar:
//!
//! ```text
//! total = cpu_weight * cpu + memory_weight * memory + network_weight * network
//! ```
//!
//! Costs are additive: a node's cost is its local cost plus the costs of its inputs.

use crate::expr::*;
use crate::stats::Statistics;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Scalar cost. Lower is better.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cost {
    /// `f64::MAX` stands for infinity (not costed or infeasible).
    pub total: f64,
}

impl Cost {
    pub fn zero() -> Self {
        Self { total: 0.0 }
    }

    pub fn new(total: f64) -> Self {
        Self { total }
    }

    pub fn infinite() -> Self {
        Self { total: f64::MAX }
    }

    pub fn is_infinite(&self) -> bool {
        self.total == f64::MAX
    }

    /// Strictly cheaper, beyond floating-point noise.
    pub fn is_lt(&self, other: &Cost) -> bool {
        self.total < other.total && *self != *other
    }
}

/// Relative tolerance of cost equality.
const COST_TOLERANCE: f64 = 1e-9;

/// Equality within a relative tolerance, so the same plan summed in a different order
/// still ties.
impl PartialEq for Cost {
    fn eq(&self, other: &Self) -> bool {
        if self.total == other.total {
            return true;
        }
        let scale = self.total.abs().max(other.total.abs()).max(1.0);
        (self.total - other.total).abs() <= COST_TOLERANCE * scale
    }
}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        self.total.partial_cmp(&other.total)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            write!(f, "inf")
        } else {
            write!(f, "{:.1}", self.total)
        }
    }
}

/// Pluggable cost model.
pub trait CostModel: Send + Sync {
    /// Total cost of `op` given the statistics of its output (`stats`), of each input,
    /// and the best known cost of each input.
    fn compute_cost(
        &self,
        op: &PhysicalOp,
        stats: &Statistics,
        input_stats: &[&Statistics],
        input_costs: &[Cost],
    ) -> Cost;
}

/// CPU / memory / network weighted model. Network defaults to ten times CPU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultCostModel {
    pub cpu_weight: f64,
    pub memory_weight: f64,
    pub network_weight: f64,
}

impl Default for DefaultCostModel {
    fn default() -> Self {
        Self {
            cpu_weight: 1.0,
            memory_weight: 1.0,
            network_weight: 10.0,
        }
    }
}

impl CostModel for DefaultCostModel {
    fn compute_cost(
        &self,
        op: &PhysicalOp,
        stats: &Statistics,
        input_stats: &[&Statistics],
        input_costs: &[Cost],
    ) -> Cost {
        let inputs_total: f64 = input_costs.iter().map(|c| c.total).sum();
        let first = input_stats.first().copied().unwrap_or(stats);

        let local = match op {
            PhysicalOp::SeqScan { .. } => self.cpu_weight * stats.row_count,
            // Per-row evaluation of the predicate or projection list.
            PhysicalOp::Filter { .. } | PhysicalOp::Project { .. } => {
                self.cpu_weight * first.row_count
            }
            PhysicalOp::HashJoin { build_side, .. } => {
                let [left, right] = two_inputs(input_stats, stats);
                let (build, probe) = match build_side {
                    BuildSide::Left => (left, right),
                    BuildSide::Right => (right, left),
                };
                self.cpu_weight * build.row_count
                    + self.memory_weight * build.total_size_bytes
                    + self.cpu_weight * probe.row_count
            }
            PhysicalOp::MergeJoin { .. } => {
                let [left, right] = two_inputs(input_stats, stats);
                self.cpu_weight * (left.row_count + right.row_count)
            }
            PhysicalOp::NestedLoopJoin { .. } => {
                let [left, right] = two_inputs(input_stats, stats);
                self.cpu_weight * left.row_count * right.row_count
            }
            PhysicalOp::HashAggregate { .. } => {
                self.cpu_weight * first.row_count + self.memory_weight * stats.total_size_bytes
            }
            PhysicalOp::SortOp { .. } => {
                let rows = first.row_count;
                let n_log_n = if rows > 1.0 { rows * rows.log2() } else { 1.0 };
                self.cpu_weight * n_log_n + self.memory_weight * first.total_size_bytes
            }
            PhysicalOp::Exchange { .. } => self.network_weight * first.total_size_bytes,
            PhysicalOp::Limit { count, .. } => self.cpu_weight * (*count as f64).min(first.row_count),
        };

        Cost::new(inputs_total + local)
    }
}

fn two_inputs<'a>(input_stats: &[&'a Statistics], fallback: &'a Statistics) -> [&'a Statistics; 2] {
    match input_stats {
        [l, r, ..] => [*l, *r],
        [only] => [*only, fallback],
        [] => [fallback, fallback],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join_op(build_side: BuildSide) -> PhysicalOp {
        PhysicalOp::HashJoin {
            join_type: JoinType::Inner,
            build_side,
            condition: Expr::literal(ScalarValue::Bool(true)),
        }
    }

    #[test]
    fn test_hash_join_prefers_small_build_side() {
        let model = DefaultCostModel::default();
        let small = Statistics::new(100.0, 10_000.0);
        let large = Statistics::new(1_000_000.0, 100_000_000.0);
        let out = Statistics::new(1_000.0, 100_000.0);
        let zeros = [Cost::zero(), Cost::zero()];

        let build_small = model.compute_cost(&join_op(BuildSide::Left), &out, &[&small, &large], &zeros);
        let build_large = model.compute_cost(&join_op(BuildSide::Right), &out, &[&small, &large], &zeros);
        assert!(build_small < build_large);
    }

    #[test]
    fn test_costs_are_additive() {
        let model = DefaultCostModel::default();
        let stats = Statistics::new(10.0, 1000.0);
        let filter = PhysicalOp::Filter {
            predicate: Expr::literal(ScalarValue::Bool(true)),
        };
        let cost = model.compute_cost(&filter, &stats, &[&stats], &[Cost::new(5.0)]);
        assert_eq!(cost, Cost::new(15.0));
    }

    #[test]
    fn test_summation_order_does_not_break_ties() {
        let parts = [0.1, 1_234.567, 98_765.4321, 0.3];
        let forward = parts.iter().fold(0.0, |acc, p| acc + p);
        let backward = parts.iter().rev().fold(0.0, |acc, p| acc + p);
        assert_eq!(Cost::new(forward), Cost::new(backward));
        assert!(!Cost::new(forward).is_lt(&Cost::new(backward)));

        assert_eq!(Cost::new(1e6), Cost::new(1e6 + 1e-4));
        assert!(Cost::new(1e6).is_lt(&Cost::new(1e6 + 1.0)));
        assert_ne!(Cost::new(1e6), Cost::infinite());
    }

    #[test]
    fn test_cost_ordering() {
        assert!(Cost::new(1.0).is_lt(&Cost::new(2.0)));
        assert!(!Cost::new(2.0).is_lt(&Cost::new(2.0)));
        assert!(Cost::zero() < Cost::infinite());
        assert!(Cost::infinite().is_infinite());
        assert_eq!(Cost::new(3.0).to_string(), "3.0");
    }
}
