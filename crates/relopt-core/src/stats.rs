//! # Statistics
//!
//! Cardinality and size estimates consumed by the cost model. The engine derives them
//! lazily, once per equivalence class, from a representative member: all members of a
//! class compute the same result, so any one of them will do.
//!
//! ## Derivation Formulas
//!
//! - **Filter**: `rows = input_rows * selectivity`; column NDVs scale with the row ratio.
//! - **Join**: `rows = |L| * |R| / max(NDV(L.key), NDV(R.key))` per equi-join key pair.
//! - **Aggregate**: product of group-by NDVs, capped by input rows.
//!
//! ## Selectivity
//!
//! - Equality against a column: `1 / NDV`.
//! - Range comparisons: 1/3.
//! - Conjunction: product (independence). Disjunction: inclusion-exclusion.
//! - Anything else: [`DEFAULT_FILTER_SELECTIVITY`].

use crate::expr::{BinaryOp, Expr, ScalarValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default filter selectivity when nothing better is known.
pub const DEFAULT_FILTER_SELECTIVITY: f64 = 0.1;

/// Selectivity of range comparisons.
pub const RANGE_SELECTIVITY: f64 = 0.33;

/// Statistics of a relation (or of an equivalence class).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub row_count: f64,
    pub total_size_bytes: f64,
    pub column_stats: HashMap<String, ColumnStatistics>,
}

impl Statistics {
    pub fn new(row_count: f64, total_size_bytes: f64) -> Self {
        Self {
            row_count,
            total_size_bytes,
            column_stats: HashMap::new(),
        }
    }

    /// Fallback used when a table is unknown to the catalog.
    pub fn unknown() -> Self {
        Self::new(1000.0, 100_000.0)
    }

    pub fn with_column(mut self, name: impl Into<String>, stats: ColumnStatistics) -> Self {
        self.column_stats.insert(name.into(), stats);
        self
    }

    /// Average row width in bytes.
    pub fn avg_row_size(&self) -> f64 {
        if self.row_count > 0.0 {
            self.total_size_bytes / self.row_count
        } else {
            100.0
        }
    }
}

/// Per-column statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    /// Number of distinct values.
    pub distinct_count: f64,
    /// Fraction of NULLs in `[0, 1]`.
    pub null_fraction: f64,
    pub min_value: Option<ScalarValue>,
    pub max_value: Option<ScalarValue>,
}

impl ColumnStatistics {
    pub fn new(distinct_count: f64, null_fraction: f64) -> Self {
        Self {
            distinct_count,
            null_fraction,
            min_value: None,
            max_value: None,
        }
    }
}

/// Statistics of an equi-join output.
///
/// Missing NDVs fall back to the side's row count (all values distinct).
pub fn derive_join_stats(
    left: &Statistics,
    right: &Statistics,
    join_columns: &[(String, String)],
) -> Statistics {
    let mut selectivity = 1.0_f64;
    for (left_col, right_col) in join_columns {
        let left_ndv = left
            .column_stats
            .get(left_col)
            .map(|s| s.distinct_count)
            .unwrap_or(left.row_count);
        let right_ndv = right
            .column_stats
            .get(right_col)
            .map(|s| s.distinct_count)
            .unwrap_or(right.row_count);
        selectivity /= left_ndv.max(right_ndv).max(1.0);
    }

    let row_count = (left.row_count * right.row_count * selectivity).max(1.0);
    let total_size_bytes = row_count * (left.avg_row_size() + right.avg_row_size());

    // NDV can never exceed the output row count.
    let column_stats = left
        .column_stats
        .iter()
        .chain(right.column_stats.iter())
        .map(|(name, cs)| {
            let mut cs = cs.clone();
            cs.distinct_count = cs.distinct_count.min(row_count);
            (name.clone(), cs)
        })
        .collect();

    Statistics {
        row_count,
        total_size_bytes,
        column_stats,
    }
}

/// Statistics of a filter output under the given selectivity.
pub fn derive_filter_stats(input: &Statistics, selectivity: f64) -> Statistics {
    let row_count = (input.row_count * selectivity).max(1.0);
    let ratio = if input.row_count > 0.0 {
        row_count / input.row_count
    } else {
        1.0
    };

    let column_stats = input
        .column_stats
        .iter()
        .map(|(name, cs)| {
            let mut cs = cs.clone();
            cs.distinct_count = (cs.distinct_count * ratio).max(1.0).min(row_count);
            (name.clone(), cs)
        })
        .collect();

    Statistics {
        row_count,
        total_size_bytes: input.total_size_bytes * ratio,
        column_stats,
    }
}

/// Statistics of an aggregate output. A global aggregate yields one row.
pub fn derive_aggregate_stats(input: &Statistics, group_by_cols: &[String]) -> Statistics {
    let groups: f64 = group_by_cols
        .iter()
        .map(|col| {
            input
                .column_stats
                .get(col)
                .map(|s| s.distinct_count)
                .unwrap_or(input.row_count)
        })
        .product();
    let row_count = groups.min(input.row_count).max(1.0);

    Statistics {
        row_count,
        total_size_bytes: row_count * 100.0,
        column_stats: HashMap::new(),
    }
}

/// `1 / NDV` for an equality predicate on `col_name`.
pub fn equality_selectivity(stats: &Statistics, col_name: &str) -> f64 {
    stats
        .column_stats
        .get(col_name)
        .map(|cs| 1.0 / cs.distinct_count.max(1.0))
        .unwrap_or(DEFAULT_FILTER_SELECTIVITY)
}

/// Estimated fraction of rows of `stats` passing `predicate`.
pub fn estimate_selectivity(predicate: &Expr, stats: &Statistics) -> f64 {
    match predicate {
        Expr::BinaryOp {
            op: BinaryOp::Eq,
            left,
            right,
        } => match (left.as_ref(), right.as_ref()) {
            (Expr::Column(c), _) | (_, Expr::Column(c)) => equality_selectivity(stats, &c.name),
            _ => DEFAULT_FILTER_SELECTIVITY,
        },
        Expr::BinaryOp {
            op: BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq,
            ..
        } => RANGE_SELECTIVITY,
        Expr::Literal(ScalarValue::Bool(true)) => 1.0,
        Expr::And(conjuncts) => conjuncts
            .iter()
            .map(|c| estimate_selectivity(c, stats))
            .product(),
        Expr::Or(disjuncts) => {
            let miss: f64 = disjuncts
                .iter()
                .map(|d| 1.0 - estimate_selectivity(d, stats))
                .product();
            1.0 - miss
        }
        _ => DEFAULT_FILTER_SELECTIVITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Statistics {
        Statistics::new(1000.0, 100_000.0)
            .with_column("customer_id", ColumnStatistics::new(100.0, 0.0))
    }

    #[test]
    fn test_join_cardinality_uses_max_ndv() {
        let customers = Statistics::new(100.0, 10_000.0)
            .with_column("id", ColumnStatistics::new(100.0, 0.0));
        let joined = derive_join_stats(
            &orders(),
            &customers,
            &[("customer_id".into(), "id".into())],
        );
        assert_eq!(joined.row_count, 1000.0);
        assert_eq!(joined.total_size_bytes, 1000.0 * 200.0);
    }

    #[test]
    fn test_filter_scales_rows_and_ndv() {
        let out = derive_filter_stats(&orders(), 0.1);
        assert_eq!(out.row_count, 100.0);
        assert_eq!(out.column_stats["customer_id"].distinct_count, 10.0);
    }

    #[test]
    fn test_global_aggregate_is_one_row() {
        assert_eq!(derive_aggregate_stats(&orders(), &[]).row_count, 1.0);
        let grouped = derive_aggregate_stats(&orders(), &["customer_id".into()]);
        assert_eq!(grouped.row_count, 100.0);
    }

    #[test]
    fn test_selectivity_of_compound_predicates() {
        let stats = orders();
        let eq = Expr::equals(
            Expr::column("o", "customer_id"),
            Expr::literal(ScalarValue::Int64(7)),
        );
        assert_eq!(estimate_selectivity(&eq, &stats), 0.01);

        let both = Expr::And(vec![eq.clone(), eq.clone()]);
        assert!((estimate_selectivity(&both, &stats) - 0.0001).abs() < 1e-12);

        let either = Expr::Or(vec![eq.clone(), eq]);
        assert!((estimate_selectivity(&either, &stats) - 0.0199).abs() < 1e-12);
    }
}
