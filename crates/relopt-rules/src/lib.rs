//! # Built-in Optimization Rules
//!
//! This crate provides a default set of rules for the `relopt-core` search engine. Every
//! rule is a unit struct implementing [`OnMatch`](relopt_core::rule::OnMatch) with a
//! `rule()` constructor that pairs it with its name and operand. Rules are divided into
//! two categories:
//!
//! ## Transformation Rules (Logical -> Logical)
//!
//! These rules expand the search space by generating equivalent logical alternatives:
//!
//! - **`JoinCommutativityRule`**: Swaps the sides of inner and cross joins
//!   (A JOIN B -> B JOIN A). Enables the cost model to choose which side is smaller.
//! - **`JoinAssociativityRule`**: Changes join grouping
//!   ((A JOIN B) JOIN C -> A JOIN (B JOIN C)).
//! - **`PredicatePushdownRule`**: Merges filter predicates into join conditions,
//!   enabling earlier data reduction.
//! - **`ProjectionPushdownRule`**: Pushes column requirements into table scans,
//!   reducing the amount of data read from storage.
//!
//! ## Implementation Rules (Logical -> Physical)
//!
//! These rules produce physical operator alternatives that the cost model scores:
//!
//! - **`TableAccessRule`**: Asks the catalog what a table-access placeholder becomes.
//! - **`ImplSeqScanRule`**: Implements a scan as a sequential (full) table scan.
//! - **`ImplFilterRule`**, **`ImplProjectRule`**, **`ImplLimitRule`**: One-to-one
//!   physical counterparts.
//! - **`ImplHashJoinRule`**: Implements a join as a hash join (build-left and build-right).
//! - **`ImplMergeJoinRule`**: Implements a join as a merge join (inner equi-joins only).
//! - **`ImplNestedLoopJoinRule`**: Implements a join as a nested loop join (universal fallback).
//! - **`ImplHashAggregateRule`**: Implements aggregation using a hash table.
//! - **`ImplSortRule`**: Implements a logical sort as a physical sort operator.
//!
//! Sort and exchange enforcers for required input traits are added by the search itself
//! and need no rule.

pub mod enforcer;
pub mod impl_agg;
pub mod impl_join;
pub mod impl_scan;
pub mod impl_unary;
pub mod join_associativity;
pub mod join_commutativity;
pub mod predicate_pushdown;
pub mod projection_pushdown;
pub mod support;
pub mod table_access;

use relopt_core::rule::Rule;

/// All built-in rules, transformations first.
///
/// Registration order is the tie-break order of the first-in-first-out discipline, so
/// logical exploration is queued ahead of implementation for the same node.
pub fn default_rule_set() -> Vec<Rule> {
    vec![
        // Transformation rules: expand the logical search space.
        join_commutativity::JoinCommutativityRule::rule(),
        join_associativity::JoinAssociativityRule::rule(),
        predicate_pushdown::PredicatePushdownRule::rule(),
        projection_pushdown::ProjectionPushdownRule::rule(),
        // Implementation rules: map logical operators to physical alternatives.
        table_access::TableAccessRule::rule(),
        impl_scan::ImplSeqScanRule::rule(),
        impl_unary::ImplFilterRule::rule(),
        impl_unary::ImplProjectRule::rule(),
        impl_unary::ImplLimitRule::rule(),
        impl_join::ImplHashJoinRule::rule(),
        impl_join::ImplMergeJoinRule::rule(),
        impl_join::ImplNestedLoopJoinRule::rule(),
        impl_agg::ImplHashAggregateRule::rule(),
        enforcer::ImplSortRule::rule(),
    ]
}

/// Fire a rule against a hand-built memo without a search around it.
#[cfg(test)]
pub(crate) mod testing {
    use relopt_core::catalog::Catalog;
    use relopt_core::error::RuleError;
    use relopt_core::expr::*;
    use relopt_core::memo::{Memo, NodeId, SubsetRef};
    use relopt_core::rule::{OptContext, Proposal, Rule, RuleCall};
    use relopt_core::traits::TraitSet;

    pub fn fire(
        rule: &Rule,
        memo: &Memo,
        catalog: &dyn Catalog,
        binding: &[NodeId],
    ) -> Result<Vec<Proposal>, RuleError> {
        let ctx = OptContext { catalog };
        let mut call = RuleCall::new(rule.name(), memo, ctx, binding);
        rule.fire(&mut call)?;
        Ok(call.into_proposals())
    }

    pub fn leaf(memo: &mut Memo, op: Operator) -> NodeId {
        let traits = if op.is_physical() {
            TraitSet::physical()
        } else {
            TraitSet::any()
        };
        memo.add_node(op, traits, vec![], None).node
    }

    pub fn node(memo: &mut Memo, op: Operator, inputs: &[NodeId]) -> NodeId {
        let inputs = inputs
            .iter()
            .map(|&n| SubsetRef::new(memo.set_of(n), TraitSet::any()))
            .collect();
        memo.add_node(op, TraitSet::any(), inputs, None).node
    }

    pub fn scan(name: &str) -> Operator {
        Operator::Logical(LogicalOp::Scan {
            table: TableRef::new("s", name),
            columns: vec![],
            predicate: None,
        })
    }

    pub fn equi(lt: &str, lc: &str, rt: &str, rc: &str) -> Expr {
        Expr::equals(Expr::column(lt, lc), Expr::column(rt, rc))
    }
}
