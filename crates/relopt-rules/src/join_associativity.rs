//! # Join Associativity Rule
//!
//! This rule implements the algebraic identity for inner joins:
//! `(A JOIN_1 B) JOIN_2 C = A JOIN_1 (B JOIN_2 C)`
//!
//! ## Why Associativity Matters
//!
//! Associativity changes the *shape* of the join tree (left-deep vs right-deep vs bushy).
//! Combined with commutativity, it enables exploring the full space of join orderings.
//! For a 3-table join `(A ⋈ B) ⋈ C`:
//! - Without associativity: only commutativity swaps are explored (A⋈B)⋈C vs C⋈(A⋈B).
//! - With associativity: the optimizer also considers A⋈(B⋈C), which may be much cheaper
//!   if B and C are small and A is large.
//!
//! ## Implementation
//!
//! The operand is `Join(Join, ..)`, so every binding is `[outer, inner]` where `inner` is
//! one member of the outer join's left input class. The new intermediate join `B ⋈ C` is
//! proposed as a nested expression. The memo registers it in a class of its own, or in
//! the class of an identical join some earlier firing already produced.
//!
//! ## Condition Handling
//!
//! For inner joins, predicates can be redistributed as long as each predicate sits on a
//! join where both sides' columns are available. The outer condition is split into:
//!
//! 1. **B-C predicates**: conjuncts whose columns all come from B and C. These move to
//!    the new inner join.
//! 2. **Remaining predicates**: conjuncts that reference A. These stay on the new outer
//!    join, together with the original inner condition.
//!
//! The rule only fires if there is at least one B-C predicate. Otherwise the new inner
//! join would be a cross join.
//!
//! ## Both Orientations
//!
//! - `(A ⋈₁ B) ⋈₂ C → A ⋈ (B ⋈ C)` when `cond₂` connects B and C
//! - `(A ⋈₁ B) ⋈₂ C → B ⋈ (A ⋈ C)` when `cond₂` connects A and C
//!
//! ## Applicability
//!
//! Inner joins only. Outer join associativity has ordering constraints
//! (`(A LEFT JOIN B) LEFT JOIN C ≠ A LEFT JOIN (B LEFT JOIN C)`).

use crate::support::{referenced_tables, tables_of};
use relopt_core::error::RuleError;
use relopt_core::expr::*;
use relopt_core::memo::{RelExpr, RelInput, SubsetRef};
use relopt_core::pattern::Operand;
use relopt_core::rule::{OnMatch, Rule, RuleCall};
use std::collections::HashSet;
use tracing::trace;

/// Join associativity: `(A ⋈₁ B) ⋈₂ C → A ⋈ (B ⋈ C)`.
pub struct JoinAssociativityRule;

impl JoinAssociativityRule {
    pub const NAME: &'static str = "JoinAssociativity";

    pub fn rule() -> Rule {
        Rule::transformation(
            Self::NAME,
            Operand::join().with_leading(vec![Operand::join()]),
            Self,
        )
    }
}

impl OnMatch for JoinAssociativityRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let (outer, inner) = (call.rel(0), call.rel(1));
        let Some(outer_cond) = inner_join_condition(&outer.op) else {
            return Ok(());
        };
        let Some(inner_cond) = inner_join_condition(&inner.op) else {
            return Ok(());
        };
        let ([_, c], [a, b]) = (outer.inputs.as_slice(), inner.inputs.as_slice()) else {
            return Ok(());
        };

        let memo = call.memo();
        let a_tables = tables_of(memo, a.set);
        let b_tables = tables_of(memo, b.set);
        let c_tables = tables_of(memo, c.set);

        let candidates = [
            try_reassociate(outer_cond, inner_cond, a, b, c, &b_tables, &c_tables),
            try_reassociate(outer_cond, inner_cond, b, a, c, &a_tables, &c_tables),
        ];
        for expr in candidates.into_iter().flatten() {
            trace!("reassociated {} over {}", outer.id, inner.id);
            call.transform_to(expr);
        }
        Ok(())
    }
}

fn inner_join_condition(op: &Operator) -> Option<&Expr> {
    match op {
        Operator::Logical(LogicalOp::Join {
            join_type: JoinType::Inner,
            condition,
        }) => Some(condition),
        _ => None,
    }
}

/// Attempt `(stay ⋈_inner_cond moved) ⋈_outer_cond c → stay ⋈ (moved ⋈ c)`.
///
/// Returns `None` when no conjunct of `outer_cond` connects `moved` with `c`.
fn try_reassociate(
    outer_cond: &Expr,
    inner_cond: &Expr,
    stay: &SubsetRef,
    moved: &SubsetRef,
    c: &SubsetRef,
    moved_tables: &HashSet<String>,
    c_tables: &HashSet<String>,
) -> Option<RelExpr> {
    let mut new_inner_preds = Vec::new();
    let mut remaining_outer_preds = Vec::new();

    for pred in outer_cond.conjuncts() {
        let tables = referenced_tables(pred);
        let only_moved_and_c = tables
            .iter()
            .all(|t| moved_tables.contains(t) || c_tables.contains(t));
        let has_moved = tables.iter().any(|t| moved_tables.contains(t));
        let has_c = tables.iter().any(|t| c_tables.contains(t));

        if only_moved_and_c && has_moved && has_c {
            new_inner_preds.push(pred.clone());
        } else {
            remaining_outer_preds.push(pred.clone());
        }
    }

    if new_inner_preds.is_empty() {
        return None;
    }

    // `moved` is still below the outer join, so the inner condition stays valid there.
    let mut outer_parts: Vec<Expr> = inner_cond.conjuncts().into_iter().cloned().collect();
    outer_parts.extend(remaining_outer_preds);

    let new_inner = RelExpr::logical(
        Operator::Logical(LogicalOp::Join {
            join_type: JoinType::Inner,
            condition: Expr::and_all(new_inner_preds),
        }),
        vec![RelInput::Subset(moved.clone()), RelInput::Subset(c.clone())],
    );
    Some(RelExpr::logical(
        Operator::Logical(LogicalOp::Join {
            join_type: JoinType::Inner,
            condition: Expr::and_all(outer_parts),
        }),
        vec![RelInput::Subset(stay.clone()), RelInput::expr(new_inner)],
    ))
}
