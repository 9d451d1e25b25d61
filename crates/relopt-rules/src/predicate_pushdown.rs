//! # Predicate Pushdown Rule
//!
//! When a Filter sits on top of a Join, this rule merges the filter predicate into
//! the join condition, so the join evaluates it while joining instead of in a separate
//! pass afterward.
//!
//! ```text
//! Before: Filter(pred, Join(A, B, cond))
//! After:  Join(A, B, cond AND pred)
//! ```
//!
//! ## Memo-Based Approach
//!
//! The rule does not restructure anything. It proposes the merged join as a new member
//! of the Filter's class. The original Filter-over-Join stays in the memo as an
//! alternative, and the cost model chooses.
//!
//! ## Applicability
//!
//! Only inner and cross joins. Moving a predicate into an outer join's condition turns
//! rows it should have removed into null-extended rows. A cross join with a merged
//! predicate becomes an inner join.

use crate::support::same_inputs;
use relopt_core::error::RuleError;
use relopt_core::expr::*;
use relopt_core::memo::RelExpr;
use relopt_core::pattern::Operand;
use relopt_core::rule::{OnMatch, Rule, RuleCall};

/// Push filter predicates into join conditions.
pub struct PredicatePushdownRule;

impl PredicatePushdownRule {
    pub const NAME: &'static str = "PredicatePushdown";

    pub fn rule() -> Rule {
        Rule::transformation(Self::NAME, Operand::filter_join(), Self)
    }
}

impl OnMatch for PredicatePushdownRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let (filter, join) = (call.rel(0), call.rel(1));
        let Operator::Logical(LogicalOp::Filter { predicate }) = &filter.op else {
            return Err(RuleError::UnexpectedBinding(filter.op.to_string()));
        };
        let Operator::Logical(LogicalOp::Join {
            join_type,
            condition,
        }) = &join.op
        else {
            return Err(RuleError::UnexpectedBinding(join.op.to_string()));
        };

        let join_type = match join_type {
            JoinType::Inner | JoinType::Cross => JoinType::Inner,
            _ => return Ok(()),
        };

        let mut conjuncts: Vec<Expr> = if has_condition(condition) {
            condition.conjuncts().into_iter().cloned().collect()
        } else {
            Vec::new()
        };
        for conjunct in predicate.conjuncts() {
            if !conjuncts.contains(conjunct) {
                conjuncts.push(conjunct.clone());
            }
        }

        call.transform_to(RelExpr::new(
            Operator::Logical(LogicalOp::Join {
                join_type,
                condition: Expr::and_all(conjuncts),
            }),
            join.traits.clone(),
            same_inputs(join),
        ));
        Ok(())
    }
}

/// A literal `true` is how a cross join spells "no condition".
fn has_condition(condition: &Expr) -> bool {
    !matches!(condition, Expr::Literal(ScalarValue::Bool(true)))
}
