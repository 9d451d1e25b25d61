//! # Join Commutativity Rule
//!
//! This rule implements the algebraic identity: `A JOIN B = B JOIN A` for symmetric
//! join types (inner joins and cross joins).
//!
//! ## Why Commutativity Matters
//!
//! The order of join inputs affects performance. A hash join should build on the
//! smaller relation, and a nested loop join should iterate the smaller one in the
//! inner loop. Commutativity lets the cost model see both orientations. Combined with
//! associativity it reaches every join ordering of a multi-table query.
//!
//! ## Applicability
//!
//! Only `Inner` and `Cross` joins are commuted. Left, Right, Semi and Anti joins have
//! fixed left/right semantics.
//!
//! ## Termination
//!
//! Commuting the commuted join gives back the original, which the memo already holds,
//! so the pair of firings adds exactly one member to the class and stops.
//!
//! ## Condition Swapping
//!
//! When swapping `A.x = B.y` to `B.y = A.x`, the condition is also swapped so that the
//! left operand of every equality keeps reading from the left input.

use crate::support::same_inputs;
use relopt_core::error::RuleError;
use relopt_core::expr::*;
use relopt_core::memo::RelExpr;
use relopt_core::pattern::Operand;
use relopt_core::rule::{OnMatch, Rule, RuleCall};

/// Join commutativity: A JOIN B -> B JOIN A.
pub struct JoinCommutativityRule;

impl JoinCommutativityRule {
    pub const NAME: &'static str = "JoinCommutativity";

    pub fn rule() -> Rule {
        Rule::transformation(Self::NAME, Operand::join(), Self)
    }
}

impl OnMatch for JoinCommutativityRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let node = call.rel(0);
        let Operator::Logical(LogicalOp::Join {
            join_type,
            condition,
        }) = &node.op
        else {
            return Err(RuleError::UnexpectedBinding(node.op.to_string()));
        };

        if !join_type.is_commutative() || node.inputs.len() != 2 {
            return Ok(());
        }

        let mut inputs = same_inputs(node);
        inputs.swap(0, 1);
        call.transform_to(RelExpr::new(
            Operator::Logical(LogicalOp::Join {
                join_type: *join_type,
                condition: swap_condition_sides(condition),
            }),
            node.traits.clone(),
            inputs,
        ));
        Ok(())
    }
}

/// Swap the sides of every equality in a condition.
fn swap_condition_sides(expr: &Expr) -> Expr {
    match expr {
        Expr::BinaryOp {
            op: BinaryOp::Eq,
            left,
            right,
        } => Expr::BinaryOp {
            op: BinaryOp::Eq,
            left: right.clone(),
            right: left.clone(),
        },
        Expr::And(conjuncts) => Expr::And(conjuncts.iter().map(swap_condition_sides).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{equi, fire, leaf, node, scan};
    use relopt_core::catalog::InMemoryCatalog;
    use relopt_core::memo::{Memo, RelInput};

    #[test]
    fn test_swap_condition() {
        let swapped = swap_condition_sides(&equi("a", "x", "b", "y"));
        assert_eq!(swapped, equi("b", "y", "a", "x"));
        assert_eq!(swap_condition_sides(&swapped), equi("a", "x", "b", "y"));
    }

    #[test]
    fn test_inputs_are_swapped() {
        let mut memo = Memo::new();
        let a = leaf(&mut memo, scan("a"));
        let b = leaf(&mut memo, scan("b"));
        let join = node(
            &mut memo,
            Operator::Logical(LogicalOp::Join {
                join_type: JoinType::Inner,
                condition: equi("a", "x", "b", "y"),
            }),
            &[a, b],
        );

        let proposals =
            fire(&JoinCommutativityRule::rule(), &memo, &InMemoryCatalog::new(), &[join]).unwrap();
        assert_eq!(proposals.len(), 1);
        let sets: Vec<_> = proposals[0]
            .expr
            .inputs
            .iter()
            .filter_map(|i| match i {
                RelInput::Subset(r) => Some(r.set),
                RelInput::Expr(_) => None,
            })
            .collect();
        assert_eq!(sets, vec![memo.set_of(b), memo.set_of(a)]);
    }

    #[test]
    fn test_outer_join_is_not_commuted() {
        let mut memo = Memo::new();
        let a = leaf(&mut memo, scan("a"));
        let b = leaf(&mut memo, scan("b"));
        let join = node(
            &mut memo,
            Operator::Logical(LogicalOp::Join {
                join_type: JoinType::Left,
                condition: equi("a", "x", "b", "y"),
            }),
            &[a, b],
        );
        let proposals =
            fire(&JoinCommutativityRule::rule(), &memo, &InMemoryCatalog::new(), &[join]).unwrap();
        assert!(proposals.is_empty());
    }
}
