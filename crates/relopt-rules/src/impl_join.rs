//! # Join Implementation Rules
//!
//! This module provides three implementation rules that map a logical Join to
//! physical join operators. Each physical join has different cost characteristics
//! and applicability constraints:
//!
//! ## Hash Join (`ImplHashJoinRule`)
//!
//! Builds a hash table on one side (the "build side") and probes it with rows from the
//! other side. Produces two alternatives per join (build-left and build-right) so the
//! cost model can pick the cheaper option, typically building on the smaller side.
//!
//! **Requires**: at least one equi-join predicate (e.g., `A.id = B.id`), or a cross join.
//! **Cost**: O(build_rows) memory + O(build_rows + probe_rows) CPU.
//!
//! ## Merge Join (`ImplMergeJoinRule`)
//!
//! Merges two streams sorted on the join keys by advancing pointers. The rule asks for
//! each input sorted on its side's keys; when no member of an input class delivers that
//! order natively, the search adds a sort enforcer, and the cost model weighs the sort
//! against a hash join. The output keeps the order of the left keys.
//!
//! **Requires**: inner join with equi-join predicates whose sides can be told apart.
//! **Cost**: O(left_rows + right_rows) CPU, minimal memory, plus any sorts.
//!
//! ## Nested Loop Join (`ImplNestedLoopJoinRule`)
//!
//! The universal fallback: for each left row, scans all right rows. Works with any join
//! condition, including non-equi predicates, but O(n * m) makes it the last resort.

use crate::support::{equi_keys, physical_inputs, tables_of};
use relopt_core::error::RuleError;
use relopt_core::expr::*;
use relopt_core::memo::{RelExpr, RelInput};
use relopt_core::pattern::Operand;
use relopt_core::rule::{OnMatch, Rule, RuleCall};
use relopt_core::traits::TraitSet;

/// Join type and condition of the bound logical join, if it has two inputs.
fn binary_join<'a>(call: &RuleCall<'a>) -> Result<Option<(JoinType, &'a Expr)>, RuleError> {
    let node = call.rel(0);
    let Operator::Logical(LogicalOp::Join {
        join_type,
        condition,
    }) = &node.op
    else {
        return Err(RuleError::UnexpectedBinding(node.op.to_string()));
    };
    if node.inputs.len() != 2 {
        return Ok(None);
    }
    Ok(Some((*join_type, condition)))
}

/// Implement logical join as a hash join, building on either side.
pub struct ImplHashJoinRule;

impl ImplHashJoinRule {
    pub const NAME: &'static str = "ImplHashJoin";

    pub fn rule() -> Rule {
        Rule::implementation(Self::NAME, Operand::join(), Self)
    }
}

impl OnMatch for ImplHashJoinRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let Some((join_type, condition)) = binary_join(call)? else {
            return Ok(());
        };
        if !condition.has_equi_predicate() && join_type != JoinType::Cross {
            return Ok(());
        }

        let inputs = physical_inputs(call.rel(0));
        for build_side in [BuildSide::Right, BuildSide::Left] {
            call.transform_to(RelExpr::physical(
                Operator::Physical(PhysicalOp::HashJoin {
                    join_type,
                    build_side,
                    condition: condition.clone(),
                }),
                inputs.clone(),
            ));
        }
        Ok(())
    }
}

/// Implement logical join as a merge join over inputs sorted on the join keys.
pub struct ImplMergeJoinRule;

impl ImplMergeJoinRule {
    pub const NAME: &'static str = "ImplMergeJoin";

    pub fn rule() -> Rule {
        Rule::implementation(Self::NAME, Operand::join(), Self)
    }
}

impl OnMatch for ImplMergeJoinRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let Some((join_type, condition)) = binary_join(call)? else {
            return Ok(());
        };
        if join_type != JoinType::Inner {
            return Ok(());
        }

        let node = call.rel(0);
        let (left, right) = (node.inputs[0].set, node.inputs[1].set);
        let memo = call.memo();
        let keys = equi_keys(condition, &tables_of(memo, left), &tables_of(memo, right));
        if keys.is_empty() {
            return Ok(());
        }

        let left_order: Vec<SortKey> = keys.iter().map(|(l, _)| SortKey::asc(l.clone())).collect();
        let right_order: Vec<SortKey> = keys.iter().map(|(_, r)| SortKey::asc(r.clone())).collect();
        call.transform_to(RelExpr::new(
            Operator::Physical(PhysicalOp::MergeJoin {
                join_type,
                condition: condition.clone(),
            }),
            TraitSet::physical().with_sort(left_order.clone()),
            vec![
                RelInput::subset(left, TraitSet::physical().with_sort(left_order)),
                RelInput::subset(right, TraitSet::physical().with_sort(right_order)),
            ],
        ));
        Ok(())
    }
}

/// Implement logical join as a nested loop join (universal fallback).
pub struct ImplNestedLoopJoinRule;

impl ImplNestedLoopJoinRule {
    pub const NAME: &'static str = "ImplNestedLoopJoin";

    pub fn rule() -> Rule {
        Rule::implementation(Self::NAME, Operand::join(), Self)
    }
}

impl OnMatch for ImplNestedLoopJoinRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let Some((join_type, condition)) = binary_join(call)? else {
            return Ok(());
        };
        call.transform_to(RelExpr::physical(
            Operator::Physical(PhysicalOp::NestedLoopJoin {
                join_type,
                condition: condition.clone(),
            }),
            physical_inputs(call.rel(0)),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{equi, fire, leaf, node, scan};
    use relopt_core::catalog::InMemoryCatalog;
    use relopt_core::memo::{Memo, NodeId};

    fn join_over_ab(memo: &mut Memo, join_type: JoinType, condition: Expr) -> NodeId {
        let a = leaf(memo, scan("a"));
        let b = leaf(memo, scan("b"));
        node(
            memo,
            Operator::Logical(LogicalOp::Join {
                join_type,
                condition,
            }),
            &[a, b],
        )
    }

    #[test]
    fn test_hash_join_builds_on_both_sides() {
        let mut memo = Memo::new();
        let join = join_over_ab(&mut memo, JoinType::Inner, equi("a", "x", "b", "y"));

        let proposals = fire(&ImplHashJoinRule::rule(), &memo, &InMemoryCatalog::new(), &[join]).unwrap();
        let sides: Vec<BuildSide> = proposals
            .iter()
            .map(|p| match &p.expr.op {
                Operator::Physical(PhysicalOp::HashJoin { build_side, .. }) => *build_side,
                other => panic!("unexpected {other}"),
            })
            .collect();
        assert_eq!(sides, vec![BuildSide::Right, BuildSide::Left]);
        assert!(proposals
            .iter()
            .all(|p| p.expr.inputs.iter().all(|i| matches!(i, RelInput::Subset(r) if r.traits == TraitSet::physical()))));
    }

    #[test]
    fn test_hash_join_needs_equality() {
        let mut memo = Memo::new();
        let cond = Expr::binary(BinaryOp::Lt, Expr::column("a", "x"), Expr::column("b", "y"));
        let join = join_over_ab(&mut memo, JoinType::Inner, cond);
        let proposals = fire(&ImplHashJoinRule::rule(), &memo, &InMemoryCatalog::new(), &[join]).unwrap();
        assert!(proposals.is_empty());
    }

    #[test]
    fn test_merge_join_requires_sorted_inputs() {
        let mut memo = Memo::new();
        // Written right-to-left on purpose; the keys are oriented by side.
        let join = join_over_ab(&mut memo, JoinType::Inner, equi("b", "y", "a", "x"));

        let proposals = fire(&ImplMergeJoinRule::rule(), &memo, &InMemoryCatalog::new(), &[join]).unwrap();
        assert_eq!(proposals.len(), 1);
        let expr = &proposals[0].expr;
        let required: Vec<TraitSet> = expr
            .inputs
            .iter()
            .filter_map(|i| match i {
                RelInput::Subset(r) => Some(r.traits.clone()),
                RelInput::Expr(_) => None,
            })
            .collect();
        assert_eq!(
            required,
            vec![
                TraitSet::physical().with_sort(vec![SortKey::asc(Expr::column("a", "x"))]),
                TraitSet::physical().with_sort(vec![SortKey::asc(Expr::column("b", "y"))]),
            ]
        );
        assert_eq!(expr.traits, required[0]);
    }

    #[test]
    fn test_merge_join_only_for_inner_equi_joins() {
        let mut memo = Memo::new();
        let left = join_over_ab(&mut memo, JoinType::Left, equi("a", "x", "b", "y"));
        let proposals = fire(&ImplMergeJoinRule::rule(), &memo, &InMemoryCatalog::new(), &[left]).unwrap();
        assert!(proposals.is_empty());

        let mut memo = Memo::new();
        let literal = Expr::equals(Expr::column("a", "x"), Expr::literal(ScalarValue::Int64(3)));
        let join = join_over_ab(&mut memo, JoinType::Inner, literal);
        let proposals = fire(&ImplMergeJoinRule::rule(), &memo, &InMemoryCatalog::new(), &[join]).unwrap();
        assert!(proposals.is_empty());
    }

    #[test]
    fn test_nested_loop_join_always_applies() {
        let mut memo = Memo::new();
        let cond = Expr::binary(BinaryOp::Gt, Expr::column("a", "x"), Expr::column("b", "y"));
        let join = join_over_ab(&mut memo, JoinType::Left, cond);
        let proposals =
            fire(&ImplNestedLoopJoinRule::rule(), &memo, &InMemoryCatalog::new(), &[join]).unwrap();
        assert_eq!(proposals.len(), 1);
        assert!(matches!(
            proposals[0].expr.op,
            Operator::Physical(PhysicalOp::NestedLoopJoin {
                join_type: JoinType::Left,
                ..
            })
        ));
    }
}
