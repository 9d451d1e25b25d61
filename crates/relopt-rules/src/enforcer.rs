//! # Sort Implementation Rule
//!
//! Implements the logical Sort operator (an explicit ORDER BY).
//!
//! ## Enforcers
//!
//! An "enforcer" is a physical operator whose sole purpose is to satisfy a required
//! trait that the input plan doesn't natively provide. Sort is the canonical one: when
//! a consumer such as a merge join asks for sorted input, the search registers a
//! `SortOp` in the input's class on its own, with no rule involved.
//!
//! An explicit logical Sort is different: it is an operator of the query, not a
//! requirement. This rule maps it to a `SortOp` that advertises the sort order in its
//! traits, so the Sort class gets a sorted realization that satisfies both sorted and
//! unconstrained consumers.
//!
//! ## Cost Considerations
//!
//! The sort cost is O(n log n) CPU + O(n) memory for n input rows.

use crate::support::physical_inputs;
use relopt_core::error::RuleError;
use relopt_core::expr::*;
use relopt_core::memo::RelExpr;
use relopt_core::pattern::Operand;
use relopt_core::rule::{OnMatch, Rule, RuleCall};
use relopt_core::traits::TraitSet;

/// Implement logical sort as a physical sort operator.
pub struct ImplSortRule;

impl ImplSortRule {
    pub const NAME: &'static str = "ImplSort";

    pub fn rule() -> Rule {
        Rule::implementation(Self::NAME, Operand::sort(), Self)
    }
}

impl OnMatch for ImplSortRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let node = call.rel(0);
        let Operator::Logical(LogicalOp::Sort { order }) = &node.op else {
            return Err(RuleError::UnexpectedBinding(node.op.to_string()));
        };

        call.transform_to(RelExpr::new(
            Operator::Physical(PhysicalOp::SortOp {
                order: order.clone(),
            }),
            TraitSet::physical().with_sort(order.clone()),
            physical_inputs(node),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fire, leaf, node, scan};
    use relopt_core::catalog::InMemoryCatalog;
    use relopt_core::memo::Memo;

    #[test]
    fn test_sort_advertises_its_order() {
        let order = vec![SortKey::asc(Expr::column("orders", "o_orderdate"))];
        let mut memo = Memo::new();
        let input = leaf(&mut memo, scan("orders"));
        let sort = node(
            &mut memo,
            Operator::Logical(LogicalOp::Sort {
                order: order.clone(),
            }),
            &[input],
        );

        let proposals = fire(&ImplSortRule::rule(), &memo, &InMemoryCatalog::new(), &[sort]).unwrap();
        assert_eq!(proposals.len(), 1);
        let expr = &proposals[0].expr;
        assert_eq!(expr.traits, TraitSet::physical().with_sort(order.clone()));
        assert!(expr.traits.satisfies(&TraitSet::any()));
        assert_eq!(expr.op, Operator::Physical(PhysicalOp::SortOp { order }));
    }
}
