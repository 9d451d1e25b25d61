//! # Aggregate Implementation Rule
//!
//! Uses a hash table keyed by the group-by columns. Each input row is hashed and routed
//! to the corresponding bucket, where the aggregate accumulators are updated. Works with
//! any input ordering.
//!
//! **Cost trade-off**: O(n) CPU + O(groups) memory. The memory cost can be significant
//! for high-cardinality group-by columns.

use crate::support::physical_inputs;
use relopt_core::error::RuleError;
use relopt_core::expr::*;
use relopt_core::memo::RelExpr;
use relopt_core::pattern::Operand;
use relopt_core::rule::{OnMatch, Rule, RuleCall};

/// Implement logical aggregate as a hash aggregate.
pub struct ImplHashAggregateRule;

impl ImplHashAggregateRule {
    pub const NAME: &'static str = "ImplHashAggregate";

    pub fn rule() -> Rule {
        Rule::implementation(Self::NAME, Operand::aggregate(), Self)
    }
}

impl OnMatch for ImplHashAggregateRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let node = call.rel(0);
        let Operator::Logical(LogicalOp::Aggregate {
            group_by,
            aggregates,
        }) = &node.op
        else {
            return Err(RuleError::UnexpectedBinding(node.op.to_string()));
        };

        call.transform_to(RelExpr::physical(
            Operator::Physical(PhysicalOp::HashAggregate {
                group_by: group_by.clone(),
                aggregates: aggregates.clone(),
            }),
            physical_inputs(node),
        ));
        Ok(())
    }
}
