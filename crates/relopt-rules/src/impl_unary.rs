//! # Pass-Through Implementation Rules
//!
//! Filter, Project and Limit have a single physical counterpart each. The physical
//! operator keeps the logical one's arguments and asks its input for any physical
//! realization.

use crate::support::physical_inputs;
use relopt_core::error::RuleError;
use relopt_core::expr::*;
use relopt_core::memo::RelExpr;
use relopt_core::pattern::Operand;
use relopt_core::rule::{OnMatch, Rule, RuleCall};

pub struct ImplFilterRule;

impl ImplFilterRule {
    pub const NAME: &'static str = "ImplFilter";

    pub fn rule() -> Rule {
        Rule::implementation(Self::NAME, Operand::filter(), Self)
    }
}

impl OnMatch for ImplFilterRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let node = call.rel(0);
        let Operator::Logical(LogicalOp::Filter { predicate }) = &node.op else {
            return Err(RuleError::UnexpectedBinding(node.op.to_string()));
        };
        call.transform_to(RelExpr::physical(
            Operator::Physical(PhysicalOp::Filter {
                predicate: predicate.clone(),
            }),
            physical_inputs(node),
        ));
        Ok(())
    }
}

pub struct ImplProjectRule;

impl ImplProjectRule {
    pub const NAME: &'static str = "ImplProject";

    pub fn rule() -> Rule {
        Rule::implementation(Self::NAME, Operand::project(), Self)
    }
}

impl OnMatch for ImplProjectRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let node = call.rel(0);
        let Operator::Logical(LogicalOp::Project { exprs, aliases }) = &node.op else {
            return Err(RuleError::UnexpectedBinding(node.op.to_string()));
        };
        call.transform_to(RelExpr::physical(
            Operator::Physical(PhysicalOp::Project {
                exprs: exprs.clone(),
                aliases: aliases.clone(),
            }),
            physical_inputs(node),
        ));
        Ok(())
    }
}

pub struct ImplLimitRule;

impl ImplLimitRule {
    pub const NAME: &'static str = "ImplLimit";

    pub fn rule() -> Rule {
        Rule::implementation(Self::NAME, Operand::limit(), Self)
    }
}

impl OnMatch for ImplLimitRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let node = call.rel(0);
        let Operator::Logical(LogicalOp::Limit { offset, count }) = &node.op else {
            return Err(RuleError::UnexpectedBinding(node.op.to_string()));
        };
        call.transform_to(RelExpr::physical(
            Operator::Physical(PhysicalOp::Limit {
                offset: *offset,
                count: *count,
            }),
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
    use relopt_core::memo::{Memo, NodeId};

    fn over_scan(memo: &mut Memo, op: LogicalOp) -> NodeId {
        let input = leaf(memo, scan("orders"));
        node(memo, Operator::Logical(op), &[input])
    }

    #[test]
    fn test_filter_project_and_limit_have_physical_twins() {
        let predicate = Expr::equals(
            Expr::column("orders", "o_orderkey"),
            Expr::literal(ScalarValue::Int64(1)),
        );
        let cases = [
            (
                ImplFilterRule::rule(),
                LogicalOp::Filter {
                    predicate: predicate.clone(),
                },
                PhysicalOp::Filter { predicate },
            ),
            (
                ImplProjectRule::rule(),
                LogicalOp::Project {
                    exprs: vec![Expr::column("orders", "o_orderkey")],
                    aliases: vec!["key".into()],
                },
                PhysicalOp::Project {
                    exprs: vec![Expr::column("orders", "o_orderkey")],
                    aliases: vec!["key".into()],
                },
            ),
            (
                ImplLimitRule::rule(),
                LogicalOp::Limit {
                    offset: 10,
                    count: 5,
                },
                PhysicalOp::Limit {
                    offset: 10,
                    count: 5,
                },
            ),
        ];

        for (rule, logical, physical) in cases {
            let mut memo = Memo::new();
            let root = over_scan(&mut memo, logical);
            let proposals = fire(&rule, &memo, &InMemoryCatalog::new(), &[root]).unwrap();
            assert_eq!(proposals.len(), 1, "{}", rule.name());
            assert_eq!(proposals[0].expr.op, Operator::Physical(physical));
        }
    }

    #[test]
    fn test_wrong_operator_is_reported() {
        let mut memo = Memo::new();
        let root = leaf(&mut memo, scan("orders"));
        let err = fire(&ImplLimitRule::rule(), &memo, &InMemoryCatalog::new(), &[root]).unwrap_err();
        assert!(matches!(err, RuleError::UnexpectedBinding(_)));
    }
}
