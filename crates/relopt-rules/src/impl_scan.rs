//! # Scan Implementation Rule
//!
//! Maps a logical Scan to a physical SeqScan (sequential/full table scan).
//!
//! ## Sequential Scan
//!
//! A sequential scan reads every row from the table and evaluates any pushed-down
//! predicate. It is the only access path the built-in operator vocabulary knows; tables
//! that prefer something else say so through the catalog's table-access capability,
//! which `TableAccessRule` consults for `TableAccess` placeholders.
//!
//! The column list and predicate carry over unchanged, so a scan that projection
//! pushdown has narrowed stays narrow once implemented.

use relopt_core::error::RuleError;
use relopt_core::expr::*;
use relopt_core::memo::RelExpr;
use relopt_core::pattern::Operand;
use relopt_core::rule::{OnMatch, Rule, RuleCall};

/// Implement logical scan as a sequential (full) table scan.
pub struct ImplSeqScanRule;

impl ImplSeqScanRule {
    pub const NAME: &'static str = "ImplSeqScan";

    pub fn rule() -> Rule {
        Rule::implementation(Self::NAME, Operand::scan(), Self)
    }
}

impl OnMatch for ImplSeqScanRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let node = call.rel(0);
        let Operator::Logical(LogicalOp::Scan {
            table,
            columns,
            predicate,
        }) = &node.op
        else {
            return Err(RuleError::UnexpectedBinding(node.op.to_string()));
        };

        call.transform_to(RelExpr::physical(
            Operator::Physical(PhysicalOp::SeqScan {
                table: table.clone(),
                columns: columns.clone(),
                predicate: predicate.clone(),
            }),
            vec![],
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fire, leaf};
    use relopt_core::catalog::InMemoryCatalog;
    use relopt_core::memo::Memo;
    use relopt_core::traits::TraitSet;

    #[test]
    fn test_scan_fields_carry_over() {
        let predicate = Expr::equals(
            Expr::column("orders", "o_orderstatus"),
            Expr::literal(ScalarValue::Utf8("F".into())),
        );
        let mut memo = Memo::new();
        let node = leaf(
            &mut memo,
            Operator::Logical(LogicalOp::Scan {
                table: TableRef::new("tpch", "orders"),
                columns: vec![ColumnRef::new("orders", "o_orderkey", 0)],
                predicate: Some(predicate.clone()),
            }),
        );

        let proposals = fire(&ImplSeqScanRule::rule(), &memo, &InMemoryCatalog::new(), &[node]).unwrap();
        assert_eq!(proposals.len(), 1);
        let expr = &proposals[0].expr;
        assert_eq!(expr.traits, TraitSet::physical());
        assert!(expr.inputs.is_empty());
        assert_eq!(
            expr.op,
            Operator::Physical(PhysicalOp::SeqScan {
                table: TableRef::new("tpch", "orders"),
                columns: vec![ColumnRef::new("orders", "o_orderkey", 0)],
                predicate: Some(predicate),
            })
        );
    }
}
