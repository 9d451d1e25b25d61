//! # Projection Pushdown Rule
//!
//! This rule implements column pruning by pushing projection requirements down to
//! table scans. When a Project only references some of the columns produced by the
//! Scan below it, the rule proposes the same Project over a narrower Scan.
//!
//! ```text
//! Before: Project(exprs, Scan(t, [a, b, c, d]))
//! After:  Project(exprs, Scan(t, [a, c]))
//! ```
//!
//! ## Why This Helps
//!
//! - **Reduces I/O**: columnar storage formats can skip columns that are not needed.
//! - **Reduces memory**: narrower rows throughout the plan mean smaller hash tables
//!   and sort buffers.
//!
//! ## Termination
//!
//! The narrowed Scan lands in a new class, and the rule matches again on the new
//! Project. It only proposes when the column list strictly shrinks, so the second
//! firing finds nothing to prune.
//!
//! ## Current Scope
//!
//! Only Project directly over Scan. Columns referenced by the Scan's own predicate are
//! always kept.

use relopt_core::error::RuleError;
use relopt_core::expr::*;
use relopt_core::memo::{RelExpr, RelInput};
use relopt_core::pattern::Operand;
use relopt_core::rule::{OnMatch, Rule, RuleCall};

/// Push projections into table scans to reduce intermediate data.
pub struct ProjectionPushdownRule;

impl ProjectionPushdownRule {
    pub const NAME: &'static str = "ProjectionPushdown";

    pub fn rule() -> Rule {
        Rule::transformation(
            Self::NAME,
            Operand::project().with_children(vec![Operand::scan()]),
            Self,
        )
    }
}

impl OnMatch for ProjectionPushdownRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let (project, scan) = (call.rel(0), call.rel(1));
        let Operator::Logical(LogicalOp::Project { exprs, .. }) = &project.op else {
            return Err(RuleError::UnexpectedBinding(project.op.to_string()));
        };
        let Operator::Logical(LogicalOp::Scan {
            table,
            columns,
            predicate,
        }) = &scan.op
        else {
            return Err(RuleError::UnexpectedBinding(scan.op.to_string()));
        };

        let mut needed: Vec<&ColumnRef> = exprs.iter().flat_map(|e| e.columns()).collect();
        if let Some(predicate) = predicate {
            needed.extend(predicate.columns());
        }
        if needed.is_empty() {
            return Ok(());
        }

        let Some(pruned) = prune_columns(&table.name, columns, &needed) else {
            return Ok(());
        };

        let narrow_scan = RelExpr::leaf(
            Operator::Logical(LogicalOp::Scan {
                table: table.clone(),
                columns: pruned,
                predicate: predicate.clone(),
            }),
            scan.traits.clone(),
        );
        call.transform_to(RelExpr::new(
            project.op.clone(),
            project.traits.clone(),
            vec![RelInput::expr(narrow_scan)],
        ));
        Ok(())
    }
}

/// The columns of `available` that `needed` references, in scan order.
///
/// An empty `available` list means the scan has not been narrowed yet, in which case the
/// needed columns themselves become the list. Returns `None` when nothing would be pruned.
fn prune_columns(table: &str, available: &[ColumnRef], needed: &[&ColumnRef]) -> Option<Vec<ColumnRef>> {
    let references = |column: &ColumnRef| {
        needed.iter().any(|n| {
            n.name == column.name && n.table.as_deref().map_or(true, |t| t == table)
        })
    };

    if available.is_empty() {
        let mut pruned: Vec<ColumnRef> = Vec::new();
        for column in needed {
            if !pruned.iter().any(|p| p.name == column.name) {
                pruned.push((*column).clone());
            }
        }
        return Some(pruned);
    }

    let pruned: Vec<ColumnRef> = available.iter().filter(|c| references(c)).cloned().collect();
    (pruned.len() < available.len()).then_some(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fire, leaf, node};
    use relopt_core::catalog::InMemoryCatalog;
    use relopt_core::memo::Memo;

    fn orders_scan(columns: &[&str]) -> Operator {
        Operator::Logical(LogicalOp::Scan {
            table: TableRef::new("sales", "orders"),
            columns: columns
                .iter()
                .enumerate()
                .map(|(i, c)| ColumnRef::new("orders", *c, i as u32))
                .collect(),
            predicate: None,
        })
    }

    fn project_keys(memo: &mut Memo, scan: Operator) -> [relopt_core::memo::NodeId; 2] {
        let scan = leaf(memo, scan);
        let project = node(
            memo,
            Operator::Logical(LogicalOp::Project {
                exprs: vec![Expr::column("orders", "o_orderkey")],
                aliases: vec!["key".into()],
            }),
            &[scan],
        );
        [project, scan]
    }

    #[test]
    fn test_unused_columns_are_pruned() {
        let mut memo = Memo::new();
        let binding = project_keys(&mut memo, orders_scan(&["o_orderkey", "o_custkey", "o_totalprice"]));

        let proposals =
            fire(&ProjectionPushdownRule::rule(), &memo, &InMemoryCatalog::new(), &binding).unwrap();
        assert_eq!(proposals.len(), 1);
        let RelInput::Expr(scan) = &proposals[0].expr.inputs[0] else {
            panic!("expected a nested scan");
        };
        let Operator::Logical(LogicalOp::Scan { columns, .. }) = &scan.op else {
            panic!("expected a scan");
        };
        assert_eq!(columns, &vec![ColumnRef::new("orders", "o_orderkey", 0)]);
    }

    #[test]
    fn test_nothing_to_prune() {
        let mut memo = Memo::new();
        let binding = project_keys(&mut memo, orders_scan(&["o_orderkey"]));
        let proposals =
            fire(&ProjectionPushdownRule::rule(), &memo, &InMemoryCatalog::new(), &binding).unwrap();
        assert!(proposals.is_empty());
    }

    #[test]
    fn test_pruning_keeps_scan_order_and_indices() {
        let available = [
            ColumnRef::new("orders", "o_orderkey", 0),
            ColumnRef::new("orders", "o_custkey", 1),
            ColumnRef::new("orders", "o_comment", 2),
        ];
        let key = ColumnRef::new("orders", "o_orderkey", 0);
        let cust = ColumnRef::new("orders", "o_custkey", 0);
        let pruned = prune_columns("orders", &available, &[&key, &cust]).unwrap();
        assert_eq!(pruned, available[..2].to_vec());
    }
}
