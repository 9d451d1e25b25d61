//! Helpers shared by the built-in rules.

use relopt_core::expr::*;
use relopt_core::memo::{Memo, MemoNode, RelInput, SetId};
use relopt_core::traits::TraitSet;
use std::collections::HashSet;

/// The inputs of `node`, each asked for as an unconstrained physical realization.
pub fn physical_inputs(node: &MemoNode) -> Vec<RelInput> {
    node.inputs
        .iter()
        .map(|input| RelInput::subset(input.set, TraitSet::physical()))
        .collect()
}

/// The inputs of `node` exactly as it consumes them.
pub fn same_inputs(node: &MemoNode) -> Vec<RelInput> {
    node.inputs.iter().cloned().map(RelInput::Subset).collect()
}

/// Names of every table reachable from `set`.
///
/// Walks all live members and their inputs. Enforcers and rediscovered inputs make the
/// class graph cyclic, so visited classes are tracked.
pub fn tables_of(memo: &Memo, set: SetId) -> HashSet<String> {
    let mut tables = HashSet::new();
    let mut visited = HashSet::new();
    collect_tables(memo, set, &mut tables, &mut visited);
    tables
}

fn collect_tables(
    memo: &Memo,
    set: SetId,
    tables: &mut HashSet<String>,
    visited: &mut HashSet<SetId>,
) {
    let set = memo.find(set);
    if !visited.insert(set) {
        return;
    }
    for &member in memo.members(set) {
        let node = memo.node(member);
        match &node.op {
            Operator::Logical(LogicalOp::TableAccess { table })
            | Operator::Logical(LogicalOp::Scan { table, .. })
            | Operator::Physical(PhysicalOp::SeqScan { table, .. }) => {
                tables.insert(table.name.clone());
            }
            _ => {
                for input in &node.inputs {
                    collect_tables(memo, input.set, tables, visited);
                }
            }
        }
    }
}

/// Tables named by the column references of `expr`.
pub fn referenced_tables(expr: &Expr) -> HashSet<String> {
    expr.columns()
        .into_iter()
        .filter_map(|c| c.table.clone())
        .collect()
}

/// Equality predicates between a column of `left` and a column of `right`, oriented so
/// the first expression of each pair reads from `left`.
pub fn equi_keys(
    condition: &Expr,
    left: &HashSet<String>,
    right: &HashSet<String>,
) -> Vec<(Expr, Expr)> {
    let side = |c: &ColumnRef, tables: &HashSet<String>| {
        c.table.as_ref().is_some_and(|t| tables.contains(t))
    };
    condition
        .conjuncts()
        .into_iter()
        .filter_map(|conjunct| match conjunct {
            Expr::BinaryOp {
                op: BinaryOp::Eq,
                left: l,
                right: r,
            } => match (l.as_ref(), r.as_ref()) {
                (Expr::Column(a), Expr::Column(b)) if side(a, left) && side(b, right) => {
                    Some((l.as_ref().clone(), r.as_ref().clone()))
                }
                (Expr::Column(a), Expr::Column(b)) if side(b, left) && side(a, right) => {
                    Some((r.as_ref().clone(), l.as_ref().clone()))
                }
                _ => None,
            },
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relopt_core::memo::SubsetRef;

    fn col(table: &str, name: &str) -> Expr {
        Expr::column(table, name)
    }

    fn names(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_referenced_tables() {
        let cond = Expr::equals(col("orders", "o_custkey"), col("customer", "c_custkey"));
        let tables = referenced_tables(&cond);
        assert_eq!(tables, names(&["orders", "customer"]));
    }

    #[test]
    fn test_equi_keys_are_oriented_by_side() {
        let cond = Expr::and_all(vec![
            Expr::equals(col("b", "y"), col("a", "x")),
            Expr::equals(col("a", "z"), Expr::literal(ScalarValue::Int64(1))),
            Expr::equals(col("a", "w"), col("b", "v")),
        ]);
        let keys = equi_keys(&cond, &names(&["a"]), &names(&["b"]));
        assert_eq!(
            keys,
            vec![(col("a", "x"), col("b", "y")), (col("a", "w"), col("b", "v"))]
        );
    }

    #[test]
    fn test_tables_of_walks_inputs() {
        let mut memo = Memo::new();
        let scan = |name: &str| {
            Operator::Logical(LogicalOp::Scan {
                table: TableRef::new("s", name),
                columns: vec![],
                predicate: None,
            })
        };
        let a = memo.add_node(scan("a"), TraitSet::any(), vec![], None).set;
        let b = memo.add_node(scan("b"), TraitSet::any(), vec![], None).set;
        let join = memo.add_node(
            Operator::Logical(LogicalOp::Join {
                join_type: JoinType::Inner,
                condition: Expr::equals(col("a", "x"), col("b", "y")),
            }),
            TraitSet::any(),
            vec![
                SubsetRef::new(a, TraitSet::any()),
                SubsetRef::new(b, TraitSet::any()),
            ],
            None,
        );
        assert_eq!(tables_of(&memo, join.set), names(&["a", "b"]));
        assert_eq!(tables_of(&memo, a), names(&["a"]));
    }
}
