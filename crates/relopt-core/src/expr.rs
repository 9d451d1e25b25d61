//! # Operator Vocabulary
//!
//! The rewrite engine treats operators as opaque tree nodes: it hashes them, compares
//! them, and hands them to rules and to the cost model, but never interprets them. This
//! module supplies the concrete vocabulary those collaborators agree on.
//!
//! ## Scalar Expressions (`Expr`)
//! Row-level computations carried inside operators: predicates, projections, join
//! conditions and sort keys.
//!
//! ## Logical Operators (`LogicalOp`)
//! Describe *what* to compute. `TableAccess` is the abstract table-reference placeholder
//! that a rule later replaces with whatever access tree the catalog prefers.
//!
//! ## Physical Operators (`PhysicalOp`)
//! Describe *how* to compute it. Only physical operators are costed.
//!
//! Children are never stored inline. An operator appears inside a [`MemoNode`] whose
//! inputs are references into the equivalence registry.
//!
//! [`MemoNode`]: crate::memo::MemoNode

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Reference to a table in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Reference to a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
    pub index: u32,
}

impl ColumnRef {
    pub fn new(table: impl Into<String>, name: impl Into<String>, index: u32) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
            index,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table {
            Some(ref t) => write!(f, "{}.{}", t, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Constant value.
///
/// Floats are wrapped in `OrderedFloat` so literals can take part in structural
/// digests (`Eq` + `Hash`), which interning depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(OrderedFloat<f64>),
    Utf8(String),
    /// Days since 1970-01-01.
    Date(i32),
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::Utf8(a), Self::Utf8(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int64(v) => v.hash(state),
            Self::Float64(v) => v.hash(state),
            Self::Utf8(v) => v.hash(state),
            Self::Date(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{}", v.0),
            Self::Utf8(v) => write!(f, "'{v}'"),
            Self::Date(v) => write!(f, "DATE({v})"),
        }
    }
}

/// Scalar expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    Column(ColumnRef),
    Literal(ScalarValue),
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
    /// Flat conjunction; keeps predicate splitting trivial.
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn column(table: &str, name: &str) -> Self {
        Expr::Column(ColumnRef::new(table, name, 0))
    }

    pub fn literal(value: ScalarValue) -> Self {
        Expr::Literal(value)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `left = right`.
    pub fn equals(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    /// All column references in this expression, in left-to-right order.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut cols = Vec::new();
        self.collect_columns(&mut cols);
        cols
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Expr::Column(c) => out.push(c),
            Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::UnaryOp { operand, .. } => operand.collect_columns(out),
            Expr::Function { args, .. } => args.iter().for_each(|a| a.collect_columns(out)),
            Expr::And(exprs) | Expr::Or(exprs) => {
                exprs.iter().for_each(|e| e.collect_columns(out))
            }
        }
    }

    /// Flatten nested conjunctions: `A AND (B AND C)` yields `[A, B, C]`.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::And(exprs) => exprs.iter().flat_map(|e| e.conjuncts()).collect(),
            other => vec![other],
        }
    }

    /// Build a conjunction from a list of predicates, collapsing the single-element case.
    pub fn and_all(mut exprs: Vec<Expr>) -> Expr {
        match exprs.len() {
            0 => Expr::Literal(ScalarValue::Bool(true)),
            1 => exprs.remove(0),
            _ => Expr::And(exprs),
        }
    }

    /// True for a `col = col` comparison, or a conjunction containing one.
    pub fn has_equi_predicate(&self) -> bool {
        match self {
            Expr::BinaryOp {
                op: BinaryOp::Eq,
                left,
                right,
            } => matches!(
                (left.as_ref(), right.as_ref()),
                (Expr::Column(_), Expr::Column(_))
            ),
            Expr::And(conjuncts) => conjuncts.iter().any(Expr::has_equi_predicate),
            _ => false,
        }
    }

    /// Equi-join column name pairs, e.g. `a.x = b.y AND a.z = b.w` gives
    /// `[("x", "y"), ("z", "w")]`.
    pub fn equi_join_columns(&self) -> Vec<(String, String)> {
        self.conjuncts()
            .into_iter()
            .filter_map(|c| match c {
                Expr::BinaryOp {
                    op: BinaryOp::Eq,
                    left,
                    right,
                } => match (left.as_ref(), right.as_ref()) {
                    (Expr::Column(l), Expr::Column(r)) => Some((l.name.clone(), r.name.clone())),
                    _ => None,
                },
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "{c}"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::BinaryOp { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::UnaryOp { op, operand } => write!(f, "{op:?}({operand})"),
            Expr::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expr::And(exprs) | Expr::Or(exprs) => {
                let sep = if matches!(self, Expr::And(_)) { " AND " } else { " OR " };
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{sep}")?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    IsNull,
    IsNotNull,
}

/// Join types. Only `Inner` and `Cross` are symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
    Cross,
}

impl JoinType {
    pub fn is_commutative(&self) -> bool {
        matches!(self, JoinType::Inner | JoinType::Cross)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggExpr {
    pub func: AggFunc,
    pub arg: Expr,
    pub distinct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub expr: Expr,
    pub ascending: bool,
    pub nulls_first: bool,
}

impl SortKey {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: true,
            nulls_first: false,
        }
    }
}

/// How rows are spread across workers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Distribution {
    Single,
    Broadcast,
    Hash(Vec<Expr>),
    RoundRobin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildSide {
    Left,
    Right,
}

/// Logical operators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Abstract reference to a table whose access path has not been chosen yet.
    /// The catalog decides what concrete tree replaces it.
    TableAccess { table: TableRef },
    /// Table scan with optional column pruning and pushed-down predicate. Leaf.
    Scan {
        table: TableRef,
        columns: Vec<ColumnRef>,
        predicate: Option<Expr>,
    },
    Filter { predicate: Expr },
    Project { exprs: Vec<Expr>, aliases: Vec<String> },
    Join { join_type: JoinType, condition: Expr },
    Aggregate { group_by: Vec<Expr>, aggregates: Vec<AggExpr> },
    Sort { order: Vec<SortKey> },
    Limit { offset: u64, count: u64 },
}

/// Physical operators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalOp {
    SeqScan {
        table: TableRef,
        columns: Vec<ColumnRef>,
        predicate: Option<Expr>,
    },
    Filter { predicate: Expr },
    Project { exprs: Vec<Expr>, aliases: Vec<String> },
    /// Hash join; `build_side` is materialized into the hash table.
    HashJoin {
        join_type: JoinType,
        build_side: BuildSide,
        condition: Expr,
    },
    /// Merge join over inputs sorted on the join keys.
    MergeJoin { join_type: JoinType, condition: Expr },
    NestedLoopJoin { join_type: JoinType, condition: Expr },
    HashAggregate { group_by: Vec<Expr>, aggregates: Vec<AggExpr> },
    /// Sort enforcer.
    SortOp { order: Vec<SortKey> },
    /// Redistribution enforcer.
    Exchange { distribution: Distribution },
    Limit { offset: u64, count: u64 },
}

/// Unified operator stored in the memo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Logical(LogicalOp),
    Physical(PhysicalOp),
}

impl Operator {
    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::Logical(_))
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, Operator::Physical(_))
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Operator::Logical(l) => OpKind::Logical(l.kind()),
            Operator::Physical(p) => OpKind::Physical(p.kind()),
        }
    }

    pub fn as_physical(&self) -> Option<&PhysicalOp> {
        match self {
            Operator::Physical(p) => Some(p),
            Operator::Logical(_) => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Logical(op) => match op {
                LogicalOp::TableAccess { table } => write!(f, "TableAccess[{table}]"),
                LogicalOp::Scan { table, .. } => write!(f, "Scan[{table}]"),
                LogicalOp::Filter { predicate } => write!(f, "Filter[{predicate}]"),
                LogicalOp::Project { aliases, .. } => write!(f, "Project[{}]", aliases.join(", ")),
                LogicalOp::Join {
                    join_type,
                    condition,
                } => write!(f, "Join[{join_type:?}, {condition}]"),
                LogicalOp::Aggregate { group_by, .. } => {
                    write!(f, "Aggregate[{} keys]", group_by.len())
                }
                LogicalOp::Sort { order } => write!(f, "Sort[{} keys]", order.len()),
                LogicalOp::Limit { offset, count } => write!(f, "Limit[{offset}, {count}]"),
            },
            Operator::Physical(op) => match op {
                PhysicalOp::SeqScan { table, .. } => write!(f, "SeqScan[{table}]"),
                PhysicalOp::Filter { predicate } => write!(f, "PhysicalFilter[{predicate}]"),
                PhysicalOp::Project { aliases, .. } => {
                    write!(f, "PhysicalProject[{}]", aliases.join(", "))
                }
                PhysicalOp::HashJoin {
                    join_type,
                    build_side,
                    condition,
                } => write!(f, "HashJoin[{join_type:?}, build={build_side:?}, {condition}]"),
                PhysicalOp::MergeJoin {
                    join_type,
                    condition,
                } => write!(f, "MergeJoin[{join_type:?}, {condition}]"),
                PhysicalOp::NestedLoopJoin {
                    join_type,
                    condition,
                } => write!(f, "NestedLoopJoin[{join_type:?}, {condition}]"),
                PhysicalOp::HashAggregate { group_by, .. } => {
                    write!(f, "HashAggregate[{} keys]", group_by.len())
                }
                PhysicalOp::SortOp { order } => write!(f, "SortOp[{} keys]", order.len()),
                PhysicalOp::Exchange { distribution } => write!(f, "Exchange[{distribution:?}]"),
                PhysicalOp::Limit { offset, count } => {
                    write!(f, "PhysicalLimit[{offset}, {count}]")
                }
            },
        }
    }
}

/// Data-less operator discriminant used by operand matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Logical(LogicalOpKind),
    Physical(PhysicalOpKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOpKind {
    TableAccess,
    Scan,
    Filter,
    Project,
    Join,
    Aggregate,
    Sort,
    Limit,
}

impl LogicalOp {
    pub fn kind(&self) -> LogicalOpKind {
        match self {
            LogicalOp::TableAccess { .. } => LogicalOpKind::TableAccess,
            LogicalOp::Scan { .. } => LogicalOpKind::Scan,
            LogicalOp::Filter { .. } => LogicalOpKind::Filter,
            LogicalOp::Project { .. } => LogicalOpKind::Project,
            LogicalOp::Join { .. } => LogicalOpKind::Join,
            LogicalOp::Aggregate { .. } => LogicalOpKind::Aggregate,
            LogicalOp::Sort { .. } => LogicalOpKind::Sort,
            LogicalOp::Limit { .. } => LogicalOpKind::Limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalOpKind {
    SeqScan,
    Filter,
    Project,
    HashJoin,
    MergeJoin,
    NestedLoopJoin,
    HashAggregate,
    SortOp,
    Exchange,
    Limit,
}

impl PhysicalOp {
    pub fn kind(&self) -> PhysicalOpKind {
        match self {
            PhysicalOp::SeqScan { .. } => PhysicalOpKind::SeqScan,
            PhysicalOp::Filter { .. } => PhysicalOpKind::Filter,
            PhysicalOp::Project { .. } => PhysicalOpKind::Project,
            PhysicalOp::HashJoin { .. } => PhysicalOpKind::HashJoin,
            PhysicalOp::MergeJoin { .. } => PhysicalOpKind::MergeJoin,
            PhysicalOp::NestedLoopJoin { .. } => PhysicalOpKind::NestedLoopJoin,
            PhysicalOp::HashAggregate { .. } => PhysicalOpKind::HashAggregate,
            PhysicalOp::SortOp { .. } => PhysicalOpKind::SortOp,
            PhysicalOp::Exchange { .. } => PhysicalOpKind::Exchange,
            PhysicalOp::Limit { .. } => PhysicalOpKind::Limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conjuncts_flatten_nested_and() {
        let a = Expr::equals(Expr::column("t", "a"), Expr::literal(ScalarValue::Int64(1)));
        let b = Expr::equals(Expr::column("t", "b"), Expr::literal(ScalarValue::Int64(2)));
        let c = Expr::equals(Expr::column("t", "c"), Expr::literal(ScalarValue::Int64(3)));
        let nested = Expr::And(vec![a.clone(), Expr::And(vec![b.clone(), c.clone()])]);
        assert_eq!(nested.conjuncts(), vec![&a, &b, &c]);
    }

    #[test]
    fn test_equi_join_columns() {
        let cond = Expr::And(vec![
            Expr::equals(Expr::column("a", "x"), Expr::column("b", "y")),
            Expr::binary(
                BinaryOp::Lt,
                Expr::column("a", "z"),
                Expr::literal(ScalarValue::Int64(10)),
            ),
        ]);
        assert!(cond.has_equi_predicate());
        assert_eq!(cond.equi_join_columns(), vec![("x".to_string(), "y".to_string())]);
    }

    #[test]
    fn test_float_literals_hash_equal() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(ScalarValue::Float64(OrderedFloat(1.5)));
        assert!(set.contains(&ScalarValue::Float64(OrderedFloat(1.5))));
        assert!(!set.contains(&ScalarValue::Int64(1)));
    }

    #[test]
    fn test_operator_kind() {
        let op = Operator::Logical(LogicalOp::TableAccess {
            table: TableRef::new("s", "t"),
        });
        assert_eq!(op.kind(), OpKind::Logical(LogicalOpKind::TableAccess));
        assert!(op.as_physical().is_none());
        assert_eq!(op.to_string(), "TableAccess[s.t]");
    }
}
