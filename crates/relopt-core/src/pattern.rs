//! # Operand Patterns and the Pattern Matcher
//!
//! Every rule declares an [`Operand`] tree describing the shape of expressions it can
//! transform. The scheduler asks the matcher for all bindings of a rule's operand rooted
//! at a candidate node; the rule callback only ever sees confirmed bindings.
//!
//! ## Pattern Language
//!
//! Each operand node has a matcher and a child specification:
//!
//! - [`OpMatcher`] constrains the operator: one logical or physical kind, any logical,
//!   any physical, or `Any` (a wildcard that binds whatever node sits in that position).
//! - [`OperandChildren`] constrains the inputs:
//!   - `Unconstrained`: any arity, inputs are not bound.
//!   - `Exact(children)`: arity must equal `children.len()`, each input matched in order.
//!     A wildcard child still counts towards arity.
//!   - `Leading(children)`: variable arity, at least `children.len()` inputs, the leading
//!     ones matched in order.
//!
//! ## Bindings
//!
//! A binding assigns one memo node to every operand node, listed in preorder. `rel(0)` is
//! the root. A child operand is matched against every live member of the input's
//! equivalence class, so one root may produce several bindings.
//!
//! Matching is purely structural and only visits classes reachable from the root, to the
//! depth of the operand tree. Members are visited in node-id (registration) order, which
//! makes the binding sequence stable for a fixed memo snapshot.

use crate::expr::{LogicalOpKind, OpKind, Operator, PhysicalOpKind};
use crate::memo::{Memo, NodeId};

/// Concrete nodes bound to an operand tree, in preorder.
pub type Binding = Vec<NodeId>;

/// Operator constraint of one operand node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpMatcher {
    Logical(LogicalOpKind),
    Physical(PhysicalOpKind),
    AnyLogical,
    AnyPhysical,
    Any,
}

impl OpMatcher {
    pub fn accepts(&self, op: &Operator) -> bool {
        match (self, op.kind()) {
            (OpMatcher::Any, _) => true,
            (OpMatcher::AnyLogical, OpKind::Logical(_)) => true,
            (OpMatcher::AnyPhysical, OpKind::Physical(_)) => true,
            (OpMatcher::Logical(want), OpKind::Logical(got)) => *want == got,
            (OpMatcher::Physical(want), OpKind::Physical(got)) => *want == got,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandChildren {
    Unconstrained,
    Exact(Vec<Operand>),
    Leading(Vec<Operand>),
}

/// One node of an operand tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub matcher: OpMatcher,
    pub children: OperandChildren,
}

impl Operand {
    pub fn new(matcher: OpMatcher, children: OperandChildren) -> Self {
        Self { matcher, children }
    }

    /// A logical operator of `kind`, inputs unconstrained.
    pub fn logical(kind: LogicalOpKind) -> Self {
        Self::new(OpMatcher::Logical(kind), OperandChildren::Unconstrained)
    }

    /// A physical operator of `kind`, inputs unconstrained.
    pub fn physical(kind: PhysicalOpKind) -> Self {
        Self::new(OpMatcher::Physical(kind), OperandChildren::Unconstrained)
    }

    /// Wildcard: binds any node, inputs unconstrained.
    pub fn any() -> Self {
        Self::new(OpMatcher::Any, OperandChildren::Unconstrained)
    }

    pub fn with_children(mut self, children: Vec<Operand>) -> Self {
        self.children = OperandChildren::Exact(children);
        self
    }

    pub fn with_leading(mut self, children: Vec<Operand>) -> Self {
        self.children = OperandChildren::Leading(children);
        self
    }

    /// Require zero inputs.
    pub fn leaf(self) -> Self {
        self.with_children(vec![])
    }

    /// Match the table-access placeholder.
    pub fn table_access() -> Self {
        Self::logical(LogicalOpKind::TableAccess).leaf()
    }

    pub fn scan() -> Self {
        Self::logical(LogicalOpKind::Scan).leaf()
    }

    pub fn filter() -> Self {
        Self::logical(LogicalOpKind::Filter)
    }

    pub fn project() -> Self {
        Self::logical(LogicalOpKind::Project)
    }

    pub fn join() -> Self {
        Self::logical(LogicalOpKind::Join)
    }

    pub fn aggregate() -> Self {
        Self::logical(LogicalOpKind::Aggregate)
    }

    pub fn sort() -> Self {
        Self::logical(LogicalOpKind::Sort)
    }

    pub fn limit() -> Self {
        Self::logical(LogicalOpKind::Limit)
    }

    /// A filter directly on top of a join.
    pub fn filter_join() -> Self {
        Self::filter().with_children(vec![Self::join()])
    }

    /// Number of operand levels. A single operand has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .child_operands()
            .iter()
            .map(Operand::depth)
            .max()
            .unwrap_or(0)
    }

    /// Number of operand nodes, which is also the length of every binding.
    pub fn size(&self) -> usize {
        1 + self.child_operands().iter().map(Operand::size).sum::<usize>()
    }

    fn child_operands(&self) -> &[Operand] {
        match &self.children {
            OperandChildren::Unconstrained => &[],
            OperandChildren::Exact(c) | OperandChildren::Leading(c) => c,
        }
    }
}

/// Lazy iterator over the bindings of an operand at one root.
///
/// Bindings of each child operand are collected per input when the iterator is built;
/// their cross product, which is where the count multiplies, is enumerated on demand.
#[derive(Debug)]
pub struct Matches {
    root: NodeId,
    /// Candidate sub-bindings per matched input, in member order.
    inputs: Vec<Vec<Binding>>,
    /// Position in each input's candidates; `None` once exhausted.
    cursor: Option<Vec<usize>>,
}

impl Matches {
    fn empty(root: NodeId) -> Self {
        Self {
            root,
            inputs: Vec::new(),
            cursor: None,
        }
    }
}

impl Iterator for Matches {
    type Item = Binding;

    fn next(&mut self) -> Option<Binding> {
        let cursor = self.cursor.as_mut()?;
        let mut binding = vec![self.root];
        for (candidates, &at) in self.inputs.iter().zip(cursor.iter()) {
            binding.extend_from_slice(&candidates[at]);
        }

        // Odometer step: the last input moves fastest.
        let mut i = cursor.len();
        loop {
            if i == 0 {
                self.cursor = None;
                break;
            }
            i -= 1;
            cursor[i] += 1;
            if cursor[i] < self.inputs[i].len() {
                break;
            }
            cursor[i] = 0;
        }
        Some(binding)
    }
}

/// All bindings of `operand` rooted at `root`, in stable order. Empty when nothing matches.
pub fn matches(memo: &Memo, operand: &Operand, root: NodeId) -> Matches {
    let node = memo.node(root);
    if node.is_retired() || !operand.matcher.accepts(&node.op) {
        return Matches::empty(root);
    }
    let arity_ok = match &operand.children {
        OperandChildren::Unconstrained => true,
        OperandChildren::Exact(c) => node.inputs.len() == c.len(),
        OperandChildren::Leading(c) => node.inputs.len() >= c.len(),
    };
    if !arity_ok {
        return Matches::empty(root);
    }

    let mut inputs = Vec::new();
    for (input, child) in node.inputs.iter().zip(operand.child_operands()) {
        let candidates: Vec<Binding> = memo
            .members(input.set)
            .iter()
            .flat_map(|&m| matches(memo, child, m))
            .collect();
        if candidates.is_empty() {
            return Matches::empty(root);
        }
        inputs.push(candidates);
    }
    let cursor = Some(vec![0; inputs.len()]);
    Matches {
        root,
        inputs,
        cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::*;
    use crate::memo::SubsetRef;
    use crate::traits::TraitSet;

    fn scan(name: &str) -> Operator {
        Operator::Logical(LogicalOp::Scan {
            table: TableRef::new("s", name),
            columns: vec![],
            predicate: None,
        })
    }

    fn join() -> Operator {
        Operator::Logical(LogicalOp::Join {
            join_type: JoinType::Inner,
            condition: Expr::equals(Expr::column("a", "id"), Expr::column("b", "id")),
        })
    }

    fn filter() -> Operator {
        Operator::Logical(LogicalOp::Filter {
            predicate: Expr::literal(ScalarValue::Bool(true)),
        })
    }

    fn input(memo: &Memo, id: NodeId) -> SubsetRef {
        SubsetRef::new(memo.set_of(id), TraitSet::any())
    }

    /// Filter(Join(Scan a, Scan b))
    fn filter_over_join(memo: &mut Memo) -> (NodeId, NodeId, NodeId, NodeId) {
        let a = memo.add_node(scan("a"), TraitSet::any(), vec![], None).node;
        let b = memo.add_node(scan("b"), TraitSet::any(), vec![], None).node;
        let inputs = vec![input(memo, a), input(memo, b)];
        let j = memo.add_node(join(), TraitSet::any(), inputs, None).node;
        let inputs = vec![input(memo, j)];
        let f = memo.add_node(filter(), TraitSet::any(), inputs, None).node;
        (f, j, a, b)
    }

    #[test]
    fn test_single_operand_matches_root_only() {
        let mut memo = Memo::new();
        let (f, j, _, _) = filter_over_join(&mut memo);
        assert_eq!(matches(&memo, &Operand::join(), j).collect::<Vec<_>>(), vec![vec![j]]);
        assert_eq!(matches(&memo, &Operand::join(), f).count(), 0);
    }

    #[test]
    fn test_nested_operand_binds_in_preorder() {
        let mut memo = Memo::new();
        let (f, j, a, b) = filter_over_join(&mut memo);

        let bindings: Vec<_> = matches(&memo, &Operand::filter_join(), f).collect();
        assert_eq!(bindings, vec![vec![f, j]]);

        let full = Operand::filter().with_children(vec![
            Operand::join().with_children(vec![Operand::scan(), Operand::any()])
        ]);
        assert_eq!(full.depth(), 3);
        assert_eq!(full.size(), 4);
        let bindings: Vec<_> = matches(&memo, &full, f).collect();
        assert_eq!(bindings, vec![vec![f, j, a, b]]);
    }

    #[test]
    fn test_pattern_deeper_than_tree_yields_nothing() {
        let mut memo = Memo::new();
        let (_, j, _, _) = filter_over_join(&mut memo);
        let too_deep = Operand::join().with_children(vec![
            Operand::any().with_children(vec![Operand::any()]),
            Operand::any(),
        ]);
        assert_eq!(matches(&memo, &too_deep, j).count(), 0);
    }

    #[test]
    fn test_wildcard_children_constrain_arity() {
        let mut memo = Memo::new();
        let (_, j, a, b) = filter_over_join(&mut memo);

        let unary = Operand::join().with_children(vec![Operand::any()]);
        assert_eq!(matches(&memo, &unary, j).count(), 0);

        let leading = Operand::join().with_leading(vec![Operand::any()]);
        assert_eq!(matches(&memo, &leading, j).collect::<Vec<_>>(), vec![vec![j, a]]);

        let binary = Operand::join().with_children(vec![Operand::any(), Operand::any()]);
        assert_eq!(matches(&memo, &binary, j).collect::<Vec<_>>(), vec![vec![j, a, b]]);
    }

    #[test]
    fn test_child_operand_tries_every_member_in_order() {
        let mut memo = Memo::new();
        let (f, j, a, b) = filter_over_join(&mut memo);
        // A second member in the join's class.
        let other = Operator::Logical(LogicalOp::Join {
            join_type: JoinType::Inner,
            condition: Expr::literal(ScalarValue::Bool(true)),
        });
        let inputs = memo.node(j).inputs.clone();
        let target = memo.set_of(j);
        let j2 = memo.add_node(other, TraitSet::any(), inputs, Some(target)).node;

        let bindings: Vec<_> = matches(&memo, &Operand::filter_join(), f).collect();
        assert_eq!(bindings, vec![vec![f, j], vec![f, j2]]);

        let deep = Operand::filter().with_children(vec![
            Operand::join().with_children(vec![Operand::scan(), Operand::scan()])
        ]);
        let bindings: Vec<_> = matches(&memo, &deep, f).collect();
        assert_eq!(bindings, vec![vec![f, j, a, b], vec![f, j2, a, b]]);
    }

    #[test]
    fn test_cross_product_is_enumerated_last_input_fastest() {
        let mut memo = Memo::new();
        let (_, j, a, b) = filter_over_join(&mut memo);
        let target = memo.set_of(a);
        let a2 = memo.add_node(scan("a2"), TraitSet::any(), vec![], Some(target)).node;
        let target = memo.set_of(b);
        let b2 = memo.add_node(scan("b2"), TraitSet::any(), vec![], Some(target)).node;

        let both = Operand::join().with_children(vec![Operand::scan(), Operand::scan()]);
        let bindings: Vec<_> = matches(&memo, &both, j).collect();
        assert_eq!(
            bindings,
            vec![vec![j, a, b], vec![j, a, b2], vec![j, a2, b], vec![j, a2, b2]]
        );

        let mut lazy = matches(&memo, &both, j);
        assert_eq!(lazy.next(), Some(vec![j, a, b]));
        assert_eq!(lazy.next(), Some(vec![j, a, b2]));
        assert_eq!(lazy.count(), 2);
    }

    #[test]
    fn test_physical_and_wildcard_matchers() {
        let seq = Operator::Physical(PhysicalOp::SeqScan {
            table: TableRef::new("s", "a"),
            columns: vec![],
            predicate: None,
        });
        assert!(OpMatcher::AnyPhysical.accepts(&seq));
        assert!(OpMatcher::Physical(PhysicalOpKind::SeqScan).accepts(&seq));
        assert!(OpMatcher::Any.accepts(&seq));
        assert!(!OpMatcher::AnyLogical.accepts(&seq));
        assert!(!OpMatcher::Logical(LogicalOpKind::Scan).accepts(&seq));
    }
}
