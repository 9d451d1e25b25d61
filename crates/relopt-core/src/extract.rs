//! # Plan Extraction
//!
//! Walks the memo top-down from a root class and picks, for every class reached, the
//! cheapest subset whose traits satisfy what the consumer requires. The result is a
//! self-contained [`PlanNode`] tree that no longer refers to the memo.
//!
//! Extraction is read-only. A failure is reported to the caller and leaves the memo
//! exactly as it was.
//!
//! ## Cycle Guard
//!
//! The active recursion path is tracked as `(class, required traits)` pairs. Enforcers
//! legitimately consume their own class under weaker traits, so the class alone is not
//! enough; revisiting the same pair, however, means a plan would contain itself and is
//! reported as [`ExtractionError::CyclicPlan`].

use crate::cost::Cost;
use crate::error::ExtractionError;
use crate::expr::Operator;
use crate::memo::{Memo, NodeId, SetId};
use crate::traits::TraitSet;
use std::fmt::Write;

/// A node of an extracted plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub op: Operator,
    pub traits: TraitSet,
    /// Total cost of this subtree.
    pub cost: Cost,
    /// Class the node was chosen from.
    pub set: SetId,
    /// Memo node the plan node was copied from.
    pub node: NodeId,
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    /// Indented multi-line rendering, one operator per line.
    pub fn display(&self, indent: usize) -> String {
        let mut out = String::new();
        self.render(indent, &mut out);
        out
    }

    fn render(&self, indent: usize, out: &mut String) {
        let _ = writeln!(
            out,
            "{}{} (cost={})",
            "  ".repeat(indent),
            self.op,
            self.cost
        );
        for child in &self.children {
            child.render(indent + 1, out);
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(PlanNode::node_count).sum::<usize>()
    }
}

/// Extract the cheapest plan for `set` satisfying `required`.
pub fn extract(memo: &Memo, set: SetId, required: &TraitSet) -> Result<PlanNode, ExtractionError> {
    if !memo.contains_set(set) {
        return Err(ExtractionError::UnknownSet(set));
    }
    let mut path = Vec::new();
    extract_set(memo, set, required, &mut path)
}

fn extract_set(
    memo: &Memo,
    set: SetId,
    required: &TraitSet,
    path: &mut Vec<(SetId, TraitSet)>,
) -> Result<PlanNode, ExtractionError> {
    let set = memo.find(set);
    if path.iter().any(|(s, t)| *s == set && t == required) {
        return Err(ExtractionError::CyclicPlan {
            set,
            required: required.clone(),
        });
    }
    let subset = memo
        .best_satisfying(set, required)
        .ok_or_else(|| ExtractionError::NoRealization {
            set,
            required: required.clone(),
        })?;
    let node_id = memo.resolve_node(subset.best);
    let node = memo.node(node_id);

    path.push((set, required.clone()));
    let children = node
        .inputs
        .iter()
        .map(|input| extract_set(memo, input.set, &input.traits, path))
        .collect::<Result<Vec<_>, _>>();
    path.pop();

    Ok(PlanNode {
        op: node.op.clone(),
        traits: node.traits.clone(),
        cost: subset.cost,
        set,
        node: node_id,
        children: children?,
    })
}
