//! # Memo: the Equivalence Registry
//!
//! The memo holds every expression discovered during one optimization run, grouped into
//! equivalence classes ("sets") of interchangeable expressions.
//!
//! ## Arena and References
//!
//! Nodes live in an arena indexed by [`NodeId`]; sets live in an arena indexed by
//! [`SetId`]. A node never points at another node. Its inputs are [`SubsetRef`]s: a set
//! id plus the traits required of that input. This is what lets a set contain a node
//! whose input is the very same set (an enforcer, or a rule that rediscovers its input)
//! without any ownership cycle.
//!
//! ## Interning
//!
//! Every node is keyed by `(operator, traits, canonical inputs)`. Registering a node
//! whose key already exists returns the existing node instead of creating a duplicate.
//! If the caller asked for the node to join a different set, the two sets are merged:
//! the same expression cannot belong to two classes.
//!
//! ## Merging
//!
//! Sets are merged with a union-find over set ids. The survivor is always the smaller
//! id, member lists are kept sorted by node id, and subsets combine by lowest cost with
//! ties going to the lower node id. Final membership and per-trait winners therefore do
//! not depend on the order merges happen in.
//!
//! A merge changes the canonical form of every node that consumes the absorbed set, so
//! those parents are re-keyed. A re-keyed node may collide with an existing node, which
//! proves two more sets equivalent and cascades into another merge. A node that turns
//! out to duplicate another one is retired: it leaves its member list and forwards to
//! the surviving node.
//!
//! ## Subsets
//!
//! Within a set, at most one [`Subset`] exists per distinct trait vector. It records the
//! best known physical node and its cost. The recorded cost only ever goes down.
//!
//! ## Events
//!
//! Every structural change is appended to an event log. The scheduler drains it after
//! each mutation so that new work is enqueued together with the change that caused it.

use crate::cost::Cost;
use crate::expr::Operator;
use crate::stats::Statistics;
use crate::traits::TraitSet;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::{debug, trace};

/// Arena index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Stable surrogate key of an equivalence class. May be stale after a merge; resolve
/// with [`Memo::find`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SetId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "set#{}", self.0)
    }
}

/// Structural digest of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub u64);

/// Input reference: an equivalence class plus the traits required of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubsetRef {
    pub set: SetId,
    pub traits: TraitSet,
}

impl SubsetRef {
    pub fn new(set: SetId, traits: TraitSet) -> Self {
        Self { set, traits }
    }
}

impl fmt::Display for SubsetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.set, self.traits)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeKey {
    op: Operator,
    traits: TraitSet,
    inputs: Vec<SubsetRef>,
}

impl NodeKey {
    fn digest(&self) -> Digest {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        Digest(hasher.finish())
    }
}

/// Immutable expression node stored in the memo.
#[derive(Debug, Clone)]
pub struct MemoNode {
    pub id: NodeId,
    pub op: Operator,
    pub traits: TraitSet,
    /// Canonical as of the last re-key.
    pub inputs: Vec<SubsetRef>,
    digest: Digest,
    set: SetId,
    duplicate_of: Option<NodeId>,
}

impl MemoNode {
    pub fn digest(&self) -> Digest {
        self.digest
    }

    pub fn is_retired(&self) -> bool {
        self.duplicate_of.is_some()
    }

    /// This node as a proposal over its current input subsets.
    pub fn to_rel(&self) -> RelExpr {
        RelExpr::new(
            self.op.clone(),
            self.traits.clone(),
            self.inputs.iter().cloned().map(RelInput::Subset).collect(),
        )
    }
}

/// Owned expression tree proposed by a rule (or seeded by a caller).
///
/// Inputs either point at existing subsets or nest new expressions that are registered
/// bottom-up, each in its own new (or interned) set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelExpr {
    pub op: Operator,
    pub traits: TraitSet,
    pub inputs: Vec<RelInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelInput {
    Subset(SubsetRef),
    Expr(Box<RelExpr>),
}

impl RelExpr {
    pub fn new(op: Operator, traits: TraitSet, inputs: Vec<RelInput>) -> Self {
        Self { op, traits, inputs }
    }

    pub fn leaf(op: Operator, traits: TraitSet) -> Self {
        Self::new(op, traits, vec![])
    }

    /// Logical node (`Convention::None`).
    pub fn logical(op: Operator, inputs: Vec<RelInput>) -> Self {
        Self::new(op, TraitSet::any(), inputs)
    }

    /// Physical node with no ordering or distribution of its own.
    pub fn physical(op: Operator, inputs: Vec<RelInput>) -> Self {
        Self::new(op, TraitSet::physical(), inputs)
    }
}

impl RelInput {
    pub fn subset(set: SetId, traits: TraitSet) -> Self {
        RelInput::Subset(SubsetRef::new(set, traits))
    }

    pub fn expr(expr: RelExpr) -> Self {
        RelInput::Expr(Box::new(expr))
    }
}

impl From<RelExpr> for RelInput {
    fn from(expr: RelExpr) -> Self {
        RelInput::expr(expr)
    }
}

/// Best known realization of a set under one trait vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Subset {
    pub traits: TraitSet,
    pub best: NodeId,
    pub cost: Cost,
}

/// An equivalence class.
#[derive(Debug, Clone, Default)]
pub struct RelSet {
    members: Vec<NodeId>,
    /// Nodes that consume this set as an input. May contain retired nodes.
    parents: Vec<NodeId>,
    subsets: Vec<Subset>,
    /// Trait vectors explicitly requested of this set.
    required: Vec<TraitSet>,
    stats: Option<Statistics>,
}

impl RelSet {
    /// Live members in node-id (registration) order.
    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn subsets(&self) -> &[Subset] {
        &self.subsets
    }

    pub fn required(&self) -> &[TraitSet] {
        &self.required
    }

    pub fn stats(&self) -> Option<&Statistics> {
        self.stats.as_ref()
    }
}

/// Structural change recorded for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoEvent {
    NodeAdded(NodeId),
    SetsMerged { survivor: SetId, absorbed: SetId },
    /// The node's inputs were re-canonicalized; its digest changed.
    NodeRekeyed(NodeId),
    NodeRetired { node: NodeId, duplicate_of: NodeId },
    SubsetImproved { set: SetId, traits: TraitSet },
}

/// Result of registering a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub node: NodeId,
    pub set: SetId,
    /// False when an identical node already existed.
    pub is_new: bool,
}

/// The equivalence registry of one optimization run.
#[derive(Debug, Default)]
pub struct Memo {
    nodes: Vec<MemoNode>,
    sets: Vec<RelSet>,
    /// Union-find parent pointers, indexed by set id.
    uf_parent: Vec<SetId>,
    index: HashMap<NodeKey, NodeId>,
    events: Vec<MemoEvent>,
    live_sets: usize,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Canonical representative of `set`.
    pub fn find(&self, set: SetId) -> SetId {
        let mut cur = set;
        while self.uf_parent[cur.0 as usize] != cur {
            cur = self.uf_parent[cur.0 as usize];
        }
        cur
    }

    /// `find` with path compression.
    fn find_compress(&mut self, set: SetId) -> SetId {
        let root = self.find(set);
        let mut cur = set;
        while cur != root {
            let next = self.uf_parent[cur.0 as usize];
            self.uf_parent[cur.0 as usize] = root;
            cur = next;
        }
        root
    }

    pub fn contains_set(&self, set: SetId) -> bool {
        (set.0 as usize) < self.sets.len()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        (id.0 as usize) < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &MemoNode {
        &self.nodes[id.0 as usize]
    }

    /// Follow duplicate forwarding to the live node.
    pub fn resolve_node(&self, id: NodeId) -> NodeId {
        let mut cur = id;
        while let Some(next) = self.node(cur).duplicate_of {
            cur = next;
        }
        cur
    }

    /// Current set of a node.
    pub fn set_of(&self, id: NodeId) -> SetId {
        self.find(self.node(id).set)
    }

    /// The canonical set record for `set`.
    pub fn set(&self, set: SetId) -> &RelSet {
        &self.sets[self.find(set).0 as usize]
    }

    pub fn members(&self, set: SetId) -> &[NodeId] {
        self.set(set).members()
    }

    pub fn canonical(&self, r: &SubsetRef) -> SubsetRef {
        SubsetRef::new(self.find(r.set), r.traits.clone())
    }

    /// Look up a structurally identical node, if one is registered.
    pub fn lookup(&self, op: &Operator, traits: &TraitSet, inputs: &[SubsetRef]) -> Option<NodeId> {
        self.index.get(&self.key(op, traits, inputs)).copied()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live (canonical) sets.
    pub fn num_sets(&self) -> usize {
        self.live_sets
    }

    /// Ids of all nodes that have not been retired, ascending.
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().filter(|n| !n.is_retired()).map(|n| n.id)
    }

    /// Ids of all live sets, ascending.
    pub fn set_ids(&self) -> impl Iterator<Item = SetId> + '_ {
        self.uf_parent
            .iter()
            .enumerate()
            .filter(|(i, p)| p.0 as usize == *i)
            .map(|(_, p)| *p)
    }

    fn key(&self, op: &Operator, traits: &TraitSet, inputs: &[SubsetRef]) -> NodeKey {
        NodeKey {
            op: op.clone(),
            traits: traits.clone(),
            inputs: inputs.iter().map(|r| self.canonical(r)).collect(),
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Intern a node.
    ///
    /// With `target == None` an unseen node gets a fresh singleton set. With a target,
    /// an unseen node joins it, and an already interned node living elsewhere causes the
    /// two sets to merge.
    pub fn add_node(
        &mut self,
        op: Operator,
        traits: TraitSet,
        inputs: Vec<SubsetRef>,
        target: Option<SetId>,
    ) -> Registration {
        let key = self.key(&op, &traits, &inputs);
        if let Some(&existing) = self.index.get(&key) {
            let mut set = self.set_of(existing);
            if let Some(target) = target {
                if self.find(target) != set {
                    set = self.merge(target, set);
                }
            }
            return Registration {
                node: existing,
                set,
                is_new: false,
            };
        }

        let set = match target {
            Some(t) => self.find_compress(t),
            None => self.new_set(),
        };
        let id = NodeId(self.nodes.len() as u32);
        let digest = key.digest();
        let canonical_inputs = key.inputs.clone();

        let mut input_sets: Vec<SetId> = canonical_inputs.iter().map(|r| r.set).collect();
        input_sets.sort();
        input_sets.dedup();
        for input_set in input_sets {
            self.sets[input_set.0 as usize].parents.push(id);
        }

        self.nodes.push(MemoNode {
            id,
            op,
            traits,
            inputs: canonical_inputs,
            digest,
            set,
            duplicate_of: None,
        });
        // Ids are monotonic, so pushing keeps members sorted.
        self.sets[set.0 as usize].members.push(id);
        self.index.insert(key, id);
        self.events.push(MemoEvent::NodeAdded(id));
        trace!("registered {} {} in {}", id, self.node(id).op, set);

        Registration {
            node: id,
            set,
            is_new: true,
        }
    }

    /// Register an expression tree bottom-up. Nested inputs land in their own sets
    /// (or in the set of an identical, already interned node).
    pub fn add_rel(&mut self, expr: &RelExpr, target: Option<SetId>) -> Registration {
        let inputs = expr
            .inputs
            .iter()
            .map(|input| match input {
                RelInput::Subset(r) => r.clone(),
                RelInput::Expr(child) => {
                    let reg = self.add_rel(child, None);
                    SubsetRef::new(reg.set, child.traits.clone())
                }
            })
            .collect();
        self.add_node(expr.op.clone(), expr.traits.clone(), inputs, target)
    }

    fn new_set(&mut self) -> SetId {
        let id = SetId(self.sets.len() as u32);
        self.sets.push(RelSet::default());
        self.uf_parent.push(id);
        self.live_sets += 1;
        id
    }

    // ------------------------------------------------------------------
    // Merging
    // ------------------------------------------------------------------

    /// Union two sets and return the surviving canonical id. Idempotent.
    pub fn merge(&mut self, a: SetId, b: SetId) -> SetId {
        let ra = self.find_compress(a);
        let rb = self.find_compress(b);
        if ra == rb {
            return ra;
        }
        let (survivor, absorbed) = if ra < rb { (ra, rb) } else { (rb, ra) };
        debug!("merging {} into {}", absorbed, survivor);

        self.uf_parent[absorbed.0 as usize] = survivor;
        self.live_sets -= 1;
        let gone = std::mem::take(&mut self.sets[absorbed.0 as usize]);

        {
            let target = &mut self.sets[survivor.0 as usize];
            target.members.extend(gone.members);
            target.members.sort();
            target.members.dedup();
            target.parents.extend(gone.parents);
            target.parents.sort();
            target.parents.dedup();
            for traits in gone.required {
                if !target.required.contains(&traits) {
                    target.required.push(traits);
                }
            }
            if target.stats.is_none() {
                target.stats = gone.stats;
            }
        }
        for subset in gone.subsets {
            self.offer_subset(survivor, subset.traits, subset.best, subset.cost, true);
        }
        self.events.push(MemoEvent::SetsMerged { survivor, absorbed });

        // Consumers of the absorbed set now have a different canonical form.
        let mut cascade = Vec::new();
        let parents = self.sets[survivor.0 as usize].parents.clone();
        for parent in parents {
            self.rekey(parent, &mut cascade);
        }
        for (x, y) in cascade {
            self.merge(x, y);
        }
        self.find_compress(survivor)
    }

    /// Re-canonicalize a node's inputs after a merge. Collisions with another node are
    /// returned as set pairs that must be merged.
    fn rekey(&mut self, id: NodeId, cascade: &mut Vec<(SetId, SetId)>) {
        if self.node(id).is_retired() {
            return;
        }
        let node = self.node(id);
        let old_key = NodeKey {
            op: node.op.clone(),
            traits: node.traits.clone(),
            inputs: node.inputs.clone(),
        };
        let new_key = self.key(&old_key.op, &old_key.traits, &old_key.inputs);
        if new_key == old_key {
            return;
        }

        if self.index.get(&old_key) == Some(&id) {
            self.index.remove(&old_key);
        }
        let digest = new_key.digest();
        let new_inputs = new_key.inputs.clone();

        match self.index.get(&new_key).copied() {
            Some(other) if other != id => {
                // Keep the older node; its id orders first in member lists.
                let (keep, retire) = if other < id { (other, id) } else { (id, other) };
                let keep_set = self.set_of(keep);
                let retire_set = self.set_of(retire);
                self.index.insert(new_key, keep);
                self.retire(retire, keep);
                if keep_set != retire_set {
                    cascade.push((keep_set, retire_set));
                }
            }
            _ => {
                self.index.insert(new_key, id);
            }
        }

        let node = &mut self.nodes[id.0 as usize];
        node.inputs = new_inputs;
        node.digest = digest;
        self.events.push(MemoEvent::NodeRekeyed(id));
    }

    fn retire(&mut self, node: NodeId, keep: NodeId) {
        let set = self.set_of(node);
        self.nodes[node.0 as usize].duplicate_of = Some(keep);
        let record = &mut self.sets[set.0 as usize];
        record.members.retain(|m| *m != node);
        for subset in record.subsets.iter_mut() {
            if subset.best == node {
                subset.best = keep;
            }
        }
        debug!("retired {} as duplicate of {}", node, keep);
        self.events.push(MemoEvent::NodeRetired {
            node,
            duplicate_of: keep,
        });
    }

    // ------------------------------------------------------------------
    // Subsets
    // ------------------------------------------------------------------

    /// Insert or improve the best realization of `set` under `traits`.
    ///
    /// Only a strictly lower cost replaces the current winner. Returns whether the
    /// subset changed.
    pub fn register_subset(&mut self, set: SetId, traits: TraitSet, node: NodeId, cost: Cost) -> bool {
        let set = self.find_compress(set);
        self.offer_subset(set, traits, node, cost, false)
    }

    /// With `tie_by_id`, an equal cost also wins when it comes from a lower node id.
    /// Merges use it so that combining subsets is order-independent.
    fn offer_subset(
        &mut self,
        set: SetId,
        traits: TraitSet,
        node: NodeId,
        cost: Cost,
        tie_by_id: bool,
    ) -> bool {
        let subsets = &mut self.sets[set.0 as usize].subsets;
        let improved = match subsets.iter_mut().find(|s| s.traits == traits) {
            None => {
                subsets.push(Subset {
                    traits: traits.clone(),
                    best: node,
                    cost,
                });
                true
            }
            Some(existing) => {
                let better = cost.is_lt(&existing.cost)
                    || (tie_by_id && cost == existing.cost && node < existing.best);
                if better {
                    existing.best = node;
                    existing.cost = cost;
                }
                better
            }
        };
        if improved {
            trace!("subset {}:{} improved to {} (cost {})", set, traits, node, cost);
            self.events.push(MemoEvent::SubsetImproved { set, traits });
        }
        improved
    }

    /// The subset of `set` recorded for exactly `traits`.
    pub fn subset(&self, set: SetId, traits: &TraitSet) -> Option<&Subset> {
        self.set(set).subsets.iter().find(|s| &s.traits == traits)
    }

    /// Cheapest subset of `set` whose traits satisfy `required`. Equal costs go to the
    /// lower node id, i.e. the earlier registered node.
    pub fn best_satisfying(&self, set: SetId, required: &TraitSet) -> Option<&Subset> {
        self.set(set)
            .subsets
            .iter()
            .filter(|s| s.traits.satisfies(required))
            .fold(None, |best: Option<&Subset>, s| match best {
                None => Some(s),
                Some(b) if s.cost.is_lt(&b.cost) || (s.cost == b.cost && s.best < b.best) => {
                    Some(s)
                }
                keep => keep,
            })
    }

    /// Record that `traits` has been requested of `set`. Returns false if it already was.
    pub fn require(&mut self, set: SetId, traits: TraitSet) -> bool {
        let set = self.find_compress(set);
        let record = &mut self.sets[set.0 as usize];
        if record.required.contains(&traits) {
            return false;
        }
        record.required.push(traits);
        true
    }

    pub fn set_stats(&mut self, set: SetId, stats: Statistics) {
        let set = self.find_compress(set);
        self.sets[set.0 as usize].stats = Some(stats);
    }

    /// Take the structural changes recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<MemoEvent> {
        std::mem::take(&mut self.events)
    }
}

impl fmt::Display for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for set in self.set_ids() {
            writeln!(f, "{set}:")?;
            for &m in self.members(set) {
                let node = self.node(m);
                write!(f, "  {} {} [{}]", m, node.op, node.traits)?;
                for input in &node.inputs {
                    write!(f, " {}", self.canonical(input))?;
                }
                writeln!(f)?;
            }
            for subset in self.set(set).subsets() {
                writeln!(f, "  best[{}] = {} cost={}", subset.traits, subset.best, subset.cost)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::*;

    fn scan(name: &str) -> Operator {
        Operator::Logical(LogicalOp::Scan {
            table: TableRef::new("s", name),
            columns: vec![],
            predicate: None,
        })
    }

    fn filter(v: i64) -> Operator {
        Operator::Logical(LogicalOp::Filter {
            predicate: Expr::equals(Expr::column("t", "a"), Expr::literal(ScalarValue::Int64(v))),
        })
    }

    fn any(set: SetId) -> SubsetRef {
        SubsetRef::new(set, TraitSet::any())
    }

    #[test]
    fn test_interning_returns_existing_node() {
        let mut memo = Memo::new();
        let a = memo.add_node(scan("a"), TraitSet::any(), vec![], None);
        let again = memo.add_node(scan("a"), TraitSet::any(), vec![], None);
        assert!(a.is_new);
        assert!(!again.is_new);
        assert_eq!(a.node, again.node);
        assert_eq!(a.set, again.set);
        assert_eq!(memo.num_sets(), 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut memo = Memo::new();
        let a = memo.add_node(scan("a"), TraitSet::any(), vec![], None).set;
        let b = memo.add_node(scan("b"), TraitSet::any(), vec![], None).set;
        let m = memo.merge(a, b);
        assert_eq!(m, a);
        assert_eq!(memo.merge(a, b), a);
        assert_eq!(memo.merge(b, b), a);
        assert_eq!(memo.members(b).len(), 2);
        assert_eq!(memo.num_sets(), 1);
    }

    #[test]
    fn test_adding_existing_node_into_other_set_merges() {
        let mut memo = Memo::new();
        let a = memo.add_node(scan("a"), TraitSet::any(), vec![], None).set;
        let b = memo.add_node(scan("b"), TraitSet::any(), vec![], None).set;
        let reg = memo.add_node(scan("a"), TraitSet::any(), vec![], Some(b));
        assert!(!reg.is_new);
        assert_eq!(memo.find(a), memo.find(b));
    }

    #[test]
    fn test_merge_rekeys_parents_and_cascades() {
        let mut memo = Memo::new();
        let a = memo.add_node(scan("a"), TraitSet::any(), vec![], None).set;
        let b = memo.add_node(scan("b"), TraitSet::any(), vec![], None).set;
        let fa = memo.add_node(filter(1), TraitSet::any(), vec![any(a)], None);
        let fb = memo.add_node(filter(1), TraitSet::any(), vec![any(b)], None);
        assert_ne!(fa.set, fb.set);
        let before = memo.node(fb.node).digest();

        memo.merge(a, b);

        // Filter(a) and Filter(b) are now the same expression.
        assert_eq!(memo.find(fa.set), memo.find(fb.set));
        assert_eq!(memo.members(fa.set), &[fa.node]);
        assert_eq!(memo.resolve_node(fb.node), fa.node);
        assert_ne!(memo.node(fb.node).digest(), before);
        let events = memo.drain_events();
        assert!(events.contains(&MemoEvent::NodeRetired {
            node: fb.node,
            duplicate_of: fa.node
        }));
    }

    #[test]
    fn test_subset_cost_only_decreases() {
        let mut memo = Memo::new();
        let reg = memo.add_node(scan("a"), TraitSet::physical(), vec![], None);
        let t = TraitSet::physical();
        assert!(memo.register_subset(reg.set, t.clone(), reg.node, Cost::new(10.0)));
        assert!(!memo.register_subset(reg.set, t.clone(), reg.node, Cost::new(12.0)));
        assert!(!memo.register_subset(reg.set, t.clone(), reg.node, Cost::new(10.0)));
        assert!(memo.register_subset(reg.set, t.clone(), reg.node, Cost::new(4.0)));
        assert_eq!(memo.subset(reg.set, &t).unwrap().cost, Cost::new(4.0));
        assert_eq!(memo.set(reg.set).subsets().len(), 1);
    }

    #[test]
    fn test_best_satisfying_prefers_cheapest_matching_subset() {
        let mut memo = Memo::new();
        let reg = memo.add_node(scan("a"), TraitSet::physical(), vec![], None);
        let sorted = TraitSet::physical().with_sort(vec![SortKey::asc(Expr::column("a", "x"))]);
        memo.register_subset(reg.set, TraitSet::physical(), reg.node, Cost::new(10.0));
        memo.register_subset(reg.set, sorted.clone(), reg.node, Cost::new(7.0));

        let any_best = memo.best_satisfying(reg.set, &TraitSet::any()).unwrap();
        assert_eq!(any_best.cost, Cost::new(7.0));
        let sorted_best = memo.best_satisfying(reg.set, &sorted).unwrap();
        assert_eq!(sorted_best.traits, sorted);
        let other = TraitSet::physical().with_sort(vec![SortKey::asc(Expr::column("a", "y"))]);
        assert!(memo.best_satisfying(reg.set, &other).is_none());
    }

    #[test]
    fn test_add_rel_registers_nested_inputs() {
        let mut memo = Memo::new();
        let tree = RelExpr::logical(filter(3), vec![RelExpr::logical(scan("a"), vec![]).into()]);
        let root = memo.add_rel(&tree, None);
        assert_eq!(memo.num_sets(), 2);
        let node = memo.node(root.node);
        assert_eq!(node.inputs.len(), 1);
        assert_eq!(memo.set(node.inputs[0].set).parents(), &[root.node]);
    }
}
