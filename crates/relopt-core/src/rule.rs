//! # Rule System
//!
//! A rule is a value: a name, an [`Operand`] tree, and a callback. Rules are built once at
//! setup time and registered into the [`RuleRegistry`] owned by one search. There is no
//! process-wide rule state.
//!
//! ## Rule Types
//!
//! - **Transformation rules** (`RuleType::Transformation`) rewrite a logical operator
//!   into an equivalent logical operator, e.g. join commutativity.
//! - **Implementation rules** (`RuleType::Implementation`) map a logical operator to
//!   physical operators, e.g. a logical join to a hash join.
//!
//! The distinction only matters for cost-guided scheduling, which fires implementation
//! rules first.
//!
//! ## Firing Protocol
//!
//! For every confirmed binding the scheduler builds a [`RuleCall`] and invokes the
//! rule's [`OnMatch`] handler. The handler reads the bound nodes and may call
//! [`RuleCall::transform_to`] any number of times. Proposals are buffered on the call
//! and registered only after the handler returns `Ok`; an `Err` discards all of them.
//!
//! Handlers must not keep anything from one call to the next. The same rule may be
//! invoked for unrelated bindings in any order.

use crate::catalog::Catalog;
use crate::error::{RegistryError, RuleError};
use crate::memo::{Memo, MemoNode, NodeId, RelExpr, SetId};
use crate::pattern::Operand;
use crate::stats::Statistics;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Classification of optimization rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Logical → Logical.
    Transformation,
    /// Logical → Physical.
    Implementation,
}

/// Context passed to rules during firing. The engine never looks inside it.
#[derive(Clone, Copy)]
pub struct OptContext<'a> {
    pub catalog: &'a dyn Catalog,
}

/// Rule callback.
///
/// Implemented by unit-struct rules and by any
/// `Fn(&mut RuleCall<'_>) -> Result<(), RuleError>` closure.
pub trait OnMatch: Send + Sync {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError>;
}

impl<F> OnMatch for F
where
    F: Fn(&mut RuleCall<'_>) -> Result<(), RuleError> + Send + Sync,
{
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        self(call)
    }
}

/// An immutable rule: identity, operand tree and callback.
#[derive(Clone)]
pub struct Rule {
    name: String,
    rule_type: RuleType,
    operand: Operand,
    handler: Arc<dyn OnMatch>,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        rule_type: RuleType,
        operand: Operand,
        handler: impl OnMatch + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            rule_type,
            operand,
            handler: Arc::new(handler),
        }
    }

    pub fn transformation(
        name: impl Into<String>,
        operand: Operand,
        handler: impl OnMatch + 'static,
    ) -> Self {
        Self::new(name, RuleType::Transformation, operand, handler)
    }

    pub fn implementation(
        name: impl Into<String>,
        operand: Operand,
        handler: impl OnMatch + 'static,
    ) -> Self {
        Self::new(name, RuleType::Implementation, operand, handler)
    }

    /// Build a rule from a closure.
    pub fn from_fn<F>(name: impl Into<String>, rule_type: RuleType, operand: Operand, f: F) -> Self
    where
        F: Fn(&mut RuleCall<'_>) -> Result<(), RuleError> + Send + Sync + 'static,
    {
        Self::new(name, rule_type, operand, f)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    pub fn fire(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        self.handler.on_match(call)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("rule_type", &self.rule_type)
            .field("operand", &self.operand)
            .finish_non_exhaustive()
    }
}

/// One proposed alternative for the matched root's class.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub expr: RelExpr,
    /// Extra equivalences: each expression belongs in the paired class.
    pub equivalences: Vec<(RelExpr, SetId)>,
}

/// The handle a rule callback receives for one binding.
pub struct RuleCall<'a> {
    rule: &'a str,
    memo: &'a Memo,
    ctx: OptContext<'a>,
    binding: &'a [NodeId],
    proposals: Vec<Proposal>,
}

impl<'a> RuleCall<'a> {
    pub fn new(rule: &'a str, memo: &'a Memo, ctx: OptContext<'a>, binding: &'a [NodeId]) -> Self {
        Self {
            rule,
            memo,
            ctx,
            binding,
            proposals: Vec::new(),
        }
    }

    pub fn rule_name(&self) -> &str {
        self.rule
    }

    /// The node bound to operand `i` (preorder). `rel(0)` is the matched root.
    ///
    /// # Panics
    ///
    /// If `i` is not smaller than the operand tree's size.
    pub fn rel(&self, i: usize) -> &'a MemoNode {
        self.memo.node(self.binding[i])
    }

    pub fn binding(&self) -> &[NodeId] {
        self.binding
    }

    pub fn memo(&self) -> &'a Memo {
        self.memo
    }

    pub fn context(&self) -> OptContext<'a> {
        self.ctx
    }

    pub fn catalog(&self) -> &'a dyn Catalog {
        self.ctx.catalog
    }

    /// Statistics of a class, if they have been derived already.
    pub fn stats(&self, set: SetId) -> Option<&'a Statistics> {
        self.memo.set(set).stats()
    }

    /// Propose `expr` as equivalent to the matched root.
    pub fn transform_to(&mut self, expr: RelExpr) {
        self.transform_to_with(expr, Vec::new());
    }

    /// Propose `expr` together with further equivalences discovered on the way.
    pub fn transform_to_with(&mut self, expr: RelExpr, equivalences: Vec<(RelExpr, SetId)>) {
        self.proposals.push(Proposal { expr, equivalences });
    }

    pub fn into_proposals(self) -> Vec<Proposal> {
        self.proposals
    }
}

/// Position of a rule in its registry. Never reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u32);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule#{}", self.0)
    }
}

/// Rules of one search, in registration order.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: Vec<Option<Rule>>,
    by_name: HashMap<String, RuleId>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Names are identities: a second rule with the same name is rejected.
    pub fn register(&mut self, rule: Rule) -> Result<RuleId, RegistryError> {
        if self.by_name.contains_key(rule.name()) {
            return Err(RegistryError::DuplicateRule(rule.name().to_string()));
        }
        let id = RuleId(self.rules.len() as u32);
        self.by_name.insert(rule.name().to_string(), id);
        self.rules.push(Some(rule));
        Ok(id)
    }

    pub fn remove(&mut self, name: &str) -> Result<Rule, RegistryError> {
        let id = self
            .by_name
            .remove(name)
            .ok_or_else(|| RegistryError::UnknownRule(name.to_string()))?;
        self.rules[id.0 as usize]
            .take()
            .ok_or_else(|| RegistryError::UnknownRule(name.to_string()))
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn id_of(&self, name: &str) -> Option<RuleId> {
        self.by_name.get(name).copied()
    }

    /// Live rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().map(|r| (RuleId(i as u32), r)))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Deepest operand tree among the live rules.
    pub fn max_depth(&self) -> usize {
        self.iter().map(|(_, r)| r.operand().depth()).max().unwrap_or(0)
    }
}
