//! # Volcano Search: the Rule-Firing Scheduler
//!
//! [`VolcanoSearch`] owns the memo, the rule registry and the work queue of one
//! optimization run, and drives rule firing until a fixed point or until the budget runs
//! out.
//!
//! ## How It Works
//!
//! 1. **Seeding**: the caller registers a root expression with [`VolcanoSearch::seed`].
//!    Every node that enters the memo queues a `(rule, node)` work item for each rule
//!    whose root operand accepts it.
//! 2. **Firing**: [`VolcanoSearch::run`] pops work items, asks the matcher for the
//!    bindings at that root, and fires the rule once per binding that has not fired
//!    before. A binding is identified by the rule and the digests of its nodes, so the
//!    same binding fires again only if one of its nodes was re-keyed by a merge.
//! 3. **Registration**: proposals are registered into the class of the matched root.
//!    New nodes queue work for themselves and for their ancestors within the deepest
//!    operand of any rule; merges queue work for the parents of the merged class.
//!    Work is queued while draining the memo's change log, right after the mutation
//!    that caused it.
//! 4. **Costing**: physical nodes are costed as soon as every input has a satisfying
//!    subset. When a subset improves, every consumer of that class is re-costed, so
//!    cheaper inputs bubble up through the memo.
//! 5. **Extraction**: [`VolcanoSearch::extract_best`] reads the winners.
//!
//! ## Enforcers
//!
//! A node whose input demands a sort order or distribution, or an explicit
//! [`VolcanoSearch::require`] call, registers an enforcer (`SortOp` or `Exchange`) in the
//! demanded class. The enforcer consumes its own class under the weaker traits.
//!
//! ## Termination
//!
//! The run halts when the queue is empty (`converged`), or when an iteration, time or
//! memo-size limit is hit, or when the budget's cancel token is tripped. A halted run can
//! still be extracted from; it is just not guaranteed to have found the best plan.

use crate::catalog::Catalog;
use crate::config::{Budget, FiringDiscipline, SearchConfig};
use crate::cost::CostModel;
use crate::error::{ExtractionError, RegistryError, RuleError, RuleFiringError};
use crate::expr::*;
use crate::extract::{self, PlanNode};
use crate::memo::{Digest, Memo, MemoEvent, NodeId, RelExpr, RelInput, SetId, SubsetRef};
use crate::pattern::{self, Binding};
use crate::queue::{Priority, RuleQueue, WorkItem};
use crate::rule::{OptContext, Proposal, Rule, RuleCall, RuleId, RuleRegistry, RuleType};
use crate::stats::{self, Statistics};
use crate::traits::{Convention, TraitSet};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No work left: a fixed point.
    Converged,
    IterationLimit,
    TimeLimit,
    MemoLimit,
    Cancelled,
}

/// Outcome of one [`VolcanoSearch::run`].
#[derive(Debug, Clone)]
pub struct RunResult {
    pub converged: bool,
    pub stop: StopReason,
    /// Work items processed.
    pub iterations: usize,
    /// Rule callbacks invoked, failed ones included.
    pub firings: usize,
    pub failed_firings: usize,
    pub errors: Vec<RuleFiringError>,
    /// Callback invocations per rule name.
    pub rule_firings: BTreeMap<String, usize>,
}

impl RunResult {
    fn new() -> Self {
        Self {
            converged: false,
            stop: StopReason::Converged,
            iterations: 0,
            firings: 0,
            failed_firings: 0,
            errors: Vec::new(),
            rule_firings: BTreeMap::new(),
        }
    }

    pub fn firings_of(&self, rule: &str) -> usize {
        self.rule_firings.get(rule).copied().unwrap_or(0)
    }
}

/// The rule-driven search engine.
pub struct VolcanoSearch {
    memo: Memo,
    rules: RuleRegistry,
    queue: RuleQueue,
    /// Bindings that already fired, keyed by rule and node digests.
    fired: HashSet<(RuleId, Vec<Digest>)>,
    /// Firings spent per class, for cost-guided scheduling.
    set_firings: HashMap<SetId, u32>,
    cost_model: Arc<dyn CostModel>,
    catalog: Arc<dyn Catalog>,
    config: SearchConfig,
}

impl VolcanoSearch {
    pub fn new(cost_model: Arc<dyn CostModel>, catalog: Arc<dyn Catalog>, config: SearchConfig) -> Self {
        Self {
            memo: Memo::new(),
            rules: RuleRegistry::new(),
            queue: RuleQueue::new(config.discipline),
            fired: HashSet::new(),
            set_firings: HashMap::new(),
            cost_model,
            catalog,
            config,
        }
    }

    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn discipline(&self) -> FiringDiscipline {
        self.queue.discipline()
    }

    /// Work items waiting to be fired.
    pub fn pending_work(&self) -> usize {
        self.queue.len()
    }

    // ------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------

    /// Register a rule. Nodes already in the memo are queued for it.
    pub fn register_rule(&mut self, rule: Rule) -> Result<RuleId, RegistryError> {
        let id = self.rules.register(rule)?;
        let candidates: Vec<NodeId> = self.memo.live_nodes().collect();
        for node in candidates {
            if self.accepts(id, node) {
                self.push(WorkItem { rule: id, root: node });
            }
        }
        debug!(
            "Registered rule '{}' as {} ({} pending)",
            self.rules.get(id).map(Rule::name).unwrap_or_default(),
            id,
            self.queue.len()
        );
        Ok(id)
    }

    pub fn register_rules(&mut self, rules: impl IntoIterator<Item = Rule>) -> Result<(), RegistryError> {
        for rule in rules {
            self.register_rule(rule)?;
        }
        Ok(())
    }

    /// Remove a rule. Its pending work items are dropped when they come up.
    pub fn remove_rule(&mut self, name: &str) -> Result<Rule, RegistryError> {
        let rule = self.rules.remove(name)?;
        debug!("Removed rule '{}'", name);
        Ok(rule)
    }

    /// Queue `(rule, root)` by hand. Returns false if it is already pending.
    pub fn schedule(&mut self, rule: &str, root: NodeId) -> Result<bool, RegistryError> {
        let id = self
            .rules
            .id_of(rule)
            .ok_or_else(|| RegistryError::UnknownRule(rule.to_string()))?;
        if !self.memo.contains_node(root) || self.memo.node(root).is_retired() {
            return Err(RegistryError::UnknownNode(root));
        }
        Ok(self.push(WorkItem { rule: id, root }))
    }

    // ------------------------------------------------------------------
    // Seeding and requirements
    // ------------------------------------------------------------------

    /// Register a root expression and return its class.
    pub fn seed(&mut self, expr: &RelExpr) -> SetId {
        let reg = self.memo.add_rel(expr, None);
        self.process_events();
        let set = self.memo.find(reg.set);
        debug!(
            "Seeded {} at {}: sets={}, nodes={}, pending={}",
            expr.op,
            set,
            self.memo.num_sets(),
            self.memo.num_nodes(),
            self.queue.len()
        );
        set
    }

    /// Ask for a realization of `set` under `traits`, adding an enforcer if needed.
    pub fn require(&mut self, set: SetId, traits: TraitSet) {
        self.require_inner(set, traits);
        self.process_events();
    }

    fn require_inner(&mut self, set: SetId, traits: TraitSet) {
        if !self.memo.require(set, traits.clone()) || !traits.needs_enforcement() {
            return;
        }
        let mut provided = traits;
        provided.convention = Convention::Physical;
        // Sorting preserves distribution, so a sort enforcer only relaxes the order.
        let (op, below) = if let Some(order) = provided.sort_order.clone() {
            let below = TraitSet {
                sort_order: None,
                ..provided.clone()
            };
            (PhysicalOp::SortOp { order }, below)
        } else if let Some(distribution) = provided.distribution.clone() {
            (PhysicalOp::Exchange { distribution }, provided.relaxed())
        } else {
            return;
        };
        trace!("Adding enforcer {:?} for {}:{}", op, set, provided);
        self.memo.add_node(
            Operator::Physical(op),
            provided,
            vec![SubsetRef::new(set, below)],
            Some(set),
        );
    }

    // ------------------------------------------------------------------
    // Driving loop
    // ------------------------------------------------------------------

    /// Run with the limits from this search's [`SearchConfig`].
    pub fn run_configured(&mut self) -> RunResult {
        let budget = Budget::from(&self.config);
        self.run(&budget)
    }

    /// Fire rules until the queue drains or the budget is exhausted.
    pub fn run(&mut self, budget: &Budget) -> RunResult {
        let started = Instant::now();
        let mut result = RunResult::new();
        debug!(
            "Starting rule firing: discipline={:?}, sets={}, nodes={}, pending={}",
            self.queue.discipline(),
            self.memo.num_sets(),
            self.memo.num_nodes(),
            self.queue.len()
        );

        let stop = loop {
            if self.queue.is_empty() {
                break StopReason::Converged;
            }
            if budget.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if result.iterations >= budget.max_iterations {
                break StopReason::IterationLimit;
            }
            if budget.time_limit.is_some_and(|limit| started.elapsed() >= limit) {
                break StopReason::TimeLimit;
            }
            if self.memo.num_sets() > budget.max_memo_sets {
                break StopReason::MemoLimit;
            }
            let Some(item) = self.next_item() else {
                break StopReason::Converged;
            };
            result.iterations += 1;
            self.process_item(item, &mut result);
        };

        result.stop = stop;
        result.converged = stop == StopReason::Converged;
        debug!(
            "Rule firing stopped ({:?}): iterations={}, firings={}, failed={}, sets={}, nodes={}",
            stop,
            result.iterations,
            result.firings,
            result.failed_firings,
            self.memo.num_sets(),
            self.memo.num_nodes()
        );
        result
    }

    fn next_item(&mut self) -> Option<WorkItem> {
        let Self {
            queue,
            memo,
            rules,
            set_firings,
            ..
        } = self;
        queue.pop(|item| priority_of(memo, rules, set_firings, item))
    }

    fn process_item(&mut self, item: WorkItem, result: &mut RunResult) {
        let Some(rule) = self.rules.get(item.rule).cloned() else {
            trace!("Dropping work for removed {}", item.rule);
            return;
        };
        if self.memo.node(item.root).is_retired() {
            return;
        }

        let bindings: Vec<Binding> = pattern::matches(&self.memo, rule.operand(), item.root).collect();
        for binding in bindings {
            // An earlier firing in this loop may have retired part of the binding.
            if binding.iter().any(|n| self.memo.node(*n).is_retired()) {
                continue;
            }
            let digests: Vec<Digest> = binding.iter().map(|n| self.memo.node(*n).digest()).collect();
            if !self.fired.insert((item.rule, digests)) {
                trace!("Skipping '{}' on {:?}: already fired", rule.name(), binding);
                continue;
            }
            self.fire(&rule, &binding, result);
        }
    }

    fn fire(&mut self, rule: &Rule, binding: &[NodeId], result: &mut RunResult) {
        let origin = self.memo.set_of(binding[0]);
        *self.set_firings.entry(origin).or_insert(0) += 1;
        *result.rule_firings.entry(rule.name().to_string()).or_insert(0) += 1;
        result.firings += 1;
        trace!("Firing '{}' on {:?}", rule.name(), binding);

        let outcome = {
            let ctx = OptContext {
                catalog: self.catalog.as_ref(),
            };
            let mut call = RuleCall::new(rule.name(), &self.memo, ctx, binding);
            rule.fire(&mut call).map(|()| call.into_proposals())
        };
        let outcome = outcome.and_then(|proposals| {
            self.check_proposals(&proposals)?;
            Ok(proposals)
        });

        match outcome {
            Ok(proposals) => self.apply(origin, binding, proposals),
            Err(cause) => {
                warn!("Rule '{}' failed on {:?}: {}", rule.name(), binding, cause);
                result.failed_firings += 1;
                result.errors.push(RuleFiringError {
                    rule: rule.name().to_string(),
                    binding: binding.to_vec(),
                    cause,
                });
            }
        }
    }

    /// Register the proposals of one successful firing into the root's class.
    ///
    /// A proposal identical to a node of the binding (the root, or an input the rule
    /// rediscovered) is dropped together with its equivalences. Nothing is added and
    /// nothing is merged.
    fn apply(&mut self, origin: SetId, binding: &[NodeId], proposals: Vec<Proposal>) {
        for proposal in proposals {
            if let Some(existing) = self.lookup_rel(&proposal.expr) {
                if binding.contains(&existing) {
                    trace!("Proposal {} repeats bound node {}, ignoring", proposal.expr.op, existing);
                    continue;
                }
            }
            let target = self.memo.find(origin);
            let reg = self.memo.add_rel(&proposal.expr, Some(target));
            trace!(
                "Registered {} {} in {}{}",
                reg.node,
                proposal.expr.op,
                reg.set,
                if reg.is_new { "" } else { " (existing)" }
            );
            for (expr, set) in &proposal.equivalences {
                self.memo.add_rel(expr, Some(*set));
            }
            self.process_events();
        }
    }

    /// Every set a proposal reads from or targets must exist in this memo.
    fn check_proposals(&self, proposals: &[Proposal]) -> Result<(), RuleError> {
        for proposal in proposals {
            self.check_rel(&proposal.expr)?;
            for (expr, set) in &proposal.equivalences {
                if !self.memo.contains_set(*set) {
                    return Err(RuleError::InvalidProposal(format!(
                        "equivalence for {} targets unknown {}",
                        expr.op, set
                    )));
                }
                self.check_rel(expr)?;
            }
        }
        Ok(())
    }

    fn check_rel(&self, expr: &RelExpr) -> Result<(), RuleError> {
        for input in &expr.inputs {
            match input {
                RelInput::Subset(r) if !self.memo.contains_set(r.set) => {
                    return Err(RuleError::InvalidProposal(format!(
                        "{} reads unknown {}",
                        expr.op, r.set
                    )));
                }
                RelInput::Subset(_) => {}
                RelInput::Expr(child) => self.check_rel(child)?,
            }
        }
        Ok(())
    }

    /// The node `expr` would intern to, without registering anything.
    fn lookup_rel(&self, expr: &RelExpr) -> Option<NodeId> {
        let inputs = expr
            .inputs
            .iter()
            .map(|input| match input {
                RelInput::Subset(r) => Some(r.clone()),
                RelInput::Expr(child) => self
                    .lookup_rel(child)
                    .map(|n| SubsetRef::new(self.memo.set_of(n), child.traits.clone())),
            })
            .collect::<Option<Vec<_>>>()?;
        self.memo.lookup(&expr.op, &expr.traits, &inputs)
    }

    // ------------------------------------------------------------------
    // Reacting to memo changes
    // ------------------------------------------------------------------

    fn process_events(&mut self) {
        loop {
            let events = self.memo.drain_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                match event {
                    MemoEvent::NodeAdded(id) => self.on_node_added(id),
                    MemoEvent::NodeRekeyed(id) => {
                        self.enqueue_for(id);
                        self.try_cost(id);
                    }
                    MemoEvent::SetsMerged { survivor, absorbed } => {
                        self.on_sets_merged(survivor, absorbed)
                    }
                    MemoEvent::NodeRetired { .. } => {}
                    MemoEvent::SubsetImproved { set, .. } => self.propagate_cost(set),
                }
            }
        }
    }

    fn on_node_added(&mut self, id: NodeId) {
        let demanded: Vec<SubsetRef> = self
            .memo
            .node(id)
            .inputs
            .iter()
            .filter(|input| input.traits.needs_enforcement())
            .cloned()
            .collect();
        for input in demanded {
            self.require_inner(input.set, input.traits);
        }
        self.enqueue_for(id);
        self.try_cost(id);
    }

    fn on_sets_merged(&mut self, survivor: SetId, absorbed: SetId) {
        if let Some(spent) = self.set_firings.remove(&absorbed) {
            *self.set_firings.entry(survivor).or_insert(0) += spent;
        }
        let parents = self.memo.set(survivor).parents().to_vec();
        for parent in parents {
            self.enqueue_for(parent);
        }
    }

    /// Queue rules rooted at `id`, and deeper rules rooted at its ancestors.
    fn enqueue_for(&mut self, id: NodeId) {
        if self.memo.node(id).is_retired() {
            return;
        }
        let rules: Vec<RuleId> = self.rules.iter().map(|(rid, _)| rid).collect();
        for rule in rules {
            if self.accepts(rule, id) {
                self.push(WorkItem { rule, root: id });
            }
        }
        self.enqueue_ancestors(id);
    }

    fn enqueue_ancestors(&mut self, id: NodeId) {
        let max_depth = self.rules.max_depth();
        let start = self.memo.set_of(id);
        let mut seen: HashSet<SetId> = HashSet::from([start]);
        let mut frontier = vec![start];

        for level in 1..max_depth {
            let mut items = Vec::new();
            let mut next = Vec::new();
            for set in &frontier {
                for &parent in self.memo.set(*set).parents() {
                    let node = self.memo.node(parent);
                    if node.is_retired() {
                        continue;
                    }
                    for (rule_id, rule) in self.rules.iter() {
                        if rule.operand().depth() > level && rule.operand().matcher.accepts(&node.op) {
                            items.push(WorkItem {
                                rule: rule_id,
                                root: parent,
                            });
                        }
                    }
                    let parent_set = self.memo.set_of(parent);
                    if seen.insert(parent_set) {
                        next.push(parent_set);
                    }
                }
            }
            for item in items {
                self.push(item);
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }
    }

    fn accepts(&self, rule: RuleId, node: NodeId) -> bool {
        self.rules
            .get(rule)
            .is_some_and(|r| r.operand().matcher.accepts(&self.memo.node(node).op))
    }

    fn push(&mut self, item: WorkItem) -> bool {
        let priority = priority_of(&self.memo, &self.rules, &self.set_firings, &item);
        self.queue.push(item, priority)
    }

    // ------------------------------------------------------------------
    // Costing
    // ------------------------------------------------------------------

    /// Cost a physical node if all of its inputs are realized, and offer it to the
    /// subset of its traits.
    fn try_cost(&mut self, id: NodeId) {
        let node = self.memo.node(id);
        if node.is_retired() {
            return;
        }
        let Some(op) = node.op.as_physical().cloned() else {
            return;
        };
        let traits = node.traits.clone();
        let inputs = node.inputs.clone();

        let mut input_costs = Vec::with_capacity(inputs.len());
        for input in &inputs {
            match self.memo.best_satisfying(input.set, &input.traits) {
                Some(subset) => input_costs.push(subset.cost),
                None => return,
            }
        }

        let set = self.memo.set_of(id);
        let stats = self.derive_stats(set);
        let input_stats: Vec<Statistics> = inputs.iter().map(|i| self.derive_stats(i.set)).collect();
        let input_refs: Vec<&Statistics> = input_stats.iter().collect();
        let cost = self
            .cost_model
            .compute_cost(&op, &stats, &input_refs, &input_costs);

        if self.memo.register_subset(set, traits, id, cost) {
            trace!("New best for {}: {} cost={}", set, id, cost);
        }
    }

    fn propagate_cost(&mut self, set: SetId) {
        let parents = self.memo.set(set).parents().to_vec();
        for parent in parents {
            self.try_cost(parent);
        }
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    /// Statistics of a class, derived once from a representative member and cached.
    fn derive_stats(&mut self, set: SetId) -> Statistics {
        let mut path = Vec::new();
        self.derive_stats_on_path(set, &mut path)
    }

    fn derive_stats_on_path(&mut self, set: SetId, path: &mut Vec<SetId>) -> Statistics {
        let set = self.memo.find(set);
        if let Some(stats) = self.memo.set(set).stats() {
            return stats.clone();
        }
        if path.contains(&set) {
            return Statistics::unknown();
        }
        let Some(rep) = self.representative(set) else {
            return Statistics::unknown();
        };

        path.push(set);
        let stats = self.node_stats(rep, path);
        path.pop();
        self.memo.set_stats(set, stats.clone());
        stats
    }

    /// First member that does not consume its own class; enforcers make poor witnesses.
    fn representative(&self, set: SetId) -> Option<NodeId> {
        let members = self.memo.members(set);
        members
            .iter()
            .copied()
            .find(|&m| {
                self.memo
                    .node(m)
                    .inputs
                    .iter()
                    .all(|i| self.memo.find(i.set) != set)
            })
            .or_else(|| members.first().copied())
    }

    fn node_stats(&mut self, id: NodeId, path: &mut Vec<SetId>) -> Statistics {
        let node = self.memo.node(id);
        let op = node.op.clone();
        let input_sets: Vec<SetId> = node.inputs.iter().map(|i| i.set).collect();
        let input_stats: Vec<Statistics> = input_sets
            .into_iter()
            .map(|s| self.derive_stats_on_path(s, path))
            .collect();
        let first = input_stats.first().cloned().unwrap_or_else(Statistics::unknown);

        match &op {
            Operator::Logical(LogicalOp::TableAccess { table }) => self.table_stats(table, None),
            Operator::Logical(LogicalOp::Scan { table, predicate, .. })
            | Operator::Physical(PhysicalOp::SeqScan { table, predicate, .. }) => {
                self.table_stats(table, predicate.as_ref())
            }
            Operator::Logical(LogicalOp::Filter { predicate })
            | Operator::Physical(PhysicalOp::Filter { predicate }) => {
                let selectivity = stats::estimate_selectivity(predicate, &first);
                stats::derive_filter_stats(&first, selectivity)
            }
            Operator::Logical(LogicalOp::Join { condition, .. })
            | Operator::Physical(PhysicalOp::HashJoin { condition, .. })
            | Operator::Physical(PhysicalOp::MergeJoin { condition, .. })
            | Operator::Physical(PhysicalOp::NestedLoopJoin { condition, .. }) => {
                let right = input_stats.get(1).cloned().unwrap_or_else(Statistics::unknown);
                stats::derive_join_stats(&first, &right, &condition.equi_join_columns())
            }
            Operator::Logical(LogicalOp::Aggregate { group_by, .. })
            | Operator::Physical(PhysicalOp::HashAggregate { group_by, .. }) => {
                let group_cols: Vec<String> = group_by
                    .iter()
                    .filter_map(|e| match e {
                        Expr::Column(c) => Some(c.name.clone()),
                        _ => None,
                    })
                    .collect();
                stats::derive_aggregate_stats(&first, &group_cols)
            }
            Operator::Logical(LogicalOp::Limit { count, .. })
            | Operator::Physical(PhysicalOp::Limit { count, .. }) => {
                let rows = (*count as f64).min(first.row_count);
                let ratio = if first.row_count > 0.0 {
                    rows / first.row_count
                } else {
                    1.0
                };
                stats::derive_filter_stats(&first, ratio)
            }
            // Project, sort and exchange keep cardinality.
            _ => first,
        }
    }

    fn table_stats(&self, table: &TableRef, predicate: Option<&Expr>) -> Statistics {
        let base = self
            .catalog
            .get_table_stats(table)
            .unwrap_or_else(Statistics::unknown);
        match predicate {
            Some(p) => {
                let selectivity = stats::estimate_selectivity(p, &base);
                stats::derive_filter_stats(&base, selectivity)
            }
            None => base,
        }
    }

    // ------------------------------------------------------------------
    // Extraction
    // ------------------------------------------------------------------

    /// Cheapest plan for `set` satisfying `required`.
    pub fn extract_best(&self, set: SetId, required: &TraitSet) -> Result<PlanNode, ExtractionError> {
        let plan = extract::extract(&self.memo, set, required);
        match &plan {
            Ok(p) => debug!("Extracted plan for {}: cost={}, nodes={}", set, p.cost, p.node_count()),
            Err(e) => debug!("Extraction for {} failed: {}", set, e),
        }
        plan
    }
}

fn priority_of(
    memo: &Memo,
    rules: &RuleRegistry,
    set_firings: &HashMap<SetId, u32>,
    item: &WorkItem,
) -> Priority {
    let set = memo.set_of(item.root);
    Priority {
        realized: !memo.set(set).subsets().is_empty(),
        transformation: rules
            .get(item.rule)
            .is_some_and(|r| r.rule_type() == RuleType::Transformation),
        firings: set_firings.get(&set).copied().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::cost::DefaultCostModel;
    use crate::error::RuleError;
    use crate::pattern::Operand;
    use crate::stats::ColumnStatistics;

    fn orders() -> TableRef {
        TableRef::new("sales", "orders")
    }

    fn catalog() -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::new().with_table(
            &orders(),
            vec![ColumnRef::new("orders", "id", 0)],
            Statistics::new(1000.0, 100_000.0).with_column("id", ColumnStatistics::new(1000.0, 0.0)),
        ))
    }

    fn search(config: SearchConfig) -> VolcanoSearch {
        VolcanoSearch::new(Arc::new(DefaultCostModel::default()), catalog(), config)
    }

    fn logical_scan() -> RelExpr {
        RelExpr::logical(
            Operator::Logical(LogicalOp::Scan {
                table: orders(),
                columns: vec![],
                predicate: None,
            }),
            vec![],
        )
    }

    fn seq_scan() -> Operator {
        Operator::Physical(PhysicalOp::SeqScan {
            table: orders(),
            columns: vec![],
            predicate: None,
        })
    }

    fn implement_scan() -> Rule {
        Rule::from_fn("impl_scan", RuleType::Implementation, Operand::scan(), |call| {
            call.transform_to(RelExpr::physical(seq_scan(), vec![]));
            Ok(())
        })
    }

    #[test]
    fn test_physical_seed_is_costed_immediately() {
        let mut search = search(SearchConfig::default());
        let set = search.seed(&RelExpr::physical(seq_scan(), vec![]));
        let best = search.memo().best_satisfying(set, &TraitSet::any()).unwrap();
        assert_eq!(best.cost.total, 1000.0);
    }

    #[test]
    fn test_late_registered_rule_sees_existing_nodes() {
        let mut search = search(SearchConfig::default());
        let set = search.seed(&logical_scan());
        assert_eq!(search.pending_work(), 0);
        search.register_rule(implement_scan()).unwrap();
        assert_eq!(search.pending_work(), 1);

        let result = search.run(&Budget::unlimited());
        assert!(result.converged);
        assert_eq!(result.firings_of("impl_scan"), 1);
        assert_eq!(search.memo().members(set).len(), 2);
    }

    #[test]
    fn test_required_sort_adds_enforcer() {
        let mut search = search(SearchConfig::default());
        let set = search.seed(&RelExpr::physical(seq_scan(), vec![]));
        let sorted = TraitSet::physical().with_sort(vec![SortKey::asc(Expr::column("orders", "id"))]);
        assert!(search.extract_best(set, &sorted).is_err());

        search.require(set, sorted.clone());
        let plan = search.extract_best(set, &sorted).unwrap();
        assert!(matches!(plan.op, Operator::Physical(PhysicalOp::SortOp { .. })));
        assert_eq!(plan.children.len(), 1);
        assert_eq!(plan.children[0].op, seq_scan());
        assert_eq!(plan.children[0].set, plan.set);
        assert!(plan.cost > plan.children[0].cost);

        // Without a sort requirement the bare scan still wins.
        let plain = search.extract_best(set, &TraitSet::any()).unwrap();
        assert_eq!(plain.op, seq_scan());
    }

    #[test]
    fn test_failed_firing_discards_proposals() {
        let mut search = search(SearchConfig::default());
        let set = search.seed(&logical_scan());
        search
            .register_rule(Rule::from_fn(
                "half_done",
                RuleType::Implementation,
                Operand::scan(),
                |call| {
                    call.transform_to(RelExpr::physical(seq_scan(), vec![]));
                    Err(RuleError::Failed("gave up".into()))
                },
            ))
            .unwrap();

        let result = search.run(&Budget::unlimited());
        assert!(result.converged);
        assert_eq!(result.failed_firings, 1);
        assert_eq!(result.errors[0].rule, "half_done");
        assert_eq!(search.memo().members(set).len(), 1);
    }

    #[test]
    fn test_cost_guided_discipline_converges() {
        let config = SearchConfig {
            discipline: FiringDiscipline::CostGuided,
            ..SearchConfig::default()
        };
        let mut search = search(config);
        search.register_rule(implement_scan()).unwrap();
        let set = search.seed(&logical_scan());
        let result = search.run_configured();
        assert!(result.converged);
        assert_eq!(search.extract_best(set, &TraitSet::any()).unwrap().op, seq_scan());
    }

    #[test]
    fn test_stats_are_cached_per_set() {
        let mut search = search(SearchConfig::default());
        let set = search.seed(&RelExpr::physical(seq_scan(), vec![]));
        let stats = search.memo().set(set).stats().unwrap();
        assert_eq!(stats.row_count, 1000.0);
    }
}
