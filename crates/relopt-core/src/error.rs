//! # Error Taxonomy
//!
//! Failures are isolated at the smallest unit that can fail:
//!
//! - [`RegistryError`]: rule registration conflicts. Rejected immediately; the run is
//!   unaffected.
//! - [`RuleError`]: a rule callback (or a collaborator it called) failed for one
//!   binding. The scheduler wraps it in a [`RuleFiringError`], records it in the run
//!   result, discards that binding's proposals, and keeps going.
//! - [`ExtractionError`]: plan extraction failed. Local to the extraction call; the
//!   registry is left untouched.
//!
//! Running out of budget is not an error. It is reported through
//! `RunResult::converged == false`.

use crate::expr::TableRef;
use crate::memo::{NodeId, SetId};
use crate::traits::TraitSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("rule '{0}' is already registered")]
    DuplicateRule(String),
    #[error("no rule named '{0}' is registered")]
    UnknownRule(String),
    #[error("{0} is not a live node")]
    UnknownNode(NodeId),
}

/// Failure of the external table-access capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("table {0} not found in catalog")]
    UnknownTable(TableRef),
    #[error("table {table} cannot be converted: {reason}")]
    Unsupported { table: TableRef, reason: String },
}

/// Why a single rule firing failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The binding did not have the shape the rule expected (a rule defect).
    #[error("unexpected binding: {0}")]
    UnexpectedBinding(String),
    /// A proposal refers to a set the memo has never handed out (a rule defect).
    #[error("invalid proposal: {0}")]
    InvalidProposal(String),
    #[error("{0}")]
    Failed(String),
}

/// A recorded rule-firing failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("rule '{rule}' failed on binding {binding:?}: {cause}")]
pub struct RuleFiringError {
    pub rule: String,
    pub binding: Vec<NodeId>,
    #[source]
    pub cause: RuleError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// No subset of a reachable class satisfies the required traits.
    #[error("no realization of {set} satisfies {required}")]
    NoRealization { set: SetId, required: TraitSet },
    /// A class depends on itself under the same requirement; indicates a rule defect.
    #[error("cyclic plan: {set} under {required} depends on itself")]
    CyclicPlan { set: SetId, required: TraitSet },
    #[error("{0} is not a known equivalence set")]
    UnknownSet(SetId),
}
