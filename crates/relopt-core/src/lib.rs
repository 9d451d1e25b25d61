//! # relopt-core: Rule-Driven Relational Rewrite Engine
//!
//! This crate implements the engine at the heart of a cost-based query optimizer. Given a
//! tree of logical and physical operators it applies registered, pattern-triggered rules
//! until no further rule has anything new to say, keeps every equivalent form of every
//! sub-expression it discovers, and extracts the cheapest plan.
//!
//! ## Module Overview
//!
//! - **`expr`**: operator vocabulary and scalar expressions.
//! - **`traits`**: trait vectors (convention, sort order, distribution) and satisfaction.
//! - **`memo`**: the equivalence registry. Nodes, classes, subsets, union-find merging.
//! - **`pattern`**: operand trees and the structural matcher producing bindings.
//! - **`rule`**: rules as values, the `RuleCall` handed to callbacks, the rule registry.
//! - **`queue`**: pending work items and the two firing disciplines.
//! - **`search`**: the scheduler and public entry point, [`VolcanoSearch`].
//! - **`extract`**: cheapest-plan extraction with a cycle guard.
//! - **`cost`**: cost model trait and a weighted default implementation.
//! - **`stats`**: cardinality estimates used by the default cost model.
//! - **`catalog`**: table metadata and the table-access capability.
//! - **`config`**: search configuration, run budgets and cancellation.
//! - **`error`**: the error taxonomy.
//!
//! ## Example
//!
//! ```
//! use relopt_core::prelude::*;
//! use std::sync::Arc;
//!
//! let table = TableRef::new("sales", "orders");
//! let catalog = InMemoryCatalog::new().with_table(
//!     &table,
//!     vec![ColumnRef::new("orders", "id", 0)],
//!     Statistics::new(1000.0, 100_000.0),
//! );
//! let mut search = VolcanoSearch::new(
//!     Arc::new(DefaultCostModel::default()),
//!     Arc::new(catalog),
//!     SearchConfig::default(),
//! );
//! search
//!     .register_rule(Rule::from_fn(
//!         "table_access",
//!         RuleType::Implementation,
//!         Operand::table_access(),
//!         |call| {
//!             if let Operator::Logical(LogicalOp::TableAccess { table }) = &call.rel(0).op {
//!                 let concrete = call.catalog().to_rel(table)?;
//!                 call.transform_to(concrete);
//!             }
//!             Ok(())
//!         },
//!     ))
//!     .unwrap();
//!
//! let root = search.seed(&RelExpr::logical(
//!     Operator::Logical(LogicalOp::TableAccess { table }),
//!     vec![],
//! ));
//! assert!(search.run(&Budget::unlimited()).converged);
//! let plan = search.extract_best(root, &TraitSet::any()).unwrap();
//! assert!(plan.op.is_physical());
//! ```

pub mod catalog;
pub mod config;
pub mod cost;
pub mod error;
pub mod expr;
pub mod extract;
pub mod memo;
pub mod pattern;
pub mod queue;
pub mod rule;
pub mod search;
pub mod stats;
pub mod traits;

pub use search::{RunResult, StopReason, VolcanoSearch};

/// The types most callers and rule authors need.
pub mod prelude {
    pub use crate::catalog::{Catalog, InMemoryCatalog};
    pub use crate::config::{Budget, CancelToken, FiringDiscipline, SearchConfig};
    pub use crate::cost::{Cost, CostModel, DefaultCostModel};
    pub use crate::error::{CatalogError, ExtractionError, RegistryError, RuleError, RuleFiringError};
    pub use crate::expr::*;
    pub use crate::extract::PlanNode;
    pub use crate::memo::{Memo, MemoNode, NodeId, RelExpr, RelInput, SetId, SubsetRef};
    pub use crate::pattern::Operand;
    pub use crate::rule::{OnMatch, OptContext, Rule, RuleCall, RuleType};
    pub use crate::search::{RunResult, StopReason, VolcanoSearch};
    pub use crate::stats::{ColumnStatistics, Statistics};
    pub use crate::traits::{Convention, TraitSet};
}
