//! # Catalog and Table Access
//!
//! The catalog is an external collaborator. It answers two kinds of questions:
//!
//! - **Metadata**: column definitions and table statistics, used by statistics
//!   derivation and the cost model.
//! - **Table access**: given a table reference, produce the concrete operator tree the
//!   table prefers to be read with (`to_rel`). The table-access rule replaces every
//!   `TableAccess` placeholder with this tree.
//!
//! Calls are synchronous and must not mutate anything the optimizer can observe. A
//! failing `to_rel` aborts only the rule firing that called it.
//!
//! `InMemoryCatalog` is a `HashMap`-backed implementation for tests and embedding.

use crate::error::CatalogError;
use crate::expr::{ColumnRef, Operator, PhysicalOp, TableRef};
use crate::memo::RelExpr;
use crate::stats::Statistics;
use crate::traits::TraitSet;
use std::collections::HashMap;

/// Schema, statistics and table-access capability.
pub trait Catalog: Send + Sync {
    fn get_table_stats(&self, table: &TableRef) -> Option<Statistics>;

    fn get_table_columns(&self, table: &TableRef) -> Option<Vec<ColumnRef>>;

    /// Convert a table reference into its preferred concrete access tree.
    ///
    /// The default is a physical sequential scan over every known column.
    fn to_rel(&self, table: &TableRef) -> Result<RelExpr, CatalogError> {
        let columns = self
            .get_table_columns(table)
            .ok_or_else(|| CatalogError::UnknownTable(table.clone()))?;
        Ok(RelExpr::leaf(
            Operator::Physical(PhysicalOp::SeqScan {
                table: table.clone(),
                columns,
                predicate: None,
            }),
            TraitSet::physical(),
        ))
    }
}

/// In-memory catalog keyed by `schema.table`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    pub table_stats: HashMap<String, Statistics>,
    pub table_columns: HashMap<String, Vec<ColumnRef>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, table: &TableRef, columns: Vec<ColumnRef>, stats: Statistics) {
        let key = table.to_string();
        self.table_columns.insert(key.clone(), columns);
        self.table_stats.insert(key, stats);
    }

    /// Builder-style `add_table` for tests.
    pub fn with_table(mut self, table: &TableRef, columns: Vec<ColumnRef>, stats: Statistics) -> Self {
        self.add_table(table, columns, stats);
        self
    }
}

impl Catalog for InMemoryCatalog {
    fn get_table_stats(&self, table: &TableRef) -> Option<Statistics> {
        self.table_stats.get(&table.to_string()).cloned()
    }

    fn get_table_columns(&self, table: &TableRef) -> Option<Vec<ColumnRef>> {
        self.table_columns.get(&table.to_string()).cloned()
    }
}
