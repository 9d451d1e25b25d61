//! # Table Access Rule
//!
//! Replaces the abstract `TableAccess` placeholder with whatever concrete operator tree
//! the catalog prefers for that table.
//!
//! The placeholder carries nothing but a table reference. Which access path to use is
//! the table's decision, not the optimizer's: a plain table answers with a sequential
//! scan, a view or a federated table may answer with a deeper tree. The rule asks the
//! catalog through [`Catalog::to_rel`] and proposes the answer as an equivalent of the
//! placeholder.
//!
//! A catalog failure (unknown table, unsupported source) fails this one firing. The
//! placeholder then simply has no realization, which surfaces at extraction time.
//!
//! [`Catalog::to_rel`]: relopt_core::catalog::Catalog::to_rel

use relopt_core::error::RuleError;
use relopt_core::expr::*;
use relopt_core::pattern::Operand;
use relopt_core::rule::{OnMatch, Rule, RuleCall};
use tracing::trace;

pub struct TableAccessRule;

impl TableAccessRule {
    pub const NAME: &'static str = "TableAccess";

    pub fn rule() -> Rule {
        Rule::implementation(Self::NAME, Operand::table_access(), Self)
    }
}

impl OnMatch for TableAccessRule {
    fn on_match(&self, call: &mut RuleCall<'_>) -> Result<(), RuleError> {
        let node = call.rel(0);
        let Operator::Logical(LogicalOp::TableAccess { table }) = &node.op else {
            return Err(RuleError::UnexpectedBinding(node.op.to_string()));
        };

        let concrete = call.catalog().to_rel(table)?;
        trace!("{} resolves to {}", table, concrete.op);
        call.transform_to(concrete);
        Ok(())
    }
}
