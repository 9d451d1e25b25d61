//! # Traits
//!
//! A trait is a physical property of a realization: the calling convention it runs in,
//! the order its rows come out in, and how those rows are distributed. Each equivalence
//! class keeps one best realization ("subset") per distinct trait vector.
//!
//! ## Conventions
//!
//! - `Convention::None` marks logical nodes. They describe a result but cannot be
//!   executed, so they are never costed and never win a subset.
//! - `Convention::Physical` marks executable nodes.
//!
//! ## Satisfaction
//!
//! A provided trait vector satisfies a required one when every constraint the requirement
//! states is met:
//!
//! - **Convention**: equal, or the requirement is `None` (no requirement).
//! - **Sort**: the required keys are a prefix of the provided keys. Output sorted by
//!   `a, b, c` is also sorted by `a, b`.
//! - **Distribution**: exact match.
//!
//! An absent sort or distribution requirement is always satisfied.

use crate::expr::{Distribution, SortKey};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Convention {
    /// Logical, not implementable. As a requirement: any convention.
    #[default]
    None,
    Physical,
}

/// Trait vector of a node or of a requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitSet {
    pub convention: Convention,
    pub sort_order: Option<Vec<SortKey>>,
    pub distribution: Option<Distribution>,
}

impl TraitSet {
    /// No requirement at all. Also the trait vector of every logical node.
    pub fn any() -> Self {
        Self::default()
    }

    /// A physical realization with no ordering or distribution constraint.
    pub fn physical() -> Self {
        Self {
            convention: Convention::Physical,
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, order: Vec<SortKey>) -> Self {
        self.sort_order = Some(order);
        self
    }

    pub fn with_distribution(mut self, dist: Distribution) -> Self {
        self.distribution = Some(dist);
        self
    }

    pub fn is_physical(&self) -> bool {
        self.convention == Convention::Physical
    }

    /// Whether this (provided) trait vector meets `required`.
    pub fn satisfies(&self, required: &TraitSet) -> bool {
        let convention_ok =
            required.convention == Convention::None || required.convention == self.convention;
        let sort_ok = match (&required.sort_order, &self.sort_order) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(required), Some(provided)) => {
                required.len() <= provided.len()
                    && required.iter().zip(provided.iter()).all(|(r, p)| r == p)
            }
        };
        let dist_ok = match (&required.distribution, &self.distribution) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(required), Some(provided)) => required == provided,
        };
        convention_ok && sort_ok && dist_ok
    }

    /// Whether meeting this requirement may need an enforcer (sort or exchange).
    pub fn needs_enforcement(&self) -> bool {
        self.sort_order.is_some() || self.distribution.is_some()
    }

    /// The requirement with sort and distribution dropped: what an enforcer asks of
    /// its input.
    pub fn relaxed(&self) -> TraitSet {
        TraitSet {
            convention: self.convention,
            sort_order: None,
            distribution: None,
        }
    }
}

impl fmt::Display for TraitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.convention {
            Convention::None => write!(f, "NONE")?,
            Convention::Physical => write!(f, "PHYSICAL")?,
        }
        if let Some(order) = &self.sort_order {
            write!(f, ".sorted(")?;
            for (i, k) in order.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}{}", k.expr, if k.ascending { "" } else { " DESC" })?;
            }
            write!(f, ")")?;
        }
        if let Some(dist) = &self.distribution {
            write!(f, ".{dist:?}")?;
        }
        Ok(())
    }
}
