//! Search configuration and run budgets.
//!
//! [`SearchConfig`] is the serializable form embedders load from JSON or TOML. A
//! [`Budget`] is what a single `run` call actually enforces; it adds a [`CancelToken`]
//! that another thread can trip to stop the run between work items.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Order in which pending work items are fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiringDiscipline {
    /// FIFO until the queue drains.
    #[default]
    Exhaustive,
    /// Classes without any realization first, then implementation rules before
    /// transformation rules, then classes that have seen fewer firings.
    CostGuided,
}

/// Configuration knobs for the search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub discipline: FiringDiscipline,
    /// Upper bound on work items processed by one run.
    pub max_iterations: usize,
    /// Wall-clock limit for one run, in milliseconds.
    pub time_limit_ms: Option<u64>,
    /// The run stops once the memo holds more classes than this.
    pub max_memo_sets: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            discipline: FiringDiscipline::Exhaustive,
            max_iterations: 1_000_000,
            time_limit_ms: None,
            max_memo_sets: 100_000,
        }
    }
}

/// Shared stop flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Limits enforced by a single run.
#[derive(Debug, Clone)]
pub struct Budget {
    pub max_iterations: usize,
    pub time_limit: Option<Duration>,
    pub max_memo_sets: usize,
    pub cancel: CancelToken,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self {
            max_iterations: usize::MAX,
            time_limit: None,
            max_memo_sets: usize::MAX,
            cancel: CancelToken::new(),
        }
    }

    pub fn iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Self::unlimited()
        }
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_max_memo_sets(mut self, max: usize) -> Self {
        self.max_memo_sets = max;
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }
}

impl Default for Budget {
    fn default() -> Self {
        Budget::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for Budget {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            time_limit: config.time_limit_ms.map(Duration::from_millis),
            max_memo_sets: config.max_memo_sets,
            cancel: CancelToken::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_config_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.discipline, FiringDiscipline::Exhaustive);
        assert_eq!(config.max_memo_sets, 100_000);
        assert_eq!(config.max_iterations, 1_000_000);
        assert!(config.time_limit_ms.is_none());
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: SearchConfig =
            serde_json::from_str(r#"{"discipline": "cost_guided", "time_limit_ms": 250}"#).unwrap();
        assert_eq!(config.discipline, FiringDiscipline::CostGuided);
        assert_eq!(config.max_iterations, 1_000_000);

        let budget = Budget::from(&config);
        assert_eq!(budget.time_limit, Some(Duration::from_millis(250)));
        assert_eq!(budget.max_memo_sets, 100_000);
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let budget = Budget::unlimited().with_cancel(token.clone());
        assert!(!budget.cancel.is_cancelled());
        token.cancel();
        assert!(budget.cancel.is_cancelled());
    }
}
