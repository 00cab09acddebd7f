//! Inputs shared by every planner.

use chrono::{DateTime, Utc};
use tessera_shared::types::RoundingMode;

use crate::rules::RuleCache;

/// Ambient inputs of a planner call. Planners are pure: the clock is an input.
#[derive(Clone, Copy)]
pub struct PlanContext<'a> {
    /// Compiled rule cache.
    pub rules: &'a RuleCache,
    /// Planning time.
    pub now: DateTime<Utc>,
    /// Caller identity recorded on the transaction.
    pub created_by: &'a str,
    /// Rounding mode when the request does not name one.
    pub rounding_mode: RoundingMode,
}

impl<'a> PlanContext<'a> {
    /// Creates a context with the default rounding mode.
    #[must_use]
    pub fn new(rules: &'a RuleCache, now: DateTime<Utc>, created_by: &'a str) -> Self {
        Self {
            rules,
            now,
            created_by,
            rounding_mode: RoundingMode::default(),
        }
    }
}
