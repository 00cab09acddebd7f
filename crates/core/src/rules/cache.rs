//! Content-addressed cache of compiled rules using Moka.
//!
//! Rules are keyed by their exact source text, so every value that carries the
//! same rule shares one compiled instance. The cache is constructed explicitly
//! and passed to the planner; there is no global.

use moka::sync::Cache;
use std::sync::Arc;

use super::error::RuleError;
use super::evaluator::CompiledRule;

/// Read-through cache of compiled rules.
///
/// Entries never expire: a rule source always compiles to the same tree.
#[derive(Clone)]
pub struct RuleCache {
    cache: Cache<String, Arc<CompiledRule>>,
}

impl RuleCache {
    /// Creates an empty, unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().build(),
        }
    }

    /// Returns the compiled rule for `source`, compiling it on first use.
    ///
    /// Compilation failures are not cached.
    ///
    /// # Errors
    ///
    /// Returns `RuleError` if the source does not compile.
    pub fn compile(&self, source: &str) -> Result<Arc<CompiledRule>, RuleError> {
        if let Some(compiled) = self.cache.get(source) {
            return Ok(compiled);
        }

        let compiled = Arc::new(CompiledRule::compile(source)?);
        self.cache.insert(source.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Returns the number of entries in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending maintenance tasks so `entry_count` is accurate.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for RuleCache {
    fn default() -> Self {
        Self::new()
    }
}
