//! Cache tuning knobs for the resolver and master decorators.

use serde::{Deserialize, Serialize};

/// Tuning for the caching resolver's adaptive lookup strategy.
///
/// The resolver keeps a running signed counter, incremented on every
/// resolution hit and decremented on every miss. Every `flip_window`
/// observations the counter is reset; if it ended below
/// `pessimistic_below` the resolver flips to pessimistic mode, if it ended
/// above `optimistic_above` it flips back to optimistic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverCacheConfig {
    /// Maximum entries in the per-identifier resolution cache.
    pub max_entries: u64,
    /// Number of observations between mode re-evaluations.
    pub flip_window: u64,
    /// Net counter value below which the resolver turns pessimistic.
    pub pessimistic_below: i64,
    /// Net counter value above which the resolver turns optimistic again.
    pub optimistic_above: i64,
}

impl Default for ResolverCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
            flip_window: 1000,
            pessimistic_below: -500,
            optimistic_above: 500,
        }
    }
}

/// Tuning for the caching master decorator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterCacheConfig {
    /// Maximum documents held in the document cache.
    pub max_documents: u64,
    /// Maximum cached search/history result fingerprints (each cache).
    pub max_fingerprints: u64,
    /// Upper bound on concurrently running background prefetch tasks.
    pub prefetch_workers: usize,
    /// Diagnostic only: re-query the underlying master after serving from
    /// cache and log any divergence. Doubles underlying load; never enable
    /// outside tests.
    pub self_check: bool,
}

impl Default for MasterCacheConfig {
    fn default() -> Self {
        Self {
            max_documents: 10_000,
            max_fingerprints: 1000,
            prefetch_workers: 4,
            self_check: false,
        }
    }
}
