//! Observability metrics for the mapper cache.
//!
//! Provides counters for cache behavior and fallbacks for monitoring and
//! debugging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking mapper cache statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Lookups served from the cache
    cache_hits: AtomicU64,
    /// Lookups that found no usable entry
    cache_misses: AtomicU64,
    /// Filtered mappers built
    mappers_built: AtomicU64,
    /// Entries rebuilt because their base configuration changed
    stale_rebuilds: AtomicU64,
    /// Responses written without filtering
    fallbacks: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                cache_hits: AtomicU64::new(0),
                cache_misses: AtomicU64::new(0),
                mappers_built: AtomicU64::new(0),
                stale_rebuilds: AtomicU64::new(0),
                fallbacks: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_build(&self) {
        self.inner.mappers_built.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale_rebuild(&self) {
        self.inner.stale_rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fallback(&self) {
        self.inner.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the number of cache hits.
    pub fn cache_hits(&self) -> u64 {
        self.inner.cache_hits.load(Ordering::Relaxed)
    }

    /// Get the number of cache misses.
    pub fn cache_misses(&self) -> u64 {
        self.inner.cache_misses.load(Ordering::Relaxed)
    }

    /// Get the number of filtered mappers built.
    pub fn mappers_built(&self) -> u64 {
        self.inner.mappers_built.load(Ordering::Relaxed)
    }

    /// Get the number of entries rebuilt after a base configuration change.
    pub fn stale_rebuilds(&self) -> u64 {
        self.inner.stale_rebuilds.load(Ordering::Relaxed)
    }

    /// Get the number of responses written without filtering.
    pub fn fallbacks(&self) -> u64 {
        self.inner.fallbacks.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits(),
            cache_misses: self.cache_misses(),
            mappers_built: self.mappers_built(),
            stale_rebuilds: self.stale_rebuilds(),
            fallbacks: self.fallbacks(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.cache_hits.store(0, Ordering::Relaxed);
        self.inner.cache_misses.store(0, Ordering::Relaxed);
        self.inner.mappers_built.store(0, Ordering::Relaxed);
        self.inner.stale_rebuilds.store(0, Ordering::Relaxed);
        self.inner.fallbacks.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Lookups served from the cache
    pub cache_hits: u64,
    /// Lookups that found no usable entry
    pub cache_misses: u64,
    /// Filtered mappers built
    pub mappers_built: u64,
    /// Entries rebuilt after a base configuration change
    pub stale_rebuilds: u64,
    /// Responses written without filtering
    pub fallbacks: u64,
}

impl MetricsSnapshot {
    /// Calculate the hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no lookups have happened.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_lookups();
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Get the total number of lookups (hits + misses).
    pub fn total_lookups(&self) -> u64 {
        self.cache_hits.saturating_add(self.cache_misses)
    }
}
