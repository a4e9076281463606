//! Store-level metrics: lookups, evictions, entry count and timings.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use serde::Serialize;

const LOOKUPS: &str = "routecache_cache_lookups_total";
const EVICTIONS: &str = "routecache_cache_evictions_total";
const ENTRIES: &str = "routecache_cache_entries";
const OPERATION_SECONDS: &str = "routecache_cache_operation_seconds";

/// Registra las descripciones de las metricas de cache.
pub fn register_cache_metrics() {
    metrics::describe_counter!(LOOKUPS, "Cache lookups, labelled hit or miss");
    metrics::describe_counter!(EVICTIONS, "Entries removed from the store, by cause");
    metrics::describe_gauge!(ENTRIES, "Approximate number of entries in the store");
    metrics::describe_histogram!(OPERATION_SECONDS, "Time spent on store operations");
}

/// Why an entry left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionCause {
    /// TTL or TTI elapsed.
    Expired,
    /// Pushed out by the capacity bound.
    Capacity,
    /// Removed by a publish or a reset.
    Invalidated,
}

impl EvictionCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Capacity => "capacity",
            Self::Invalidated => "invalidated",
        }
    }
}

impl fmt::Display for EvictionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the local counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Recorder de metricas de cache.
///
/// Every event goes to the global `metrics` recorder and to local counters,
/// so [`CacheMetrics::stats`] works without an exporter installed. Clones
/// share the counters.
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    counters: Arc<Counters>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A read served from the store.
    pub fn record_hit(&self) {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        counter!(LOOKUPS, "result" => "hit").increment(1);
    }

    /// A read that had to produce fresh data.
    pub fn record_miss(&self) {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        counter!(LOOKUPS, "result" => "miss").increment(1);
    }

    pub fn record_eviction(&self, cause: EvictionCause) {
        self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        counter!(EVICTIONS, "cause" => cause.as_str()).increment(1);
    }

    pub fn update_entry_count(&self, count: u64) {
        gauge!(ENTRIES).set(count as f64);
    }

    pub fn record_operation_duration(&self, operation: &'static str, duration: Duration) {
        histogram!(OPERATION_SECONDS, "operation" => operation).record(duration.as_secs_f64());
    }

    pub fn hits(&self) -> u64 {
        self.counters.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.counters.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.counters.evictions.load(Ordering::Relaxed)
    }

    /// Fraction of lookups that hit, 0 before any traffic.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits(),
            misses: self.misses(),
            evictions: self.evictions(),
            hit_rate: self.hit_rate(),
        }
    }
}
