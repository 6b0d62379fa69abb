//! Prometheus-style counters for cache behaviour.
//!
//! Recording goes through the `metrics` facade; nothing is exported unless
//! the host application installs a recorder.

use metrics::{counter, describe_counter};

/// Metric names for the cache layer.
pub mod names {
    /// Cache-aside reads answered from the backend.
    pub const CACHE_HITS_TOTAL: &str = "cairn_cache_hits_total";
    /// Cache-aside reads that fell through to the supplier.
    pub const CACHE_MISSES_TOTAL: &str = "cairn_cache_misses_total";
    /// Computed results written back to the backend.
    pub const CACHE_STORES_TOTAL: &str = "cairn_cache_stores_total";
    /// Backend failures absorbed by the resilient accessor.
    pub const CACHE_BACKEND_ERRORS_TOTAL: &str = "cairn_cache_backend_errors_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Cache-aside reads served from the cache");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Cache-aside reads that invoked the supplier");
    describe_counter!(names::CACHE_STORES_TOTAL, "Computed results stored in the cache");
    describe_counter!(
        names::CACHE_BACKEND_ERRORS_TOTAL,
        "Backend errors converted to misses or no-ops"
    );
}

/// Record a cache hit for an operation family.
pub fn record_hit(family: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "family" => family).increment(1);
}

/// Record a cache miss for an operation family.
pub fn record_miss(family: &'static str) {
    counter!(names::CACHE_MISSES_TOTAL, "family" => family).increment(1);
}

/// Record a write-back for an operation family.
pub fn record_store(family: &'static str) {
    counter!(names::CACHE_STORES_TOTAL, "family" => family).increment(1);
}

/// Record an absorbed backend error.
pub fn record_backend_error(operation: &'static str) {
    counter!(names::CACHE_BACKEND_ERRORS_TOTAL, "operation" => operation).increment(1);
}
