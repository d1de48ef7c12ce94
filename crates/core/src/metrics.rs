//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Discover fetches (by kind and result)
//! - Stale results the engine dropped
//! - Favorites (toggles, persistence failures)

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, Opts};

// =============================================================================
// Fetch Metrics
// =============================================================================

/// Discover fetches issued, by kind and outcome.
pub static FETCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cinelist_fetches_total", "Total discover fetches completed"),
        &["kind", "result"], // kind: "restart", "next_page"; result: "ok", "http", "api", "parse", ...
    )
    .unwrap()
});

/// Results that arrived for an epoch that was no longer current.
pub static STALE_RESULTS_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cinelist_stale_results_dropped_total",
        "Fetch results discarded because their epoch was superseded",
    )
    .unwrap()
});

/// Raw discover entries skipped for lacking a usable id.
pub static MALFORMED_ENTRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cinelist_malformed_entries_total",
        "Discover entries skipped during parsing",
    )
    .unwrap()
});

/// Next-page requests refused by a precondition.
pub static PAGINATION_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "cinelist_pagination_rejected_total",
            "load_next_page calls that issued no fetch",
        ),
        &["reason"], // "guarded", "loading", "exhausted"
    )
    .unwrap()
});

// =============================================================================
// Favorites Metrics
// =============================================================================

/// Favorite toggles applied, by direction.
pub static FAVORITE_TOGGLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("cinelist_favorite_toggles_total", "Favorite toggles applied"),
        &["action"], // "added", "removed"
    )
    .unwrap()
});

/// Favorite set writes that failed to reach durable storage.
pub static PERSIST_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "cinelist_persist_failures_total",
        "Favorite set writes that failed",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(FETCHES_TOTAL.clone()),
        Box::new(STALE_RESULTS_DROPPED.clone()),
        Box::new(MALFORMED_ENTRIES.clone()),
        Box::new(PAGINATION_REJECTED.clone()),
        Box::new(FAVORITE_TOGGLES.clone()),
        Box::new(PERSIST_FAILURES.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        FETCHES_TOTAL.with_label_values(&["restart", "ok"]).inc();
        assert!(!registry.gather().is_empty());
    }
}
