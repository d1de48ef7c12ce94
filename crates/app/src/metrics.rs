//! Prometheus registry for the runner.
//!
//! Core counters plus gauges mirroring the latest catalog snapshot.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};

use cinelist_core::CatalogSnapshot;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Items currently listed.
pub static CATALOG_ITEMS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("cinelist_catalog_items", "Items in the current catalog list").unwrap()
});

/// Last loaded page.
pub static CATALOG_PAGE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("cinelist_catalog_page", "Last successfully loaded page").unwrap()
});

/// Size of the favorite set.
pub static FAVORITES: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("cinelist_favorites", "Items in the favorite set").unwrap());

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(CATALOG_ITEMS.clone()))
        .unwrap();
    registry
        .register(Box::new(CATALOG_PAGE.clone()))
        .unwrap();
    registry.register(Box::new(FAVORITES.clone())).unwrap();

    for metric in cinelist_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Update the gauges from a snapshot.
pub fn record_snapshot(snapshot: &CatalogSnapshot) {
    CATALOG_ITEMS.set(snapshot.items.len() as i64);
    CATALOG_PAGE.set(i64::from(snapshot.page));
    FAVORITES.set(snapshot.favorites.len() as i64);
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinelist_core::testing::fixtures;

    #[test]
    fn test_record_snapshot_sets_gauges() {
        let snapshot = CatalogSnapshot {
            items: fixtures::items(&[1, 2, 3]),
            page: 2,
            query: fixtures::default_query(),
            loading: false,
            error: None,
            favorites: vec![fixtures::favorite(2, "Two")],
            exhausted: false,
            guarded: false,
        };

        record_snapshot(&snapshot);
        let output = encode_metrics();
        assert!(output.contains("cinelist_catalog_items 3"));
        assert!(output.contains("cinelist_catalog_page 2"));
        assert!(output.contains("cinelist_favorites 1"));
    }

    #[test]
    fn test_registry_includes_core_counters() {
        cinelist_core::metrics::STALE_RESULTS_DROPPED.inc();
        let output = encode_metrics();
        assert!(output.contains("cinelist_stale_results_dropped_total"));
        assert!(output.contains("# TYPE"));
    }
}
