//! Engine metrics.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `flashsale_executions_total{strategy, state}` - Purchase attempts by terminal state
//! - `flashsale_exposures_total{exposed}` - Admission gate decisions
//! - `flashsale_catalog_cache_total{result}` - Catalog cache hits, misses and errors
//!
//! Recording is a no-op until a recorder (e.g. the Prometheus exporter) is installed.

use metrics::describe_counter;

/// Purchase attempts by strategy and terminal state.
pub const EXECUTIONS_TOTAL: &str = "flashsale_executions_total";

/// Admission gate decisions.
pub const EXPOSURES_TOTAL: &str = "flashsale_exposures_total";

/// Catalog cache lookups by result.
pub const CATALOG_CACHE_TOTAL: &str = "flashsale_catalog_cache_total";

/// Register descriptions for all engine metrics.
///
/// Call once at application startup, after installing a recorder.
pub fn register_engine_metrics() {
    describe_counter!(
        EXECUTIONS_TOTAL,
        "Total purchase attempts by execution strategy and terminal state"
    );
    describe_counter!(
        EXPOSURES_TOTAL,
        "Total admission gate decisions by whether the sale was exposed"
    );
    describe_counter!(
        CATALOG_CACHE_TOTAL,
        "Total catalog cache lookups by result (hit, miss, error)"
    );

    tracing::info!("Engine metrics registered");
}
