//! Metrics and observability utilities
//!
//! Metric descriptions and recording helpers on top of the `metrics` facade.
//! Without an installed recorder every call is a no-op.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all CiteForge metrics
pub const METRICS_PREFIX: &str = "citeforge";

/// Register all metric descriptions
pub fn register_metrics() {
    // Upstream API metrics
    describe_counter!(
        format!("{}_api_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total OpenAlex API requests by outcome"
    );

    describe_histogram!(
        format!("{}_api_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "OpenAlex API request latency in seconds"
    );

    describe_counter!(
        format!("{}_api_retries_total", METRICS_PREFIX),
        Unit::Count,
        "Total retried API requests"
    );

    describe_counter!(
        format!("{}_entries_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Result entries dropped during deserialization"
    );

    // Cache metrics
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache hits"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Total cache misses"
    );

    // Network build metrics
    describe_gauge!(
        format!("{}_network_nodes", METRICS_PREFIX),
        Unit::Count,
        "Nodes in the last built network"
    );

    describe_gauge!(
        format!("{}_network_edges", METRICS_PREFIX),
        Unit::Count,
        "Edges in the last built network"
    );

    describe_counter!(
        format!("{}_node_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Relation fetches that failed during a build"
    );

    describe_histogram!(
        format!("{}_build_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Network build latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record one upstream API request
pub fn record_api_request(duration_secs: f64, endpoint: &str, status: &str) {
    counter!(
        format!("{}_api_requests_total", METRICS_PREFIX),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_api_request_duration_seconds", METRICS_PREFIX),
        "endpoint" => endpoint.to_string()
    )
    .record(duration_secs);
}

/// Helper to record a retried request
pub fn record_retry(endpoint: &str) {
    counter!(
        format!("{}_api_retries_total", METRICS_PREFIX),
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

/// Helper to record entries dropped from a page
pub fn record_skipped_entries(count: usize) {
    counter!(format!("{}_entries_skipped_total", METRICS_PREFIX)).increment(count as u64);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool, tier: &str) {
    if hit {
        counter!(
            format!("{}_cache_hits_total", METRICS_PREFIX),
            "tier" => tier.to_string()
        )
        .increment(1);
    } else {
        counter!(
            format!("{}_cache_misses_total", METRICS_PREFIX),
            "tier" => tier.to_string()
        )
        .increment(1);
    }
}

/// Helper to record a finished network build
pub fn record_build(duration_secs: f64, nodes: usize, edges: usize, failures: usize) {
    gauge!(format!("{}_network_nodes", METRICS_PREFIX)).set(nodes as f64);
    gauge!(format!("{}_network_edges", METRICS_PREFIX)).set(edges as f64);

    counter!(format!("{}_node_failures_total", METRICS_PREFIX)).increment(failures as u64);

    histogram!(format!("{}_build_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}
