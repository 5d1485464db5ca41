//! Metrics instrumentation for the dayfeed service
//!
//! Provides Prometheus-compatible metrics for:
//! - Gateway request counts and outcomes
//! - Active WebSocket client count
//! - Streamed block counts and stream replacements

use metrics::{counter, gauge};

/// Metric names as constants for consistency
pub mod names {
    pub const GATEWAY_REQUESTS: &str = "gateway_requests_total";
    pub const WS_CLIENTS_ACTIVE: &str = "ws_clients_active";
    pub const BLOCKS_STREAMED: &str = "blocks_streamed_total";
    pub const STREAMS_REPLACED: &str = "streams_replaced_total";
    pub const PAGE_FALLBACKS: &str = "page_fallbacks_total";
}

/// Record a gateway request
pub fn record_gateway_request(endpoint: &'static str, success: bool) {
    counter!(
        names::GATEWAY_REQUESTS,
        "endpoint" => endpoint,
        "success" => if success { "true" } else { "false" }
    )
    .increment(1);
}

/// Increment active WebSocket client count
pub fn ws_client_connected() {
    gauge!(names::WS_CLIENTS_ACTIVE).increment(1.0);
}

/// Decrement active WebSocket client count
pub fn ws_client_disconnected() {
    gauge!(names::WS_CLIENTS_ACTIVE).decrement(1.0);
}

/// Record blocks emitted to a client
pub fn record_blocks_streamed(count: u64) {
    counter!(names::BLOCKS_STREAMED).increment(count);
}

/// Record a stream being superseded by a new request on the same connection
pub fn record_stream_replaced() {
    counter!(names::STREAMS_REPLACED).increment(1);
}

/// Record a degraded single-page fallback after a failed page request
pub fn record_page_fallback() {
    counter!(names::PAGE_FALLBACKS).increment(1);
}

/// Initialize the Prometheus metrics exporter
/// Returns a handle to the metrics endpoint
pub fn init_metrics() -> metrics_exporter_prometheus::PrometheusHandle {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    builder
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}
