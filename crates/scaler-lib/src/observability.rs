//! Prometheus metrics for backend construction and capacity estimation

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Histogram buckets for template lookups (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ScalerMetricsInner> = OnceLock::new();

struct ScalerMetricsInner {
    capacity_estimates: IntCounterVec,
    unmanaged_node_errors: IntCounter,
    template_latency_seconds: Histogram,
    backend_builds: IntCounterVec,
}

impl ScalerMetricsInner {
    fn new() -> Self {
        Self {
            capacity_estimates: register_int_counter_vec!(
                "scaler_capacity_estimates_total",
                "Node capacity estimates by the source the value came from",
                &["source"]
            )
            .expect("Failed to register capacity_estimates_total"),

            unmanaged_node_errors: register_int_counter!(
                "scaler_unmanaged_node_errors_total",
                "Nodes expected to carry the resource that no node group could vouch for"
            )
            .expect("Failed to register unmanaged_node_errors_total"),

            template_latency_seconds: register_histogram!(
                "scaler_template_latency_seconds",
                "Time spent asking a backend for a template node",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register template_latency_seconds"),

            backend_builds: register_int_counter_vec!(
                "scaler_backend_builds_total",
                "Backend construction attempts",
                &["backend", "result"]
            )
            .expect("Failed to register backend_builds_total"),
        }
    }
}

/// Handle to the process-wide metrics.
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct ScalerMetrics {
    _private: (),
}

impl Default for ScalerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalerMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ScalerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ScalerMetricsInner {
        GLOBAL_METRICS.get_or_init(ScalerMetricsInner::new)
    }

    pub fn record_capacity_estimate(&self, source: &str) {
        self.inner()
            .capacity_estimates
            .with_label_values(&[source])
            .inc();
    }

    pub fn inc_unmanaged_node_errors(&self) {
        self.inner().unmanaged_node_errors.inc();
    }

    pub fn observe_template_latency(&self, duration_secs: f64) {
        self.inner().template_latency_seconds.observe(duration_secs);
    }

    pub fn record_backend_build(&self, backend: &str, success: bool) {
        let result = if success { "success" } else { "error" };
        self.inner()
            .backend_builds
            .with_label_values(&[backend, result])
            .inc();
    }

    /// Text exposition of every registered metric
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
