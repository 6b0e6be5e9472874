// Prometheus metrics for compositions and HTTP responses
//
// Metrics live in the default prometheus registry so `/metrics` can export
// them with `prometheus::gather()`.

use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics registry for the service
pub struct ServiceMetrics {
    /// Finished compositions by outcome (success, input, decode, geometry, sink, timeout, abandoned, internal)
    pub compositions: IntCounterVec,

    /// Wall time from submission to outcome, in seconds
    pub composition_duration: Histogram,

    /// HTTP responses by status code
    pub http_responses: IntCounterVec,
}

/// Global singleton instance of metrics
static METRICS: OnceLock<ServiceMetrics> = OnceLock::new();

impl ServiceMetrics {
    /// Initialize and return the global metrics instance
    ///
    /// Subsequent calls return the same instance.
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let compositions = register_int_counter_vec!(
                "image_service_compositions_total",
                "Total number of finished compositions by outcome",
                &["outcome"]
            )
            .expect("Failed to register compositions_total metric");

            let composition_duration = register_histogram!(
                "image_service_composition_duration_seconds",
                "Duration of composition pipelines in seconds",
                vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
            )
            .expect("Failed to register composition_duration_seconds metric");

            let http_responses = register_int_counter_vec!(
                "image_service_http_responses_total",
                "Total number of HTTP responses by status code",
                &["status"]
            )
            .expect("Failed to register http_responses_total metric");

            Self {
                compositions,
                composition_duration,
                http_responses,
            }
        })
    }

    pub fn record_composition(&self, outcome: &str, elapsed: Duration) {
        self.compositions.with_label_values(&[outcome]).inc();
        self.composition_duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_response(&self, status: u16) {
        self.http_responses
            .with_label_values(&[&status.to_string()])
            .inc();
    }
}

/// Render every registered metric in the Prometheus text format.
pub fn export_prometheus() -> String {
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
