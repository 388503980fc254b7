pub mod registry;

pub use registry::MetricsRegistry;

use crate::models::MetricKind;

pub const HTTP_REQUESTS_TOTAL: &str = "argus_http_requests_total";
pub const HTTP_REQUEST_DURATION_MS: &str = "argus_http_request_duration_ms";

pub const GENERATED_SAMPLES_TOTAL: &str = "argus_generated_metric_samples_total";
pub const GENERATED_LOGS_TOTAL: &str = "argus_generated_logs_total";
pub const GENERATED_SPANS_TOTAL: &str = "argus_generated_spans_total";
pub const GENERATED_ALERTS_TOTAL: &str = "argus_generated_alerts_total";

pub const SIM_REQUESTS_TOTAL: &str = "argus_simulated_requests_total";
pub const SIM_REQUEST_DURATION_MS: &str = "argus_simulated_request_duration_ms";
pub const SIM_ERRORS_TOTAL: &str = "argus_simulated_errors_total";
pub const SIM_MEMORY_BYTES: &str = "argus_simulated_memory_bytes";
pub const SIM_CPU_PERCENT: &str = "argus_simulated_cpu_percent";

pub const LOAD_OPERATIONS_TOTAL: &str = "argus_load_test_operations_total";
pub const LOAD_ERRORS_TOTAL: &str = "argus_load_test_errors_total";
pub const LOAD_ACTIVE_WORKERS: &str = "argus_load_test_active_workers";
pub const SCALE_TEST_SERIES: &str = "argus_scale_test_series_total";
pub const SCALE_TEST_LATENCY_MS: &str = "argus_scale_test_latency_ms";
pub const TRACE_SPAN_DURATION_MS: &str = "argus_trace_span_duration_ms";

pub const LGTM_SERVICE_UP: &str = "argus_lgtm_service_up";
pub const LGTM_CHECK_DURATION_MS: &str = "argus_lgtm_check_duration_ms";

pub const ALERTS_FIRING: &str = "argus_alerts_firing";
pub const NOTIFICATIONS_TOTAL: &str = "argus_notifications_total";

/// Registers HELP text for every family argus itself exports.
pub fn describe_builtin_metrics(registry: &MetricsRegistry) {
    let families: &[(&str, MetricKind, &str)] = &[
        (HTTP_REQUESTS_TOTAL, MetricKind::Counter, "HTTP requests served, by route and status"),
        (HTTP_REQUEST_DURATION_MS, MetricKind::Histogram, "HTTP request latency in milliseconds"),
        (GENERATED_SAMPLES_TOTAL, MetricKind::Counter, "Synthetic metric samples generated"),
        (GENERATED_LOGS_TOTAL, MetricKind::Counter, "Synthetic log entries generated"),
        (GENERATED_SPANS_TOTAL, MetricKind::Counter, "Synthetic spans generated"),
        (GENERATED_ALERTS_TOTAL, MetricKind::Counter, "Synthetic alerts generated"),
        (SIM_REQUESTS_TOTAL, MetricKind::Counter, "Requests recorded by workload simulations"),
        (SIM_REQUEST_DURATION_MS, MetricKind::Histogram, "Simulated request latency in milliseconds"),
        (SIM_ERRORS_TOTAL, MetricKind::Counter, "Errors recorded by workload simulations"),
        (SIM_MEMORY_BYTES, MetricKind::Gauge, "Simulated resident memory in bytes"),
        (SIM_CPU_PERCENT, MetricKind::Gauge, "Simulated CPU utilisation percent"),
        (LOAD_OPERATIONS_TOTAL, MetricKind::Counter, "Operations completed by load tests"),
        (LOAD_ERRORS_TOTAL, MetricKind::Counter, "Failed operations in load tests"),
        (LOAD_ACTIVE_WORKERS, MetricKind::Gauge, "Load test workers currently running"),
        (SCALE_TEST_SERIES, MetricKind::Counter, "Series written by the metrics scale test"),
        (SCALE_TEST_LATENCY_MS, MetricKind::Histogram, "Latency samples written by the metrics scale test"),
        (TRACE_SPAN_DURATION_MS, MetricKind::Histogram, "Duration of generated spans in milliseconds"),
        (LGTM_SERVICE_UP, MetricKind::Gauge, "1 if the LGTM service answered its readiness probe"),
        (LGTM_CHECK_DURATION_MS, MetricKind::Histogram, "LGTM readiness probe latency in milliseconds"),
        (ALERTS_FIRING, MetricKind::Gauge, "Alerts currently firing"),
        (NOTIFICATIONS_TOTAL, MetricKind::Counter, "Notification deliveries, by channel type and status"),
    ];
    for (name, kind, help) in families {
        registry.describe(name, *kind, help);
    }
}
