use async_trait::async_trait;
use rand::Rng;
use reqwest::{header, Client};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{LoadError, Workload};
use crate::generators::{logs, skewed, traces};
use crate::server::settings::Settings;
use crate::telemetry::{
    MetricsRegistry, GENERATED_LOGS_TOTAL, GENERATED_SPANS_TOTAL, SCALE_TEST_LATENCY_MS,
    SCALE_TEST_SERIES, TRACE_SPAN_DURATION_MS,
};

pub const SCALE_TEST_SERIES_COUNT: usize = 100;
const METRICS_BATCH: usize = 10;
const LOGS_BATCH: usize = 10;

/// Counter and histogram updates spread over a fixed set of series.
pub struct MetricsScaleWorkload {
    registry: Arc<MetricsRegistry>,
    series: Vec<String>,
}

impl MetricsScaleWorkload {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self {
            registry,
            series: (0..SCALE_TEST_SERIES_COUNT).map(|i| format!("series-{i:03}")).collect(),
        }
    }
}

#[async_trait]
impl Workload for MetricsScaleWorkload {
    fn name(&self) -> &'static str {
        "metrics-scale"
    }

    async fn run_once(&self, _worker_id: usize) -> Result<u64, LoadError> {
        let mut rng = rand::rng();
        for _ in 0..METRICS_BATCH {
            let series = &self.series[rng.random_range(0..self.series.len())];
            let labels = [("series", series.as_str())];
            self.registry.inc_counter(SCALE_TEST_SERIES, &labels, 1.0);
            self.registry.observe(SCALE_TEST_LATENCY_MS, &labels, skewed(&mut rng, 1.0, 2000.0));
        }
        Ok(METRICS_BATCH as u64)
    }
}

/// Structured log lines written through `tracing`.
pub struct LogsScaleWorkload {
    registry: Arc<MetricsRegistry>,
}

impl LogsScaleWorkload {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Workload for LogsScaleWorkload {
    fn name(&self) -> &'static str {
        "logs-scale"
    }

    async fn run_once(&self, _worker_id: usize) -> Result<u64, LoadError> {
        let entries = logs::generate_entries(&mut rand::rng(), LOGS_BATCH, None, None);
        for entry in &entries {
            logs::emit(entry);
        }
        self.registry.inc_counter(GENERATED_LOGS_TOTAL, &[], entries.len() as f64);
        Ok(entries.len() as u64)
    }
}

/// Generates whole traces and records each span's duration.
pub struct TracesScaleWorkload {
    registry: Arc<MetricsRegistry>,
}

impl TracesScaleWorkload {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Workload for TracesScaleWorkload {
    fn name(&self) -> &'static str {
        "traces-scale"
    }

    async fn run_once(&self, _worker_id: usize) -> Result<u64, LoadError> {
        let trace = traces::generate_trace(&mut rand::rng(), None);
        for span in &trace.spans {
            self.registry.observe(
                TRACE_SPAN_DURATION_MS,
                &[("service", span.service_name.as_str())],
                span.duration_ms,
            );
        }
        self.registry.inc_counter(GENERATED_SPANS_TOTAL, &[], trace.spans.len() as f64);
        Ok(trace.spans.len() as u64)
    }
}

#[derive(Debug, Clone)]
struct DashboardTarget {
    url: String,
    bearer: Option<String>,
}

/// HTTP GETs rotating over the endpoints a Grafana dashboard load touches.
pub struct DashboardLoadWorkload {
    http: Client,
    targets: Vec<DashboardTarget>,
    timeout: Duration,
    cursor: AtomicUsize,
}

impl DashboardLoadWorkload {
    pub fn new(http: Client, settings: &Settings) -> Self {
        let bearer = settings.grafana_api_key.clone();
        let targets = vec![
            DashboardTarget {
                url: format!("{}/api/search", settings.grafana_url),
                bearer: bearer.clone(),
            },
            DashboardTarget {
                url: format!("{}/api/health", settings.grafana_url),
                bearer,
            },
            DashboardTarget {
                url: format!("{}/api/v1/query?query=up", settings.prometheus_url),
                bearer: None,
            },
        ];
        Self {
            http,
            targets,
            timeout: Duration::from_secs(settings.health_check_timeout_secs),
            cursor: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Workload for DashboardLoadWorkload {
    fn name(&self) -> &'static str {
        "dashboard-load"
    }

    async fn run_once(&self, _worker_id: usize) -> Result<u64, LoadError> {
        if self.targets.is_empty() {
            return Err(LoadError::NoTargets(self.name().to_string()));
        }
        let target = &self.targets[self.cursor.fetch_add(1, Ordering::Relaxed) % self.targets.len()];

        let mut request = self.http.get(&target.url).timeout(self.timeout);
        if let Some(key) = &target.bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        let response = request.send().await.map_err(|source| LoadError::Request {
            url: target.url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: target.url.clone(),
                status: status.as_u16(),
            });
        }
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> Settings {
        Settings {
            prometheus_url: server.uri(),
            loki_url: server.uri(),
            tempo_url: server.uri(),
            tempo_otlp_url: server.uri(),
            grafana_url: server.uri(),
            alertmanager_url: server.uri(),
            grafana_api_key: Some("secret".to_string()),
            health_check_timeout_secs: 2,
            service_label: "argus".to_string(),
        }
    }

    #[tokio::test]
    async fn test_metrics_scale_touches_bounded_series() {
        let registry = Arc::new(MetricsRegistry::new());
        let workload = MetricsScaleWorkload::new(registry.clone());
        let mut total = 0;
        for worker in 0..50 {
            total += workload.run_once(worker).await.unwrap();
        }
        assert_eq!(total, 500);
        assert_eq!(registry.value_of(SCALE_TEST_SERIES), Some(500.0));
        assert_eq!(registry.histogram_count(SCALE_TEST_LATENCY_MS), 500);
        // one counter and one histogram per series
        assert!(registry.series_count() <= SCALE_TEST_SERIES_COUNT * 2);
    }

    #[tokio::test]
    async fn test_traces_scale_counts_spans() {
        let registry = Arc::new(MetricsRegistry::new());
        let workload = TracesScaleWorkload::new(registry.clone());
        let spans = workload.run_once(0).await.unwrap();
        assert!(spans >= 2);
        assert_eq!(registry.histogram_count(TRACE_SPAN_DURATION_MS), spans);
        assert_eq!(registry.value_of(GENERATED_SPANS_TOTAL), Some(spans as f64));
    }

    #[tokio::test]
    async fn test_logs_scale_counts_lines() {
        let registry = Arc::new(MetricsRegistry::new());
        let workload = LogsScaleWorkload::new(registry.clone());
        assert_eq!(workload.run_once(0).await.unwrap(), LOGS_BATCH as u64);
        assert_eq!(registry.value_of(GENERATED_LOGS_TOTAL), Some(LOGS_BATCH as f64));
    }

    #[tokio::test]
    async fn test_dashboard_load_rotates_targets_and_sends_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .and(header_matcher("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let workload = DashboardLoadWorkload::new(Client::new(), &settings_for(&server));
        assert_eq!(workload.run_once(0).await.unwrap(), 1);
        assert_eq!(workload.run_once(0).await.unwrap(), 1);
        match workload.run_once(0).await {
            Err(LoadError::Status { status, .. }) => assert_eq!(status, 503),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dashboard_load_reports_unreachable_target() {
        let mut settings = settings_for(&MockServer::start().await);
        settings.grafana_url = "http://127.0.0.1:1".to_string();
        let workload = DashboardLoadWorkload::new(Client::new(), &settings);
        assert!(matches!(workload.run_once(0).await, Err(LoadError::Request { .. })));
    }
}
