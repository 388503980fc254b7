use chrono::{Duration as ChronoDuration, Utc};
use futures::future::join_all;
use reqwest::{header, Client, RequestBuilder};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::models::{HealthStatus, LgtmService, OverallHealth, PushSummary, ServiceHealth, StackHealth};
use super::payloads;
use super::LgtmError;
use crate::generators::round2;
use crate::models::{Alert, LogEntry, Trace};
use crate::server::settings::Settings;
use crate::telemetry::{MetricsRegistry, LGTM_CHECK_DURATION_MS, LGTM_SERVICE_UP};

const LOKI_QUERY_WINDOW_MINUTES: i64 = 60;
const ERROR_BODY_LIMIT: usize = 512;

/// Talks to the LGTM services named in one [`Settings`] snapshot.
#[derive(Clone)]
pub struct LgtmClient {
    http: Client,
    settings: Settings,
    registry: Option<Arc<MetricsRegistry>>,
}

impl LgtmClient {
    pub fn new(http: Client, settings: Settings) -> Self {
        Self {
            http,
            settings,
            registry: None,
        }
    }

    /// Records probe results as `argus_lgtm_*` metrics.
    pub fn with_registry(mut self, registry: Arc<MetricsRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn base_url(&self, service: LgtmService) -> &str {
        match service {
            LgtmService::Prometheus => &self.settings.prometheus_url,
            LgtmService::Loki => &self.settings.loki_url,
            LgtmService::Tempo => &self.settings.tempo_url,
            LgtmService::Grafana => &self.settings.grafana_url,
            LgtmService::Alertmanager => &self.settings.alertmanager_url,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.health_check_timeout_secs)
    }

    fn authorize(&self, service: LgtmService, request: RequestBuilder) -> RequestBuilder {
        match (&self.settings.grafana_api_key, service) {
            (Some(key), LgtmService::Grafana) => {
                request.header(header::AUTHORIZATION, format!("Bearer {key}"))
            }
            _ => request,
        }
    }

    fn get(&self, service: LgtmService, url: &str) -> RequestBuilder {
        self.authorize(service, self.http.get(url).timeout(self.timeout()))
    }

    fn post(&self, service: LgtmService, url: &str) -> RequestBuilder {
        self.authorize(service, self.http.post(url).timeout(self.timeout()))
    }

    /// Probes the readiness endpoint. Never fails; problems show up in the status.
    pub async fn check(&self, service: LgtmService) -> ServiceHealth {
        let url = format!("{}{}", self.base_url(service), service.probe_path());
        let started = Instant::now();
        let result = self.get(service, &url).send().await;
        let latency_ms = round2(started.elapsed().as_secs_f64() * 1000.0);

        let (status, status_code, message) = match result {
            Ok(response) if response.status().is_success() => {
                (HealthStatus::Online, Some(response.status().as_u16()), "ready".to_string())
            }
            Ok(response) => {
                let code = response.status();
                (HealthStatus::Degraded, Some(code.as_u16()), format!("HTTP {code}"))
            }
            Err(e) => {
                debug!(service = %service, url = %url, error = %e, "LGTM readiness probe failed.");
                (HealthStatus::Offline, None, e.to_string())
            }
        };

        if let Some(registry) = &self.registry {
            let labels = [("service", service.as_str())];
            let up = if status == HealthStatus::Online { 1.0 } else { 0.0 };
            registry.set_gauge(LGTM_SERVICE_UP, &labels, up);
            registry.observe(LGTM_CHECK_DURATION_MS, &labels, latency_ms);
        }

        ServiceHealth {
            service,
            url,
            status,
            status_code,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }

    /// Probes every service concurrently.
    pub async fn check_all(&self) -> StackHealth {
        let services = join_all(LgtmService::ALL.into_iter().map(|s| self.check(s))).await;
        StackHealth {
            overall: OverallHealth::from_checks(&services),
            services,
            checked_at: Utc::now(),
        }
    }

    async fn send_json(
        &self,
        service: LgtmService,
        url: String,
        body: &Value,
        accepted: usize,
    ) -> Result<PushSummary, LgtmError> {
        let response = self
            .post(service, &url)
            .json(body)
            .send()
            .await
            .map_err(|source| LgtmError::Request { service, source })?;
        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            warn!(service = %service, status = status.as_u16(), "LGTM push rejected.");
            return Err(LgtmError::Status {
                service,
                status: status.as_u16(),
                body,
            });
        }
        Ok(PushSummary {
            service,
            url,
            accepted,
            status_code: status.as_u16(),
        })
    }

    pub async fn push_logs(&self, entries: &[LogEntry]) -> Result<PushSummary, LgtmError> {
        let body = payloads::loki_push_body(entries, &self.settings.service_label);
        let url = format!("{}/loki/api/v1/push", self.settings.loki_url);
        self.send_json(LgtmService::Loki, url, &body, entries.len()).await
    }

    /// Sends spans over OTLP/HTTP JSON to `tempo_otlp_url`.
    pub async fn push_traces(&self, traces: &[Trace]) -> Result<PushSummary, LgtmError> {
        let body = payloads::otlp_traces_body(traces, &self.settings.service_label);
        let url = format!("{}/v1/traces", self.settings.tempo_otlp_url);
        let spans = traces.iter().map(|t| t.spans.len()).sum();
        self.send_json(LgtmService::Tempo, url, &body, spans).await
    }

    pub async fn push_alerts(&self, alerts: &[Alert]) -> Result<PushSummary, LgtmError> {
        let body = payloads::alertmanager_body(alerts, &self.settings.grafana_url);
        let url = format!("{}/api/v2/alerts", self.settings.alertmanager_url);
        self.send_json(LgtmService::Alertmanager, url, &body, alerts.len()).await
    }

    async fn get_json(
        &self,
        service: LgtmService,
        url: String,
        query: &[(&str, String)],
    ) -> Result<Value, LgtmError> {
        let response = self
            .get(service, &url)
            .query(query)
            .send()
            .await
            .map_err(|source| LgtmError::Request { service, source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(LgtmError::Status {
                service,
                status: status.as_u16(),
                body: read_error_body(response).await,
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|source| LgtmError::Decode { service, source })
    }

    /// Instant query against `/api/v1/query`; the response body is returned as-is.
    pub async fn query_prometheus(&self, query: &str) -> Result<Value, LgtmError> {
        let url = format!("{}/api/v1/query", self.settings.prometheus_url);
        self.get_json(LgtmService::Prometheus, url, &[("query", query.to_string())])
            .await
    }

    /// Range query over the last hour.
    pub async fn query_loki(&self, query: &str, limit: usize) -> Result<Value, LgtmError> {
        let end = Utc::now();
        let start = end - ChronoDuration::minutes(LOKI_QUERY_WINDOW_MINUTES);
        let nanos = |at: chrono::DateTime<Utc>| at.timestamp_nanos_opt().unwrap_or_default().to_string();
        let url = format!("{}/loki/api/v1/query_range", self.settings.loki_url);
        self.get_json(
            LgtmService::Loki,
            url,
            &[
                ("query", query.to_string()),
                ("limit", limit.to_string()),
                ("start", nanos(start)),
                ("end", nanos(end)),
            ],
        )
        .await
    }
}

async fn read_error_body(response: reqwest::Response) -> String {
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
