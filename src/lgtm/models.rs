use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LgtmService {
    Prometheus,
    Loki,
    Tempo,
    Grafana,
    Alertmanager,
}

impl LgtmService {
    pub const ALL: [LgtmService; 5] = [
        LgtmService::Prometheus,
        LgtmService::Loki,
        LgtmService::Tempo,
        LgtmService::Grafana,
        LgtmService::Alertmanager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LgtmService::Prometheus => "prometheus",
            LgtmService::Loki => "loki",
            LgtmService::Tempo => "tempo",
            LgtmService::Grafana => "grafana",
            LgtmService::Alertmanager => "alertmanager",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// Readiness endpoint probed by health checks.
    pub fn probe_path(&self) -> &'static str {
        match self {
            LgtmService::Prometheus | LgtmService::Alertmanager => "/-/ready",
            LgtmService::Loki | LgtmService::Tempo => "/ready",
            LgtmService::Grafana => "/api/health",
        }
    }
}

impl fmt::Display for LgtmService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Online,
    Degraded,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub service: LgtmService,
    pub url: String,
    pub status: HealthStatus,
    pub status_code: Option<u16>,
    pub latency_ms: f64,
    pub message: String,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

impl OverallHealth {
    /// All online is healthy, none online is unhealthy, anything else degraded.
    pub fn from_checks(checks: &[ServiceHealth]) -> Self {
        let online = checks.iter().filter(|c| c.status == HealthStatus::Online).count();
        if !checks.is_empty() && online == checks.len() {
            OverallHealth::Healthy
        } else if online == 0 {
            OverallHealth::Unhealthy
        } else {
            OverallHealth::Degraded
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StackHealth {
    pub overall: OverallHealth,
    pub services: Vec<ServiceHealth>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushSummary {
    pub service: LgtmService,
    pub url: String,
    pub accepted: usize,
    pub status_code: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationStep {
    pub name: String,
    pub success: bool,
    pub duration_ms: f64,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationOutcome {
    Passed,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationReport {
    pub status: IntegrationOutcome,
    pub steps: Vec<IntegrationStep>,
    pub services: Vec<ServiceHealth>,
    pub duration_ms: f64,
}
