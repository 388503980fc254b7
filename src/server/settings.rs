//! Runtime-mutable LGTM connection settings.
//!
//! Settings start from the [`ServerConfig`] values and can be changed through
//! `/api/settings`. They live in memory only and are lost on restart.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::server::config::ServerConfig;

pub const REDACTED: &str = "********";
pub const MAX_HEALTH_CHECK_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub prometheus_url: String,
    pub loki_url: String,
    pub tempo_url: String,
    pub tempo_otlp_url: String,
    pub grafana_url: String,
    pub alertmanager_url: String,
    pub grafana_api_key: Option<String>,
    pub health_check_timeout_secs: u64,
    pub service_label: String,
}

/// Partial update body for `PUT /api/settings`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsUpdate {
    pub prometheus_url: Option<String>,
    pub loki_url: Option<String>,
    pub tempo_url: Option<String>,
    pub tempo_otlp_url: Option<String>,
    pub grafana_url: Option<String>,
    pub alertmanager_url: Option<String>,
    /// An empty string clears the key.
    pub grafana_api_key: Option<String>,
    pub health_check_timeout_secs: Option<u64>,
    pub service_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("{field} must be an absolute http(s) URL, got '{value}'")]
    InvalidUrl { field: &'static str, value: String },
    #[error("health_check_timeout_secs must be between 1 and 60")]
    InvalidTimeout,
    #[error("service_label must not be empty")]
    EmptyServiceLabel,
}

impl Settings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            prometheus_url: config.prometheus_url.clone(),
            loki_url: config.loki_url.clone(),
            tempo_url: config.tempo_url.clone(),
            tempo_otlp_url: config.tempo_otlp_url.clone(),
            grafana_url: config.grafana_url.clone(),
            alertmanager_url: config.alertmanager_url.clone(),
            grafana_api_key: config.grafana_api_key.clone(),
            health_check_timeout_secs: config
                .health_check_timeout_secs
                .clamp(1, MAX_HEALTH_CHECK_TIMEOUT_SECS),
            service_label: config.service_label.clone(),
        }
    }

    /// Copy safe to hand out over the API.
    pub fn redacted(&self) -> Self {
        Self {
            grafana_api_key: self.grafana_api_key.as_ref().map(|_| REDACTED.to_string()),
            ..self.clone()
        }
    }

    /// Applies `update` onto a copy of `self`, validating the result.
    pub fn apply(&self, update: SettingsUpdate) -> Result<Self, SettingsError> {
        let mut next = self.clone();

        let url_fields: [(&'static str, Option<String>, &mut String); 6] = [
            ("prometheus_url", update.prometheus_url, &mut next.prometheus_url),
            ("loki_url", update.loki_url, &mut next.loki_url),
            ("tempo_url", update.tempo_url, &mut next.tempo_url),
            ("tempo_otlp_url", update.tempo_otlp_url, &mut next.tempo_otlp_url),
            ("grafana_url", update.grafana_url, &mut next.grafana_url),
            ("alertmanager_url", update.alertmanager_url, &mut next.alertmanager_url),
        ];
        for (field, value, slot) in url_fields {
            if let Some(value) = value {
                *slot = validate_url(field, &value)?;
            }
        }

        match update.grafana_api_key {
            // Echoing the redacted placeholder back keeps the current key.
            Some(key) if key == REDACTED => {}
            Some(key) if key.trim().is_empty() => next.grafana_api_key = None,
            Some(key) => next.grafana_api_key = Some(key.trim().to_string()),
            None => {}
        }

        if let Some(timeout) = update.health_check_timeout_secs {
            if timeout == 0 || timeout > MAX_HEALTH_CHECK_TIMEOUT_SECS {
                return Err(SettingsError::InvalidTimeout);
            }
            next.health_check_timeout_secs = timeout;
        }

        if let Some(label) = update.service_label {
            let label = label.trim();
            if label.is_empty() {
                return Err(SettingsError::EmptyServiceLabel);
            }
            next.service_label = label.to_string();
        }

        Ok(next)
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<String, SettingsError> {
    let trimmed = value.trim().trim_end_matches('/');
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(trimmed.to_string())
        }
        _ => Err(SettingsError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}

/// Shared settings handle injected through `AppState`.
pub struct SettingsStore {
    initial: Settings,
    current: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(initial: Settings) -> Self {
        Self {
            current: RwLock::new(initial.clone()),
            initial,
        }
    }

    pub async fn snapshot(&self) -> Settings {
        self.current.read().await.clone()
    }

    pub async fn update(&self, update: SettingsUpdate) -> Result<Settings, SettingsError> {
        let mut guard = self.current.write().await;
        let next = guard.apply(update)?;
        *guard = next.clone();
        Ok(next)
    }

    pub async fn reset(&self) -> Settings {
        let mut guard = self.current.write().await;
        *guard = self.initial.clone();
        guard.clone()
    }
}
