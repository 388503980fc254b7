use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub listen_address: String,
    pub static_dir: String,
    pub log_dir: String,
    pub request_timeout_secs: u64,
    /// Requests per second admitted by the global token bucket. 0 disables limiting.
    pub rate_limit_per_second: u32,
    pub rate_limit_burst: u32,
    /// 0 disables the background evaluation task.
    pub alert_evaluation_interval_secs: u64,

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

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
pub struct PartialServerConfig {
    listen_address: Option<String>,
    static_dir: Option<String>,
    log_dir: Option<String>,
    request_timeout_secs: Option<u64>,
    rate_limit_per_second: Option<u32>,
    rate_limit_burst: Option<u32>,
    alert_evaluation_interval_secs: Option<u64>,
    prometheus_url: Option<String>,
    loki_url: Option<String>,
    tempo_url: Option<String>,
    tempo_otlp_url: Option<String>,
    grafana_url: Option<String>,
    alertmanager_url: Option<String>,
    grafana_api_key: Option<String>,
    health_check_timeout_secs: Option<u64>,
    service_label: Option<String>,
}

const ENV_PREFIX: &str = "ARGUS_";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8080".to_string(),
            static_dir: "static".to_string(),
            log_dir: "logs".to_string(),
            request_timeout_secs: 90,
            rate_limit_per_second: 200,
            rate_limit_burst: 400,
            alert_evaluation_interval_secs: 30,
            prometheus_url: "http://localhost:9090".to_string(),
            loki_url: "http://localhost:3100".to_string(),
            tempo_url: "http://localhost:3200".to_string(),
            tempo_otlp_url: "http://localhost:4318".to_string(),
            grafana_url: "http://localhost:3000".to_string(),
            alertmanager_url: "http://localhost:9093".to_string(),
            grafana_api_key: None,
            health_check_timeout_secs: 5,
            service_label: "argus".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str).map_err(|source| ConfigError::Read {
                    path: path_str.to_string(),
                    source,
                })?;
                parse_file(path_str, &contents)?
            }
            _ => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::prefixed(ENV_PREFIX).from_env()?;

        // 3. Merge: environment overrides file
        Ok(Self::merge(file_config, env_config))
    }

    pub fn merge(file: PartialServerConfig, env: PartialServerConfig) -> Self {
        let defaults = ServerConfig::default();
        ServerConfig {
            listen_address: env.listen_address.or(file.listen_address)
                .unwrap_or(defaults.listen_address),
            static_dir: env.static_dir.or(file.static_dir)
                .unwrap_or(defaults.static_dir),
            log_dir: env.log_dir.or(file.log_dir)
                .unwrap_or(defaults.log_dir),
            request_timeout_secs: env.request_timeout_secs.or(file.request_timeout_secs)
                .unwrap_or(defaults.request_timeout_secs),
            rate_limit_per_second: env.rate_limit_per_second.or(file.rate_limit_per_second)
                .unwrap_or(defaults.rate_limit_per_second),
            rate_limit_burst: env.rate_limit_burst.or(file.rate_limit_burst)
                .unwrap_or(defaults.rate_limit_burst),
            alert_evaluation_interval_secs: env.alert_evaluation_interval_secs
                .or(file.alert_evaluation_interval_secs)
                .unwrap_or(defaults.alert_evaluation_interval_secs),
            prometheus_url: env.prometheus_url.or(file.prometheus_url)
                .unwrap_or(defaults.prometheus_url),
            loki_url: env.loki_url.or(file.loki_url)
                .unwrap_or(defaults.loki_url),
            tempo_url: env.tempo_url.or(file.tempo_url)
                .unwrap_or(defaults.tempo_url),
            tempo_otlp_url: env.tempo_otlp_url.or(file.tempo_otlp_url)
                .unwrap_or(defaults.tempo_otlp_url),
            grafana_url: env.grafana_url.or(file.grafana_url)
                .unwrap_or(defaults.grafana_url),
            alertmanager_url: env.alertmanager_url.or(file.alertmanager_url)
                .unwrap_or(defaults.alertmanager_url),
            grafana_api_key: env.grafana_api_key.or(file.grafana_api_key)
                .filter(|k| !k.trim().is_empty()),
            health_check_timeout_secs: env.health_check_timeout_secs
                .or(file.health_check_timeout_secs)
                .unwrap_or(defaults.health_check_timeout_secs),
            service_label: env.service_label.or(file.service_label)
                .unwrap_or(defaults.service_label),
        }
    }
}

fn parse_file(path: &str, contents: &str) -> Result<PartialServerConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}
