use serde::Deserialize;

use crate::models::LogLevel;
use crate::web::validation;

pub mod alert_models;

/// Query parameters shared by the generator, simulation and load endpoints.
///
/// Everything is kept as raw text so a malformed value falls back to its
/// default instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct ApiParams {
    pub count: Option<String>,
    pub duration: Option<String>,
    pub concurrency: Option<String>,
    pub error_rate: Option<String>,
    pub latency: Option<String>,
    pub limit: Option<String>,
    pub level: Option<String>,
    pub service: Option<String>,
    pub query: Option<String>,
    pub status: Option<String>,
    pub sleep: Option<String>,
    pub push: Option<String>,
}

impl ApiParams {
    pub fn count(&self) -> usize {
        validation::validate_count(self.count.as_deref())
    }

    pub fn duration(&self) -> std::time::Duration {
        validation::validate_duration(self.duration.as_deref())
    }

    pub fn concurrency(&self) -> usize {
        validation::validate_concurrency(self.concurrency.as_deref())
    }

    /// `None` when absent, so callers can keep their own default.
    pub fn error_rate(&self) -> Option<f64> {
        self.error_rate
            .as_deref()
            .map(|raw| validation::validate_error_rate(Some(raw)))
    }

    pub fn latency_ms(&self) -> u64 {
        validation::validate_latency_ms(self.latency.as_deref())
    }

    pub fn limit(&self) -> usize {
        validation::validate_limit(self.limit.as_deref())
    }

    /// Unknown level names are ignored.
    pub fn level(&self) -> Option<LogLevel> {
        validation::validate_text(self.level.as_deref()).and_then(|l| LogLevel::parse(&l))
    }

    pub fn service(&self) -> Option<String> {
        validation::validate_text(self.service.as_deref())
    }

    pub fn query(&self) -> Option<String> {
        validation::validate_text(self.query.as_deref())
    }

    pub fn status(&self) -> Option<String> {
        validation::validate_text(self.status.as_deref())
    }

    pub fn sleep(&self) -> bool {
        validation::validate_flag(self.sleep.as_deref(), false)
    }

    pub fn push(&self) -> bool {
        validation::validate_flag(self.push.as_deref(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_fall_back_to_defaults() {
        let params = ApiParams {
            count: Some("lots".to_string()),
            concurrency: Some("500".to_string()),
            level: Some("verbose".to_string()),
            service: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(params.count(), validation::DEFAULT_COUNT);
        assert_eq!(params.concurrency(), validation::MAX_CONCURRENCY);
        assert_eq!(params.level(), None);
        assert_eq!(params.service(), None);
        assert_eq!(params.error_rate(), None);
        assert!(!params.sleep());
    }

    #[test]
    fn test_error_rate_present_but_invalid_uses_default() {
        let params = ApiParams {
            error_rate: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(params.error_rate(), Some(validation::DEFAULT_ERROR_RATE));
    }
}
