use chrono::Utc;
use rand::Rng;
use std::collections::BTreeMap;

use super::{pick, round2, skewed, ENDPOINTS, SERVICES};
use crate::models::{MetricKind, MetricSample};
use crate::telemetry::{MetricsRegistry, GENERATED_SAMPLES_TOTAL};

struct MetricFamily {
    name: &'static str,
    kind: MetricKind,
    min: f64,
    max: f64,
    per_endpoint: bool,
}

const FAMILIES: &[MetricFamily] = &[
    MetricFamily { name: "app_http_requests_total", kind: MetricKind::Counter, min: 1.0, max: 50.0, per_endpoint: true },
    MetricFamily { name: "app_http_request_duration_ms", kind: MetricKind::Histogram, min: 2.0, max: 1500.0, per_endpoint: true },
    MetricFamily { name: "app_errors_total", kind: MetricKind::Counter, min: 0.0, max: 5.0, per_endpoint: true },
    MetricFamily { name: "app_cpu_usage_percent", kind: MetricKind::Gauge, min: 1.0, max: 95.0, per_endpoint: false },
    MetricFamily { name: "app_memory_usage_bytes", kind: MetricKind::Gauge, min: 64.0 * 1024.0 * 1024.0, max: 2048.0 * 1024.0 * 1024.0, per_endpoint: false },
    MetricFamily { name: "app_queue_depth", kind: MetricKind::Gauge, min: 0.0, max: 500.0, per_endpoint: false },
    MetricFamily { name: "app_cache_hits_total", kind: MetricKind::Counter, min: 1.0, max: 200.0, per_endpoint: false },
    MetricFamily { name: "app_db_connections_active", kind: MetricKind::Gauge, min: 1.0, max: 100.0, per_endpoint: false },
];

const METHODS: &[&str] = &["GET", "GET", "GET", "POST", "PUT", "DELETE"];

/// Names of the families `generate_samples` draws from.
pub fn family_names() -> impl Iterator<Item = &'static str> {
    FAMILIES.iter().map(|f| f.name)
}

pub fn generate_samples<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<MetricSample> {
    let now = Utc::now();
    (0..count)
        .map(|_| {
            let family = pick(rng, FAMILIES);
            let mut labels = BTreeMap::new();
            labels.insert("service".to_string(), pick(rng, SERVICES).to_string());
            if family.per_endpoint {
                labels.insert("endpoint".to_string(), pick(rng, ENDPOINTS).to_string());
                labels.insert("method".to_string(), pick(rng, METHODS).to_string());
            }
            let value = match family.kind {
                MetricKind::Histogram => skewed(rng, family.min, family.max),
                MetricKind::Counter => rng.random_range(family.min..=family.max).round(),
                MetricKind::Gauge => rng.random_range(family.min..=family.max),
            };
            MetricSample {
                name: family.name.to_string(),
                kind: family.kind,
                labels,
                value: round2(value),
                timestamp: now,
            }
        })
        .collect()
}

/// Writes samples into the registry so they are exported on `/metrics`.
pub fn record_samples(registry: &MetricsRegistry, samples: &[MetricSample]) {
    for sample in samples {
        let labels: Vec<(&str, &str)> = sample
            .labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        match sample.kind {
            MetricKind::Counter => registry.inc_counter(&sample.name, &labels, sample.value),
            MetricKind::Gauge => registry.set_gauge(&sample.name, &labels, sample.value),
            MetricKind::Histogram => registry.observe(&sample.name, &labels, sample.value),
        }
    }
    registry.inc_counter(GENERATED_SAMPLES_TOTAL, &[], samples.len() as f64);
}
