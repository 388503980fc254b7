use rand::Rng;

use super::{round2, skewed, SERVICES};
use crate::models::{ApmServiceSummary, ServiceMapEdge};

/// Apdex target threshold in milliseconds.
pub const APDEX_T_MS: f64 = 100.0;
const LATENCY_SAMPLES: usize = 200;

const SERVICE_EDGES: &[(&str, &str)] = &[
    ("api-gateway", "auth-service"),
    ("api-gateway", "user-service"),
    ("api-gateway", "order-service"),
    ("api-gateway", "search-service"),
    ("order-service", "payment-service"),
    ("order-service", "inventory-service"),
    ("order-service", "notification-service"),
    ("user-service", "auth-service"),
];

/// Nearest-rank percentile of an ascending slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Apdex score: (satisfied + tolerating / 2) / total.
pub fn apdex(latencies: &[f64], t_ms: f64) -> f64 {
    if latencies.is_empty() {
        return 1.0;
    }
    let satisfied = latencies.iter().filter(|l| **l <= t_ms).count() as f64;
    let tolerating = latencies
        .iter()
        .filter(|l| **l > t_ms && **l <= 4.0 * t_ms)
        .count() as f64;
    (satisfied + tolerating / 2.0) / latencies.len() as f64
}

pub fn service_summary<R: Rng + ?Sized>(rng: &mut R, service: &str) -> ApmServiceSummary {
    let max_latency = rng.random_range(150.0..1500.0);
    let mut latencies: Vec<f64> = (0..LATENCY_SAMPLES)
        .map(|_| skewed(rng, 1.0, max_latency))
        .collect();
    latencies.sort_by(|a, b| a.total_cmp(b));

    ApmServiceSummary {
        service: service.to_string(),
        request_rate: round2(rng.random_range(5.0..500.0)),
        error_rate: round2(skewed(rng, 0.0, 0.1)),
        p50_ms: round2(percentile(&latencies, 50.0)),
        p95_ms: round2(percentile(&latencies, 95.0)),
        p99_ms: round2(percentile(&latencies, 99.0)),
        apdex: round2(apdex(&latencies, APDEX_T_MS)),
    }
}

pub fn service_summaries<R: Rng + ?Sized>(rng: &mut R) -> Vec<ApmServiceSummary> {
    SERVICES.iter().map(|s| service_summary(rng, s)).collect()
}

pub fn service_map<R: Rng + ?Sized>(rng: &mut R) -> Vec<ServiceMapEdge> {
    SERVICE_EDGES
        .iter()
        .map(|(source, target)| ServiceMapEdge {
            source: source.to_string(),
            target: target.to_string(),
            calls: rng.random_range(100..50_000),
            error_rate: round2(skewed(rng, 0.0, 0.08)),
            avg_latency_ms: round2(skewed(rng, 2.0, 400.0)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_percentile_nearest_rank() {
        let data: Vec<f64> = (1..=100).map(|v| v as f64).collect();
        assert_eq!(percentile(&data, 50.0), 50.0);
        assert_eq!(percentile(&data, 99.0), 99.0);
        assert_eq!(percentile(&data, 100.0), 100.0);
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_apdex() {
        assert_eq!(apdex(&[50.0, 80.0], 100.0), 1.0);
        assert_eq!(apdex(&[50.0, 200.0], 100.0), 0.75);
        assert_eq!(apdex(&[1000.0], 100.0), 0.0);
    }

    #[test]
    fn test_summaries_are_ordered() {
        let mut rng = StdRng::seed_from_u64(41);
        let summaries = service_summaries(&mut rng);
        assert_eq!(summaries.len(), SERVICES.len());
        for s in summaries {
            assert!(s.p50_ms <= s.p95_ms && s.p95_ms <= s.p99_ms);
            assert!((0.0..=1.0).contains(&s.apdex));
            assert!((0.0..=0.1).contains(&s.error_rate));
        }
    }

    #[test]
    fn test_service_map_edges_reference_known_services() {
        let mut rng = StdRng::seed_from_u64(42);
        for edge in service_map(&mut rng) {
            assert!(SERVICES.contains(&edge.source.as_str()));
            assert!(SERVICES.contains(&edge.target.as_str()));
        }
    }
}
