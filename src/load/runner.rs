use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

use super::LoadError;
use crate::generators::round2;
use crate::telemetry::{
    MetricsRegistry, LOAD_ACTIVE_WORKERS, LOAD_ERRORS_TOTAL, LOAD_OPERATIONS_TOTAL,
};

const ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// One unit of load. Implementations must be cheap to call in a tight loop.
#[async_trait]
pub trait Workload: Send + Sync {
    fn name(&self) -> &'static str;

    /// Performs one batch and returns how many operations it counted.
    async fn run_once(&self, worker_id: usize) -> Result<u64, LoadError>;
}

#[derive(Debug, Clone, Copy)]
pub struct LoadTestConfig {
    pub duration: Duration,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadTestReport {
    pub scenario: String,
    pub workers: usize,
    pub requested_duration_ms: u64,
    pub elapsed_ms: u64,
    pub total_operations: u64,
    pub errors: u64,
    pub operations_per_second: f64,
    pub per_worker_operations: Vec<u64>,
    pub peak_active_workers: usize,
}

#[derive(Debug, Default)]
struct WorkerOutcome {
    operations: u64,
    errors: u64,
}

/// Runs `workload` from exactly `config.concurrency` tasks until the deadline.
///
/// A batch still in flight when the deadline fires is dropped, so the call
/// returns shortly after `config.duration` regardless of workload latency.
pub async fn run_load_test(
    workload: Arc<dyn Workload>,
    config: LoadTestConfig,
    registry: Arc<MetricsRegistry>,
) -> LoadTestReport {
    let scenario = workload.name();
    let concurrency = config.concurrency.max(1);
    let started = Instant::now();
    let deadline = started + config.duration;

    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let total = Arc::new(AtomicU64::new(0));

    info!(scenario, workers = concurrency, duration_ms = config.duration.as_millis() as u64, "Starting load test.");

    let handles: Vec<_> = (0..concurrency)
        .map(|worker_id| {
            let workload = workload.clone();
            let registry = registry.clone();
            let active = active.clone();
            let peak = peak.clone();
            let total = total.clone();
            tokio::spawn(async move {
                let labels = [("scenario", scenario)];
                let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now_active, Ordering::SeqCst);
                registry.add_gauge(LOAD_ACTIVE_WORKERS, &labels, 1.0);

                let mut outcome = WorkerOutcome::default();
                while Instant::now() < deadline {
                    tokio::select! {
                        biased;
                        _ = sleep_until(deadline) => break,
                        result = workload.run_once(worker_id) => match result {
                            Ok(ops) => {
                                outcome.operations += ops;
                                total.fetch_add(ops, Ordering::Relaxed);
                                registry.inc_counter(LOAD_OPERATIONS_TOTAL, &labels, ops as f64);
                                tokio::task::yield_now().await;
                            }
                            Err(e) => {
                                outcome.errors += 1;
                                registry.inc_counter(LOAD_ERRORS_TOTAL, &labels, 1.0);
                                debug!(scenario, worker_id, error = %e, "Load test operation failed.");
                                tokio::select! {
                                    _ = sleep(ERROR_BACKOFF) => {}
                                    _ = sleep_until(deadline) => {}
                                }
                            }
                        }
                    }
                }

                active.fetch_sub(1, Ordering::SeqCst);
                registry.add_gauge(LOAD_ACTIVE_WORKERS, &labels, -1.0);
                outcome
            })
        })
        .collect();

    let mut per_worker_operations = Vec::with_capacity(concurrency);
    let mut errors = 0;
    for joined in join_all(handles).await {
        match joined {
            Ok(outcome) => {
                per_worker_operations.push(outcome.operations);
                errors += outcome.errors;
            }
            Err(e) => {
                warn!(scenario, error = %e, "Load test worker panicked.");
                per_worker_operations.push(0);
                errors += 1;
            }
        }
    }

    let elapsed = started.elapsed();
    let total_operations = total.load(Ordering::Relaxed);
    let secs = elapsed.as_secs_f64();
    let report = LoadTestReport {
        scenario: scenario.to_string(),
        workers: concurrency,
        requested_duration_ms: config.duration.as_millis() as u64,
        elapsed_ms: elapsed.as_millis() as u64,
        total_operations,
        errors,
        operations_per_second: if secs > 0.0 { round2(total_operations as f64 / secs) } else { 0.0 },
        per_worker_operations,
        peak_active_workers: peak.load(Ordering::SeqCst),
    };
    info!(
        scenario,
        total_operations = report.total_operations,
        errors = report.errors,
        elapsed_ms = report.elapsed_ms,
        "Load test finished."
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sleeps briefly per call and tracks how many calls overlap.
    struct ProbeWorkload {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail: bool,
    }

    impl ProbeWorkload {
        fn new(fail: bool) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl Workload for ProbeWorkload {
        fn name(&self) -> &'static str {
            "probe"
        }

        async fn run_once(&self, _worker_id: usize) -> Result<u64, LoadError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_millis(2)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                Err(LoadError::NoTargets("probe".to_string()))
            } else {
                Ok(1)
            }
        }
    }

    /// Never finishes a batch on its own.
    struct StuckWorkload;

    #[async_trait]
    impl Workload for StuckWorkload {
        fn name(&self) -> &'static str {
            "stuck"
        }

        async fn run_once(&self, _worker_id: usize) -> Result<u64, LoadError> {
            sleep(Duration::from_secs(3600)).await;
            Ok(1)
        }
    }

    #[tokio::test]
    async fn test_workers_never_exceed_concurrency() {
        let probe = Arc::new(ProbeWorkload::new(false));
        let registry = Arc::new(MetricsRegistry::new());
        let config = LoadTestConfig { duration: Duration::from_millis(300), concurrency: 7 };

        let report = run_load_test(probe.clone(), config, registry.clone()).await;

        assert_eq!(report.workers, 7);
        assert_eq!(report.per_worker_operations.len(), 7);
        assert!(report.peak_active_workers <= 7);
        assert!(probe.max_in_flight.load(Ordering::SeqCst) <= 7);
        assert!(report.total_operations > 0);
        assert_eq!(report.per_worker_operations.iter().sum::<u64>(), report.total_operations);
        assert_eq!(report.errors, 0);
        assert_eq!(registry.series_value(LOAD_ACTIVE_WORKERS, &[("scenario", "probe")]), Some(0.0));
        assert_eq!(registry.value_of(LOAD_OPERATIONS_TOTAL), Some(report.total_operations as f64));
    }

    #[tokio::test]
    async fn test_stops_shortly_after_deadline_even_if_stuck() {
        let registry = Arc::new(MetricsRegistry::new());
        let config = LoadTestConfig { duration: Duration::from_millis(200), concurrency: 5 };

        let started = std::time::Instant::now();
        let report = run_load_test(Arc::new(StuckWorkload), config, registry).await;
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(1200), "took {elapsed:?}");
        assert_eq!(report.total_operations, 0);
        assert!(report.elapsed_ms >= report.requested_duration_ms);
    }

    #[tokio::test]
    async fn test_errors_are_counted_with_backoff() {
        let registry = Arc::new(MetricsRegistry::new());
        let config = LoadTestConfig { duration: Duration::from_millis(250), concurrency: 2 };

        let report = run_load_test(Arc::new(ProbeWorkload::new(true)), config, registry.clone()).await;

        assert_eq!(report.total_operations, 0);
        assert!(report.errors > 0);
        // 50ms backoff bounds each worker to a handful of attempts.
        assert!(report.errors <= 2 * 6, "errors = {}", report.errors);
        assert_eq!(registry.value_of(LOAD_ERRORS_TOTAL), Some(report.errors as f64));
    }

    #[tokio::test]
    async fn test_zero_concurrency_runs_one_worker() {
        let registry = Arc::new(MetricsRegistry::new());
        let config = LoadTestConfig { duration: Duration::from_millis(50), concurrency: 0 };
        let report = run_load_test(Arc::new(ProbeWorkload::new(false)), config, registry).await;
        assert_eq!(report.workers, 1);
        assert_eq!(report.peak_active_workers, 1);
    }
}
