//! Workload simulations.
//!
//! Each scenario replays a batch of fake requests for one or more services,
//! records them as `argus_simulated_*` metrics, emits matching logs and a
//! trace, and reports what it produced.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::generators::apm::percentile;
use crate::generators::{logs, pick, round2, skewed, traces};
use crate::models::{LogEntry, LogLevel};
use crate::telemetry::{
    MetricsRegistry, SIM_CPU_PERCENT, SIM_ERRORS_TOTAL, SIM_MEMORY_BYTES, SIM_REQUESTS_TOTAL,
    SIM_REQUEST_DURATION_MS,
};
use crate::web::models::ApiParams;
use crate::web::validation::MAX_LATENCY_MS;
use crate::web::{AppError, AppState};

/// Error log lines emitted per simulation, at most.
const MAX_ERROR_LOGS: usize = 5;
const MEMORY_LEAK_STEP_BYTES: (f64, f64) = (8.0 * 1024.0 * 1024.0, 64.0 * 1024.0 * 1024.0);

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScenarioGauge {
    MemoryLeak,
    CpuSpike,
}

#[derive(Debug)]
struct ScenarioProfile {
    name: &'static str,
    description: &'static str,
    services: &'static [&'static str],
    error_rate: f64,
    latency_ms: (f64, f64),
    /// Requests per simulation are `count * load_multiplier`.
    load_multiplier: usize,
    gauge: Option<ScenarioGauge>,
}

const SCENARIOS: &[ScenarioProfile] = &[
    ScenarioProfile { name: "web-service", description: "Steady web traffic with occasional errors", services: &["web-frontend"], error_rate: 0.01, latency_ms: (5.0, 250.0), load_multiplier: 1, gauge: None },
    ScenarioProfile { name: "database", description: "Query mix against a primary database", services: &["postgres-primary"], error_rate: 0.005, latency_ms: (1.0, 120.0), load_multiplier: 1, gauge: None },
    ScenarioProfile { name: "cache", description: "Cache reads and writes", services: &["redis-cache"], error_rate: 0.001, latency_ms: (0.2, 8.0), load_multiplier: 1, gauge: None },
    ScenarioProfile { name: "message-queue", description: "Producers and consumers on a message broker", services: &["kafka-broker"], error_rate: 0.01, latency_ms: (2.0, 60.0), load_multiplier: 1, gauge: None },
    ScenarioProfile { name: "payment-service", description: "Payment authorisations with a slow provider tail", services: &["payment-service"], error_rate: 0.03, latency_ms: (40.0, 1800.0), load_multiplier: 1, gauge: None },
    ScenarioProfile { name: "auth-service", description: "Token issuance and validation", services: &["auth-service"], error_rate: 0.02, latency_ms: (3.0, 90.0), load_multiplier: 1, gauge: None },
    ScenarioProfile { name: "error-spike", description: "Sudden burst of server errors", services: &["api-gateway"], error_rate: 0.35, latency_ms: (5.0, 400.0), load_multiplier: 1, gauge: None },
    ScenarioProfile { name: "latency-spike", description: "Latency degradation across requests", services: &["search-service"], error_rate: 0.02, latency_ms: (800.0, 4500.0), load_multiplier: 1, gauge: None },
    ScenarioProfile { name: "memory-leak", description: "Resident memory that keeps growing", services: &["inventory-service"], error_rate: 0.01, latency_ms: (10.0, 300.0), load_multiplier: 1, gauge: Some(ScenarioGauge::MemoryLeak) },
    ScenarioProfile { name: "cpu-spike", description: "CPU saturation with slower responses", services: &["order-service"], error_rate: 0.04, latency_ms: (100.0, 1500.0), load_multiplier: 1, gauge: Some(ScenarioGauge::CpuSpike) },
    ScenarioProfile { name: "traffic-burst", description: "Five times the usual request volume", services: &["api-gateway"], error_rate: 0.02, latency_ms: (5.0, 600.0), load_multiplier: 5, gauge: None },
    ScenarioProfile { name: "cascading-failure", description: "A failing dependency dragging its callers down", services: &["payment-service", "order-service", "api-gateway"], error_rate: 0.5, latency_ms: (500.0, 5000.0), load_multiplier: 1, gauge: None },
];

pub fn scenario_names() -> impl Iterator<Item = &'static str> {
    SCENARIOS.iter().map(|s| s.name)
}

fn find_scenario(name: &str) -> Option<&'static ScenarioProfile> {
    SCENARIOS.iter().find(|s| s.name == name)
}

pub fn create_simulate_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_scenarios_handler))
        .route("/{scenario}", get(simulate_handler))
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub scenario: String,
    pub description: String,
    pub services: Vec<String>,
    pub requests: usize,
    pub errors: usize,
    pub error_rate: f64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub max_latency_ms: f64,
    pub trace_id: String,
    pub logs_emitted: usize,
    pub slept_ms: u64,
    pub gauges: serde_json::Map<String, Value>,
}

/// Runs the random part of a simulation. No I/O, no awaiting.
fn run_simulation<R: Rng + ?Sized>(
    rng: &mut R,
    profile: &ScenarioProfile,
    registry: &MetricsRegistry,
    count: usize,
    error_rate: f64,
    extra_latency_ms: u64,
) -> (SimulationReport, Vec<LogEntry>) {
    let requests = count.saturating_mul(profile.load_multiplier).max(1);
    let mut latencies = Vec::with_capacity(requests);
    let mut errors = 0;
    let mut error_logs = Vec::new();

    for _ in 0..requests {
        let service = *pick(rng, profile.services);
        let latency = round2(skewed(rng, profile.latency_ms.0, profile.latency_ms.1) + extra_latency_ms as f64);
        let failed = rng.random_bool(error_rate);
        let status = if failed { "500" } else { "200" };

        registry.inc_counter(
            SIM_REQUESTS_TOTAL,
            &[("scenario", profile.name), ("service", service), ("status", status)],
            1.0,
        );
        registry.observe(
            SIM_REQUEST_DURATION_MS,
            &[("scenario", profile.name), ("service", service)],
            latency,
        );
        if failed {
            errors += 1;
            registry.inc_counter(SIM_ERRORS_TOTAL, &[("scenario", profile.name), ("service", service)], 1.0);
            if error_logs.len() < MAX_ERROR_LOGS {
                error_logs.push(logs::generate_entry(rng, Some(LogLevel::Error), Some(service)));
            }
        }
        latencies.push(latency);
    }

    let mut gauges = serde_json::Map::new();
    match profile.gauge {
        Some(ScenarioGauge::MemoryLeak) => {
            let step = rng.random_range(MEMORY_LEAK_STEP_BYTES.0..MEMORY_LEAK_STEP_BYTES.1).round();
            for service in profile.services {
                registry.add_gauge(SIM_MEMORY_BYTES, &[("service", service)], step);
                let total = registry
                    .series_value(SIM_MEMORY_BYTES, &[("service", service)])
                    .unwrap_or(step);
                gauges.insert(format!("{service}_memory_bytes"), json!(total));
            }
        }
        Some(ScenarioGauge::CpuSpike) => {
            let cpu = round2(rng.random_range(85.0..100.0));
            for service in profile.services {
                registry.set_gauge(SIM_CPU_PERCENT, &[("service", service)], cpu);
                gauges.insert(format!("{service}_cpu_percent"), json!(cpu));
            }
        }
        None => {}
    }

    let trace = traces::generate_trace(rng, Some(profile.services[0]));
    let mut entries = vec![logs::generate_entry(rng, Some(LogLevel::Info), Some(profile.services[0]))];
    entries[0].message = format!(
        "Simulated {} requests for scenario {} ({} errors)",
        requests, profile.name, errors
    );
    entries[0].trace_id = Some(trace.trace_id.clone());
    entries.extend(error_logs);

    let avg = latencies.iter().sum::<f64>() / latencies.len() as f64;
    latencies.sort_by(|a, b| a.total_cmp(b));
    let report = SimulationReport {
        scenario: profile.name.to_string(),
        description: profile.description.to_string(),
        services: profile.services.iter().map(|s| s.to_string()).collect(),
        requests,
        errors,
        error_rate: round2(errors as f64 / requests as f64),
        avg_latency_ms: round2(avg),
        p95_latency_ms: percentile(&latencies, 95.0),
        max_latency_ms: latencies.last().copied().unwrap_or_default(),
        trace_id: trace.trace_id,
        logs_emitted: entries.len(),
        slept_ms: 0,
        gauges,
    };
    (report, entries)
}

async fn list_scenarios_handler() -> Json<Value> {
    let scenarios: Vec<Value> = SCENARIOS
        .iter()
        .map(|s| {
            json!({
                "name": s.name,
                "description": s.description,
                "services": s.services,
                "error_rate": s.error_rate,
                "latency_ms": [s.latency_ms.0, s.latency_ms.1],
            })
        })
        .collect();
    Json(json!({ "scenarios": scenarios }))
}

async fn simulate_handler(
    State(app_state): State<Arc<AppState>>,
    Path(scenario): Path<String>,
    Query(params): Query<ApiParams>,
) -> Result<Json<SimulationReport>, AppError> {
    let profile = find_scenario(&scenario)
        .ok_or_else(|| AppError::NotFound(format!("unknown scenario '{scenario}'")))?;
    let error_rate = params.error_rate().unwrap_or(profile.error_rate);

    let (mut report, entries) = run_simulation(
        &mut rand::rng(),
        profile,
        &app_state.registry,
        params.count(),
        error_rate,
        params.latency_ms(),
    );
    for entry in &entries {
        logs::emit(entry);
    }

    if params.sleep() {
        let slept_ms = (report.avg_latency_ms.round() as u64).min(MAX_LATENCY_MS);
        tokio::time::sleep(Duration::from_millis(slept_ms)).await;
        report.slept_ms = slept_ms;
    }

    info!(
        scenario = profile.name,
        requests = report.requests,
        errors = report.errors,
        "Simulation finished."
    );
    Ok(Json(report))
}
