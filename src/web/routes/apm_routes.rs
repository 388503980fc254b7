//! APM views backed by freshly generated data.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::generators::{apm, logs, traces};
use crate::models::ServiceMapEdge;
use crate::telemetry::GENERATED_LOGS_TOTAL;
use crate::web::models::ApiParams;
use crate::web::AppState;

pub fn create_apm_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/services", get(services_handler))
        .route("/traces", get(traces_handler))
        .route("/service-map", get(service_map_handler))
}

async fn services_handler(Query(params): Query<ApiParams>) -> Json<Value> {
    let mut services = apm::service_summaries(&mut rand::rng());
    if let Some(name) = params.service() {
        services.retain(|s| s.service == name);
    }
    Json(json!({
        "apdex_threshold_ms": apm::APDEX_T_MS,
        "services": services,
    }))
}

async fn traces_handler(Query(params): Query<ApiParams>) -> Json<Value> {
    let service = params.service();
    let generated = traces::generate_traces(&mut rand::rng(), params.limit(), service.as_deref());
    Json(json!({ "count": generated.len(), "traces": generated }))
}

/// Nodes are every service that appears on at least one edge.
fn map_nodes(edges: &[ServiceMapEdge]) -> Vec<Value> {
    let names: BTreeSet<&str> = edges
        .iter()
        .flat_map(|e| [e.source.as_str(), e.target.as_str()])
        .collect();
    names
        .into_iter()
        .map(|name| {
            let outgoing = edges.iter().filter(|e| e.source == name).count();
            let incoming = edges.iter().filter(|e| e.target == name).count();
            json!({ "id": name, "outgoing": outgoing, "incoming": incoming })
        })
        .collect()
}

async fn service_map_handler() -> Json<Value> {
    let edges = apm::service_map(&mut rand::rng());
    Json(json!({ "nodes": map_nodes(&edges), "edges": edges }))
}

/// `GET /api/logs`: recent synthetic log lines, filterable by level and service.
pub async fn logs_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ApiParams>,
) -> Json<Value> {
    let service = params.service();
    let entries = logs::generate_entries(&mut rand::rng(), params.limit(), params.level(), service.as_deref());
    app_state.registry.inc_counter(GENERATED_LOGS_TOTAL, &[], entries.len() as f64);
    Json(json!({ "count": entries.len(), "logs": entries }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_map_nodes_cover_every_edge_endpoint() {
        let edges = apm::service_map(&mut StdRng::seed_from_u64(9));
        let nodes = map_nodes(&edges);
        let gateway = nodes.iter().find(|n| n["id"] == "api-gateway").unwrap();
        assert_eq!(gateway["incoming"], 0);
        assert_eq!(gateway["outgoing"], 4);
        for edge in &edges {
            assert!(nodes.iter().any(|n| n["id"] == edge.source.as_str()));
            assert!(nodes.iter().any(|n| n["id"] == edge.target.as_str()));
        }
    }
}
