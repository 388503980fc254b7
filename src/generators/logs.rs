use chrono::Utc;
use rand::Rng;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{hex_id, pick, ENDPOINTS, SERVICES};
use crate::models::{LogEntry, LogLevel};

/// Target used for every synthetic log line written through `tracing`.
pub const SYNTHETIC_TARGET: &str = "argus::synthetic";

const DEBUG_MESSAGES: &[&str] = &[
    "Cache lookup completed",
    "Loaded configuration snapshot",
    "Connection pool stats refreshed",
    "Serialized response payload",
];
const INFO_MESSAGES: &[&str] = &[
    "Request completed",
    "User logged in",
    "Order created",
    "Payment authorized",
    "Inventory reserved",
    "Notification dispatched",
];
const WARN_MESSAGES: &[&str] = &[
    "Slow query detected",
    "Retrying upstream call",
    "Cache miss ratio above threshold",
    "Connection pool nearly exhausted",
];
const ERROR_MESSAGES: &[&str] = &[
    "Upstream request failed",
    "Database connection refused",
    "Payment provider timeout",
    "Unhandled exception in request handler",
];

/// Weighted level: ~70% info, 15% debug, 10% warn, 5% error.
pub fn random_level<R: Rng + ?Sized>(rng: &mut R) -> LogLevel {
    match rng.random_range(0..100) {
        0..=69 => LogLevel::Info,
        70..=84 => LogLevel::Debug,
        85..=94 => LogLevel::Warn,
        _ => LogLevel::Error,
    }
}

pub fn generate_entry<R: Rng + ?Sized>(
    rng: &mut R,
    level: Option<LogLevel>,
    service: Option<&str>,
) -> LogEntry {
    let level = level.unwrap_or_else(|| random_level(rng));
    let service = service.map(str::to_string).unwrap_or_else(|| pick(rng, SERVICES).to_string());
    let message = match level {
        LogLevel::Debug => pick(rng, DEBUG_MESSAGES),
        LogLevel::Info => pick(rng, INFO_MESSAGES),
        LogLevel::Warn => pick(rng, WARN_MESSAGES),
        LogLevel::Error => pick(rng, ERROR_MESSAGES),
    };

    let status_code = match level {
        LogLevel::Error => *pick(rng, &[500u16, 502, 503, 504]),
        LogLevel::Warn => *pick(rng, &[200u16, 429, 404]),
        _ => 200,
    };

    let mut fields = BTreeMap::new();
    fields.insert("request_id".to_string(), Uuid::new_v4().to_string());
    fields.insert("endpoint".to_string(), pick(rng, ENDPOINTS).to_string());
    fields.insert("duration_ms".to_string(), rng.random_range(1..1500).to_string());
    fields.insert("status_code".to_string(), status_code.to_string());
    fields.insert("user_id".to_string(), format!("user-{}", rng.random_range(1000..10000)));

    let (trace_id, span_id) = if rng.random_bool(0.6) {
        (Some(hex_id(rng, 16)), Some(hex_id(rng, 8)))
    } else {
        (None, None)
    };

    LogEntry {
        timestamp: Utc::now(),
        level,
        service,
        message: message.to_string(),
        trace_id,
        span_id,
        fields,
    }
}

pub fn generate_entries<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    level: Option<LogLevel>,
    service: Option<&str>,
) -> Vec<LogEntry> {
    (0..count).map(|_| generate_entry(rng, level, service)).collect()
}

/// Writes the entry as a structured `tracing` event under [`SYNTHETIC_TARGET`].
pub fn emit(entry: &LogEntry) {
    let trace_id = entry.trace_id.as_deref().unwrap_or("");
    let fields = serde_json::to_string(&entry.fields).unwrap_or_default();
    match entry.level {
        LogLevel::Debug => tracing::debug!(target: SYNTHETIC_TARGET, service = %entry.service, trace_id, fields = %fields, "{}", entry.message),
        LogLevel::Info => tracing::info!(target: SYNTHETIC_TARGET, service = %entry.service, trace_id, fields = %fields, "{}", entry.message),
        LogLevel::Warn => tracing::warn!(target: SYNTHETIC_TARGET, service = %entry.service, trace_id, fields = %fields, "{}", entry.message),
        LogLevel::Error => tracing::error!(target: SYNTHETIC_TARGET, service = %entry.service, trace_id, fields = %fields, "{}", entry.message),
    }
}

/// Logfmt-style line, the shape pushed to Loki.
pub fn format_line(entry: &LogEntry) -> String {
    let mut line = format!(
        "level={} service={} msg=\"{}\"",
        entry.level.as_str(),
        entry.service,
        entry.message
    );
    if let Some(trace_id) = &entry.trace_id {
        line.push_str(&format!(" trace_id={trace_id}"));
    }
    for (key, value) in &entry.fields {
        line.push_str(&format!(" {key}={value}"));
    }
    line
}
