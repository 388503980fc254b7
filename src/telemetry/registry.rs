//! Prometheus-style metrics registry.
//!
//! Provides counters, gauges and histograms keyed by metric name and label set,
//! rendered in the text exposition format served at `/metrics`.

use dashmap::DashMap;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use crate::models::MetricKind;

/// Histogram bucket upper bounds, in milliseconds.
pub const DEFAULT_BUCKETS_MS: &[f64] = &[
    5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];

const DEFAULT_HELP: &str = "Synthetic metric generated by argus";

/// An f64 stored as bits inside an `AtomicU64`.
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    fn add(&self, delta: f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

#[derive(Debug)]
struct Histogram {
    counts: Vec<AtomicU64>,
    sum: AtomicF64,
    count: AtomicU64,
}

impl Histogram {
    fn new() -> Self {
        Self {
            counts: DEFAULT_BUCKETS_MS.iter().map(|_| AtomicU64::new(0)).collect(),
            sum: AtomicF64::default(),
            count: AtomicU64::new(0),
        }
    }

    fn observe(&self, value: f64) {
        if let Some(idx) = DEFAULT_BUCKETS_MS.iter().position(|bound| value <= *bound) {
            self.counts[idx].fetch_add(1, Ordering::Relaxed);
        }
        self.sum.add(value);
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug)]
enum Series {
    Counter(AtomicF64),
    Gauge(AtomicF64),
    Histogram(Histogram),
}

impl Series {
    fn kind(&self) -> MetricKind {
        match self {
            Series::Counter(_) => MetricKind::Counter,
            Series::Gauge(_) => MetricKind::Gauge,
            Series::Histogram(_) => MetricKind::Histogram,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct SeriesKey {
    name: String,
    labels: Vec<(String, String)>,
}

impl SeriesKey {
    fn new(name: &str, labels: &[(&str, &str)]) -> Self {
        let mut labels: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        labels.sort();
        labels.dedup_by(|a, b| a.0 == b.0);
        Self {
            name: name.to_string(),
            labels,
        }
    }
}

/// Point-in-time copy of one series, used for rendering.
enum SeriesSnapshot {
    Value(f64),
    Histogram { buckets: Vec<u64>, sum: f64, count: u64 },
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    series: DashMap<SeriesKey, Series>,
    help: DashMap<String, (MetricKind, String)>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers HELP text for a metric family.
    pub fn describe(&self, name: &str, kind: MetricKind, help: &str) {
        self.help.insert(name.to_string(), (kind, help.to_string()));
    }

    pub fn inc_counter(&self, name: &str, labels: &[(&str, &str)], by: f64) {
        if !by.is_finite() || by < 0.0 {
            warn!(metric = name, value = by, "Ignoring negative or non-finite counter increment.");
            return;
        }
        let entry = self
            .series
            .entry(SeriesKey::new(name, labels))
            .or_insert_with(|| Series::Counter(AtomicF64::default()));
        match entry.value() {
            Series::Counter(v) => v.add(by),
            other => kind_mismatch(name, MetricKind::Counter, other.kind()),
        }
    }

    pub fn set_gauge(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let entry = self
            .series
            .entry(SeriesKey::new(name, labels))
            .or_insert_with(|| Series::Gauge(AtomicF64::new(0.0)));
        match entry.value() {
            Series::Gauge(v) => v.set(value),
            other => kind_mismatch(name, MetricKind::Gauge, other.kind()),
        }
    }

    pub fn add_gauge(&self, name: &str, labels: &[(&str, &str)], delta: f64) {
        let entry = self
            .series
            .entry(SeriesKey::new(name, labels))
            .or_insert_with(|| Series::Gauge(AtomicF64::new(0.0)));
        match entry.value() {
            Series::Gauge(v) => v.add(delta),
            other => kind_mismatch(name, MetricKind::Gauge, other.kind()),
        }
    }

    pub fn observe(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        if !value.is_finite() {
            return;
        }
        let entry = self
            .series
            .entry(SeriesKey::new(name, labels))
            .or_insert_with(|| Series::Histogram(Histogram::new()));
        match entry.value() {
            Series::Histogram(h) => h.observe(value),
            other => kind_mismatch(name, MetricKind::Histogram, other.kind()),
        }
    }

    /// Aggregate value of a family: counters and gauges are summed across
    /// series; histograms report the mean observation. `None` if no series exist.
    pub fn value_of(&self, name: &str) -> Option<f64> {
        let mut total = 0.0;
        let mut hist_sum = 0.0;
        let mut hist_count = 0u64;
        let mut found = false;
        for entry in self.series.iter().filter(|e| e.key().name == name) {
            found = true;
            match entry.value() {
                Series::Counter(v) | Series::Gauge(v) => total += v.get(),
                Series::Histogram(h) => {
                    hist_sum += h.sum.get();
                    hist_count += h.count.load(Ordering::Relaxed);
                }
            }
        }
        if !found {
            return None;
        }
        if hist_count > 0 {
            total += hist_sum / hist_count as f64;
        }
        Some(total)
    }

    /// Value of a single series, if it exists and is a counter or gauge.
    pub fn series_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.series
            .get(&SeriesKey::new(name, labels))
            .and_then(|entry| match entry.value() {
                Series::Counter(v) | Series::Gauge(v) => Some(v.get()),
                Series::Histogram(_) => None,
            })
    }

    /// Number of observations recorded in a histogram family.
    pub fn histogram_count(&self, name: &str) -> u64 {
        self.series
            .iter()
            .filter(|e| e.key().name == name)
            .map(|e| match e.value() {
                Series::Histogram(h) => h.count.load(Ordering::Relaxed),
                _ => 0,
            })
            .sum()
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn family_count(&self) -> usize {
        self.series
            .iter()
            .map(|e| e.key().name.clone())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Renders all series in Prometheus text exposition format 0.0.4.
    pub fn render(&self) -> String {
        // Copy out first so no shard lock is held while formatting.
        let mut snapshot: Vec<(SeriesKey, MetricKind, SeriesSnapshot)> = self
            .series
            .iter()
            .map(|entry| {
                let snap = match entry.value() {
                    Series::Counter(v) | Series::Gauge(v) => SeriesSnapshot::Value(v.get()),
                    Series::Histogram(h) => SeriesSnapshot::Histogram {
                        buckets: h.counts.iter().map(|c| c.load(Ordering::Relaxed)).collect(),
                        sum: h.sum.get(),
                        count: h.count.load(Ordering::Relaxed),
                    },
                };
                (entry.key().clone(), entry.value().kind(), snap)
            })
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = String::new();
        let mut current_family: Option<String> = None;
        for (key, kind, snap) in snapshot {
            if current_family.as_deref() != Some(key.name.as_str()) {
                let help = self
                    .help
                    .get(&key.name)
                    .map(|h| h.1.clone())
                    .unwrap_or_else(|| DEFAULT_HELP.to_string());
                let _ = writeln!(out, "# HELP {} {}", key.name, escape_help(&help));
                let _ = writeln!(out, "# TYPE {} {}", key.name, kind_name(kind));
                current_family = Some(key.name.clone());
            }
            match snap {
                SeriesSnapshot::Value(v) => {
                    let _ = writeln!(out, "{}{} {}", key.name, format_labels(&key.labels, None), format_value(v));
                }
                SeriesSnapshot::Histogram { buckets, sum, count } => {
                    let mut cumulative = 0u64;
                    for (bound, c) in DEFAULT_BUCKETS_MS.iter().zip(buckets) {
                        cumulative += c;
                        let le = format_value(*bound);
                        let _ = writeln!(
                            out,
                            "{}_bucket{} {}",
                            key.name,
                            format_labels(&key.labels, Some(&le)),
                            cumulative
                        );
                    }
                    let _ = writeln!(out, "{}_bucket{} {}", key.name, format_labels(&key.labels, Some("+Inf")), count);
                    let _ = writeln!(out, "{}_sum{} {}", key.name, format_labels(&key.labels, None), format_value(sum));
                    let _ = writeln!(out, "{}_count{} {}", key.name, format_labels(&key.labels, None), count);
                }
            }
        }
        out
    }
}

fn kind_mismatch(name: &str, wanted: MetricKind, existing: MetricKind) {
    warn!(metric = name, ?wanted, ?existing, "Metric already registered with a different type.");
}

fn kind_name(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::Counter => "counter",
        MetricKind::Gauge => "gauge",
        MetricKind::Histogram => "histogram",
    }
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "+Inf".to_string() } else { "-Inf".to_string() }
    } else {
        v.to_string()
    }
}

fn format_labels(labels: &[(String, String)], le: Option<&str>) -> String {
    if labels.is_empty() && le.is_none() {
        return String::new();
    }
    let mut parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();
    if let Some(le) = le {
        parts.push(format!("le=\"{le}\""));
    }
    format!("{{{}}}", parts.join(","))
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}
