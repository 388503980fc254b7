use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use super::notifier::{DeliveryRecord, NotificationDispatcher};
use super::store::{AlertStore, RuleTransition};
use crate::models::{Alert, AlertRule};
use crate::telemetry::{MetricsRegistry, ALERTS_FIRING};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,
}

impl Comparison {
    pub fn parse(op: &str) -> Option<Self> {
        match op.trim() {
            ">" => Some(Comparison::Gt),
            ">=" => Some(Comparison::Gte),
            "<" => Some(Comparison::Lt),
            "<=" => Some(Comparison::Lte),
            "==" | "=" => Some(Comparison::Eq),
            "!=" => Some(Comparison::Ne),
            _ => None,
        }
    }

    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Gt => value > threshold,
            Comparison::Gte => value >= threshold,
            Comparison::Lt => value < threshold,
            Comparison::Lte => value <= threshold,
            Comparison::Eq => (value - threshold).abs() < f64::EPSILON,
            Comparison::Ne => (value - threshold).abs() >= f64::EPSILON,
        }
    }
}

/// `None` when `op` is not a known operator.
pub fn compare(op: &str, value: f64, threshold: f64) -> Option<bool> {
    Comparison::parse(op).map(|c| c.holds(value, threshold))
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationSummary {
    pub evaluated: usize,
    /// Rules whose condition holds right now, newly fired or not.
    pub firing: usize,
    pub resolved: usize,
    pub no_data: usize,
    pub evaluated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationOutcome {
    pub summary: EvaluationSummary,
    pub fired: Vec<(AlertRule, Alert)>,
}

/// Evaluates every enabled rule against the current registry values.
pub async fn evaluate_rules(store: &AlertStore, registry: &MetricsRegistry) -> EvaluationOutcome {
    let now = Utc::now();
    let mut outcome = EvaluationOutcome::default();
    outcome.summary.evaluated_at = Some(now);

    for rule in store.enabled_rules().await {
        outcome.summary.evaluated += 1;
        let value = registry.value_of(&rule.metric);
        let condition = value.and_then(|v| compare(&rule.comparison_operator, v, rule.threshold));
        if value.is_none() {
            outcome.summary.no_data += 1;
        }

        match store.record_evaluation(&rule, value, condition, now).await {
            RuleTransition::Fired(alert) => {
                info!(rule = %rule.name, value = alert.value, threshold = rule.threshold, "Alert rule fired.");
                outcome.summary.firing += 1;
                outcome.fired.push((rule, alert));
            }
            RuleTransition::StillFiring => outcome.summary.firing += 1,
            RuleTransition::Resolved => {
                info!(rule = %rule.name, "Alert rule resolved.");
                outcome.summary.resolved += 1;
            }
            RuleTransition::Unchanged => {}
        }
    }

    registry.set_gauge(ALERTS_FIRING, &[], store.firing_count().await as f64);
    outcome
}

/// Evaluates, then notifies the channels linked to each newly fired rule.
pub async fn evaluate_and_notify(
    store: &AlertStore,
    registry: &MetricsRegistry,
    notifier: &NotificationDispatcher,
) -> (EvaluationSummary, Vec<DeliveryRecord>) {
    let outcome = evaluate_rules(store, registry).await;
    let mut deliveries = Vec::new();
    for (rule, alert) in &outcome.fired {
        let channels = store.channels_by_ids(&rule.notification_channel_ids).await;
        if channels.is_empty() {
            continue;
        }
        deliveries.extend(notifier.notify_alert(&channels, rule, alert).await);
    }
    (outcome.summary, deliveries)
}

/// Runs [`evaluate_and_notify`] every `period_secs`. `0` disables the task.
pub fn spawn_periodic_evaluation(
    store: Arc<AlertStore>,
    registry: Arc<MetricsRegistry>,
    notifier: Arc<NotificationDispatcher>,
    period_secs: u64,
) -> Option<JoinHandle<()>> {
    if period_secs == 0 {
        info!("Periodic alert evaluation disabled.");
        return None;
    }
    info!(interval_secs = period_secs, "Alert evaluation task started.");
    Some(tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(period_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let (summary, deliveries) = evaluate_and_notify(&store, &registry, &notifier).await;
            debug!(
                evaluated = summary.evaluated,
                firing = summary.firing,
                resolved = summary.resolved,
                no_data = summary.no_data,
                "Alert evaluation cycle finished."
            );
            for failed in deliveries.iter().filter(|d| d.is_failure()) {
                error!(channel_id = %failed.channel_id, detail = %failed.detail, "Alert notification failed.");
            }
        }
    }))
}
