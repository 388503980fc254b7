//! In-memory alert rules, alerts, incidents and notification channels.

pub mod evaluation;
pub mod notifier;
pub mod store;

pub use evaluation::{evaluate_and_notify, evaluate_rules, spawn_periodic_evaluation, Comparison, EvaluationSummary};
pub use notifier::{DeliveryRecord, DeliveryStatus, NotificationDispatcher, NotificationError};
pub use store::{AlertStore, AlertStoreError};

/// Channel types accepted by `POST /api/notification-channels`.
pub const CHANNEL_TYPES: &[&str] = &["webhook", "slack", "email", "pagerduty"];
