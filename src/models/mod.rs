pub mod alert_models;
pub mod telemetry_models;

pub use alert_models::*;
pub use telemetry_models::*;
