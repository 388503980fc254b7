pub mod alerting;
pub mod generators;
pub mod lgtm;
pub mod load;
pub mod models;
pub mod server;
pub mod telemetry;
pub mod version;
pub mod web;
