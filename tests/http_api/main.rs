//! End-to-end tests driving the full router in process.

mod helpers;

mod alerts;
mod core_api;
mod generate;
mod lgtm;
mod load;
mod settings;
