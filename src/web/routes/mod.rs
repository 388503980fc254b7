pub mod alert_routes;
pub mod apm_routes;
pub mod core_routes;
pub mod generate_routes;
pub mod lgtm_routes;
pub mod load_routes;
pub mod settings_routes;
pub mod simulate_routes;
