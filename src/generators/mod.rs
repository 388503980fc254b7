//! Random telemetry generators.
//!
//! Every generator takes the RNG as an argument so callers can seed it.

pub mod alerts;
pub mod apm;
pub mod logs;
pub mod metrics;
pub mod traces;

use rand::Rng;

pub const SERVICES: &[&str] = &[
    "api-gateway",
    "auth-service",
    "user-service",
    "order-service",
    "payment-service",
    "inventory-service",
    "notification-service",
    "search-service",
];

pub const ENDPOINTS: &[&str] = &[
    "/api/users",
    "/api/orders",
    "/api/checkout",
    "/api/search",
    "/api/inventory",
    "/healthz",
];

pub fn pick<'a, R: Rng + ?Sized, T>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

/// Lowercase hex string of `bytes` random bytes.
pub fn hex_id<R: Rng + ?Sized>(rng: &mut R, bytes: usize) -> String {
    (0..bytes).map(|_| format!("{:02x}", rng.random::<u8>())).collect()
}

/// Value in `[min, max]` skewed toward `min`, the usual shape of latencies.
pub fn skewed<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    let u: f64 = rng.random();
    min + (max - min) * u * u * u
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
