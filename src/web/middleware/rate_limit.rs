use axum::{
    body::Body as AxumBody,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::warn;

use crate::web::{error::AppError, AppState};

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Global token bucket: refills `per_second` tokens a second up to `burst`.
#[derive(Debug)]
pub struct RateLimiter {
    per_second: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// A `per_second` of 0 admits everything.
    pub fn new(per_second: u32, burst: u32) -> Self {
        let burst = f64::from(burst.max(per_second).max(1));
        Self {
            per_second: f64::from(per_second),
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.per_second > 0.0
    }

    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&self, now: Instant) -> bool {
        if !self.is_enabled() {
            return true;
        }
        // A poisoned lock only means another request panicked mid-update.
        let mut bucket = match self.bucket.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.burst);
        bucket.last_refill = bucket.last_refill.max(now);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request<AxumBody>,
    next: Next,
) -> Result<Response, AppError> {
    if !state.rate_limiter.try_acquire() {
        warn!(path = %req.uri().path(), "Request rejected by rate limiter.");
        return Err(AppError::RateLimited);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_burst_then_refill() {
        let limiter = RateLimiter::new(10, 3);
        let start = Instant::now();
        // burst is raised to per_second when smaller
        for _ in 0..10 {
            assert!(limiter.try_acquire_at(start));
        }
        assert!(!limiter.try_acquire_at(start));

        let later = start + Duration::from_millis(250);
        assert!(limiter.try_acquire_at(later));
        assert!(limiter.try_acquire_at(later));
        assert!(!limiter.try_acquire_at(later));
    }

    #[test]
    fn test_disabled_admits_everything() {
        let limiter = RateLimiter::new(0, 0);
        let now = Instant::now();
        assert!((0..10_000).all(|_| limiter.try_acquire_at(now)));
    }

    #[test]
    fn test_refill_is_capped_at_burst() {
        let limiter = RateLimiter::new(1, 2);
        let start = Instant::now();
        assert!(limiter.try_acquire_at(start));
        assert!(limiter.try_acquire_at(start));
        let much_later = start + Duration::from_secs(3600);
        assert!(limiter.try_acquire_at(much_later));
        assert!(limiter.try_acquire_at(much_later));
        assert!(!limiter.try_acquire_at(much_later));
    }
}
