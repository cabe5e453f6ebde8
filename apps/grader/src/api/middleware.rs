//! # Middleware Module
//!
//! Global rate limiting for the grader HTTP API.
//!
//! Configured by `[server] rate_limit` (or `GRADER_RATE_LIMIT`), in requests
//! per second. Zero disables the limiter.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

const DEFAULT_RPS: NonZeroU32 = match NonZeroU32::new(crate::config::DEFAULT_RATE_LIMIT) {
    Some(rps) => rps,
    None => NonZeroU32::MIN,
};

/// Global rate limiter type alias.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a new global rate limiter. Zero falls back to the default rate.
pub fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_RPS);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// Returns 429 Too Many Requests once the limit is exceeded.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    match limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!("Rate limit exceeded");
            Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"))
        }
    }
}
