//! # Per-Client Rate Limiting
//!
//! Fixed-window counter keyed by client address. Applied to the credential
//! endpoints (register, login) only.
//!
//! The key is the first entry of `X-Forwarded-For`, falling back to
//! `"anonymous"` when the header is absent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use parking_lot::Mutex;

use crate::error::AppError;

/// Rate limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    /// 50 requests per 15 minutes.
    fn default() -> Self {
        Self {
            max_requests: 50,
            window_secs: 900,
        }
    }
}

#[derive(Debug, Clone)]
struct BucketState {
    count: u64,
    window_start: Instant,
}

/// Shared rate limiter state. Clones share the same buckets.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<HashMap<String, BucketState>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count one request for `key` at `now`. `Err` carries the seconds
    /// left in the current window.
    fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        let window = Duration::from_secs(self.config.window_secs);
        let mut buckets = self.buckets.lock();

        // Evict expired windows once the map gets large.
        if buckets.len() > 10_000 {
            buckets.retain(|_, b| now.duration_since(b.window_start) < window);
        }

        let bucket = buckets.entry(key.to_string()).or_insert(BucketState {
            count: 0,
            window_start: now,
        });

        let elapsed = now.duration_since(bucket.window_start);
        if elapsed >= window {
            bucket.count = 0;
            bucket.window_start = now;
        }

        if bucket.count >= self.config.max_requests {
            let remaining = window.saturating_sub(now.duration_since(bucket.window_start));
            Err(remaining.as_secs().max(1))
        } else {
            bucket.count += 1;
            Ok(())
        }
    }
}

fn client_key(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

/// Reject with 429 once a client exceeds its window.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    if let Some(limiter) = request.extensions().get::<RateLimiter>().cloned() {
        let key = client_key(&request);
        if let Err(retry_after_secs) = limiter.check_at(&key, Instant::now()) {
            tracing::warn!(client = %key, "rate limit exceeded");
            return AppError::RateLimited { retry_after_secs }.into_response();
        }
    }

    next.run(request).await
}
