//! Per-IP request rate limiting (token bucket, keyed by client address).
//!
//! Only the direct connection address is used; forwarded headers are not
//! trusted. Without `ConnectInfo` every client shares the "unknown" bucket.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{clock::Clock, clock::DefaultClock, DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Rate limiter shared across requests; a no-op when disabled in configuration
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Option<Arc<DefaultKeyedRateLimiter<String>>>,
}

impl RateLimitState {
    pub fn new(config: &ApiConfig) -> Self {
        if !config.enable_rate_limiting {
            return Self::disabled();
        }
        match Self::quota(config.rate_limit_requests, config.rate_limit_window_secs) {
            Some(quota) => Self {
                limiter: Some(Arc::new(RateLimiter::dashmap(quota))),
            },
            None => {
                tracing::warn!(
                    "Invalid rate limit {} per {}s, rate limiting disabled",
                    config.rate_limit_requests,
                    config.rate_limit_window_secs
                );
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { limiter: None }
    }

    /// `requests` per `window_secs`, all of them available as an initial burst
    fn quota(requests: u32, window_secs: u64) -> Option<Quota> {
        let burst = NonZeroU32::new(requests)?;
        let period = Duration::from_secs(window_secs) / requests;
        Quota::with_period(period).map(|q| q.allow_burst(burst))
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    pub fn check(&self, key: &str) -> Result<(), ApiError> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        limiter.check_key(&key.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            tracing::debug!("Rate limit exceeded for {}", key);
            ApiError::too_many_requests(wait.as_secs() + 1)
        })
    }

    /// Drop buckets that have fully replenished
    pub fn cleanup(&self) -> usize {
        match &self.limiter {
            Some(limiter) => {
                limiter.retain_recent();
                limiter.shrink_to_fit();
                limiter.len()
            }
            None => 0,
        }
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.rate_limit.is_enabled() {
        return next.run(request).await;
    }

    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match state.rate_limit.check(&key) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Periodically evict idle buckets so the key map stays bounded
pub fn spawn_cleanup_task(rate_limit: RateLimitState, interval: Duration) -> Option<tokio::task::JoinHandle<()>> {
    if !rate_limit.is_enabled() {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let remaining = rate_limit.cleanup();
            tracing::debug!("Rate limiter cleanup, {} active keys", remaining);
        }
    }))
}
