//! Per-client sliding-window rate limiting for the sign-up and login forms.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;

use super::routes::request_ip;
use super::AppState;

/// Key used when the client address is unknown.
const UNKNOWN_CLIENT: &str = "unknown";

/// In-memory rate limiter keyed by client address.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_attempts: usize,
    window: Duration,
    entries: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn per_minute(max_attempts: u32) -> Self {
        Self::new(max_attempts as usize, Duration::from_secs(60))
    }

    /// Record an attempt from `key`.
    ///
    /// Returns `true` if the attempt is allowed, `false` if rate limited.
    /// Rejected attempts are not counted.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock();
        let timestamps = entries.entry(key.to_string()).or_default();

        timestamps.retain(|&t| now.duration_since(t) < self.window);
        if timestamps.len() >= self.max_attempts {
            return false;
        }
        timestamps.push(now);
        true
    }

    /// Drop clients with no attempts inside the window.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, timestamps| {
            timestamps.retain(|&t| now.duration_since(t) < self.window);
            !timestamps.is_empty()
        });
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }
}

/// Reject requests over the per-client budget with 429.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = request_ip(
        request.headers(),
        connect_info,
        state.config.trust_proxy_headers,
    )
    .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    if !state.rate_limiter.check(&key) {
        tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(
                header::RETRY_AFTER,
                state.rate_limiter.window().as_secs().to_string(),
            )],
            "Too many requests. Please wait a minute and try again.",
        )
            .into_response();
    }

    next.run(request).await
}
