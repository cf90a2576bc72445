mod pages;
mod rate_limit;
mod routes;

pub use rate_limit::RateLimiter;
pub use routes::status_for;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, FromRef};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::AuthService;
use crate::config::Config;
use crate::tabs::TabService;

/// Headroom for form encoding: percent-escaping can triple the body size.
const FORM_OVERHEAD_FACTOR: usize = 3;
const FORM_FIELDS_ALLOWANCE: usize = 16 * 1024;

/// Shared application state.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub auth: AuthService,
    pub tabs: TabService,
    pub config: Arc<Config>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    #[must_use]
    pub fn new(auth: AuthService, tabs: TabService, config: Config) -> Self {
        let rate_limiter = RateLimiter::per_minute(config.rate_limit_per_minute);
        Self {
            auth,
            tabs,
            config: Arc::new(config),
            rate_limiter,
        }
    }
}

/// Start the web server and run until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve(state: AppState, shutdown: CancellationToken) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.web_host, state.config.web_port)
        .parse()
        .context("Invalid web server address")?;

    spawn_rate_limiter_cleanup(state.rate_limiter.clone(), shutdown.clone());

    let app = create_app(state);

    info!(addr = %addr, "Starting HTTP web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .context("Web server error")?;

    Ok(())
}

/// Create the main application router.
pub fn create_app(state: AppState) -> Router {
    let body_limit =
        state.tabs.max_content_bytes() * FORM_OVERHEAD_FACTOR + FORM_FIELDS_ALLOWANCE;

    Router::new()
        .merge(routes::router(state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn spawn_rate_limiter_cleanup(limiter: RateLimiter, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(limiter.window());
        loop {
            tokio::select! {
                _ = interval.tick() => limiter.cleanup(),
                () = shutdown.cancelled() => break,
            }
        }
    });
}
