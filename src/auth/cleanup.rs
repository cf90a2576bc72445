//! Background worker that prunes old access log rows.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::db::SiteStore;

/// Cleanup configuration.
pub struct CleanupConfig {
    /// Interval between cleanup runs.
    pub interval: Duration,
    /// Number of days to keep access log rows.
    pub retention_days: i64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600), // 1 hour
            retention_days: 90,
        }
    }
}

/// Run a single cleanup cycle. Returns the number of rows removed.
pub async fn cleanup_once(store: &dyn SiteStore, retention_days: i64) -> u64 {
    match store.delete_old_access_logs(retention_days).await {
        Ok(count) => {
            if count > 0 {
                tracing::info!(
                    old_access_logs = count,
                    retention_days,
                    "Cleaned up old access logs"
                );
            }
            count
        }
        Err(e) => {
            tracing::error!("Failed to delete old access logs: {e}");
            0
        }
    }
}

/// Run the cleanup worker.
/// Runs once on start, then at the configured interval until cancelled.
pub async fn run_cleanup_worker(
    store: Arc<dyn SiteStore>,
    config: CleanupConfig,
    shutdown: CancellationToken,
) {
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        retention_days = config.retention_days,
        "Starting cleanup worker"
    );

    cleanup_once(store.as_ref(), config.retention_days).await;

    let mut interval = tokio::time::interval(config.interval);
    interval.tick().await; // Skip the first immediate tick (we already ran cleanup)

    loop {
        tokio::select! {
            _ = interval.tick() => {
                cleanup_once(store.as_ref(), config.retention_days).await;
            }
            () = shutdown.cancelled() => {
                tracing::info!("Cleanup worker shutting down");
                break;
            }
        }
    }
}
