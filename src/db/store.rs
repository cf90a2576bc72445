//! The persistence boundary used by the auth and tab services.
//!
//! Services hold an `Arc<dyn SiteStore>` so tests can swap in doubles;
//! [`Database`] is the SQLite implementation used in production.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use super::models::{NewTab, Site, Tab};
use super::{queries, Database};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("{0} already exists")]
    Conflict(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Classify a query error, surfacing unique-index violations as conflicts.
    fn classify(err: anyhow::Error, what: &'static str) -> Self {
        let is_unique = err
            .chain()
            .filter_map(|cause| cause.downcast_ref::<sqlx::Error>())
            .any(|e| matches!(e, sqlx::Error::Database(db) if db.is_unique_violation()));

        if is_unique {
            Self::Conflict(what)
        } else {
            Self::Backend(err)
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Data access for sites, tabs and access logs.
///
/// `touch_site_last_accessed` and `log_access` are telemetry: they report
/// failure through their return value instead of an error.
#[async_trait]
pub trait SiteStore: Send + Sync {
    async fn insert_site(&self, username: &str, password_hash: &str) -> StoreResult<Site>;

    /// Create a site and its first tab atomically.
    async fn create_site_with_default_tab(
        &self,
        username: &str,
        password_hash: &str,
        tab_name: &str,
    ) -> StoreResult<(Site, Tab)>;

    async fn find_site_by_username(&self, username: &str) -> StoreResult<Option<Site>>;

    async fn find_site_by_id(&self, id: i64) -> StoreResult<Option<Site>>;

    async fn touch_site_last_accessed(&self, id: i64) -> bool;

    async fn deactivate_site(&self, id: i64) -> StoreResult<bool>;

    async fn insert_tab(&self, site_id: i64, name: &str, order: i64) -> StoreResult<Tab>;

    async fn find_tab(&self, site_id: i64, tab_id: i64) -> StoreResult<Option<Tab>>;

    async fn list_tabs_by_site(&self, site_id: i64) -> StoreResult<Vec<Tab>>;

    async fn count_tabs(&self, site_id: i64) -> StoreResult<i64>;

    async fn update_tab_content(
        &self,
        site_id: i64,
        tab_id: i64,
        content: &str,
    ) -> StoreResult<Option<Tab>>;

    async fn update_tab_name(
        &self,
        site_id: i64,
        tab_id: i64,
        name: &str,
    ) -> StoreResult<Option<Tab>>;

    async fn delete_tab(&self, site_id: i64, tab_id: i64) -> StoreResult<bool>;

    async fn reorder_tabs(&self, site_id: i64, mapping: &[(i64, i64)]) -> StoreResult<()>;

    async fn log_access(
        &self,
        site_id: i64,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> bool;

    async fn count_access_logs(&self, site_id: i64) -> StoreResult<i64>;

    /// Remove access log rows older than `days`. Returns the number removed.
    async fn delete_old_access_logs(&self, days: i64) -> StoreResult<u64>;
}

#[async_trait]
impl SiteStore for Database {
    async fn insert_site(&self, username: &str, password_hash: &str) -> StoreResult<Site> {
        queries::insert_site(self.pool(), username, password_hash)
            .await
            .map_err(|e| StoreError::classify(e, "username"))
    }

    async fn create_site_with_default_tab(
        &self,
        username: &str,
        password_hash: &str,
        tab_name: &str,
    ) -> StoreResult<(Site, Tab)> {
        queries::create_site_with_default_tab(self.pool(), username, password_hash, tab_name)
            .await
            .map_err(|e| StoreError::classify(e, "username"))
    }

    async fn find_site_by_username(&self, username: &str) -> StoreResult<Option<Site>> {
        Ok(queries::get_site_by_username(self.pool(), username).await?)
    }

    async fn find_site_by_id(&self, id: i64) -> StoreResult<Option<Site>> {
        Ok(queries::get_site_by_id(self.pool(), id).await?)
    }

    async fn touch_site_last_accessed(&self, id: i64) -> bool {
        match queries::touch_site_last_accessed(self.pool(), id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(site_id = id, "Failed to update last accessed: {e:#}");
                false
            }
        }
    }

    async fn deactivate_site(&self, id: i64) -> StoreResult<bool> {
        Ok(queries::deactivate_site(self.pool(), id).await?)
    }

    async fn insert_tab(&self, site_id: i64, name: &str, order: i64) -> StoreResult<Tab> {
        let new_tab = NewTab {
            site_id,
            tab_name: name,
            tab_order: order,
        };
        queries::insert_tab(self.pool(), &new_tab)
            .await
            .map_err(|e| StoreError::classify(e, "tab name"))
    }

    async fn find_tab(&self, site_id: i64, tab_id: i64) -> StoreResult<Option<Tab>> {
        Ok(queries::get_tab(self.pool(), site_id, tab_id).await?)
    }

    async fn list_tabs_by_site(&self, site_id: i64) -> StoreResult<Vec<Tab>> {
        Ok(queries::get_tabs_by_site(self.pool(), site_id).await?)
    }

    async fn count_tabs(&self, site_id: i64) -> StoreResult<i64> {
        Ok(queries::count_tabs(self.pool(), site_id).await?)
    }

    async fn update_tab_content(
        &self,
        site_id: i64,
        tab_id: i64,
        content: &str,
    ) -> StoreResult<Option<Tab>> {
        Ok(queries::update_tab_content(self.pool(), site_id, tab_id, content).await?)
    }

    async fn update_tab_name(
        &self,
        site_id: i64,
        tab_id: i64,
        name: &str,
    ) -> StoreResult<Option<Tab>> {
        queries::update_tab_name(self.pool(), site_id, tab_id, name)
            .await
            .map_err(|e| StoreError::classify(e, "tab name"))
    }

    async fn delete_tab(&self, site_id: i64, tab_id: i64) -> StoreResult<bool> {
        Ok(queries::delete_tab(self.pool(), site_id, tab_id).await?)
    }

    async fn reorder_tabs(&self, site_id: i64, mapping: &[(i64, i64)]) -> StoreResult<()> {
        Ok(queries::update_tab_order(self.pool(), site_id, mapping).await?)
    }

    async fn log_access(
        &self,
        site_id: i64,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> bool {
        match queries::insert_access_log(self.pool(), site_id, ip_address, user_agent).await {
            Ok(_) => true,
            Err(e) => {
                warn!(site_id, "Failed to log access: {e:#}");
                false
            }
        }
    }

    async fn count_access_logs(&self, site_id: i64) -> StoreResult<i64> {
        Ok(queries::count_access_logs(self.pool(), site_id).await?)
    }

    async fn delete_old_access_logs(&self, days: i64) -> StoreResult<u64> {
        Ok(queries::delete_old_access_logs(self.pool(), days).await?)
    }
}
