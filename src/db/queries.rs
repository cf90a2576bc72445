use anyhow::{Context, Result};
use chrono::{Duration, SecondsFormat, Utc};
use sqlx::SqlitePool;

use super::models::{NewTab, Site, Tab};

/// Current time in the RFC 3339 form stored in every timestamp column.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ========== Sites ==========

/// Get an active site by ID.
pub async fn get_site_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Site>> {
    sqlx::query_as("SELECT * FROM sites WHERE id = ? AND is_active = 1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch site by id")
}

/// Get an active site by username.
pub async fn get_site_by_username(pool: &SqlitePool, username: &str) -> Result<Option<Site>> {
    sqlx::query_as("SELECT * FROM sites WHERE username = ? AND is_active = 1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch site by username")
}

/// Insert a new active site, returning the stored row.
pub async fn insert_site(pool: &SqlitePool, username: &str, password_hash: &str) -> Result<Site> {
    let now = now_timestamp();
    sqlx::query_as(
        r"
        INSERT INTO sites (username, password_hash, created_at, is_active)
        VALUES (?, ?, ?, 1)
        RETURNING *
        ",
    )
    .bind(username)
    .bind(password_hash)
    .bind(&now)
    .fetch_one(pool)
    .await
    .context("Failed to create site")
}

/// Insert a new site together with its first tab in a single transaction.
///
/// Either both rows exist afterwards or neither does.
pub async fn create_site_with_default_tab(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    tab_name: &str,
) -> Result<(Site, Tab)> {
    let now = now_timestamp();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let site: Site = sqlx::query_as(
        r"
        INSERT INTO sites (username, password_hash, created_at, is_active)
        VALUES (?, ?, ?, 1)
        RETURNING *
        ",
    )
    .bind(username)
    .bind(password_hash)
    .bind(&now)
    .fetch_one(&mut *tx)
    .await
    .context("Failed to create site")?;

    let tab: Tab = sqlx::query_as(
        r"
        INSERT INTO tabs (site_id, tab_name, content, tab_order, created_at, updated_at)
        VALUES (?, ?, '', 0, ?, ?)
        RETURNING *
        ",
    )
    .bind(site.id)
    .bind(tab_name)
    .bind(&now)
    .bind(&now)
    .fetch_one(&mut *tx)
    .await
    .context("Failed to create default tab")?;

    tx.commit().await.context("Failed to commit site creation")?;

    Ok((site, tab))
}

/// Update a site's last accessed timestamp.
pub async fn touch_site_last_accessed(pool: &SqlitePool, site_id: i64) -> Result<()> {
    sqlx::query("UPDATE sites SET last_accessed = ? WHERE id = ?")
        .bind(now_timestamp())
        .bind(site_id)
        .execute(pool)
        .await
        .context("Failed to update site last_accessed")?;
    Ok(())
}

/// Mark a site inactive. Returns whether a row changed.
pub async fn deactivate_site(pool: &SqlitePool, site_id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE sites SET is_active = 0 WHERE id = ? AND is_active = 1")
        .bind(site_id)
        .execute(pool)
        .await
        .context("Failed to deactivate site")?;
    Ok(result.rows_affected() > 0)
}

// ========== Tabs ==========

/// Get a tab by ID, scoped to its owning site.
pub async fn get_tab(pool: &SqlitePool, site_id: i64, tab_id: i64) -> Result<Option<Tab>> {
    sqlx::query_as("SELECT * FROM tabs WHERE id = ? AND site_id = ?")
        .bind(tab_id)
        .bind(site_id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch tab")
}

/// Get all tabs for a site in display order.
pub async fn get_tabs_by_site(pool: &SqlitePool, site_id: i64) -> Result<Vec<Tab>> {
    sqlx::query_as("SELECT * FROM tabs WHERE site_id = ? ORDER BY tab_order, id")
        .bind(site_id)
        .fetch_all(pool)
        .await
        .context("Failed to fetch tabs")
}

/// Count tabs owned by a site.
pub async fn count_tabs(pool: &SqlitePool, site_id: i64) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tabs WHERE site_id = ?")
        .bind(site_id)
        .fetch_one(pool)
        .await
        .context("Failed to count tabs")?;
    Ok(row.0)
}

/// Insert a new empty tab.
pub async fn insert_tab(pool: &SqlitePool, tab: &NewTab<'_>) -> Result<Tab> {
    let now = now_timestamp();
    sqlx::query_as(
        r"
        INSERT INTO tabs (site_id, tab_name, content, tab_order, created_at, updated_at)
        VALUES (?, ?, '', ?, ?, ?)
        RETURNING *
        ",
    )
    .bind(tab.site_id)
    .bind(tab.tab_name)
    .bind(tab.tab_order)
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await
    .context("Failed to create tab")
}

/// Replace a tab's content. Returns `None` if the site owns no such tab.
pub async fn update_tab_content(
    pool: &SqlitePool,
    site_id: i64,
    tab_id: i64,
    content: &str,
) -> Result<Option<Tab>> {
    sqlx::query_as(
        r"
        UPDATE tabs SET content = ?, updated_at = ?
        WHERE id = ? AND site_id = ?
        RETURNING *
        ",
    )
    .bind(content)
    .bind(now_timestamp())
    .bind(tab_id)
    .bind(site_id)
    .fetch_optional(pool)
    .await
    .context("Failed to update tab content")
}

/// Rename a tab. Returns `None` if the site owns no such tab.
pub async fn update_tab_name(
    pool: &SqlitePool,
    site_id: i64,
    tab_id: i64,
    tab_name: &str,
) -> Result<Option<Tab>> {
    sqlx::query_as(
        r"
        UPDATE tabs SET tab_name = ?, updated_at = ?
        WHERE id = ? AND site_id = ?
        RETURNING *
        ",
    )
    .bind(tab_name)
    .bind(now_timestamp())
    .bind(tab_id)
    .bind(site_id)
    .fetch_optional(pool)
    .await
    .context("Failed to update tab name")
}

/// Delete a tab. Returns whether a row was removed.
pub async fn delete_tab(pool: &SqlitePool, site_id: i64, tab_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tabs WHERE id = ? AND site_id = ?")
        .bind(tab_id)
        .bind(site_id)
        .execute(pool)
        .await
        .context("Failed to delete tab")?;
    Ok(result.rows_affected() > 0)
}

/// Apply a `(tab_id, tab_order)` mapping for one site in a single transaction.
///
/// Tab IDs not owned by the site are ignored.
pub async fn update_tab_order(
    pool: &SqlitePool,
    site_id: i64,
    mapping: &[(i64, i64)],
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    for &(tab_id, order) in mapping {
        sqlx::query("UPDATE tabs SET tab_order = ? WHERE id = ? AND site_id = ?")
            .bind(order)
            .bind(tab_id)
            .bind(site_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update tab order")?;
    }

    tx.commit().await.context("Failed to commit tab order")?;
    Ok(())
}

// ========== Access Logs ==========

/// Record an access to a site.
pub async fn insert_access_log(
    pool: &SqlitePool,
    site_id: i64,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO access_logs (site_id, ip_address, user_agent, accessed_at)
        VALUES (?, ?, ?, ?)
        ",
    )
    .bind(site_id)
    .bind(ip_address)
    .bind(user_agent)
    .bind(now_timestamp())
    .execute(pool)
    .await
    .context("Failed to insert access log")?;

    Ok(result.last_insert_rowid())
}

/// Count access log rows for a site.
pub async fn count_access_logs(pool: &SqlitePool, site_id: i64) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM access_logs WHERE site_id = ?")
        .bind(site_id)
        .fetch_one(pool)
        .await
        .context("Failed to count access logs")?;
    Ok(row.0)
}

/// Delete access logs older than the given number of days.
pub async fn delete_old_access_logs(pool: &SqlitePool, days: i64) -> Result<u64> {
    let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Secs, true);
    let result = sqlx::query("DELETE FROM access_logs WHERE accessed_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await
        .context("Failed to delete old access logs")?;
    Ok(result.rows_affected())
}
