use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Run all pending migrations.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    create_migration_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version < 1 {
        debug!("Running migration v1");
        run_migration_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    if current_version < 2 {
        debug!("Running migration v2");
        run_migration_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }

    Ok(())
}

async fn create_migration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS _schema_version (
            version INTEGER PRIMARY KEY
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create schema version table")?;

    Ok(())
}

async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT version FROM _schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("Failed to get schema version")?;

    Ok(row.map_or(0, |(v,)| v))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("DELETE FROM _schema_version")
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO _schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

async fn run_migration_v1(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v1: creating sites and tabs");

    // Sites table
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS sites (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            last_accessed TEXT,
            is_active INTEGER NOT NULL DEFAULT 1
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create sites table")?;

    // Usernames only need to be unique among active sites
    sqlx::query(
        r"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_sites_active_username
        ON sites(username) WHERE is_active = 1
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create sites username index")?;

    // Tabs table
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS tabs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            tab_name TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            tab_order INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
            UNIQUE(site_id, tab_name)
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create tabs table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tabs_site_order ON tabs(site_id, tab_order)")
        .execute(pool)
        .await
        .context("Failed to create tabs order index")?;

    Ok(())
}

async fn run_migration_v2(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v2: creating access logs");

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS access_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            ip_address TEXT,
            user_agent TEXT,
            accessed_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create access_logs table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_access_logs_site ON access_logs(site_id, accessed_at)",
    )
    .execute(pool)
    .await
    .context("Failed to create access_logs index")?;

    Ok(())
}
