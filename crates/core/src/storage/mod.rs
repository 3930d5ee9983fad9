pub mod insights;
pub mod news;
pub mod quotes;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub type Db = SqlitePool;

/// Idempotent schema; applied on every start. There is no migration history.
const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS crypto_snapshots (
        name TEXT NOT NULL,
        symbol TEXT NOT NULL,
        price_usd TEXT NOT NULL,
        change_1h TEXT NOT NULL,
        change_24h TEXT NOT NULL,
        change_7d TEXT NOT NULL,
        change_14d TEXT NOT NULL,
        change_30d TEXT NOT NULL,
        captured_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS crypto_snapshots_captured_at ON crypto_snapshots (captured_at)",
    "CREATE TABLE IF NOT EXISTS crypto_sentiments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
        sentiment TEXT
    )",
    "CREATE TABLE IF NOT EXISTS crypto_news (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        link TEXT NOT NULL UNIQUE,
        published DATETIME,
        summary TEXT,
        sentiment TEXT
    )",
    "CREATE INDEX IF NOT EXISTS crypto_news_pending ON crypto_news (published) WHERE sentiment IS NULL",
];

pub async fn open(database_url: &str) -> anyhow::Result<Db> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid sqlite url: {database_url}"))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("connect {database_url} failed"))?;

    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Single-connection pool so every query sees the same in-memory database.
pub async fn open_in_memory() -> anyhow::Result<Db> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .context("open in-memory sqlite failed")?;

    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Opens the configured store, or an in-memory one when that fails. The error
/// is handed back so the caller can surface it. A snapshot table with a
/// foreign column layout is fatal instead.
pub async fn open_or_fallback(database_url: &str) -> anyhow::Result<(Db, Option<anyhow::Error>)> {
    match open(database_url).await {
        Ok(pool) => Ok((pool, None)),
        Err(err) if err.downcast_ref::<LegacySnapshotTable>().is_some() => Err(err),
        Err(err) => {
            tracing::error!(
                error = %format!("{err:#}"),
                "database unavailable; falling back to in-memory store"
            );
            let pool = open_in_memory().await?;
            Ok((pool, Some(err)))
        }
    }
}

/// `crypto_snapshots` exists but lacks the columns this build writes.
#[derive(Debug)]
pub struct LegacySnapshotTable {
    pub columns: Vec<String>,
}

impl std::fmt::Display for LegacySnapshotTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "crypto_snapshots has an unsupported column layout ({}); \
             point DATABASE_URL at a new file or rename the old table",
            self.columns.join(", ")
        )
    }
}

impl std::error::Error for LegacySnapshotTable {}

const SNAPSHOT_COLUMNS: [&str; 9] = [
    "name",
    "symbol",
    "price_usd",
    "change_1h",
    "change_24h",
    "change_7d",
    "change_14d",
    "change_30d",
    "captured_at",
];

async fn check_snapshot_layout(pool: &Db) -> anyhow::Result<()> {
    let columns: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM pragma_table_info('crypto_snapshots')")
            .fetch_all(pool)
            .await
            .context("inspect crypto_snapshots failed")?;
    if columns.is_empty() {
        return Ok(());
    }
    let columns: Vec<String> = columns.into_iter().map(|(n,)| n).collect();
    if SNAPSHOT_COLUMNS
        .iter()
        .all(|want| columns.iter().any(|have| have == want))
    {
        return Ok(());
    }
    Err(LegacySnapshotTable { columns }.into())
}

pub async fn ensure_schema(pool: &Db) -> anyhow::Result<()> {
    check_snapshot_layout(pool).await?;
    for stmt in SCHEMA {
        sqlx::query(stmt)
            .execute(pool)
            .await
            .with_context(|| format!("schema statement failed: {stmt}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_is_idempotent() {
        let pool = open_in_memory().await.unwrap();
        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE 'crypto_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<_> = tables.into_iter().map(|(n,)| n).collect();
        assert_eq!(names, ["crypto_news", "crypto_sentiments", "crypto_snapshots"]);
    }

    #[tokio::test]
    async fn file_database_is_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("crypto_data.db").display());
        let pool = open(&url).await.unwrap();
        pool.close().await;
        assert!(dir.path().join("crypto_data.db").exists());
    }

    #[tokio::test]
    async fn foreign_snapshot_layout_is_rejected_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("crypto_data.db").display());

        let options = SqliteConnectOptions::from_str(&url).unwrap().create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await.unwrap();
        sqlx::query(
            r#"CREATE TABLE crypto_snapshots ("🪙 Coin" TEXT, "💲 Price (USD)" TEXT, "⏱️ 1h Change" TEXT)"#,
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;

        let err = open(&url).await.unwrap_err();
        let legacy = err.downcast_ref::<LegacySnapshotTable>().unwrap();
        assert_eq!(legacy.columns.len(), 3);
        assert!(err.to_string().contains("point DATABASE_URL at a new file"));

        let err = open_or_fallback(&url).await.unwrap_err();
        assert!(err.downcast_ref::<LegacySnapshotTable>().is_some());
    }

    #[tokio::test]
    async fn existing_current_layout_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("crypto_data.db").display());
        open(&url).await.unwrap().close().await;
        open(&url).await.unwrap().close().await;
    }

    #[tokio::test]
    async fn unusable_path_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite://{}",
            dir.path().join("missing").join("nested").join("x.db").display()
        );
        let (pool, err) = open_or_fallback(&url).await.unwrap();
        assert!(err.is_some());
        ensure_schema(&pool).await.unwrap();
    }
}
