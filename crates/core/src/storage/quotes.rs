use crate::domain::quote::MarketQuote;
use crate::storage::Db;
use anyhow::Context;
use chrono::{DateTime, Utc};

type QuoteRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    DateTime<Utc>,
);

/// Appends one snapshot to the history. Rows are never deduplicated.
pub async fn append_snapshot(pool: &Db, quotes: &[MarketQuote]) -> anyhow::Result<u64> {
    if quotes.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await.context("begin transaction failed")?;
    let mut inserted: u64 = 0;
    for q in quotes {
        let res = sqlx::query(
            "INSERT INTO crypto_snapshots \
             (name, symbol, price_usd, change_1h, change_24h, change_7d, change_14d, change_30d, captured_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&q.name)
        .bind(&q.symbol)
        .bind(&q.price_usd)
        .bind(&q.change_1h)
        .bind(&q.change_24h)
        .bind(&q.change_7d)
        .bind(&q.change_14d)
        .bind(&q.change_30d)
        .bind(q.captured_at)
        .execute(&mut *tx)
        .await
        .context("insert crypto_snapshots failed")?;
        inserted += res.rows_affected();
    }
    tx.commit().await.context("commit transaction failed")?;

    tracing::debug!(rows = inserted, "appended quote snapshot");
    Ok(inserted)
}

/// Full history in insertion order.
pub async fn load_history(pool: &Db) -> anyhow::Result<Vec<MarketQuote>> {
    let rows = sqlx::query_as::<_, QuoteRow>(
        "SELECT name, symbol, price_usd, change_1h, change_24h, change_7d, change_14d, change_30d, captured_at \
         FROM crypto_snapshots \
         ORDER BY ROWID ASC",
    )
    .fetch_all(pool)
    .await
    .context("select crypto_snapshots failed")?;

    Ok(rows.into_iter().map(into_quote).collect())
}

/// The most recent `limit` rows, newest first.
pub async fn latest_rows(pool: &Db, limit: i64) -> anyhow::Result<Vec<MarketQuote>> {
    let rows = sqlx::query_as::<_, QuoteRow>(
        "SELECT name, symbol, price_usd, change_1h, change_24h, change_7d, change_14d, change_30d, captured_at \
         FROM crypto_snapshots \
         ORDER BY ROWID DESC \
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("select latest crypto_snapshots failed")?;

    Ok(rows.into_iter().map(into_quote).collect())
}

pub async fn distinct_names(pool: &Db) -> anyhow::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM crypto_snapshots GROUP BY name ORDER BY MIN(ROWID)",
    )
    .fetch_all(pool)
    .await
    .context("select distinct names failed")?;
    Ok(rows.into_iter().map(|(n,)| n).collect())
}

fn into_quote(row: QuoteRow) -> MarketQuote {
    let (name, symbol, price_usd, change_1h, change_24h, change_7d, change_14d, change_30d, captured_at) =
        row;
    MarketQuote {
        name,
        symbol,
        price_usd,
        change_1h,
        change_24h,
        change_7d,
        change_14d,
        change_30d,
        captured_at,
    }
}
