use crate::domain::insight::InsightRecord;
use crate::storage::Db;
use anyhow::Context;
use chrono::{DateTime, Utc};

pub async fn record_insight(pool: &Db, text: &str, at: DateTime<Utc>) -> anyhow::Result<i64> {
    let res = sqlx::query("INSERT INTO crypto_sentiments (timestamp, sentiment) VALUES (?, ?)")
        .bind(at)
        .bind(text)
        .execute(pool)
        .await
        .context("insert crypto_sentiments failed")?;
    Ok(res.last_insert_rowid())
}

pub async fn latest_insights(pool: &Db, limit: i64) -> anyhow::Result<Vec<InsightRecord>> {
    let rows = sqlx::query_as::<_, (i64, DateTime<Utc>, Option<String>)>(
        "SELECT id, timestamp, sentiment FROM crypto_sentiments ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("select crypto_sentiments failed")?;

    Ok(rows
        .into_iter()
        .map(|(id, timestamp, sentiment)| InsightRecord {
            id,
            timestamp,
            sentiment: sentiment.unwrap_or_default(),
        })
        .collect())
}
