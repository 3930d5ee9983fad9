use crate::domain::news::{FeedEntry, NewsItem};
use crate::storage::Db;
use anyhow::Context;
use chrono::{DateTime, Utc};

type NewsRow = (
    i64,
    String,
    String,
    Option<DateTime<Utc>>,
    Option<String>,
    Option<String>,
);

/// `INSERT OR IGNORE` keyed on the unique link. Returns how many rows were new.
pub async fn upsert_entries(pool: &Db, entries: &[FeedEntry]) -> anyhow::Result<u64> {
    let mut tx = pool.begin().await.context("begin transaction failed")?;
    let mut inserted: u64 = 0;
    for entry in entries {
        let res = sqlx::query(
            "INSERT OR IGNORE INTO crypto_news (title, link, published, summary) VALUES (?, ?, ?, ?)",
        )
        .bind(&entry.title)
        .bind(&entry.link)
        .bind(entry.published)
        .bind(&entry.summary)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("insert crypto_news failed for {}", entry.link))?;
        inserted += res.rows_affected();
    }
    tx.commit().await.context("commit transaction failed")?;
    Ok(inserted)
}

/// Rows still waiting for a sentiment, most recently published first.
pub async fn pending_sentiment(pool: &Db, limit: i64) -> anyhow::Result<Vec<NewsItem>> {
    let rows = sqlx::query_as::<_, NewsRow>(
        "SELECT id, title, link, published, summary, sentiment \
         FROM crypto_news \
         WHERE sentiment IS NULL \
         ORDER BY published IS NULL, published DESC, id DESC \
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("select pending crypto_news failed")?;

    Ok(rows.into_iter().map(into_item).collect())
}

pub async fn latest_news(pool: &Db, limit: i64) -> anyhow::Result<Vec<NewsItem>> {
    let rows = sqlx::query_as::<_, NewsRow>(
        "SELECT id, title, link, published, summary, sentiment \
         FROM crypto_news \
         ORDER BY published IS NULL, published DESC, id DESC \
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("select crypto_news failed")?;

    Ok(rows.into_iter().map(into_item).collect())
}

/// Only fills rows that are still unclassified; returns false when the row was
/// already set (or does not exist).
pub async fn set_sentiment(pool: &Db, id: i64, sentiment_json: &str) -> anyhow::Result<bool> {
    let res = sqlx::query("UPDATE crypto_news SET sentiment = ? WHERE id = ? AND sentiment IS NULL")
        .bind(sentiment_json)
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("update crypto_news sentiment failed (id={id})"))?;
    Ok(res.rows_affected() == 1)
}

fn into_item(row: NewsRow) -> NewsItem {
    let (id, title, link, published, summary, sentiment) = row;
    NewsItem {
        id,
        title,
        link,
        published,
        summary,
        sentiment,
    }
}
