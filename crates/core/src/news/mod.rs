pub mod feeds;
pub mod sentiment;
pub mod summary;

use crate::config::Settings;
use crate::llm::LlmClient;
use crate::storage::{self, Db};
use feeds::FeedSource;

/// Feed URLs from `NEWS_FEEDS`, or the built-in list.
pub fn configured_feeds(settings: &Settings) -> Vec<String> {
    match &settings.news_feeds {
        Some(list) if !list.is_empty() => list.clone(),
        _ => feeds::DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NewsRunStats {
    pub feeds_ok: usize,
    pub selected: usize,
    pub inserted: u64,
    pub sentiment: sentiment::SentimentRunStats,
}

/// Fetches every feed, keeps the newest entries, stores the new ones.
pub async fn ingest(
    pool: &Db,
    source: &dyn FeedSource,
    feed_urls: &[String],
) -> anyhow::Result<NewsRunStats> {
    let per_feed = feeds::fetch_all(source, feed_urls).await;
    let feeds_ok = per_feed.len();
    let selected = feeds::select_recent(per_feed, feeds::MAX_ENTRIES);
    let inserted = storage::news::upsert_entries(pool, &selected).await?;

    tracing::info!(
        feeds = feed_urls.len(),
        feeds_ok,
        selected = selected.len(),
        inserted,
        "news ingest finished"
    );
    Ok(NewsRunStats {
        feeds_ok,
        selected: selected.len(),
        inserted,
        ..Default::default()
    })
}

/// Ingest followed by sentiment for up to [`feeds::MAX_ENTRIES`] unclassified rows.
pub async fn refresh(
    pool: &Db,
    source: &dyn FeedSource,
    llm: &dyn LlmClient,
    feed_urls: &[String],
) -> anyhow::Result<NewsRunStats> {
    let mut stats = ingest(pool, source, feed_urls).await?;
    let pending = storage::news::pending_sentiment(pool, feeds::MAX_ENTRIES as i64).await?;
    stats.sentiment = sentiment::classify_pending(pool, llm, &pending).await?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::news::FeedEntry;
    use crate::llm::fake::ScriptedLlm;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashMap;

    struct StaticFeeds(HashMap<String, Vec<FeedEntry>>);

    #[async_trait::async_trait]
    impl FeedSource for StaticFeeds {
        async fn fetch_feed(&self, url: &str) -> anyhow::Result<Vec<FeedEntry>> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("404 for {url}"))
        }
    }

    fn entries(prefix: &str, n: usize) -> Vec<FeedEntry> {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| FeedEntry {
                title: format!("{prefix} story {i}"),
                link: format!("https://{prefix}.example/{i}"),
                published: Some(base + Duration::minutes(i as i64)),
                summary: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn failing_feed_is_skipped_and_reruns_insert_nothing() {
        let pool = storage::open_in_memory().await.unwrap();
        let mut map = HashMap::new();
        map.insert("https://a.example/rss".to_string(), entries("a", 15));
        map.insert("https://b.example/rss".to_string(), entries("b", 15));
        let source = StaticFeeds(map);
        let urls = vec![
            "https://a.example/rss".to_string(),
            "https://down.example/rss".to_string(),
            "https://b.example/rss".to_string(),
        ];

        let first = ingest(&pool, &source, &urls).await.unwrap();
        assert_eq!(first.feeds_ok, 2);
        assert_eq!(first.selected, feeds::MAX_ENTRIES);
        assert_eq!(first.inserted, feeds::MAX_ENTRIES as u64);

        let second = ingest(&pool, &source, &urls).await.unwrap();
        assert_eq!(second.inserted, 0);
    }

    #[tokio::test]
    async fn refresh_classifies_new_rows() {
        let pool = storage::open_in_memory().await.unwrap();
        let mut map = HashMap::new();
        map.insert("https://a.example/rss".to_string(), entries("a", 3));
        let source = StaticFeeds(map);
        let llm = ScriptedLlm::new(vec![Ok(r#"[
            {"sentiment": "Positive", "reason": "x"},
            {"sentiment": "Negative", "reason": "y"},
            {"sentiment": "Neutral", "reason": "z"}
        ]"#
        .to_string())]);

        let stats = refresh(&pool, &source, &llm, &["https://a.example/rss".to_string()])
            .await
            .unwrap();
        assert_eq!(stats.inserted, 3);
        assert_eq!(stats.sentiment.classified, 3);
        assert_eq!(stats.sentiment.batches, 1);
    }

    #[test]
    fn falls_back_to_default_feeds() {
        let mut settings = Settings::for_tests();
        assert_eq!(configured_feeds(&settings).len(), feeds::DEFAULT_FEEDS.len());
        settings.news_feeds = Some(vec!["https://only.example/rss".to_string()]);
        assert_eq!(configured_feeds(&settings), vec!["https://only.example/rss".to_string()]);
    }
}
