use crate::domain::news::FeedEntry;
use anyhow::Context;
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_FEEDS: [&str; 3] = [
    "https://cointelegraph.com/rss",
    "https://www.coindesk.com/arc/outboundfeeds/rss/",
    "https://cryptonews.com/news/feed",
];

/// Entries kept per run after de-duplication.
pub const MAX_ENTRIES: usize = 20;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self, url: &str) -> anyhow::Result<Vec<FeedEntry>>;
}

#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    http: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(concat!("coinpulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build feed http client")?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_feed(&self, url: &str) -> anyhow::Result<Vec<FeedEntry>> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("feed request failed: {url}"))?;
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .with_context(|| format!("failed to read feed body: {url}"))?;
        if !status.is_success() {
            anyhow::bail!("feed HTTP {status}: {url}");
        }
        parse_feed(&bytes).with_context(|| format!("failed to parse feed: {url}"))
    }
}

/// RSS or Atom. Entries without a link are dropped; dates that fail to parse
/// become `None`.
pub fn parse_feed(bytes: &[u8]) -> anyhow::Result<Vec<FeedEntry>> {
    let feed = feed_rs::parser::parse(bytes)?;

    let mut out = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let link = entry
            .links
            .first()
            .map(|l| l.href.trim().to_string())
            .unwrap_or_default();
        if link.is_empty() {
            continue;
        }

        out.push(FeedEntry {
            title: entry
                .title
                .map(|t| t.content.trim().to_string())
                .unwrap_or_default(),
            link,
            published: entry.published.or(entry.updated),
            summary: entry
                .summary
                .map(|t| t.content.trim().to_string())
                .filter(|s| !s.is_empty()),
        });
    }
    Ok(out)
}

/// Each feed is fetched on its own; a failing feed is logged and skipped.
pub async fn fetch_all(source: &dyn FeedSource, feeds: &[String]) -> Vec<Vec<FeedEntry>> {
    let mut out = Vec::with_capacity(feeds.len());
    for url in feeds {
        match source.fetch_feed(url).await {
            Ok(entries) => {
                tracing::info!(%url, entries = entries.len(), "fetched feed");
                out.push(entries);
            }
            Err(err) => {
                tracing::warn!(%url, error = %format!("{err:#}"), "feed fetch failed; skipping");
            }
        }
    }
    out
}

/// De-duplicates by link (first occurrence wins) and keeps the most recently
/// published entries. Undated entries sort last.
pub fn select_recent(per_feed: Vec<Vec<FeedEntry>>, limit: usize) -> Vec<FeedEntry> {
    let mut seen = HashSet::new();
    let mut entries: Vec<FeedEntry> = per_feed
        .into_iter()
        .flatten()
        .filter(|e| seen.insert(e.link.clone()))
        .collect();

    entries.sort_by(|a, b| b.published.cmp(&a.published));
    entries.truncate(limit);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Crypto News</title>
    <link>https://news.example</link>
    <description>feed</description>
    <item>
      <title>  Bitcoin ETF sees record inflows </title>
      <link>https://news.example/btc-etf</link>
      <pubDate>Sun, 01 Feb 2026 09:30:00 GMT</pubDate>
      <description>Funds pulled in a record amount.</description>
    </item>
    <item>
      <title>Undated item</title>
      <link>https://news.example/undated</link>
    </item>
    <item>
      <title>No link here</title>
    </item>
  </channel>
</rss>"#;

    fn entry(link: &str, hour: Option<u32>) -> FeedEntry {
        FeedEntry {
            title: link.to_string(),
            link: link.to_string(),
            published: hour.map(|h| Utc.with_ymd_and_hms(2026, 2, 1, h, 0, 0).unwrap()),
            summary: None,
        }
    }

    #[test]
    fn parses_rss_items() {
        let entries = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Bitcoin ETF sees record inflows");
        assert_eq!(entries[0].link, "https://news.example/btc-etf");
        assert_eq!(
            entries[0].published,
            Some(Utc.with_ymd_and_hms(2026, 2, 1, 9, 30, 0).unwrap())
        );
        assert_eq!(
            entries[0].summary.as_deref(),
            Some("Funds pulled in a record amount.")
        );
        assert_eq!(entries[1].published, None);
    }

    #[test]
    fn rejects_non_feed_bodies() {
        assert!(parse_feed(b"<html><body>503</body></html>").is_err());
    }

    #[test]
    fn same_link_from_two_feeds_is_kept_once() {
        let a = vec![entry("https://x.example/1", Some(8)), entry("https://x.example/2", Some(9))];
        let b = vec![entry("https://x.example/1", Some(10))];
        let out = select_recent(vec![a, b], MAX_ENTRIES);
        assert_eq!(out.len(), 2);
        let first = out.iter().find(|e| e.link == "https://x.example/1").unwrap();
        assert_eq!(first.published, Some(Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap()));
    }

    #[test]
    fn keeps_most_recent_and_puts_undated_last() {
        let feed: Vec<_> = (0..23).map(|h| entry(&format!("https://x.example/{h}"), Some(h))).collect();
        let mut all = feed.clone();
        all.push(entry("https://x.example/undated", None));

        let out = select_recent(vec![all], MAX_ENTRIES);
        assert_eq!(out.len(), 20);
        assert_eq!(out[0].link, "https://x.example/22");
        assert_eq!(out[19].link, "https://x.example/3");

        let out = select_recent(vec![vec![entry("u", None), entry("d", Some(1))]], MAX_ENTRIES);
        assert_eq!(out[0].link, "d");
        assert_eq!(out[1].link, "u");
    }

    struct FlakySource;

    #[async_trait::async_trait]
    impl FeedSource for FlakySource {
        async fn fetch_feed(&self, url: &str) -> anyhow::Result<Vec<FeedEntry>> {
            if url.contains("broken") {
                anyhow::bail!("connection reset");
            }
            Ok(vec![entry(&format!("{url}/item"), Some(1))])
        }
    }

    #[tokio::test]
    async fn one_failing_feed_does_not_abort_the_others() {
        let feeds = vec![
            "https://a.example".to_string(),
            "https://broken.example".to_string(),
            "https://c.example".to_string(),
        ];
        let out = fetch_all(&FlakySource, &feeds).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[1][0].link, "https://c.example/item");
    }
}
