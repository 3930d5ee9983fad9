use crate::domain::quote::MarketQuote;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Last successful fetch, as persisted: `{"timestamp": <epoch secs>, "data": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedQuoteSet {
    pub timestamp: i64,
    pub data: Vec<MarketQuote>,
}

impl CachedQuoteSet {
    pub fn new(captured_at: DateTime<Utc>, data: Vec<MarketQuote>) -> Self {
        Self {
            timestamp: captured_at.timestamp(),
            data,
        }
    }

    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp() - self.timestamp
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age_secs(now) < ttl.as_secs() as i64
    }
}

#[async_trait::async_trait]
pub trait QuoteCache: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<CachedQuoteSet>>;

    async fn store(&self, set: &CachedQuoteSet) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileQuoteCache {
    path: PathBuf,
}

impl FileQuoteCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl QuoteCache for FileQuoteCache {
    async fn load(&self) -> anyhow::Result<Option<CachedQuoteSet>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read {} failed", self.path.display()))
            }
        };

        let set = serde_json::from_slice::<CachedQuoteSet>(&bytes)
            .with_context(|| format!("{} is not a valid quote cache", self.path.display()))?;
        Ok(Some(set))
    }

    async fn store(&self, set: &CachedQuoteSet) -> anyhow::Result<()> {
        let body = serde_json::to_vec(set).context("serialize quote cache failed")?;

        // Write then rename so a reader never sees a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .with_context(|| format!("write {} failed", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace {} failed", self.path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryQuoteCache {
    inner: tokio::sync::Mutex<Option<CachedQuoteSet>>,
}

impl MemoryQuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_set(set: CachedQuoteSet) -> Self {
        Self {
            inner: tokio::sync::Mutex::new(Some(set)),
        }
    }
}

#[async_trait::async_trait]
impl QuoteCache for MemoryQuoteCache {
    async fn load(&self) -> anyhow::Result<Option<CachedQuoteSet>> {
        Ok(self.inner.lock().await.clone())
    }

    async fn store(&self, set: &CachedQuoteSet) -> anyhow::Result<()> {
        *self.inner.lock().await = Some(set.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quote(at: DateTime<Utc>) -> MarketQuote {
        MarketQuote {
            name: "Bitcoin".to_string(),
            symbol: "BTC".to_string(),
            price_usd: "$67,000.00".to_string(),
            change_1h: "0.10%".to_string(),
            change_24h: "N/A".to_string(),
            change_7d: "2.00%".to_string(),
            change_14d: "3.00%".to_string(),
            change_30d: "-4.00%".to_string(),
            captured_at: at,
        }
    }

    #[test]
    fn freshness_is_strictly_within_ttl() {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let set = CachedQuoteSet::new(t, vec![]);
        assert!(set.is_fresh(t + chrono::Duration::seconds(299), DEFAULT_TTL));
        assert!(!set.is_fresh(t + chrono::Duration::seconds(300), DEFAULT_TTL));
        assert!(!set.is_fresh(t + chrono::Duration::seconds(301), DEFAULT_TTL));
    }

    #[tokio::test]
    async fn file_cache_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileQuoteCache::new(dir.path().join("cache.json"));
        assert!(cache.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_cache_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileQuoteCache::new(dir.path().join("cache.json"));
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

        cache
            .store(&CachedQuoteSet::new(t, vec![quote(t), quote(t)]))
            .await
            .unwrap();
        let later = t + chrono::Duration::seconds(600);
        cache
            .store(&CachedQuoteSet::new(later, vec![quote(later)]))
            .await
            .unwrap();

        let loaded = cache.load().await.unwrap().unwrap();
        assert_eq!(loaded.timestamp, later.timestamp());
        assert_eq!(loaded.data, vec![quote(later)]);
    }

    #[tokio::test]
    async fn file_cache_reports_corrupt_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"{not json").unwrap();
        let cache = FileQuoteCache::new(path);
        assert!(cache.load().await.is_err());
    }

    #[test]
    fn cache_file_uses_timestamp_and_data_keys() {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let v = serde_json::to_value(CachedQuoteSet::new(t, vec![])).unwrap();
        assert_eq!(v["timestamp"], serde_json::json!(t.timestamp()));
        assert!(v["data"].is_array());
    }
}
