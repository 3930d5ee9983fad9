use crate::cache::{CachedQuoteSet, FileQuoteCache, QuoteCache, DEFAULT_TTL};
use crate::config::Settings;
use crate::domain::quote::{format_usd, safe_pct, Coin, MarketQuote, NOT_AVAILABLE, TRACKED_COINS};
use crate::ingest::error::FetchError;
use crate::ingest::provider::{CoinGeckoClient, MarketDataSource};
use crate::ingest::types::CoinMarket;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Sleep after the n-th rate-limited attempt is `rate_limit_step * n`.
    pub rate_limit_step: Duration,
    pub error_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_step: Duration::from_secs(30),
            error_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32, err: &FetchError) -> Duration {
        match err {
            FetchError::RateLimited { .. } => self.rate_limit_step * attempt,
            _ => self.error_backoff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSource {
    Live,
    Cache,
    Empty,
}

#[derive(Debug, Clone)]
pub struct QuoteBatch {
    pub quotes: Vec<MarketQuote>,
    pub source: QuoteSource,
    /// Set when the live call was attempted and failed.
    pub error: Option<FetchError>,
}

impl QuoteBatch {
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

pub struct MarketFetcher {
    source: Arc<dyn MarketDataSource>,
    cache: Arc<dyn QuoteCache>,
    coins: Vec<Coin>,
    policy: RetryPolicy,
    ttl: Duration,
}

impl MarketFetcher {
    pub fn new(source: Arc<dyn MarketDataSource>, cache: Arc<dyn QuoteCache>) -> Self {
        Self {
            source,
            cache,
            coins: TRACKED_COINS.to_vec(),
            policy: RetryPolicy::default(),
            ttl: DEFAULT_TTL,
        }
    }

    /// CoinGecko client plus the file cache at `QUOTE_CACHE_PATH`.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let source = CoinGeckoClient::from_settings(settings)?;
        let cache = FileQuoteCache::new(settings.quote_cache_path.clone());
        Ok(Self::new(Arc::new(source), Arc::new(cache)))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn fetch(&self) -> QuoteBatch {
        self.fetch_at(Utc::now()).await
    }

    /// Cache-aware fetch: a fresh cache short-circuits the network; a failed
    /// live call falls back to whatever cache exists, stale or not.
    pub async fn fetch_at(&self, now: DateTime<Utc>) -> QuoteBatch {
        let cached = match self.cache.load().await {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "quote cache unreadable; ignoring");
                None
            }
        };

        if let Some(set) = cached.as_ref() {
            if set.is_fresh(now, self.ttl) {
                tracing::debug!(age_secs = set.age_secs(now), rows = set.data.len(), "serving quotes from cache");
                return QuoteBatch {
                    quotes: set.data.clone(),
                    source: QuoteSource::Cache,
                    error: None,
                };
            }
        }

        match self.fetch_live(now).await {
            Ok(quotes) => {
                let captured_at = quotes.first().map(|q| q.captured_at).unwrap_or(now);
                let set = CachedQuoteSet::new(captured_at, quotes.clone());
                if let Err(err) = self.cache.store(&set).await {
                    let err = FetchError::storage(err);
                    tracing::warn!(error = %err, "failed to write quote cache");
                }
                QuoteBatch {
                    quotes,
                    source: QuoteSource::Live,
                    error: None,
                }
            }
            Err(err) => match cached {
                Some(set) => {
                    tracing::warn!(
                        error = %err,
                        age_secs = set.age_secs(now),
                        "live fetch failed; serving stale cache"
                    );
                    QuoteBatch {
                        quotes: set.data,
                        source: QuoteSource::Cache,
                        error: Some(err),
                    }
                }
                None => {
                    tracing::error!(error = %err, "live fetch failed and no cache available");
                    QuoteBatch {
                        quotes: Vec::new(),
                        source: QuoteSource::Empty,
                        error: Some(err),
                    }
                }
            },
        }
    }

    /// Live call with the retry policy applied; no cache involvement.
    pub async fn fetch_live(&self, now: DateTime<Utc>) -> Result<Vec<MarketQuote>, FetchError> {
        let ids: Vec<&str> = self.coins.iter().map(|c| c.id).collect();
        let started = tokio::time::Instant::now();

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.source.fetch_markets(&ids).await {
                Ok(markets) => {
                    let elapsed = chrono::Duration::from_std(started.elapsed())
                        .unwrap_or_else(|_| chrono::Duration::zero());
                    let captured_at = now + elapsed;
                    tracing::info!(
                        provider = self.source.provider_name(),
                        attempt,
                        rows = markets.len(),
                        "fetched market data"
                    );
                    return Ok(markets
                        .iter()
                        .map(|m| to_quote(m, &self.coins, captured_at))
                        .collect());
                }
                Err(err) => {
                    if attempt >= self.policy.max_attempts {
                        return Err(err);
                    }
                    let backoff = self.policy.backoff(attempt, &err);
                    tracing::warn!(
                        attempt,
                        ?backoff,
                        kind = err.kind(),
                        error = %err,
                        "market data fetch failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

/// Formats one upstream market into a display row.
pub fn to_quote(market: &CoinMarket, coins: &[Coin], captured_at: DateTime<Utc>) -> MarketQuote {
    let symbol = market
        .id
        .as_deref()
        .and_then(|id| coins.iter().find(|c| c.id == id))
        .map(|c| c.symbol.to_string())
        .or_else(|| market.symbol.as_deref().map(str::to_uppercase))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let price = market
        .current_price
        .as_ref()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);

    MarketQuote {
        name: market
            .name
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        symbol,
        price_usd: format_usd(price),
        change_1h: safe_pct(market.price_change_percentage_1h_in_currency.as_ref()),
        change_24h: safe_pct(market.price_change_percentage_24h_in_currency.as_ref()),
        change_7d: safe_pct(market.price_change_percentage_7d_in_currency.as_ref()),
        change_14d: safe_pct(market.price_change_percentage_14d_in_currency.as_ref()),
        change_30d: safe_pct(market.price_change_percentage_30d_in_currency.as_ref()),
        captured_at,
    }
}
