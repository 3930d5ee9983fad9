use crate::dashboard::{style_rows, StyledRow};
use crate::ingest::market::{MarketFetcher, QuoteBatch, QuoteSource};
use crate::insight::InsightGenerator;
use crate::storage::{self, Db};
use chrono::{DateTime, Utc};

/// Everything the live page shows for one request.
#[derive(Debug, Clone)]
pub struct LiveView {
    pub batch: QuoteBatch,
    pub rows: Vec<StyledRow>,
    pub insight: String,
    /// Non-fatal problems (fetch fallback, storage failures) for a banner.
    pub warnings: Vec<String>,
}

/// Fetch, append to history, narrate, log the narrative. With `db` unset the
/// run writes nothing.
pub async fn refresh_live(
    fetcher: &MarketFetcher,
    insights: &InsightGenerator,
    db: Option<&Db>,
    now: DateTime<Utc>,
) -> LiveView {
    let batch = fetcher.fetch_at(now).await;
    let mut warnings = Vec::new();

    if let Some(err) = &batch.error {
        let fallback = match batch.source {
            QuoteSource::Cache => "showing the last cached prices",
            _ => "no cached prices to show",
        };
        warnings.push(format!("Live data unavailable ({err}); {fallback}."));
    }

    if let Some(pool) = db {
        if let Err(err) = storage::quotes::append_snapshot(pool, &batch.quotes).await {
            tracing::error!(error = %format!("{err:#}"), "failed to save snapshot");
            warnings.push(format!("Could not save snapshot: {err:#}"));
        }
    }

    let insight = insights.generate(&batch.quotes).await;

    if let Some(pool) = db {
        if let Err(err) = storage::insights::record_insight(pool, &insight, now).await {
            tracing::error!(error = %format!("{err:#}"), "failed to log insight");
            warnings.push(format!("Could not log insight: {err:#}"));
        }
    }

    LiveView {
        rows: style_rows(&batch.quotes),
        batch,
        insight,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryQuoteCache;
    use crate::ingest::error::FetchError;
    use crate::ingest::provider::MarketDataSource;
    use crate::ingest::types::CoinMarket;
    use crate::insight::narrative::NO_DATA_MESSAGE;
    use serde_json::json;
    use std::sync::Arc;

    struct OneCoin(Result<Vec<CoinMarket>, FetchError>);

    #[async_trait::async_trait]
    impl MarketDataSource for OneCoin {
        fn provider_name(&self) -> &'static str {
            "test"
        }

        async fn fetch_markets(&self, _ids: &[&str]) -> Result<Vec<CoinMarket>, FetchError> {
            self.0.clone()
        }
    }

    fn bitcoin() -> CoinMarket {
        serde_json::from_value(json!({
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "current_price": 67000.0,
            "price_change_percentage_24h_in_currency": 2.5
        }))
        .unwrap()
    }

    fn fetcher(result: Result<Vec<CoinMarket>, FetchError>) -> MarketFetcher {
        MarketFetcher::new(Arc::new(OneCoin(result)), Arc::new(MemoryQuoteCache::new()))
            .with_policy(crate::ingest::market::RetryPolicy {
                max_attempts: 1,
                ..Default::default()
            })
    }

    #[tokio::test]
    async fn live_run_persists_snapshot_and_insight() {
        let pool = storage::open_in_memory().await.unwrap();
        let view = refresh_live(
            &fetcher(Ok(vec![bitcoin()])),
            &InsightGenerator::Template,
            Some(&pool),
            Utc::now(),
        )
        .await;

        assert_eq!(view.batch.source, QuoteSource::Live);
        assert!(view.warnings.is_empty());
        assert_eq!(view.rows.len(), 1);
        assert!(view.insight.starts_with("🧠 Insight: "));
        assert_eq!(storage::quotes::load_history(&pool).await.unwrap().len(), 1);
        assert_eq!(storage::insights::latest_insights(&pool, 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_without_cache_warns_and_writes_no_rows() {
        let pool = storage::open_in_memory().await.unwrap();
        let view = refresh_live(
            &fetcher(Err(FetchError::network("connection reset"))),
            &InsightGenerator::Template,
            Some(&pool),
            Utc::now(),
        )
        .await;

        assert_eq!(view.batch.source, QuoteSource::Empty);
        assert_eq!(view.insight, NO_DATA_MESSAGE);
        assert_eq!(view.warnings.len(), 1);
        assert!(storage::quotes::load_history(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dry_run_touches_no_store() {
        let view = refresh_live(
            &fetcher(Ok(vec![bitcoin()])),
            &InsightGenerator::Template,
            None,
            Utc::now(),
        )
        .await;
        assert_eq!(view.rows.len(), 1);
    }
}
