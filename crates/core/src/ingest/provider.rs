use crate::config::Settings;
use crate::ingest::error::FetchError;
use crate::ingest::types::CoinMarket;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const MARKETS_PATH: &str = "/coins/markets";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const VS_CURRENCY: &str = "usd";
const CHANGE_WINDOWS: &str = "1h,24h,7d,14d,30d";

/// A single request against the price API. Retrying is the caller's job.
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_markets(&self, ids: &[&str]) -> Result<Vec<CoinMarket>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .coingecko_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = settings.coingecko_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build price api http client")?;

        Ok(Self {
            http,
            base_url,
            api_key: settings.coingecko_api_key.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), MARKETS_PATH)
    }

    fn headers(&self) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            let value = HeaderValue::from_str(api_key).map_err(FetchError::network)?;
            headers.insert("x-cg-demo-api-key", value);
        }
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl MarketDataSource for CoinGeckoClient {
    fn provider_name(&self) -> &'static str {
        "coingecko"
    }

    async fn fetch_markets(&self, ids: &[&str]) -> Result<Vec<CoinMarket>, FetchError> {
        let res = self
            .http
            .get(self.url())
            .headers(self.headers()?)
            .query(&[
                ("vs_currency", VS_CURRENCY.to_string()),
                ("ids", ids.join(",")),
                ("price_change_percentage", CHANGE_WINDOWS.to_string()),
            ])
            .send()
            .await
            .map_err(FetchError::network)?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = res
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(FetchError::RateLimited { retry_after });
        }

        let text = res.text().await.map_err(FetchError::network)?;
        if !status.is_success() {
            return Err(FetchError::network(format!("HTTP {status}: {text}")));
        }

        parse_markets(&text)
    }
}

pub fn parse_markets(text: &str) -> Result<Vec<CoinMarket>, FetchError> {
    serde_json::from_str::<Vec<CoinMarket>>(text)
        .map_err(|e| FetchError::parse(format!("expected a JSON array of markets: {e}")))
}
