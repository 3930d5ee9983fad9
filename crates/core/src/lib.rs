pub mod cache;
pub mod dashboard;
pub mod domain;
pub mod export;
pub mod ingest;
pub mod insight;
pub mod llm;
pub mod news;
pub mod storage;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    pub const DEFAULT_DATABASE_URL: &str = "sqlite://crypto_data.db";
    pub const DEFAULT_QUOTE_CACHE_PATH: &str = "crypto_cache.json";
    pub const DEFAULT_PORT: u16 = 3000;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum InsightMode {
        Template,
        Model,
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: String,
        pub quote_cache_path: PathBuf,
        pub coingecko_base_url: Option<String>,
        pub coingecko_api_key: Option<String>,
        pub coingecko_timeout_secs: Option<u64>,
        pub llm_provider: Option<String>,
        pub llm_timeout_secs: Option<u64>,
        pub openai_api_key: Option<String>,
        pub openai_model: Option<String>,
        pub openai_base_url: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub anthropic_model: Option<String>,
        pub anthropic_base_url: Option<String>,
        pub insight_mode: InsightMode,
        pub news_feeds: Option<Vec<String>>,
        pub sentry_dsn: Option<String>,
        pub port: u16,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let insight_mode = match non_empty_var("INSIGHT_MODE").as_deref() {
                None | Some("template") => InsightMode::Template,
                Some("model") => InsightMode::Model,
                Some(other) => anyhow::bail!("INSIGHT_MODE must be template or model (got {other})"),
            };

            let news_feeds = non_empty_var("NEWS_FEEDS").map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            });

            Ok(Self {
                database_url: non_empty_var("DATABASE_URL")
                    .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                quote_cache_path: non_empty_var("QUOTE_CACHE_PATH")
                    .unwrap_or_else(|| DEFAULT_QUOTE_CACHE_PATH.to_string())
                    .into(),
                coingecko_base_url: non_empty_var("COINGECKO_BASE_URL"),
                coingecko_api_key: non_empty_var("COINGECKO_API_KEY"),
                coingecko_timeout_secs: parsed_var("COINGECKO_TIMEOUT_SECS")?,
                llm_provider: non_empty_var("LLM_PROVIDER"),
                llm_timeout_secs: parsed_var("LLM_TIMEOUT_SECS")?,
                openai_api_key: non_empty_var("OPENAI_API_KEY"),
                openai_model: non_empty_var("OPENAI_MODEL"),
                openai_base_url: non_empty_var("OPENAI_BASE_URL"),
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                anthropic_model: non_empty_var("ANTHROPIC_MODEL"),
                anthropic_base_url: non_empty_var("ANTHROPIC_BASE_URL"),
                insight_mode,
                news_feeds: news_feeds.filter(|feeds| !feeds.is_empty()),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                port: parsed_var("PORT")?.unwrap_or(DEFAULT_PORT),
            })
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        #[cfg(test)]
        pub fn for_tests() -> Self {
            Self {
                database_url: "sqlite::memory:".to_string(),
                quote_cache_path: DEFAULT_QUOTE_CACHE_PATH.into(),
                coingecko_base_url: None,
                coingecko_api_key: None,
                coingecko_timeout_secs: None,
                llm_provider: None,
                llm_timeout_secs: None,
                openai_api_key: None,
                openai_model: None,
                openai_base_url: None,
                anthropic_api_key: None,
                anthropic_model: None,
                anthropic_base_url: None,
                insight_mode: InsightMode::Template,
                news_feeds: None,
                sentry_dsn: None,
                port: DEFAULT_PORT,
            }
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Blank counts as unset; anything else must parse.
    fn parsed_var<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        non_empty_var(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| anyhow::anyhow!("{key} is invalid ({raw}): {e}"))
            })
            .transpose()
    }

}
