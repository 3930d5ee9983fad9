use std::fmt;
use std::time::Duration;

/// Failure kinds of a market data fetch. Callers decide the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Timeout, connection failure or a non-success HTTP status.
    Network { detail: String },
    /// HTTP 429 from the price API.
    RateLimited { retry_after: Option<Duration> },
    /// The response body did not match the expected shape.
    Parse { detail: String },
    /// Reading or writing the local cache failed.
    Storage { detail: String },
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network { .. } => "network",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::Parse { .. } => "parse",
            FetchError::Storage { .. } => "storage",
        }
    }

    pub fn network(err: impl fmt::Display) -> Self {
        FetchError::Network {
            detail: err.to_string(),
        }
    }

    pub fn parse(err: impl fmt::Display) -> Self {
        FetchError::Parse {
            detail: err.to_string(),
        }
    }

    pub fn storage(err: impl fmt::Display) -> Self {
        FetchError::Storage {
            detail: format!("{err:#}"),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network { detail } => write!(f, "market data request failed: {detail}"),
            FetchError::RateLimited { retry_after: Some(d) } => {
                write!(f, "market data rate limited (retry after {}s)", d.as_secs())
            }
            FetchError::RateLimited { retry_after: None } => f.write_str("market data rate limited"),
            FetchError::Parse { detail } => write!(f, "market data response invalid: {detail}"),
            FetchError::Storage { detail } => write!(f, "quote cache failure: {detail}"),
        }
    }
}

impl std::error::Error for FetchError {}
