use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the narrative log (`crypto_sentiments`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub sentiment: String,
}
