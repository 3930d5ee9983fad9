use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One element of the `/coins/markets` response. Percentage fields stay as raw
/// JSON so that non-numeric values can be mapped to the sentinel instead of
/// failing the whole batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoinMarket {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub current_price: Option<Value>,
    #[serde(default)]
    pub price_change_percentage_1h_in_currency: Option<Value>,
    #[serde(default)]
    pub price_change_percentage_24h_in_currency: Option<Value>,
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Option<Value>,
    #[serde(default)]
    pub price_change_percentage_14d_in_currency: Option<Value>,
    #[serde(default)]
    pub price_change_percentage_30d_in_currency: Option<Value>,
}
