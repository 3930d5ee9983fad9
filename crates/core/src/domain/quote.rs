use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coin {
    pub id: &'static str,
    pub symbol: &'static str,
}

/// CoinGecko ids tracked by the dashboard, with their display tickers.
pub const TRACKED_COINS: [Coin; 10] = [
    Coin { id: "bitcoin", symbol: "BTC" },
    Coin { id: "ethereum", symbol: "ETH" },
    Coin { id: "tether", symbol: "USDT" },
    Coin { id: "binancecoin", symbol: "BNB" },
    Coin { id: "ripple", symbol: "XRP" },
    Coin { id: "solana", symbol: "SOL" },
    Coin { id: "usd-coin", symbol: "USDC" },
    Coin { id: "dogecoin", symbol: "DOGE" },
    Coin { id: "staked-ether", symbol: "STETH" },
    Coin { id: "tron", symbol: "TRX" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeWindow {
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "24h")]
    H24,
    #[serde(rename = "7d")]
    D7,
    #[serde(rename = "14d")]
    D14,
    #[serde(rename = "30d")]
    D30,
}

impl ChangeWindow {
    pub const ALL: [ChangeWindow; 5] = [
        ChangeWindow::H1,
        ChangeWindow::H24,
        ChangeWindow::D7,
        ChangeWindow::D14,
        ChangeWindow::D30,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ChangeWindow::H1 => "1h",
            ChangeWindow::H24 => "24h",
            ChangeWindow::D7 => "7d",
            ChangeWindow::D14 => "14d",
            ChangeWindow::D30 => "30d",
        }
    }

    pub fn column_label(self) -> &'static str {
        match self {
            ChangeWindow::H1 => "1h Change",
            ChangeWindow::H24 => "24h Change",
            ChangeWindow::D7 => "7d Change",
            ChangeWindow::D14 => "14d Change",
            ChangeWindow::D30 => "30d Change",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.key() == s.trim())
    }
}

/// One formatted row of the market table. Percentages are display strings
/// (`"1.23%"`) or the `"N/A"` sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub name: String,
    pub symbol: String,
    pub price_usd: String,
    pub change_1h: String,
    pub change_24h: String,
    pub change_7d: String,
    pub change_14d: String,
    pub change_30d: String,
    pub captured_at: DateTime<Utc>,
}

impl MarketQuote {
    pub fn change(&self, window: ChangeWindow) -> &str {
        match window {
            ChangeWindow::H1 => &self.change_1h,
            ChangeWindow::H24 => &self.change_24h,
            ChangeWindow::D7 => &self.change_7d,
            ChangeWindow::D14 => &self.change_14d,
            ChangeWindow::D30 => &self.change_30d,
        }
    }

    pub fn change_value(&self, window: ChangeWindow) -> Option<f64> {
        parse_pct(self.change(window))
    }
}

/// Formats an upstream percentage value. Anything that is not a JSON number
/// (absent, null, string, object) becomes `"N/A"`.
pub fn safe_pct(value: Option<&Value>) -> String {
    match value.and_then(Value::as_f64) {
        Some(v) if v.is_finite() => format!("{v:.2}%"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Parses a `"1.23%"` display string back into a number.
pub fn parse_pct(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() || t == NOT_AVAILABLE {
        return None;
    }
    t.trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// `1234.5` -> `"$1,234.50"`.
pub fn format_usd(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i != 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{frac_part}")
}
