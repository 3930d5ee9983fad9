use crate::domain::quote::{ChangeWindow, MarketQuote};

pub const NO_DATA_MESSAGE: &str = "⚠️ No data available from CoinGecko. Please try again later.";

const MAJOR_COINS: [&str; 3] = ["Bitcoin", "Ethereum", "BNB"];
const STABLECOINS: [&str; 2] = ["Tether", "USDC"];

const CLOSING: &str = "This subdued performance may stem from macroeconomic factors, such as \
inflation concerns and tightening monetary policies, which continue to influence investor \
sentiment. Overall, traders should remain vigilant as volatility remains a defining \
characteristic of the current crypto landscape.";

/// Row indices of the largest and smallest 24h change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movers {
    pub gainer: usize,
    pub loser: usize,
}

/// Rows whose 24h change is `"N/A"` or unparseable are skipped. Ties keep the
/// earliest row.
pub fn biggest_movers(quotes: &[MarketQuote]) -> Option<Movers> {
    let mut best: Option<(usize, f64)> = None;
    let mut worst: Option<(usize, f64)> = None;

    for (idx, q) in quotes.iter().enumerate() {
        let Some(v) = q.change_value(ChangeWindow::H24) else {
            continue;
        };
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((idx, v));
        }
        if worst.map_or(true, |(_, w)| v < w) {
            worst = Some((idx, v));
        }
    }

    Some(Movers {
        gainer: best?.0,
        loser: worst?.0,
    })
}

/// Deterministic template summary of the market table. No I/O.
pub fn generate_insights(quotes: &[MarketQuote]) -> String {
    if quotes.is_empty() {
        return NO_DATA_MESSAGE.to_string();
    }

    let mut narrative = String::from("🧠 Insight: ");

    let major_trends: Vec<String> = quotes
        .iter()
        .filter(|q| MAJOR_COINS.contains(&q.name.as_str()))
        .map(|q| {
            let change = change_24h_or_zero(q);
            let (name, price) = (&q.name, &q.price_usd);
            if change < 0.0 {
                if change.abs() < 2.0 {
                    format!("{name} has dipped slightly to {price}")
                } else {
                    format!("{name} has dropped {:.2}% to {price}", change.abs())
                }
            } else if change > 0.0 {
                format!("{name} has risen {change:.2}% to {price}")
            } else {
                format!("{name} remains stable at {price}")
            }
        })
        .collect();
    if !major_trends.is_empty() {
        narrative.push_str(&major_trends.join(" "));
        narrative.push_str(", reflecting recent market movements. ");
    }

    let stable_trends: Vec<String> = quotes
        .iter()
        .filter(|q| STABLECOINS.contains(&q.name.as_str()))
        .map(|q| format!("{} remains relatively stable at {}", q.name, q.price_usd))
        .collect();
    if !stable_trends.is_empty() {
        narrative.push_str("Stablecoins like ");
        narrative.push_str(&stable_trends.join(", "));
        narrative.push_str(", indicating a flight to safety among investors. ");
    }

    if let Some(Movers { gainer, loser }) = biggest_movers(quotes) {
        let (g, l) = (&quotes[gainer], &quotes[loser]);
        narrative.push_str(&format!(
            "The biggest 24h gainer is {} ({}) and the biggest 24h loser is {} ({}). ",
            g.name, g.change_24h, l.name, l.change_24h
        ));
    }

    let laggards: Vec<&str> = quotes
        .iter()
        .filter(|q| {
            let name = q.name.as_str();
            !MAJOR_COINS.contains(&name) && !STABLECOINS.contains(&name)
        })
        .filter(|q| change_24h_or_zero(q) < 0.0)
        .map(|q| q.name.as_str())
        .collect();
    if !laggards.is_empty() {
        narrative.push_str(&laggards.join(", "));
        narrative.push_str(" also reflect negative momentum, suggesting broader market hesitancy. ");
    }

    narrative.push_str(CLOSING);
    narrative
}

fn change_24h_or_zero(q: &MarketQuote) -> f64 {
    q.change_value(ChangeWindow::H24).unwrap_or(0.0)
}
