use coinpulse_core::domain::insight::InsightRecord;
use coinpulse_core::domain::news::NewsItem;
use coinpulse_core::domain::quote::{ChangeWindow, MarketQuote};

/// Fixed-width text table of quotes for the terminal.
pub fn quote_table(quotes: &[MarketQuote]) -> String {
    let mut out = format!("{:<14} {:<6} {:>16}", "Name", "Symbol", "Price (USD)");
    for w in ChangeWindow::ALL {
        out.push_str(&format!(" {:>8}", w.key()));
    }
    out.push('\n');

    for q in quotes {
        out.push_str(&format!("{:<14} {:<6} {:>16}", q.name, q.symbol, q.price_usd));
        for w in ChangeWindow::ALL {
            out.push_str(&format!(" {:>8}", q.change(w)));
        }
        out.push('\n');
    }
    out
}

pub fn insight_lines(records: &[InsightRecord]) -> String {
    records
        .iter()
        .map(|r| format!("[{}] {}\n", r.timestamp.format("%Y-%m-%d %H:%M:%S"), r.sentiment))
        .collect()
}

pub fn headline_lines(items: &[NewsItem]) -> String {
    items
        .iter()
        .map(|n| {
            let label = n
                .sentiment_payload()
                .map(|p| p.sentiment.to_string())
                .unwrap_or_else(|| "pending".to_string());
            format!("- [{label}] {}\n  {}\n", n.title, n.link)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn table_has_header_and_one_line_per_quote() {
        let q = MarketQuote {
            name: "Bitcoin".to_string(),
            symbol: "BTC".to_string(),
            price_usd: "$67,000.00".to_string(),
            change_1h: "0.10%".to_string(),
            change_24h: "N/A".to_string(),
            change_7d: "2.00%".to_string(),
            change_14d: "3.00%".to_string(),
            change_30d: "-4.00%".to_string(),
            captured_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        };
        let table = quote_table(&[q.clone(), q]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Name"));
        assert!(lines[1].contains("$67,000.00"));
        assert!(lines[1].contains("N/A"));
    }

    #[test]
    fn insight_lines_are_timestamped() {
        let r = InsightRecord {
            id: 1,
            timestamp: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
            sentiment: "calm".to_string(),
        };
        assert_eq!(insight_lines(&[r]), "[2026-01-02 03:04:05] calm\n");
    }
}
