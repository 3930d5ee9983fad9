pub mod chart;
pub mod live;

use crate::domain::quote::{ChangeWindow, MarketQuote};
use crate::insight::narrative::{biggest_movers, Movers};

pub const GAINER_BACKGROUND: &str = "#d4edda";
pub const LOSER_BACKGROUND: &str = "#f8d7da";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Up,
    Down,
    Flat,
}

impl Tone {
    pub fn css_color(self) -> Option<&'static str> {
        match self {
            Tone::Up => Some("green"),
            Tone::Down => Some("red"),
            Tone::Flat => None,
        }
    }
}

/// `"N/A"`, zero and unparseable cells are flat.
pub fn cell_tone(cell: &str) -> Tone {
    match crate::domain::quote::parse_pct(cell) {
        Some(v) if v > 0.0 => Tone::Up,
        Some(v) if v < 0.0 => Tone::Down,
        _ => Tone::Flat,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyledCell {
    pub text: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyledRow {
    pub name: String,
    pub symbol: String,
    pub price_usd: String,
    pub changes: Vec<StyledCell>,
    pub background: Option<&'static str>,
}

/// Live-table view: every percentage cell toned, the 24h gainer and loser rows
/// shaded. When one row is both, the loser shade wins.
pub fn style_rows(quotes: &[MarketQuote]) -> Vec<StyledRow> {
    let movers = biggest_movers(quotes);
    quotes
        .iter()
        .enumerate()
        .map(|(idx, q)| StyledRow {
            name: q.name.clone(),
            symbol: q.symbol.clone(),
            price_usd: q.price_usd.clone(),
            changes: ChangeWindow::ALL
                .iter()
                .map(|w| StyledCell {
                    text: q.change(*w).to_string(),
                    tone: cell_tone(q.change(*w)),
                })
                .collect(),
            background: row_background(idx, movers),
        })
        .collect()
}

fn row_background(idx: usize, movers: Option<Movers>) -> Option<&'static str> {
    let m = movers?;
    if m.loser == idx {
        Some(LOSER_BACKGROUND)
    } else if m.gainer == idx {
        Some(GAINER_BACKGROUND)
    } else {
        None
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quote(name: &str, change_24h: &str) -> MarketQuote {
        MarketQuote {
            name: name.to_string(),
            symbol: name.to_uppercase(),
            price_usd: "$1.00".to_string(),
            change_1h: "0.00%".to_string(),
            change_24h: change_24h.to_string(),
            change_7d: "N/A".to_string(),
            change_14d: "-0.50%".to_string(),
            change_30d: "12.00%".to_string(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn tones_follow_sign() {
        assert_eq!(cell_tone("1.20%"), Tone::Up);
        assert_eq!(cell_tone("-0.01%"), Tone::Down);
        assert_eq!(cell_tone("0.00%"), Tone::Flat);
        assert_eq!(cell_tone("N/A"), Tone::Flat);
        assert_eq!(Tone::Flat.css_color(), None);
    }

    #[test]
    fn gainer_and_loser_rows_are_shaded() {
        let rows = style_rows(&[
            quote("a", "1.00%"),
            quote("b", "5.00%"),
            quote("c", "N/A"),
            quote("d", "-3.00%"),
        ]);
        assert_eq!(rows[0].background, None);
        assert_eq!(rows[1].background, Some(GAINER_BACKGROUND));
        assert_eq!(rows[2].background, None);
        assert_eq!(rows[3].background, Some(LOSER_BACKGROUND));

        let tones: Vec<Tone> = rows[0].changes.iter().map(|c| c.tone).collect();
        assert_eq!(tones, vec![Tone::Flat, Tone::Up, Tone::Flat, Tone::Down, Tone::Up]);
    }

    #[test]
    fn all_na_rows_have_no_shading() {
        let rows = style_rows(&[quote("a", "N/A"), quote("b", "N/A")]);
        assert!(rows.iter().all(|r| r.background.is_none()));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }
}
