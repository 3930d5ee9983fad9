use coinpulse_core::dashboard::chart::{ChartAxis, ChartQuery};
use coinpulse_core::dashboard::live::LiveView;
use coinpulse_core::dashboard::{escape_html, StyledRow};
use coinpulse_core::domain::news::NewsItem;
use coinpulse_core::domain::quote::{ChangeWindow, MarketQuote};
use coinpulse_core::export;

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem;color:#222}\
table{border-collapse:collapse;margin:1rem 0}\
th,td{border:1px solid #ddd;padding:4px 8px;text-align:right}\
th:first-child,td:first-child{text-align:left}\
nav a{margin-right:1rem}\
.warn{background:#fff3cd;border:1px solid #ffe69c;padding:.5rem 1rem;margin:.5rem 0}\
.insight{max-width:60rem;line-height:1.5}";

pub fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
<style>{STYLE}</style></head><body>\
<h1>📊 AI-Powered Crypto Market Dashboard</h1>\
<nav><a href=\"/\">Live Market</a><a href=\"/history\">Historical Data</a><a href=\"/news\">News</a></nav>\
{body}</body></html>",
        title = escape_html(title),
    )
}

fn warnings_html(warnings: &[String]) -> String {
    warnings
        .iter()
        .map(|w| format!("<div class=\"warn\">⚠️ {}</div>", escape_html(w)))
        .collect()
}

fn header_row() -> String {
    let mut out = String::from("<tr><th>Name</th><th>Symbol</th><th>Price (USD)</th>");
    for w in ChangeWindow::ALL {
        out.push_str(&format!("<th>{}</th>", w.column_label()));
    }
    out
}

fn styled_row(row: &StyledRow) -> String {
    let bg = row
        .background
        .map(|c| format!(" style=\"background-color: {c}\""))
        .unwrap_or_default();
    let mut out = format!(
        "<tr{bg}><td>{}</td><td>{}</td><td>{}</td>",
        escape_html(&row.name),
        escape_html(&row.symbol),
        escape_html(&row.price_usd)
    );
    for cell in &row.changes {
        match cell.tone.css_color() {
            Some(color) => out.push_str(&format!(
                "<td style=\"color: {color}\">{}</td>",
                escape_html(&cell.text)
            )),
            None => out.push_str(&format!("<td>{}</td>", escape_html(&cell.text))),
        }
    }
    out.push_str("</tr>");
    out
}

pub fn live_page(view: &LiveView, extra_warnings: &[String], insight_label: &str) -> String {
    let mut body = String::from("<h2>Live Market</h2>");
    body.push_str(&warnings_html(extra_warnings));
    body.push_str(&warnings_html(&view.warnings));

    if view.rows.is_empty() {
        body.push_str("<p>No market data available.</p>");
    } else {
        body.push_str("<table>");
        body.push_str(&header_row());
        body.push_str("</tr>");
        for row in &view.rows {
            body.push_str(&styled_row(row));
        }
        body.push_str("</table>");
    }

    body.push_str(&format!(
        "<hr><h2>🤖 Market Insights <small>({})</small></h2><p class=\"insight\">{}</p>",
        escape_html(insight_label),
        escape_html(&view.insight)
    ));
    layout("Live Market", &body)
}

pub fn history_page(
    history: &[MarketQuote],
    names: &[String],
    query: &ChartQuery,
    chart_svg: &str,
    warnings: &[String],
) -> String {
    let mut body = String::from("<h2>Historical Data</h2>");
    body.push_str(&warnings_html(warnings));

    if history.is_empty() {
        body.push_str(
            "<p>No historical data found. Live data will be saved automatically when fetching.</p>",
        );
        return layout("Historical Data", &body);
    }

    body.push_str("<h3>📈 Multi-Coin Trend Chart</h3><form method=\"get\" action=\"/history\">");
    body.push_str("<label>Timeframe <select name=\"metric\">");
    for w in ChangeWindow::ALL {
        let selected = if w == query.metric { " selected" } else { "" };
        body.push_str(&format!("<option value=\"{0}\"{selected}>{0}</option>", w.key()));
    }
    body.push_str("</select></label> <label>X axis <select name=\"axis\">");
    for (axis, label) in [(ChartAxis::Snapshot, "snapshot"), (ChartAxis::Timestamp, "timestamp")] {
        let selected = if axis == query.axis { " selected" } else { "" };
        body.push_str(&format!("<option value=\"{label}\"{selected}>{label}</option>"));
    }
    body.push_str("</select></label><br>");
    for name in names {
        let checked = if query.coins.is_empty() || query.coins.contains(name) {
            " checked"
        } else {
            ""
        };
        let name = escape_html(name);
        body.push_str(&format!(
            "<label><input type=\"checkbox\" name=\"coin\" value=\"{name}\"{checked}> {name}</label> "
        ));
    }
    body.push_str("<button type=\"submit\">Plot</button></form>");
    body.push_str(chart_svg);

    body.push_str(&format!(
        "<h3>💾 Export Historical Data</h3><p><a href=\"/export/{}\">Download CSV</a> \
<a href=\"/export/{}\">Download Excel</a></p>",
        export::CSV_FILE_NAME,
        export::XLSX_FILE_NAME
    ));

    body.push_str("<h3>📊 Historical Snapshot Table</h3><table>");
    body.push_str(&header_row());
    body.push_str("<th>Captured At</th></tr>");
    for q in history {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td>",
            escape_html(&q.name),
            escape_html(&q.symbol),
            escape_html(&q.price_usd)
        ));
        for w in ChangeWindow::ALL {
            body.push_str(&format!("<td>{}</td>", escape_html(q.change(w))));
        }
        body.push_str(&format!("<td>{}</td></tr>", q.captured_at.format("%Y-%m-%d %H:%M:%S")));
    }
    body.push_str("</table>");

    layout("Historical Data", &body)
}

pub fn news_page(summary: &str, items: &[NewsItem], warnings: &[String]) -> String {
    let mut body = String::from("<h2>📰 Crypto News</h2>");
    body.push_str(&warnings_html(warnings));
    body.push_str(&format!(
        "<h3>Market Summary</h3><p class=\"insight\">{}</p><h3>Latest Headlines</h3><ul>",
        escape_html(summary)
    ));
    for item in items {
        let sentiment = match item.sentiment_payload() {
            Some(p) => format!("{} ({})", p.sentiment, escape_html(&p.reason)),
            None => "pending".to_string(),
        };
        body.push_str(&format!(
            "<li><a href=\"{}\">{}</a> <small>{}</small> - {}</li>",
            escape_html(&item.link),
            escape_html(&item.title),
            item.published
                .map(|p| p.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            sentiment
        ));
    }
    body.push_str("</ul>");
    layout("News", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use coinpulse_core::dashboard::style_rows;
    use coinpulse_core::ingest::market::{QuoteBatch, QuoteSource};

    fn quote(name: &str, change_24h: &str) -> MarketQuote {
        MarketQuote {
            name: name.to_string(),
            symbol: name.to_uppercase(),
            price_usd: "$2.00".to_string(),
            change_1h: "N/A".to_string(),
            change_24h: change_24h.to_string(),
            change_7d: "N/A".to_string(),
            change_14d: "N/A".to_string(),
            change_30d: "N/A".to_string(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn live_page_colours_cells_and_rows() {
        let quotes = vec![quote("Up", "4.00%"), quote("Down", "-1.00%")];
        let view = LiveView {
            rows: style_rows(&quotes),
            batch: QuoteBatch {
                quotes,
                source: QuoteSource::Live,
                error: None,
            },
            insight: "🧠 Insight: <calm>".to_string(),
            warnings: vec!["Could not save snapshot".to_string()],
        };
        let html = live_page(&view, &[], "template");

        assert!(html.contains("<tr style=\"background-color: #d4edda\">"));
        assert!(html.contains("<tr style=\"background-color: #f8d7da\">"));
        assert!(html.contains("<td style=\"color: green\">4.00%</td>"));
        assert!(html.contains("&lt;calm&gt;"));
        assert!(html.contains("class=\"warn\""));
    }

    #[test]
    fn empty_history_shows_hint() {
        let html = history_page(&[], &[], &ChartQuery::default(), "", &[]);
        assert!(html.contains("No historical data found"));
        assert!(!html.contains("Download CSV"));
    }

    #[test]
    fn news_page_marks_pending_sentiment() {
        let item = NewsItem {
            id: 1,
            title: "ETF approved".to_string(),
            link: "https://n.example/etf".to_string(),
            published: None,
            summary: None,
            sentiment: None,
        };
        let html = news_page("Calm week.", &[item], &[]);
        assert!(html.contains("<a href=\"https://n.example/etf\">ETF approved</a>"));
        assert!(html.contains("pending"));
    }
}
