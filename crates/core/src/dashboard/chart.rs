use crate::domain::quote::{ChangeWindow, MarketQuote};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartAxis {
    /// 1-based position among the selected history rows.
    #[default]
    Snapshot,
    Timestamp,
}

impl ChartAxis {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snapshot" => Some(ChartAxis::Snapshot),
            "timestamp" | "time" => Some(ChartAxis::Timestamp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartQuery {
    pub metric: ChangeWindow,
    /// Empty means every coin in the history.
    pub coins: Vec<String>,
    pub axis: ChartAxis,
}

impl Default for ChartQuery {
    fn default() -> Self {
        Self {
            metric: ChangeWindow::H1,
            coins: Vec::new(),
            axis: ChartAxis::Snapshot,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartX {
    Snapshot(usize),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: ChartX,
    /// `None` for `"N/A"` cells; drawn as a gap.
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

/// One series per selected coin, in order of first appearance in the history.
pub fn build_series(history: &[MarketQuote], query: &ChartQuery) -> Vec<ChartSeries> {
    let mut series: Vec<ChartSeries> = Vec::new();

    let selected = history
        .iter()
        .filter(|q| query.coins.is_empty() || query.coins.iter().any(|c| c == &q.name));

    for (pos, q) in selected.enumerate() {
        let x = match query.axis {
            ChartAxis::Snapshot => ChartX::Snapshot(pos + 1),
            ChartAxis::Timestamp => ChartX::Timestamp(q.captured_at),
        };
        let point = ChartPoint {
            x,
            y: q.change_value(query.metric),
        };
        match series.iter_mut().find(|s| s.name == q.name) {
            Some(s) => s.points.push(point),
            None => series.push(ChartSeries {
                name: q.name.clone(),
                points: vec![point],
            }),
        }
    }
    series
}

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 320.0;
const PAD: f64 = 40.0;
const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

fn x_value(x: ChartX) -> f64 {
    match x {
        ChartX::Snapshot(i) => i as f64,
        ChartX::Timestamp(t) => t.timestamp() as f64,
    }
}

/// Inline SVG line chart. Each run of consecutive numeric points becomes its
/// own polyline so missing values show as breaks.
pub fn render_svg(series: &[ChartSeries]) -> String {
    let xs = series.iter().flat_map(|s| s.points.iter().map(|p| x_value(p.x)));
    let ys = series.iter().flat_map(|s| s.points.iter().filter_map(|p| p.y));

    let (x_min, x_max) = bounds(xs);
    let (y_min, y_max) = bounds(ys);

    let sx = |x: f64| PAD + (x - x_min) / span(x_min, x_max) * (WIDTH - 2.0 * PAD);
    let sy = |y: f64| HEIGHT - PAD - (y - y_min) / span(y_min, y_max) * (HEIGHT - 2.0 * PAD);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" width="{WIDTH}" height="{HEIGHT}">"#
    );
    if y_min <= 0.0 && y_max >= 0.0 {
        let zero = sy(0.0);
        svg.push_str(&format!(
            r##"<line x1="{PAD}" y1="{zero:.1}" x2="{:.1}" y2="{zero:.1}" stroke="#ccc"/>"##,
            WIDTH - PAD
        ));
    }

    for (i, s) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        for run in s.points.split(|p| p.y.is_none()).filter(|r| !r.is_empty()) {
            let coords: Vec<String> = run
                .iter()
                .filter_map(|p| p.y.map(|y| format!("{:.1},{:.1}", sx(x_value(p.x)), sy(y))))
                .collect();
            svg.push_str(&format!(
                r#"<polyline fill="none" stroke="{color}" stroke-width="2" points="{}"/>"#,
                coords.join(" ")
            ));
        }
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="12" fill="{color}">{}</text>"#,
            WIDTH - PAD + 4.0,
            PAD + 14.0 * i as f64,
            super::escape_html(&s.name)
        ));
    }

    svg.push_str(&format!(
        r#"<text x="4" y="{PAD}" font-size="11">{y_max:.2}%</text><text x="4" y="{:.1}" font-size="11">{y_min:.2}%</text>"#,
        HEIGHT - PAD
    ));
    svg.push_str("</svg>");
    svg
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
    .unwrap_or((0.0, 1.0))
}

fn span(lo: f64, hi: f64) -> f64 {
    if hi > lo {
        hi - lo
    } else {
        1.0
    }
}
