use crate::domain::quote::{ChangeWindow, MarketQuote};
use anyhow::Context;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

pub const CSV_FILE_NAME: &str = "crypto_history.csv";
pub const XLSX_FILE_NAME: &str = "crypto_history.xlsx";
pub const XLSX_SHEET_NAME: &str = "Snapshots";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Column headers shared by every history export.
pub fn headers() -> Vec<&'static str> {
    let mut cols = vec!["Name", "Symbol", "Price (USD)"];
    cols.extend(ChangeWindow::ALL.iter().map(|w| w.column_label()));
    cols.push("Captured At");
    cols
}

fn record(q: &MarketQuote) -> Vec<String> {
    let mut row = vec![q.name.clone(), q.symbol.clone(), q.price_usd.clone()];
    row.extend(ChangeWindow::ALL.iter().map(|w| q.change(*w).to_string()));
    row.push(q.captured_at.to_rfc3339());
    row
}

pub fn to_csv(rows: &[MarketQuote]) -> anyhow::Result<Vec<u8>> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(headers()).context("write csv header failed")?;
    for q in rows {
        w.write_record(record(q)).context("write csv row failed")?;
    }
    w.into_inner()
        .map_err(|e| e.into_error())
        .context("flush csv failed")
}

pub fn to_xlsx(rows: &[MarketQuote]) -> anyhow::Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET_NAME)?;

    for (col, title) in headers().iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }
    for (i, q) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, value) in record(q).iter().enumerate() {
            sheet.write_string(row, col as u16, value)?;
        }
    }

    workbook
        .save_to_buffer()
        .context("serialize xlsx workbook failed")
}

/// Writes both formats; either path may be omitted.
pub async fn write_files(
    rows: &[MarketQuote],
    csv_path: Option<&Path>,
    xlsx_path: Option<&Path>,
) -> anyhow::Result<()> {
    if let Some(path) = csv_path {
        tokio::fs::write(path, to_csv(rows)?)
            .await
            .with_context(|| format!("write {} failed", path.display()))?;
        tracing::info!(path = %path.display(), rows = rows.len(), "wrote csv export");
    }
    if let Some(path) = xlsx_path {
        tokio::fs::write(path, to_xlsx(rows)?)
            .await
            .with_context(|| format!("write {} failed", path.display()))?;
        tracing::info!(path = %path.display(), rows = rows.len(), "wrote xlsx export");
    }
    Ok(())
}
