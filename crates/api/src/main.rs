mod pages;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coinpulse_core::config::Settings;
use coinpulse_core::dashboard::chart::{self, ChartAxis, ChartQuery, ChartSeries};
use coinpulse_core::domain::quote::ChangeWindow;
use coinpulse_core::export;
use coinpulse_core::ingest::market::MarketFetcher;
use coinpulse_core::insight::InsightGenerator;
use coinpulse_core::llm::LlmClient;
use coinpulse_core::news::feeds::{FeedSource, HttpFeedSource};
use coinpulse_core::storage::{self, Db};

const NEWS_SHOWN: i64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let (db, db_error) = storage::open_or_fallback(&settings.database_url).await?;
    let db_warning = db_error.map(|e| {
        sentry_anyhow::capture_anyhow(&e);
        format!("Database unavailable ({e:#}); history is kept in memory for this session.")
    });

    let llm = match coinpulse_core::llm::client_from_settings(&settings) {
        Ok(llm) => Some(llm),
        Err(e) => {
            tracing::warn!(error = %e, "model client unavailable; news sentiment disabled");
            None
        }
    };

    let state = AppState {
        db,
        db_warning,
        fetcher: Arc::new(MarketFetcher::from_settings(&settings)?),
        insights: InsightGenerator::from_settings(&settings),
        llm,
        feeds: Arc::new(HttpFeedSource::new()?),
        feed_urls: coinpulse_core::news::configured_feeds(&settings),
    };

    let insight_label = state.insights.label();
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(live_market))
        .route("/history", get(history))
        .route("/api/history/chart", get(history_chart))
        .route("/export/crypto_history.csv", get(export_csv))
        .route("/export/crypto_history.xlsx", get(export_xlsx))
        .route("/news", get(news))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));

    tracing::info!(%addr, insight = insight_label, "dashboard listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    db: Db,
    db_warning: Option<String>,
    fetcher: Arc<MarketFetcher>,
    insights: InsightGenerator,
    llm: Option<Arc<dyn LlmClient>>,
    feeds: Arc<dyn FeedSource>,
    feed_urls: Vec<String>,
}

impl AppState {
    fn warnings(&self) -> Vec<String> {
        self.db_warning.iter().cloned().collect()
    }
}

fn internal_error(e: anyhow::Error) -> StatusCode {
    sentry_anyhow::capture_anyhow(&e);
    tracing::error!(error = %format!("{e:#}"), "request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn live_market(State(state): State<AppState>) -> Html<String> {
    let view = coinpulse_core::dashboard::live::refresh_live(
        &state.fetcher,
        &state.insights,
        Some(&state.db),
        Utc::now(),
    )
    .await;
    Html(pages::live_page(&view, &state.warnings(), state.insights.label()))
}

/// `metric`, `axis`, repeated `coin` or a comma-separated `coins`.
fn chart_query(params: &[(String, String)]) -> Result<ChartQuery, StatusCode> {
    let mut query = ChartQuery::default();
    for (key, value) in params {
        match key.as_str() {
            "metric" => query.metric = ChangeWindow::parse(value).ok_or(StatusCode::BAD_REQUEST)?,
            "axis" => query.axis = ChartAxis::parse(value).ok_or(StatusCode::BAD_REQUEST)?,
            "coin" => query.coins.push(value.clone()),
            "coins" => query.coins.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            ),
            _ => {}
        }
    }
    Ok(query)
}

async fn history(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Html<String>, StatusCode> {
    let query = chart_query(&params)?;
    let rows = storage::quotes::load_history(&state.db)
        .await
        .map_err(internal_error)?;
    let names = storage::quotes::distinct_names(&state.db)
        .await
        .map_err(internal_error)?;

    let svg = chart::render_svg(&chart::build_series(&rows, &query));
    Ok(Html(pages::history_page(
        &rows,
        &names,
        &query,
        &svg,
        &state.warnings(),
    )))
}

async fn history_chart(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<ChartSeries>>, StatusCode> {
    let query = chart_query(&params)?;
    let rows = storage::quotes::load_history(&state.db)
        .await
        .map_err(internal_error)?;
    Ok(Json(chart::build_series(&rows, &query)))
}

fn download(content_type: &'static str, file_name: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

async fn export_csv(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let rows = storage::quotes::load_history(&state.db)
        .await
        .map_err(internal_error)?;
    let body = export::to_csv(&rows).map_err(internal_error)?;
    Ok(download("text/csv", export::CSV_FILE_NAME, body))
}

async fn export_xlsx(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let rows = storage::quotes::load_history(&state.db)
        .await
        .map_err(internal_error)?;
    let body = export::to_xlsx(&rows).map_err(internal_error)?;
    Ok(download(export::XLSX_CONTENT_TYPE, export::XLSX_FILE_NAME, body))
}

async fn news(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let mut warnings = state.warnings();

    match &state.llm {
        Some(llm) => {
            if let Err(e) = coinpulse_core::news::refresh(
                &state.db,
                state.feeds.as_ref(),
                llm.as_ref(),
                &state.feed_urls,
            )
            .await
            {
                report_news_failure(&e, &mut warnings);
            }
        }
        None => {
            if let Err(e) =
                coinpulse_core::news::ingest(&state.db, state.feeds.as_ref(), &state.feed_urls).await
            {
                report_news_failure(&e, &mut warnings);
            }
            warnings.push("No model API key configured; sentiment and summary are disabled.".to_string());
        }
    }

    let items = storage::news::latest_news(&state.db, NEWS_SHOWN)
        .await
        .map_err(internal_error)?;
    let summary = match &state.llm {
        Some(llm) => coinpulse_core::news::summary::generate_news_summary(llm.as_ref(), &items).await,
        None => coinpulse_core::news::summary::SUMMARY_FAILED_MESSAGE.to_string(),
    };

    Ok(Html(pages::news_page(&summary, &items, &warnings)))
}

fn report_news_failure(e: &anyhow::Error, warnings: &mut Vec<String>) {
    sentry_anyhow::capture_anyhow(e);
    tracing::error!(error = %format!("{e:#}"), "news refresh failed");
    warnings.push(format!("News refresh failed: {e:#}"));
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn chart_query_collects_coins_from_both_forms() {
        let q = chart_query(&pairs(&[
            ("metric", "7d"),
            ("axis", "timestamp"),
            ("coin", "Bitcoin"),
            ("coins", "Ethereum, Solana"),
        ]))
        .unwrap();
        assert_eq!(q.metric, ChangeWindow::D7);
        assert_eq!(q.axis, ChartAxis::Timestamp);
        assert_eq!(q.coins, vec!["Bitcoin", "Ethereum", "Solana"]);
    }

    #[test]
    fn chart_query_rejects_unknown_metric() {
        assert_eq!(
            chart_query(&pairs(&[("metric", "90d")])).unwrap_err(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn news_failure_is_captured_and_shown() {
        let mut warnings = Vec::new();
        let events = sentry::test::with_captured_events(|| {
            let e = anyhow::anyhow!("all feeds unreachable").context("ingest news");
            report_news_failure(&e, &mut warnings);
        });
        assert_eq!(events.len(), 1);
        assert_eq!(
            warnings,
            ["News refresh failed: ingest news: all feeds unreachable"]
        );
    }

    #[test]
    fn chart_query_defaults() {
        assert_eq!(chart_query(&[]).unwrap(), ChartQuery::default());
    }
}
