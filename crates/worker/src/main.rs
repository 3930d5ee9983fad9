use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coinpulse_core::config::Settings;
use coinpulse_core::dashboard::live::refresh_live;
use coinpulse_core::ingest::market::MarketFetcher;
use coinpulse_core::insight::InsightGenerator;
use coinpulse_core::llm::error::LlmDiagnosticsError;
use coinpulse_core::news::{self, feeds, sentiment, summary};
use coinpulse_core::storage::{self, Db};

mod report;

#[derive(Debug, Parser)]
#[command(name = "coinpulse_worker")]
struct Args {
    /// Do everything except writing to the database.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch quotes (cache-aware), append them to history, log an insight.
    Market {
        /// Print the quotes as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Pull the RSS feeds, classify pending headlines, print a summary.
    News,
    /// Show the latest stored snapshots and insights.
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Write the full history table to CSV and/or XLSX.
    Export {
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        xlsx: Option<PathBuf>,
    },
}

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

    let args = Args::parse();

    let (db, db_error) = storage::open_or_fallback(&settings.database_url).await?;
    if let Some(e) = db_error {
        sentry_anyhow::capture_anyhow(&e);
    }

    let result = match args.command {
        Command::Market { json } => run_market(&settings, &db, args.dry_run, json).await,
        Command::News => run_news(&settings, &db, args.dry_run).await,
        Command::History { limit } => run_history(&db, limit).await,
        Command::Export { csv, xlsx } => run_export(&db, csv, xlsx).await,
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        if let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() {
            tracing::error!(
                provider = diag.provider.as_str(),
                stage = diag.stage,
                raw_output = diag.raw_output.as_deref().unwrap_or(""),
                "model call failed"
            );
        }
    }
    result
}

async fn run_market(settings: &Settings, db: &Db, dry_run: bool, json: bool) -> anyhow::Result<()> {
    let fetcher = MarketFetcher::from_settings(settings)?;
    let insights = InsightGenerator::from_settings(settings);
    let target = (!dry_run).then_some(db);

    let view = refresh_live(&fetcher, &insights, target, chrono::Utc::now()).await;
    for w in &view.warnings {
        tracing::warn!(warning = %w, "market run degraded");
    }
    tracing::info!(
        source = ?view.batch.source,
        rows = view.batch.quotes.len(),
        dry_run,
        insight = insights.label(),
        "market run finished"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&view.batch.quotes)?);
    } else {
        print!("{}", report::quote_table(&view.batch.quotes));
        println!();
        println!("{}", view.insight);
    }
    Ok(())
}

async fn run_news(settings: &Settings, db: &Db, dry_run: bool) -> anyhow::Result<()> {
    let llm = coinpulse_core::llm::client_from_settings(settings)?;
    let source = feeds::HttpFeedSource::new()?;
    let urls = news::configured_feeds(settings);

    if dry_run {
        let entries = feeds::select_recent(feeds::fetch_all(&source, &urls).await, feeds::MAX_ENTRIES);
        for chunk in entries.chunks(sentiment::BATCH_SIZE) {
            let headlines: Vec<&str> = chunk.iter().map(|e| e.title.as_str()).collect();
            let results = sentiment::analyze_sentiment_batch(llm.as_ref(), &headlines).await;
            for (entry, payload) in chunk.iter().zip(results) {
                println!("- [{}] {}\n  {}", payload.sentiment, entry.title, entry.link);
            }
        }
        tracing::info!(entries = entries.len(), dry_run, "news run finished");
        return Ok(());
    }

    let stats = news::refresh(db, &source, llm.as_ref(), &urls).await?;
    tracing::info!(
        inserted = stats.inserted,
        classified = stats.sentiment.classified,
        "news run finished"
    );

    let latest = storage::news::latest_news(db, 10).await?;
    println!("{}\n", summary::generate_news_summary(llm.as_ref(), &latest).await);
    print!("{}", report::headline_lines(&latest));
    Ok(())
}

async fn run_history(db: &Db, limit: i64) -> anyhow::Result<()> {
    anyhow::ensure!(limit > 0, "--limit must be positive (got {limit})");

    let rows = storage::quotes::latest_rows(db, limit).await?;
    if rows.is_empty() {
        println!("No historical data found.");
        return Ok(());
    }
    print!("{}", report::quote_table(&rows));

    let insights = storage::insights::latest_insights(db, 5).await?;
    if !insights.is_empty() {
        println!();
        print!("{}", report::insight_lines(&insights));
    }
    Ok(())
}

async fn run_export(db: &Db, csv: Option<PathBuf>, xlsx: Option<PathBuf>) -> anyhow::Result<()> {
    anyhow::ensure!(
        csv.is_some() || xlsx.is_some(),
        "export needs --csv <path> and/or --xlsx <path>"
    );
    let rows = storage::quotes::load_history(db).await?;
    coinpulse_core::export::write_files(&rows, csv.as_deref(), xlsx.as_deref()).await
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
