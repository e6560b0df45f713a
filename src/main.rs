//! CLI entry point for vaxboard.
//!
//! Loads the vaccination CSV once per invocation and prints a leaderboard,
//! chart series, a combined dashboard, or a single country's detail card.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use vaxboard::{
    config::Config,
    country::FlagUrls,
    fetch::BasicClient,
    index::DateIndex,
    leaderboard::rank,
    normalize::RecordNormalizer,
    output::{
        append_leaderboard, render_detail, render_leaderboard, render_report, render_series,
        to_json,
    },
    pipeline::DatasetStore,
    record::Metric,
    series::build_series,
    view::{DashboardView, DetailCard},
};

#[derive(Parser)]
#[command(name = "vaxboard")]
#[command(about = "Rank countries by vaccination progress", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Path or URL of the CSV (defaults to VAXBOARD_SOURCE_URL)
    #[arg(short, long, value_name = "FILE_OR_URL")]
    source: Option<String>,

    /// Day to treat as today, YYYY-MM-DD (defaults to the local date)
    #[arg(long)]
    today: Option<NaiveDate>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pretty,
    Json,
    Csv,
}

/// Series have no flat CSV form, so only text and JSON are offered.
#[derive(Clone, Copy, ValueEnum)]
enum SeriesFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Top countries on the most recent day with data
    Leaderboard {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long, default_value = "total_vaccinations_per_hundred")]
        metric: Metric,

        /// Number of countries (defaults to VAXBOARD_LEADERBOARD_LIMIT)
        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,

        /// CSV file to append rows to when --format csv
        #[arg(short, long, default_value = "leaderboard.csv")]
        output: String,
    },
    /// Recent history for the top countries
    Series {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long, default_value = "total_vaccinations_per_hundred")]
        metric: Metric,

        /// Number of countries (defaults to VAXBOARD_LEADERBOARD_LIMIT)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Number of data days (defaults to VAXBOARD_SERIES_DAYS)
        #[arg(short, long)]
        days: Option<usize>,

        #[arg(short, long, value_enum, default_value_t = SeriesFormat::Pretty)]
        format: SeriesFormat,
    },
    /// Leaderboard, series and ingest summary together
    Dashboard {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long, default_value = "total_vaccinations_per_hundred")]
        metric: Metric,
    },
    /// Detail card for one country
    Country {
        /// 3-letter country code, e.g. TUR
        iso_code: String,

        /// Day to show, YYYY-MM-DD (defaults to --today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        #[command(flatten)]
        source: SourceArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/vaxboard.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("vaxboard.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Leaderboard {
            source,
            metric,
            limit,
            format,
            output,
        } => {
            let (index, today) = load(&config, &source).await?;
            let board = rank(
                &index,
                metric,
                today,
                limit.unwrap_or(config.leaderboard_limit),
            )?;
            match format {
                Format::Pretty => print!("{}", render_leaderboard(&board)),
                Format::Json => println!("{}", to_json(&board)?),
                Format::Csv => {
                    append_leaderboard(&output, &board)?;
                    info!(output = %output, rows = board.len(), "Leaderboard appended");
                }
            }
        }
        Commands::Series {
            source,
            metric,
            limit,
            days,
            format,
        } => {
            let (index, today) = load(&config, &source).await?;
            let board = rank(
                &index,
                metric,
                today,
                limit.unwrap_or(config.leaderboard_limit),
            )?;
            let set = build_series(
                &index,
                metric,
                &board.iso_codes(),
                today,
                days.unwrap_or(config.series_days),
            );
            match format {
                SeriesFormat::Pretty => print!("{}", render_series(&set)),
                SeriesFormat::Json => println!("{}", to_json(&set)?),
            }
        }
        Commands::Dashboard { source, metric } => {
            let store = DatasetStore::new();
            let (index, today) = load_into(&store, &config, &source).await?;
            let view = DashboardView::new(
                index,
                metric,
                today,
                config.leaderboard_limit,
                config.series_days,
            )?;

            if let Some(report) = store.report() {
                println!("{}\n", render_report(&report));
            }
            for m in Metric::ALL {
                let marker = if view.is_active(m) { "*" } else { " " };
                println!("[{marker}] {}", m.label());
            }
            println!();
            print!("{}", render_leaderboard(&view.leaderboard()?));
            println!();
            print!("{}", render_series(view.series()));
        }
        Commands::Country {
            iso_code,
            date,
            source,
        } => {
            let (index, today) = load(&config, &source).await?;
            let card = DetailCard::lookup(&index, &iso_code, date.unwrap_or(today))?;
            print!("{}", render_detail(&card));
        }
    }

    Ok(())
}

/// Loads the configured or given source into a fresh store.
async fn load(config: &Config, args: &SourceArgs) -> Result<(Arc<DateIndex>, NaiveDate)> {
    load_into(&DatasetStore::new(), config, args).await
}

#[tracing::instrument(skip_all)]
async fn load_into(
    store: &DatasetStore,
    config: &Config,
    args: &SourceArgs,
) -> Result<(Arc<DateIndex>, NaiveDate)> {
    let source = args.source.as_deref().unwrap_or(&config.source_url);
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let client = BasicClient::with_timeout(config.http_timeout)?;
    let normalizer = RecordNormalizer::new(FlagUrls::new(config.flag_url_template.as_str()));

    let index = store
        .refresh(&client, source, &normalizer)
        .await
        .context("could not load data")?;

    info!(source, %today, dates = index.len(), "Dataset ready");
    Ok((index, today))
}
