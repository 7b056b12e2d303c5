//! Candle collector CLI.

use aitrading_rs::backtest::{BacktestEngine, BacktestReport};
use aitrading_rs::collector::{CollectionOutcome, CollectionRequest, DataCollector};
use aitrading_rs::data::CandleStore;
use aitrading_rs::exchange::{BithumbClient, MAX_CANDLES_PER_REQUEST};
use aitrading_rs::strategy::Strategy;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use shared::{get_db_connection, Config, SeaOrmCandleStore};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "collector")]
#[command(about = "Bithumb minute candle collector and backtester", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect minute candles into the database
    Collect {
        #[arg(long)]
        market: String,

        /// RFC 3339 or YYYY-MM-DD; defaults to the configured lookback
        #[arg(long, value_parser = parse_datetime)]
        start: Option<DateTime<Utc>>,

        /// Continue from the newest stored candle
        #[arg(long)]
        resume: bool,
    },

    /// Show stored candle statistics for a market
    Stats {
        #[arg(long)]
        market: String,
    },

    /// List markets with stored candles
    Markets {
        /// List markets offered by the exchange instead
        #[arg(long)]
        remote: bool,
    },

    /// Delete stored candles; everything for the market unless a range or count is given
    Delete {
        #[arg(long, required_unless_present = "all")]
        market: Option<String>,

        /// Delete the candles of every market
        #[arg(long, conflicts_with_all = ["market", "from", "to", "oldest"])]
        all: bool,

        #[arg(long, value_parser = parse_datetime, requires = "to", conflicts_with = "oldest")]
        from: Option<DateTime<Utc>>,

        #[arg(long, value_parser = parse_datetime, requires = "from")]
        to: Option<DateTime<Utc>>,

        /// Delete the N oldest candles
        #[arg(long)]
        oldest: Option<u64>,
    },

    /// Backtest a strategy template over stored candles
    Backtest {
        #[arg(long)]
        market: String,

        /// conservative, aggressive, macd or combined
        #[arg(long, default_value = "conservative")]
        template: String,

        #[arg(long, value_parser = parse_datetime)]
        from: Option<DateTime<Utc>>,

        #[arg(long, value_parser = parse_datetime)]
        to: Option<DateTime<Utc>>,

        /// Run on the latest candles of this timeframe (1m .. 4h) fetched live
        #[arg(long, conflicts_with_all = ["from", "to"])]
        timeframe: Option<String>,

        #[arg(long)]
        initial_amount: Option<f64>,
    },

    /// Print build information
    Version,
}

/// Accepts RFC 3339 or a plain date (midnight UTC)
fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got '{raw}'"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn version_text() -> String {
    let git_hash = option_env!("GIT_HASH").unwrap_or("unknown");
    let git_branch = option_env!("GIT_BRANCH").unwrap_or("unknown");
    let build_time_raw = option_env!("BUILD_TIME").unwrap_or("unknown");
    let build_time = build_time_raw
        .parse::<i64>()
        .ok()
        .and_then(|epoch| DateTime::<Utc>::from_timestamp(epoch, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| build_time_raw.to_string());

    format!(
        "collector {}\ncommit: {}\nbranch: {}\nbuilt: {}",
        env!("CARGO_PKG_VERSION"),
        git_hash,
        git_branch,
        build_time
    )
}

async fn open_store(config: &Config) -> Result<Arc<SeaOrmCandleStore>> {
    let db = get_db_connection(&config.database_url).await?;
    Migrator::up(&db, None)
        .await
        .context("failed to run database migrations")?;
    Ok(Arc::new(SeaOrmCandleStore::new(db)))
}

async fn run_collect(config: &Config, request: CollectionRequest) -> Result<()> {
    let store = open_store(config).await?;
    let client = BithumbClient::new(config.client_config())?;
    let collector = Arc::new(DataCollector::new(store, client, config.collector_config()));

    let signal_task = tokio::spawn({
        let collector = collector.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received Ctrl+C, cancelling collection...");
                collector.cancel();
            }
        }
    });

    let outcome = collector.collect(request).await;
    signal_task.abort();

    match outcome {
        CollectionOutcome::Completed(summary) => {
            println!(
                "Collected {} candles for {} in {} batches",
                summary.candles_inserted, summary.market, summary.batches_done
            );
            Ok(())
        }
        CollectionOutcome::Cancelled(summary) => {
            println!(
                "Cancelled: {} candles stored for {}, resume with --resume",
                summary.candles_inserted, summary.market
            );
            Ok(())
        }
        CollectionOutcome::Failed(summary) => Err(anyhow!(
            "collection for {} failed after {} attempts: {}",
            summary.market,
            summary.failed_attempts,
            summary.last_error.unwrap_or_default()
        )),
        CollectionOutcome::AlreadyRunning => bail!("a collection is already running"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env()?;

    match cli.command {
        Commands::Collect {
            market,
            start,
            resume,
        } => {
            let mut request = match start {
                Some(start) => CollectionRequest::starting_at(market, start),
                None => CollectionRequest::new(market),
            };
            request.resume = resume;
            run_collect(&config, request).await?;
        }
        Commands::Stats { market } => {
            let store = open_store(&config).await?;
            let count = store.count(&market).await?;
            let first = store.first_timestamp(&market).await?;
            let last = store.last_timestamp(&market).await?;
            println!("Market: {market}");
            println!("Candles: {count}");
            match (first, last) {
                (Some(first), Some(last)) => println!("Range: {first} .. {last}"),
                _ => println!("Range: no data"),
            }
        }
        Commands::Markets { remote } => {
            if remote {
                let client = BithumbClient::new(config.client_config())?;
                for market in client.fetch_markets().await? {
                    println!("{}\t{}\t{}", market.market, market.korean_name, market.english_name);
                }
            } else {
                let store = open_store(&config).await?;
                for market in store.list_markets().await? {
                    println!("{market}");
                }
            }
        }
        Commands::Delete {
            market,
            all,
            from,
            to,
            oldest,
        } => {
            let store = open_store(&config).await?;
            let client = BithumbClient::new(config.client_config())?;
            let collector = DataCollector::new(store, client, config.collector_config());
            if all {
                let removed = collector.delete_all_markets().await?;
                println!("Deleted {removed} candles across all markets");
                return Ok(());
            }
            let market = market.ok_or_else(|| anyhow!("--market is required"))?;
            let removed = match (from, to, oldest) {
                (Some(from), Some(to), _) => collector.delete_range(&market, from, to).await?,
                (_, _, Some(count)) => collector.delete_oldest(&market, count).await?,
                _ => collector.delete_all(&market).await?,
            };
            println!("Deleted {removed} candles for {market}");
        }
        Commands::Backtest {
            market,
            template,
            from,
            to,
            timeframe,
            initial_amount,
        } => {
            let strategy = Strategy::template(&template)
                .ok_or_else(|| anyhow!("unknown strategy template '{template}'"))?;
            let engine =
                BacktestEngine::new(initial_amount.unwrap_or(config.backtest_initial_amount));
            info!(market = %market, strategy = %strategy.name, "Running backtest");
            let result = match timeframe {
                Some(timeframe) => {
                    let client = BithumbClient::new(config.client_config())?;
                    let mut candles = client
                        .fetch_candles(&market, &timeframe, None, MAX_CANDLES_PER_REQUEST)
                        .await?;
                    candles.sort_by_key(|c| c.timestamp);
                    engine.run(&strategy, &candles)?
                }
                None => {
                    let store = open_store(&config).await?;
                    engine
                        .run_for_market(store.as_ref(), &market, from, to, &strategy)
                        .await?
                }
            };
            println!("{}", BacktestReport::new(result).format());
        }
        Commands::Version => println!("{}", version_text()),
    }

    Ok(())
}
