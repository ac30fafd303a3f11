//! # mb-runner
//!
//! Main entry point for the minute-bar aggregation service.
//!
//! Loads an optional JSON configuration file, applies environment overrides,
//! starts one streaming feed per exchange and flushes one snapshot row per
//! instrument every minute until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! mb-runner config.json --log-level info
//! SYMBOL_BINANCE=ETHUSDT CSV_DIR=/var/lib/mb mb-runner
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mb_agg::backfill::RestBackfill;
use mb_agg::sink::create_sink;
use mb_agg::{Aggregator, BucketScheduler, GapFiller, StateStore};
use mb_core::config::{AppConfig, StorageConfig};
use mb_core::time_util::SystemClock;
use mb_core::{Exchange, FeedEvent};
use mb_md::EventCallback;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Minute-bar market data aggregator.
#[derive(Parser, Debug)]
#[command(name = "mb-runner", about = "Minute-bar market data aggregator")]
struct Cli {
    /// Configuration file path (JSON). Built-in defaults are used when absent.
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output. Overrides `app.log_path`.
    #[arg(long)]
    log_dir: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Track only this Binance symbol.
    #[arg(long, env = "SYMBOL_BINANCE")]
    symbol_binance: Option<String>,

    /// Track only this OKX instrument.
    #[arg(long, env = "SYMBOL_OKX")]
    symbol_okx: Option<String>,

    /// Write CSV files into this directory.
    #[arg(long, env = "CSV_DIR")]
    csv_dir: Option<String>,

    /// Write to Postgres instead of CSV. Wins over `CSV_DIR`.
    #[arg(long, env = "POSTGRES_DSN")]
    postgres_dsn: Option<String>,
}

impl Cli {
    /// Layer CLI / environment values over the file config.
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(symbol) = self.symbol_binance.as_deref().filter(|s| !s.trim().is_empty()) {
            config.override_symbol(Exchange::Binance, symbol.trim());
        }
        if let Some(symbol) = self.symbol_okx.as_deref().filter(|s| !s.trim().is_empty()) {
            config.override_symbol(Exchange::Okx, symbol.trim());
        }
        if let Some(dsn) = self.postgres_dsn.as_deref().filter(|s| !s.trim().is_empty()) {
            config.storage = StorageConfig::Postgres { dsn: dsn.to_string() };
        } else if let Some(dir) = self.csv_dir.as_deref().filter(|s| !s.trim().is_empty()) {
            config.storage = StorageConfig::Csv { dir: dir.to_string() };
        }
    }
}

fn load(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => mb_core::config::load_config(path)?,
        None => AppConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = load(&cli)?;

    // 2. Initialize logging
    let log_dir = config.log_dir(cli.log_dir.as_deref());
    mb_core::logging::init_logging(&cli.log_level, log_dir.as_deref(), &config.module_name("mb-runner"), cli.json_logs);

    let keys = config.instrument_keys();
    info!(
        "mb-runner starting: {} instrument(s), storage={:?}, backfill={}, ordering={:?}",
        keys.len(),
        config.storage,
        config.backfill.enabled,
        config.ordering,
    );

    // 3. Storage must be ready before anything is collected
    let sink = create_sink(&config.storage).await?;
    sink.ensure_schema().await.context("storage schema bootstrap")?;

    // 4. State store and gap filler
    let store = Arc::new(StateStore::new(keys, config.ordering));
    let gap_filler = if config.backfill.enabled {
        let rest = RestBackfill::new(&config.backfill).context("building REST backfill client")?;
        GapFiller::new(Arc::new(rest), config.backfill.depth)
    } else {
        GapFiller::disabled()
    };
    let aggregator = Arc::new(Aggregator::new(store.clone(), gap_filler, sink));

    // 5. Feeds
    let mut feeds: Vec<Box<dyn mb_md::FeedSource>> = Vec::new();
    if config.feeds.enabled {
        let on_event: EventCallback = {
            let store = store.clone();
            Arc::new(move |event: FeedEvent| {
                store.apply(&event);
            })
        };
        for exchange in [Exchange::Binance, Exchange::Okx] {
            let symbols = config.symbols_for(exchange);
            if symbols.is_empty() {
                continue;
            }
            let feed = mb_md::registry::create_feed(exchange, &symbols, &config.feeds, on_event.clone())?;
            info!("created feed '{}' for {} symbol(s)", feed.name(), symbols.len());
            feeds.push(feed);
        }
    } else {
        warn!("feeds disabled, rows will carry backfilled values only");
    }
    for feed in &mut feeds {
        feed.start().await?;
        info!("feed '{}' started", feed.name());
    }

    // 6. Scheduler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler =
        BucketScheduler::new(Arc::new(SystemClock), config.scheduler.tick_interval(), config.scheduler.skipped_buckets);
    let mut scheduler_task = tokio::spawn(scheduler.run(aggregator, shutdown_rx));
    info!("running, press Ctrl+C to stop");

    // 7. Wait for Ctrl+C or a fatal flush error
    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
            scheduler_task.await.context("scheduler task")?
        }
        joined = &mut scheduler_task => {
            joined.context("scheduler task")?
        }
    };

    // 8. Stop feeds
    for feed in &mut feeds {
        info!("stopping feed '{}'", feed.name());
        if let Err(e) = feed.stop().await {
            error!("error stopping '{}': {e}", feed.name());
        }
    }

    match &outcome {
        Ok(()) => info!("all feeds stopped, goodbye"),
        Err(e) => error!("scheduler failed: {e:#}"),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    /// No overrides set. Built directly so `SYMBOL_*` / `CSV_DIR` /
    /// `POSTGRES_DSN` in the test environment cannot leak in.
    fn cli() -> Cli {
        Cli {
            config: None,
            log_level: "info".into(),
            log_dir: None,
            json_logs: false,
            symbol_binance: None,
            symbol_okx: None,
            csv_dir: None,
            postgres_dsn: None,
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_overrides_keep_the_config() {
        let mut config = AppConfig::default();
        cli().apply_overrides(&mut config);
        assert_eq!(config.instrument_keys(), AppConfig::default().instrument_keys());
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn symbol_overrides_replace_the_exchange_list() {
        let mut config = AppConfig::default();
        Cli { symbol_binance: Some("ETHUSDT".into()), ..cli() }.apply_overrides(&mut config);
        assert_eq!(config.symbols_for(Exchange::Binance), vec!["ETHUSDT".to_string()]);
        assert_eq!(config.symbols_for(Exchange::Okx), vec!["BTC-USDT".to_string()]);
    }

    #[test]
    fn postgres_dsn_wins_over_csv_dir() {
        let mut config = AppConfig::default();
        Cli { csv_dir: Some("/tmp/x".into()), postgres_dsn: Some("host=db".into()), ..cli() }
            .apply_overrides(&mut config);
        assert_eq!(config.storage, StorageConfig::Postgres { dsn: "host=db".into() });

        let mut config = AppConfig::default();
        Cli { csv_dir: Some("/tmp/x".into()), ..cli() }.apply_overrides(&mut config);
        assert_eq!(config.storage, StorageConfig::Csv { dir: "/tmp/x".into() });
    }

    #[test]
    fn blank_override_is_ignored() {
        let mut config = AppConfig::default();
        Cli { symbol_okx: Some(" ".into()), ..cli() }.apply_overrides(&mut config);
        assert_eq!(config.symbols_for(Exchange::Okx), vec!["BTC-USDT".to_string()]);
    }
}
