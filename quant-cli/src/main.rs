//! Thin CLI entry point: load configuration, wire ports and strategies, call
//! `quant_engine::run`, translate the result into an exit code per spec.md §6.
//!
//! Credentials and a real broker/market-data integration are external collaborators this
//! workspace does not own (spec.md §1: "the broker SDK ... only their required capabilities
//! are specified"). This binary wires the `testing` feature's in-process mock ports in `paper`
//! mode, seeded from the config file, so the pipeline is runnable end-to-end without a live
//! broker. A `live` deployment is expected to link a crate that implements
//! `quant_execution::{AccountPort, MarketDataPort}` against a real brokerage and pass it to
//! `quant_engine::run` the same way this binary passes the mock ports.

mod config;

use clap::Parser;
use config::CliConfig;
use quant_execution::testing::{flat_margin_info, MockAccountPort, MockMarketDataPort};
use quant_execution::AccountSnapshot;
use quant_instrument::Symbol;
use quant_risk::DailyTradeLimitState;
use quant_strategy::StrategyRegistry;
use quant_tracker::{FilesystemObjectStore, StrategyTracker};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "quant", version, about = "Multi-strategy quantitative trading engine")]
struct Cli {
    /// Path to the JSON run configuration.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Correlation id for this run; a fresh v4 UUID is generated if omitted.
    #[arg(long)]
    correlation_id: Option<Uuid>,

    /// Directory persisted tracker state is written under (paper mode).
    #[arg(long, value_name = "DIR", default_value = "./quant-data")]
    data_dir: PathBuf,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let raw = match std::fs::read_to_string(&cli.config) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(error = %err, path = %cli.config.display(), "failed to read config file");
            return ExitCode::from(3);
        }
    };

    let cfg: CliConfig = match serde_json::from_str(&raw) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!(error = %err, "failed to parse config file");
            return ExitCode::from(3);
        }
    };

    let engine_config = match cfg.to_engine_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return ExitCode::from(3);
        }
    };

    let account = Arc::new(MockAccountPort::new(AccountSnapshot {
        total_value: cfg.paper_account.total_value,
        cash: cfg.paper_account.cash,
        equity: cfg.paper_account.total_value,
        margin_info: flat_margin_info(cfg.paper_account.buying_power),
    }));

    let market = Arc::new(MockMarketDataPort::new());
    for (symbol, price) in &cfg.paper_prices {
        let symbol = match Symbol::new(symbol) {
            Ok(symbol) => symbol,
            Err(err) => {
                tracing::error!(%symbol, error = %err, "invalid paper price symbol");
                return ExitCode::from(3);
            }
        };
        market.set_price(symbol, *price);
    }

    let daily_limit = Arc::new(DailyTradeLimitState::new(engine_config.daily_trade_limit_usd));

    let store = Arc::new(FilesystemObjectStore::new(cli.data_dir.join(&engine_config.persistence_prefix)));
    let tracker = Arc::new(StrategyTracker::new(store, engine_config.persistence_prefix.clone(), engine_config.order_history_limit));
    tracker.load().await;

    // No strategies are registered by default: strategy engines are the caller's external
    // collaborator (spec.md §1). With an empty registry the Signal Aggregator falls back to
    // the defensive-cash allocation, matching scenario S1 in spec.md §8.
    let strategies = Arc::new(StrategyRegistry::new());

    let deps = quant_engine::EngineDeps::new(account, market, strategies, daily_limit, tracker.clone());

    let result = quant_engine::run(&deps, &engine_config, cli.correlation_id).await;
    let exit_code = result.exit_code();

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(error = %err, "failed to serialize run result"),
    }

    let date_key = result.started_at.format("%Y-%m-%d").to_string();
    tracker.archive_daily_pnl(&cfg.paper_prices_as_symbols(), &date_key).await;

    ExitCode::from(exit_code as u8)
}
