//! Ticker bot CLI
//!
//! Keeps one pinned crypto price message up to date in a Telegram chat.
//!
//! # Usage
//!
//! ```bash
//! export TG_BOT_TOKEN="123456:ABC..."
//! export TG_CHAT_ID="-1001234567890"
//!
//! # One tick, for schedulers such as GitHub Actions
//! cargo run --bin ticker-bot -- once
//!
//! # Tick every TICKER_INTERVAL_SECS with a health endpoint on PORT
//! cargo run --bin ticker-bot -- serve
//! ```
//!
//! Without a subcommand the mode follows the environment: `once` when
//! `GITHUB_ACTIONS=true`, `serve` otherwise.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use ticker_bot::{Ticker, TickerConfig, health};
use ticker_utils::{LogFormat, init_tracing};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ticker-bot")]
#[command(about = "Keeps a pinned crypto price message up to date", long_about = None)]
struct Args {
    /// Run mode; inferred from the environment when omitted
    #[command(subcommand)]
    mode: Option<Mode>,

    /// Load environment variables from this file instead of `.env`
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Run a single tick and exit
    Once,
    /// Tick on an interval and serve the health endpoint
    Serve,
}

fn running_in_ci() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match &args.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    init_tracing("info", LogFormat::from_env());

    let ci = running_in_ci();
    let mode = args.mode.unwrap_or(if ci { Mode::Once } else { Mode::Serve });

    let config = TickerConfig::from_env().context("Invalid configuration")?;
    info!(
        ?mode,
        assets = ?config.asset_ids(),
        currencies = ?config.currencies,
        store = %config.store,
        "Starting ticker-bot"
    );

    let ticker = Ticker::from_config(&config)?;

    match mode {
        Mode::Once => {
            ticker.run_once().await?;
        }
        Mode::Serve => {
            let environment = if ci { "github-actions" } else { "production" };
            let identity = ticker_utils::Config::new("ticker-bot", environment);
            let addr = SocketAddr::from(([0, 0, 0, 0], config.health_port));
            let listener = health::bind(addr).await?;

            let health = tokio::spawn(async move {
                if let Err(e) = health::serve_on(listener, identity).await {
                    error!("Health endpoint stopped: {e}");
                }
            });

            ticker
                .run_forever(config.tick_interval, shutdown_signal())
                .await;
            health.abort();
        }
    }

    Ok(())
}
