//! Crypto price ticker for chat platforms
//!
//! Fetches spot prices and 24h change from CoinGecko and keeps exactly one
//! pinned status message per chat up to date. The message is edited in place
//! while it is fresh and replaced once it reaches the staleness threshold or
//! disappears from the chat.
//!
//! # Architecture
//!
//! - `api`: price sources (`CoinGeckoClient`)
//! - `interface`: rendering quotes into message text (`HtmlFormatter`)
//! - `platforms`: chat transports (`TelegramTransport`)
//! - `store`: persisted record of the live message (file, Redis, memory)
//! - `lifecycle`: the send / edit / replace decision for one tick
//! - `runner`: one-shot and interval drivers
//! - `health`: liveness endpoint for hosted deployments
//!
//! # Example
//!
//! ```rust,ignore
//! use ticker_bot::{Ticker, TickerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TickerConfig::from_env()?;
//!     let ticker = Ticker::from_config(&config)?;
//!
//!     if let Some(outcome) = ticker.run_once().await? {
//!         println!("{outcome}");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod interface;
pub mod lifecycle;
pub mod platforms;
pub mod runner;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::{AssetSpec, StoreBackend, TickerConfig};
pub use error::{Result, TickerError, TransportError};
pub use lifecycle::{LifecycleManager, ReplaceReason, TickOutcome};
pub use runner::Ticker;
