//! Tick driver
//!
//! One tick fetches quotes, renders them and hands the text to the
//! lifecycle manager. A failed fetch or render skips the tick without
//! touching the chat or the store.

use crate::api::{CoinGeckoClient, PriceSource};
use crate::config::TickerConfig;
use crate::error::Result;
use crate::interface::{Formatter, HtmlFormatter};
use crate::lifecycle::{LifecycleManager, TickOutcome};
use crate::platforms::TelegramTransport;
use crate::store::open_store;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Drives the price → message pipeline
pub struct Ticker {
    source: Arc<dyn PriceSource>,
    formatter: Arc<dyn Formatter>,
    lifecycle: LifecycleManager,
    asset_ids: Vec<String>,
    currencies: Vec<String>,
}

impl Ticker {
    /// Assemble a ticker from its parts
    pub fn new(
        source: Arc<dyn PriceSource>,
        formatter: Arc<dyn Formatter>,
        lifecycle: LifecycleManager,
        asset_ids: Vec<String>,
        currencies: Vec<String>,
    ) -> Self {
        Self {
            source,
            formatter,
            lifecycle,
            asset_ids,
            currencies,
        }
    }

    /// Wire up CoinGecko, the HTML formatter, Telegram and the configured store
    pub fn from_config(config: &TickerConfig) -> Result<Self> {
        config.validate()?;

        let source = Arc::new(CoinGeckoClient::from_config(config)?);
        let formatter = Arc::new(HtmlFormatter::from_config(config)?);
        let transport = Arc::new(TelegramTransport::new(
            &config.telegram,
            config.request_timeout,
            formatter.parse_mode(),
        )?);
        let store = open_store(&config.store)?;
        info!(store = store.name(), backend = %config.store, "Opened state store");

        let lifecycle = LifecycleManager::from_config(config, transport, store);

        Ok(Self::new(
            source,
            formatter,
            lifecycle,
            config.asset_ids(),
            config.currencies.clone(),
        ))
    }

    /// Run a single tick at `now`
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickOutcome> {
        let quotes = self.source.fetch(&self.asset_ids, &self.currencies).await?;

        let missing: Vec<&str> = self
            .asset_ids
            .iter()
            .filter(|id| !quotes.contains_key(*id))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            warn!(?missing, "No quote for some assets, leaving them out");
        }

        let text = self.formatter.render(&quotes, now)?;
        self.lifecycle.reconcile(&text, now).await
    }

    /// Run one tick now.
    ///
    /// Returns `Ok(None)` when the tick was skipped for a recoverable reason
    /// and `Err` only for failures that should stop a one-shot run.
    pub async fn run_once(&self) -> Result<Option<TickOutcome>> {
        match self.tick(Utc::now()).await {
            Ok(outcome) => {
                info!("Tick complete: {outcome}");
                Ok(Some(outcome))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Tick skipped: {e}");
                Ok(None)
            }
        }
    }

    /// Tick every `interval` until `shutdown` resolves.
    ///
    /// Ticks never overlap; the interval is measured from the end of one tick
    /// to the start of the next.
    pub async fn run_forever<S>(&self, interval: Duration, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(interval_secs = interval.as_secs(), "Ticker loop started");

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                result = self.run_once() => {
                    if let Err(e) = result {
                        error!("Tick failed: {e}");
                    }
                }
            }

            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(interval) => {}
            }
        }

        info!("Ticker loop stopped");
    }
}
