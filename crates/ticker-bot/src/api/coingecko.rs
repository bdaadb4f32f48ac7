//! CoinGecko price client
//!
//! Uses the public `/simple/price` endpoint:
//! `GET {base}/simple/price?ids=bitcoin,ripple&vs_currencies=usd,eur&include_24hr_change=true`
//!
//! The response is an object keyed by asset id, each value holding one field
//! per currency plus `<currency>_24h_change`.

use crate::api::quote::{PriceQuote, QuoteBook};
use crate::config::TickerConfig;
use crate::error::{Result, TickerError};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Longest slice of an error body kept in error messages
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Source of price quotes for a tick
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch quotes for `asset_ids` in `currencies`.
    ///
    /// Fails with `SourceUnavailable` on any transport, status or schema
    /// problem. No retries; the caller skips the tick.
    async fn fetch(&self, asset_ids: &[String], currencies: &[String]) -> Result<QuoteBook>;
}

/// CoinGecko client with rate limiting
pub struct CoinGeckoClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    rate_limiter: SharedRateLimiter,
}

impl CoinGeckoClient {
    /// Create a new CoinGecko client
    ///
    /// # Arguments
    /// * `api_base` - API root, e.g. `https://api.coingecko.com/api/v3`
    /// * `api_key` - Optional demo API key
    /// * `timeout` - Per-request timeout
    /// * `rate_limit` - Requests per minute (free tier: ~30)
    pub fn new(
        api_base: &str,
        api_key: Option<String>,
        timeout: Duration,
        rate_limit: u32,
    ) -> Result<Self> {
        let endpoint = Url::parse(&format!("{}/simple/price", api_base.trim_end_matches('/')))
            .map_err(|e| {
                TickerError::ConfigError(format!("Invalid price API base '{api_base}': {e}"))
            })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TickerError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            endpoint,
            api_key,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Create a client from the ticker configuration
    pub fn from_config(config: &TickerConfig) -> Result<Self> {
        Self::new(
            &config.coingecko_api_base,
            config.coingecko_api_key.clone(),
            config.request_timeout,
            config.price_rate_limit,
        )
    }

    fn price_url(&self, asset_ids: &[String], currencies: &[String]) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("ids", &asset_ids.join(","))
            .append_pair("vs_currencies", &currencies.join(","))
            .append_pair("include_24hr_change", "true");
        url
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch(&self, asset_ids: &[String], currencies: &[String]) -> Result<QuoteBook> {
        if asset_ids.is_empty() {
            return Ok(QuoteBook::new());
        }

        self.rate_limiter.until_ready().await;

        let url = self.price_url(asset_ids, currencies);
        debug!("Fetching prices: {url}");

        let mut request = self.client.get(url).header("accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TickerError::SourceUnavailable(format!("CoinGecko request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            return Err(TickerError::SourceUnavailable(format!(
                "CoinGecko API error {status}: {body}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            TickerError::SourceUnavailable(format!("Failed to read CoinGecko response: {e}"))
        })?;

        parse_quotes(&body, currencies)
    }
}

/// Parse a `/simple/price` body into a quote book.
///
/// Non-numeric or null fields are skipped. An asset with none of the
/// requested currencies is left out of the book.
pub fn parse_quotes(body: &[u8], currencies: &[String]) -> Result<QuoteBook> {
    let raw: HashMap<String, HashMap<String, serde_json::Value>> = serde_json::from_slice(body)
        .map_err(|e| {
            TickerError::SourceUnavailable(format!("Failed to parse CoinGecko response: {e}"))
        })?;

    let change_field = currencies.first().map(|c| format!("{c}_24h_change"));

    let mut book = QuoteBook::new();
    for (id, fields) in raw {
        let prices: BTreeMap<String, f64> = currencies
            .iter()
            .filter_map(|c| fields.get(c).and_then(serde_json::Value::as_f64).map(|p| (c.clone(), p)))
            .collect();

        if prices.is_empty() {
            debug!("No requested currency in quote for {id}, skipping");
            continue;
        }

        let change_24h = change_field
            .as_ref()
            .and_then(|f| fields.get(f))
            .and_then(serde_json::Value::as_f64);

        book.insert(id, PriceQuote { prices, change_24h });
    }

    Ok(book)
}
