//! Configuration for the ticker bot

use crate::error::{Result, TickerError};
use crate::platforms::TelegramConfig;
use chrono::{FixedOffset, Offset, Utc};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// One tracked asset: price source id plus how it is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    /// Price source identifier (e.g. "bitcoin")
    pub id: String,
    /// Ticker symbol shown in the message (e.g. "BTC")
    pub symbol: String,
    /// Optional glyph or label shown before the symbol
    pub label: Option<String>,
}

impl AssetSpec {
    /// Create a spec with an explicit symbol and no label
    pub fn new(id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            label: None,
        }
    }

    /// Attach a label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl FromStr for AssetSpec {
    type Err = TickerError;

    /// Parse `id[:SYMBOL[:label]]`
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':').map(str::trim);
        let id = parts.next().unwrap_or_default();
        if id.is_empty() {
            return Err(TickerError::ConfigError(format!("Invalid asset entry: '{s}'")));
        }

        let symbol = parts
            .next()
            .filter(|p| !p.is_empty())
            .map_or_else(|| id.to_ascii_uppercase(), ToString::to_string);
        let label = parts.next().filter(|p| !p.is_empty()).map(ToString::to_string);

        Ok(Self {
            id: id.to_ascii_lowercase(),
            symbol,
            label,
        })
    }
}

/// Backing medium of the persisted state store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// JSON file on local disk
    File(PathBuf),
    /// Redis key-value service
    Redis(String),
    /// Process memory only
    Memory,
}

impl StoreBackend {
    /// Select the backend from the environment.
    ///
    /// `TICKER_STORE` wins; otherwise GitHub Actions runs use the workspace
    /// file, a configured `REDIS_URL` selects redis, and everything else
    /// falls back to a local file.
    pub fn resolve<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_path = || {
            lookup("TICKER_STATE_FILE").map_or_else(|| default_state_file(lookup), PathBuf::from)
        };

        match lookup("TICKER_STORE").map(|s| s.trim().to_ascii_lowercase()) {
            Some(kind) if kind == "file" => Ok(Self::File(file_path())),
            Some(kind) if kind == "memory" => Ok(Self::Memory),
            Some(kind) if kind == "redis" => lookup("REDIS_URL")
                .map(Self::Redis)
                .ok_or_else(|| {
                    TickerError::ConfigError("TICKER_STORE=redis requires REDIS_URL".to_string())
                }),
            Some(other) => Err(TickerError::ConfigError(format!(
                "Unknown TICKER_STORE '{other}' (expected file, redis or memory)"
            ))),
            None if is_github_actions(lookup) => Ok(Self::File(file_path())),
            None => Ok(lookup("REDIS_URL").map_or_else(|| Self::File(file_path()), Self::Redis)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            // Redis URLs may carry credentials
            Self::Redis(_) => write!(f, "redis"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

fn is_github_actions<F>(lookup: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup("GITHUB_ACTIONS").is_some_and(|v| v == "true")
}

fn default_state_file<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if is_github_actions(lookup) {
        let workspace = lookup("GITHUB_WORKSPACE").unwrap_or_else(|| ".".to_string());
        PathBuf::from(workspace).join(".github").join("last_message.json")
    } else {
        PathBuf::from("last_message.json")
    }
}

/// Configuration for the ticker bot
#[derive(Debug, Clone)]
pub struct TickerConfig {
    /// Bot credential and destination chat
    pub telegram: TelegramConfig,

    /// Assets to track, in display order
    pub assets: Vec<AssetSpec>,

    /// Currencies to display; the first one drives the 24h change
    pub currencies: Vec<String>,

    /// Age at which the live message is replaced instead of edited
    pub stale_after: Duration,

    /// Delay between ticks in long-running mode
    pub tick_interval: Duration,

    /// Timeout applied to every outbound request
    pub request_timeout: Duration,

    /// Re-pin the live message after every successful edit
    pub repin_on_edit: bool,

    /// Heading of the status message
    pub title: String,

    /// Offset used for the "last updated" line
    pub display_offset: FixedOffset,

    /// Persisted state backend
    pub store: StoreBackend,

    /// Prefix of the persisted state key
    pub store_namespace: String,

    /// Base URL of the price API
    pub coingecko_api_base: String,

    /// Optional price API key
    pub coingecko_api_key: Option<String>,

    /// Maximum price requests per minute
    pub price_rate_limit: u32,

    /// Port of the health endpoint in long-running mode
    pub health_port: u16,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            assets: default_assets(),
            currencies: vec!["usd".to_string(), "eur".to_string()],
            stale_after: Duration::from_secs(24 * 3600), // 24 hours
            tick_interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            repin_on_edit: false,
            title: "Crypto Prices".to_string(),
            display_offset: utc(),
            store: StoreBackend::File(PathBuf::from("last_message.json")),
            store_namespace: "ticker_bot".to_string(),
            coingecko_api_base: "https://api.coingecko.com/api/v3".to_string(),
            coingecko_api_key: None,
            price_rate_limit: 30,
            health_port: 8000,
        }
    }
}

fn default_assets() -> Vec<AssetSpec> {
    vec![
        AssetSpec::new("bitcoin", "BTC").with_label("₿"),
        AssetSpec::new("ripple", "XRP").with_label("💧"),
        AssetSpec::new("linea", "LINEA").with_label("🔷"),
        AssetSpec::new("stellar", "XLM").with_label("🌟"),
        AssetSpec::new("cardano", "ADA").with_label("🔵"),
    ]
}

fn utc() -> FixedOffset {
    Utc.fix()
}

impl TickerConfig {
    /// Create a new configuration builder
    pub fn builder() -> TickerConfigBuilder {
        TickerConfigBuilder::default()
    }

    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut builder = Self::builder()
            .telegram(TelegramConfig::from_lookup(&lookup)?)
            .store(StoreBackend::resolve(&lookup)?);

        if let Some(raw) = lookup("TICKER_ASSETS") {
            let assets = split_list(&raw)
                .map(str::parse)
                .collect::<Result<Vec<AssetSpec>>>()?;
            builder = builder.assets(assets);
        }
        if let Some(raw) = lookup("TICKER_CURRENCIES") {
            builder = builder.currencies(split_list(&raw).map(str::to_ascii_lowercase).collect());
        }
        if let Some(raw) = lookup("TICKER_STALE_AFTER_HOURS") {
            let hours: f64 = parse_value("TICKER_STALE_AFTER_HOURS", &raw)?;
            let stale_after = Duration::try_from_secs_f64(hours * 3600.0)
                .ok()
                .filter(|d| !d.is_zero())
                .ok_or_else(|| {
                    TickerError::ConfigError(format!(
                        "TICKER_STALE_AFTER_HOURS must be a positive number of hours, got '{raw}'"
                    ))
                })?;
            builder = builder.stale_after(stale_after);
        }
        if let Some(raw) = lookup("TICKER_INTERVAL_SECS") {
            builder = builder.tick_interval(Duration::from_secs(parse_value(
                "TICKER_INTERVAL_SECS",
                &raw,
            )?));
        }
        if let Some(raw) = lookup("TICKER_REQUEST_TIMEOUT_SECS") {
            builder = builder.request_timeout(Duration::from_secs(parse_value(
                "TICKER_REQUEST_TIMEOUT_SECS",
                &raw,
            )?));
        }
        if let Some(raw) = lookup("TICKER_REPIN_ON_EDIT") {
            builder = builder.repin_on_edit(parse_bool("TICKER_REPIN_ON_EDIT", &raw)?);
        }
        if let Some(title) = lookup("TICKER_TITLE") {
            builder = builder.title(title);
        }
        if let Some(raw) = lookup("TICKER_UTC_OFFSET") {
            let offset = parse_utc_offset(&raw).ok_or_else(|| {
                TickerError::ConfigError(format!(
                    "Invalid TICKER_UTC_OFFSET '{raw}' (expected e.g. +02:00)"
                ))
            })?;
            builder = builder.display_offset(offset);
        }
        if let Some(namespace) = lookup("TICKER_STORE_NAMESPACE") {
            builder = builder.store_namespace(namespace);
        }
        if let Some(base) = lookup("COINGECKO_API_BASE") {
            builder = builder.coingecko_api_base(base);
        }
        if let Some(key) = lookup("COINGECKO_API_KEY") {
            builder = builder.coingecko_api_key(key);
        }
        if let Some(raw) = lookup("COINGECKO_RATE_LIMIT") {
            builder = builder.price_rate_limit(parse_value("COINGECKO_RATE_LIMIT", &raw)?);
        }
        if let Some(raw) = lookup("PORT") {
            builder = builder.health_port(parse_value("PORT", &raw)?);
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.telegram.validate()?;

        if self.assets.is_empty() {
            return Err(TickerError::ConfigError(
                "At least one asset must be configured".to_string(),
            ));
        }
        if self.currencies.is_empty() {
            return Err(TickerError::ConfigError(
                "At least one currency must be configured".to_string(),
            ));
        }
        if self.stale_after.is_zero() {
            return Err(TickerError::ConfigError(
                "stale_after must be greater than 0".to_string(),
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(TickerError::ConfigError(
                "tick_interval must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(TickerError::ConfigError(
                "request_timeout must be greater than 0".to_string(),
            ));
        }
        if self.price_rate_limit == 0 {
            return Err(TickerError::ConfigError(
                "price_rate_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Key under which the live message record is stored.
    ///
    /// Scoped to the chat, so pointing the bot at another chat never reuses
    /// a foreign message id.
    pub fn store_key(&self) -> String {
        format!(
            "{}:{}:live_message",
            self.store_namespace, self.telegram.chat_id
        )
    }

    /// Price source ids in display order
    pub fn asset_ids(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.id.clone()).collect()
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| TickerError::ConfigError(format!("Invalid value for {key}: '{raw}'")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TickerError::ConfigError(format!(
            "Invalid boolean for {key}: '{raw}'"
        ))),
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HH`, `Z` or `UTC`
fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("utc") || raw.eq_ignore_ascii_case("z") {
        return Some(utc());
    }

    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None => (rest.parse::<i32>().ok()?, 0),
    };
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Builder for TickerConfig
#[derive(Debug, Default)]
pub struct TickerConfigBuilder {
    telegram: Option<TelegramConfig>,
    assets: Option<Vec<AssetSpec>>,
    currencies: Option<Vec<String>>,
    stale_after: Option<Duration>,
    tick_interval: Option<Duration>,
    request_timeout: Option<Duration>,
    repin_on_edit: Option<bool>,
    title: Option<String>,
    display_offset: Option<FixedOffset>,
    store: Option<StoreBackend>,
    store_namespace: Option<String>,
    coingecko_api_base: Option<String>,
    coingecko_api_key: Option<String>,
    price_rate_limit: Option<u32>,
    health_port: Option<u16>,
}

impl TickerConfigBuilder {
    /// Set bot credential and chat
    pub fn telegram(mut self, telegram: TelegramConfig) -> Self {
        self.telegram = Some(telegram);
        self
    }

    /// Set tracked assets
    pub fn assets(mut self, assets: Vec<AssetSpec>) -> Self {
        self.assets = Some(assets);
        self
    }

    /// Set displayed currencies
    pub fn currencies(mut self, currencies: Vec<String>) -> Self {
        self.currencies = Some(currencies);
        self
    }

    /// Set staleness threshold
    pub fn stale_after(mut self, duration: Duration) -> Self {
        self.stale_after = Some(duration);
        self
    }

    /// Set long-running tick period
    pub fn tick_interval(mut self, duration: Duration) -> Self {
        self.tick_interval = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Re-pin after successful edits
    pub fn repin_on_edit(mut self, repin: bool) -> Self {
        self.repin_on_edit = Some(repin);
        self
    }

    /// Set message heading
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set display offset
    pub fn display_offset(mut self, offset: FixedOffset) -> Self {
        self.display_offset = Some(offset);
        self
    }

    /// Set state backend
    pub fn store(mut self, store: StoreBackend) -> Self {
        self.store = Some(store);
        self
    }

    /// Set store key prefix
    pub fn store_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.store_namespace = Some(namespace.into());
        self
    }

    /// Set price API base URL
    pub fn coingecko_api_base(mut self, base: impl Into<String>) -> Self {
        self.coingecko_api_base = Some(base.into());
        self
    }

    /// Set price API key
    pub fn coingecko_api_key(mut self, key: impl Into<String>) -> Self {
        self.coingecko_api_key = Some(key.into());
        self
    }

    /// Set price request rate limit (per minute)
    pub fn price_rate_limit(mut self, limit: u32) -> Self {
        self.price_rate_limit = Some(limit);
        self
    }

    /// Set health endpoint port
    pub fn health_port(mut self, port: u16) -> Self {
        self.health_port = Some(port);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<TickerConfig> {
        let defaults = TickerConfig::default();

        let config = TickerConfig {
            telegram: self.telegram.unwrap_or(defaults.telegram),
            assets: self.assets.unwrap_or(defaults.assets),
            currencies: self.currencies.unwrap_or(defaults.currencies),
            stale_after: self.stale_after.unwrap_or(defaults.stale_after),
            tick_interval: self.tick_interval.unwrap_or(defaults.tick_interval),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            repin_on_edit: self.repin_on_edit.unwrap_or(defaults.repin_on_edit),
            title: self.title.unwrap_or(defaults.title),
            display_offset: self.display_offset.unwrap_or(defaults.display_offset),
            store: self.store.unwrap_or(defaults.store),
            store_namespace: self.store_namespace.unwrap_or(defaults.store_namespace),
            coingecko_api_base: self.coingecko_api_base.unwrap_or(defaults.coingecko_api_base),
            coingecko_api_key: self.coingecko_api_key,
            price_rate_limit: self.price_rate_limit.unwrap_or(defaults.price_rate_limit),
            health_port: self.health_port.unwrap_or(defaults.health_port),
        };

        config.validate()?;
        Ok(config)
    }
}
