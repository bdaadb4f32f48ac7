//! Price quote data

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prices of one asset, produced fresh every tick and never persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Price per currency code (lower case, e.g. "usd")
    pub prices: BTreeMap<String, f64>,
    /// 24h change in percent, relative to the primary currency
    pub change_24h: Option<f64>,
}

impl PriceQuote {
    /// Price in the given currency, if the source returned one
    pub fn price(&self, currency: &str) -> Option<f64> {
        self.prices.get(currency).copied()
    }
}

/// Quotes keyed by asset id
pub type QuoteBook = BTreeMap<String, PriceQuote>;
