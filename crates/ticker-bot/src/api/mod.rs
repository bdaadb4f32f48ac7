//! Price source clients

pub mod coingecko;
pub mod quote;

pub use coingecko::{CoinGeckoClient, PriceSource};
pub use quote::{PriceQuote, QuoteBook};

#[cfg(test)]
pub use coingecko::MockPriceSource;
