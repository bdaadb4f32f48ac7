//! Status message formatting

use crate::api::QuoteBook;
use crate::config::{AssetSpec, TickerConfig};
use crate::error::Result;
use chrono::{DateTime, FixedOffset, Utc};
use minijinja::{Environment, context};
use serde::Serialize;

/// Renders a quote book into the text of the live message
pub trait Formatter: Send + Sync {
    /// Markup mode understood by the chat platform, if any
    fn parse_mode(&self) -> Option<&'static str>;

    /// Render the status text. Assets missing from `quotes` are left out.
    fn render(&self, quotes: &QuoteBook, now: DateTime<Utc>) -> Result<String>;
}

const STATUS_TEMPLATE_NAME: &str = "status.html";

// Blocks eat their trailing newline (trim_blocks). Operator text is
// HTML-escaped; amounts and changes are built here and marked safe.
const STATUS_TEMPLATE: &str = "\
📊 <b>{{ title }}</b>

{% for asset in assets %}
{% if asset.label %}{{ asset.label }} {% endif %}<b>{{ asset.symbol }}</b>
{% for price in asset.prices %}
{{ price.code }}: <code>{{ price.amount|safe }}</code>
{% endfor %}
Δ24h: <code>{{ asset.change|safe }}</code>{{ asset.arrow }}

{% endfor %}
<i>Last updated: {{ updated }}</i>";

#[derive(Serialize)]
struct AssetView<'a> {
    label: Option<&'a str>,
    symbol: &'a str,
    prices: Vec<PriceView>,
    change: String,
    arrow: &'static str,
}

#[derive(Serialize)]
struct PriceView {
    code: String,
    amount: String,
}

/// Telegram HTML formatter
pub struct HtmlFormatter {
    env: Environment<'static>,
    title: String,
    assets: Vec<AssetSpec>,
    currencies: Vec<String>,
    offset: FixedOffset,
}

impl HtmlFormatter {
    /// Create a formatter for the given assets and currencies
    pub fn new(
        title: impl Into<String>,
        assets: Vec<AssetSpec>,
        currencies: Vec<String>,
        offset: FixedOffset,
    ) -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.add_template(STATUS_TEMPLATE_NAME, STATUS_TEMPLATE)?;

        Ok(Self {
            env,
            title: title.into(),
            assets,
            currencies,
            offset,
        })
    }

    /// Create a formatter from the ticker configuration
    pub fn from_config(config: &TickerConfig) -> Result<Self> {
        Self::new(
            config.title.clone(),
            config.assets.clone(),
            config.currencies.clone(),
            config.display_offset,
        )
    }

    fn asset_views<'a>(&'a self, quotes: &QuoteBook) -> Vec<AssetView<'a>> {
        self.assets
            .iter()
            .filter_map(|asset| {
                let quote = quotes.get(&asset.id)?;
                let prices = self
                    .currencies
                    .iter()
                    .filter_map(|currency| {
                        quote.price(currency).map(|price| PriceView {
                            code: currency.to_ascii_uppercase(),
                            amount: format_price(currency, price),
                        })
                    })
                    .collect();

                let (change, arrow) = match quote.change_24h {
                    Some(change) if change.is_finite() => (
                        format!("{change:.2}%"),
                        if change >= 0.0 { " ⬆️" } else { " ⬇️" },
                    ),
                    _ => ("n/a".to_string(), ""),
                };

                Some(AssetView {
                    label: asset.label.as_deref(),
                    symbol: &asset.symbol,
                    prices,
                    change,
                    arrow,
                })
            })
            .collect()
    }
}

impl Formatter for HtmlFormatter {
    fn parse_mode(&self) -> Option<&'static str> {
        Some("HTML")
    }

    fn render(&self, quotes: &QuoteBook, now: DateTime<Utc>) -> Result<String> {
        let local = now.with_timezone(&self.offset);
        let updated = format!("{} (UTC{})", local.format("%Y-%m-%d %H:%M:%S"), self.offset);

        let template = self.env.get_template(STATUS_TEMPLATE_NAME)?;
        let text = template.render(context! {
            title => &self.title,
            assets => self.asset_views(quotes),
            updated => updated,
        })?;

        Ok(text)
    }
}

/// Currency symbol for well known codes
fn currency_symbol(currency: &str) -> Option<&'static str> {
    match currency {
        "usd" => Some("$"),
        "eur" => Some("€"),
        "gbp" => Some("£"),
        "jpy" => Some("¥"),
        _ => None,
    }
}

fn format_price(currency: &str, price: f64) -> String {
    if !price.is_finite() {
        return "n/a".to_string();
    }
    let amount = format_amount(price);
    match currency_symbol(currency) {
        Some(symbol) => format!("{symbol}{amount}"),
        None => amount,
    }
}

/// Thousands separators, 2 to 6 decimals with trailing zeros trimmed
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }

    let formatted = format!("{:.6}", value.abs());
    let (int_part, frac_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), ""));

    let mut frac = frac_part.trim_end_matches('0').to_string();
    while frac.len() < 2 {
        frac.push('0');
    }

    let is_zero = formatted.bytes().all(|b| b == b'0' || b == b'.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    format!("{sign}{}.{frac}", group_thousands(int_part))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
