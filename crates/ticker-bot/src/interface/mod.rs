//! Presentation of price quotes

pub mod formatter;

pub use formatter::{Formatter, HtmlFormatter, format_amount};
