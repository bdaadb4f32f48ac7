//! Shared utilities for ticker-bot
//!
//! This crate provides the ambient pieces used by the ticker binaries:
//! logging setup and the application identity reported by the health surface.

pub mod config;
pub mod logging;

pub use config::Config;
pub use logging::{LogFormat, init_tracing};
