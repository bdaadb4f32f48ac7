//! Application identity

use serde::{Deserialize, Serialize};

/// Name and deployment environment of the running service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Environment (development, github-actions, production...)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "ticker-bot".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Create a config for the given application name
    pub fn new(app_name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            environment: environment.into(),
        }
    }
}
