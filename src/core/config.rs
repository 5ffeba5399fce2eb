//! Configuration - the market registry consumed at startup
//!
//! Loads from a TOML file. Each `[[markets]]` entry describes one feed;
//! a malformed entry is fatal for that market only, never for the process.

use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::core::types::{Market, MarketKind, Venue};
use crate::core::{Error, Result};

/// Top-level config file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,

    /// Configured markets, one streaming session each.
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// tracing filter directive (e.g. "info", "depthwire=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between top-of-book log lines (0 disables the monitor)
    #[serde(default = "default_bbo_log_secs")]
    pub bbo_log_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bbo_log_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            bbo_log_secs: default_bbo_log_secs(),
        }
    }
}

/// One market descriptor as written in the config file. Venue and kind are
/// kept as strings here so a typo rejects this market, not the whole file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub exchange: String,
    pub kind: String,
    pub base: String,
    pub quote: String,
    pub ws_url: String,
    pub venue: String,
    #[serde(default = "default_ping")]
    pub ping: bool,
}

fn default_ping() -> bool {
    true
}

impl MarketConfig {
    /// Validate and freeze into an immutable `Market` descriptor.
    pub fn to_market(&self) -> Result<Market> {
        let kind: MarketKind = self.kind.parse()?;
        let venue: Venue = self.venue.parse()?;

        for (field, value) in [
            ("exchange", &self.exchange),
            ("base", &self.base),
            ("quote", &self.quote),
        ] {
            if !valid_symbol(value) {
                return Err(Error::Config(format!(
                    "market field '{field}' must be non-empty alphanumeric, got '{value}'"
                )));
            }
        }

        Url::parse(&self.ws_url)
            .map_err(|e| Error::Config(format!("bad ws_url '{}': {e}", self.ws_url)))?;

        Ok(Market {
            exchange: self.exchange.to_uppercase(),
            kind,
            base: self.base.to_uppercase(),
            quote: self.quote.to_uppercase(),
            ws_url: self.ws_url.clone(),
            venue,
            ping_required: self.ping,
        })
    }
}

// Tag grammar: `<EXCHANGE>.<TYPE>:<BASE>-<QUOTE>` leaves no room for
// dots, colons, or hyphens inside a field.
fn valid_symbol(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config: {e}")))?;

        toml::from_str(&content).map_err(|e| Error::Config(format!("failed to parse config: {e}")))
    }
}
