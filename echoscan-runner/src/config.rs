//! Serializable scan configuration (`echoscan.toml`).
//!
//! Every key has a default, so an empty file is a valid configuration that
//! scans the standard forex watchlist on Yahoo and prints alerts to stdout.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use echoscan_core::domain::Timeframe;
use echoscan_core::pattern::{Locale, DEFAULT_FORECAST_LEN, DEFAULT_MIN_COMBO_LEN};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_WINDOW_SIZE: usize = 200;
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 60;

/// Environment variable consulted when a Telegram notifier has no token.
pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable consulted when a Telegram notifier has no chat id.
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

const DEFAULT_INSTRUMENTS: [&str; 20] = [
    "EURUSD", "GBPUSD", "USDJPY", "AUDCAD", "AUDJPY", "AUDUSD", "EURAUD", "EURCAD", "EURCHF",
    "EURGBP", "EURJPY", "GBPAUD", "GBPCHF", "GBPJPY", "GBPNZD", "NZDJPY", "NZDUSD", "USDCAD",
    "USDCHF", "BTCUSDT",
];

const DEFAULT_TIMEFRAMES: [Timeframe; 7] = [
    Timeframe::M3,
    Timeframe::M4,
    Timeframe::M5,
    Timeframe::M6,
    Timeframe::M10,
    Timeframe::M12,
    Timeframe::M15,
];

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level scan configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Instrument ids, as the provider (or its symbol map) knows them.
    pub instruments: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    /// Seconds between the starts of consecutive cycles.
    pub scan_interval_secs: u64,
    /// Shortest combo that becomes a signal.
    pub min_combo_len: usize,
    /// Forecast labels taken after the prior occurrence.
    pub forecast_len: usize,
    /// Candles fetched per pair.
    pub window_size: usize,
    /// Pairs evaluated in parallel; 1 keeps the loop single-threaded.
    pub workers: usize,
    pub provider: ProviderConfig,
    pub notifiers: Vec<NotifierConfig>,
    pub alert: AlertConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            instruments: DEFAULT_INSTRUMENTS.iter().map(|s| s.to_string()).collect(),
            timeframes: DEFAULT_TIMEFRAMES.to_vec(),
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            min_combo_len: DEFAULT_MIN_COMBO_LEN,
            forecast_len: DEFAULT_FORECAST_LEN,
            window_size: DEFAULT_WINDOW_SIZE,
            workers: 1,
            provider: ProviderConfig::default(),
            notifiers: vec![NotifierConfig::Console],
            alert: AlertConfig::default(),
        }
    }
}

/// Market data source selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// Yahoo Finance chart API.
    Yahoo {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
        #[serde(default = "default_max_retries")]
        max_retries: u32,
        /// Circuit breaker cooldown after a ban or repeated failures.
        #[serde(default = "default_cooldown_secs")]
        cooldown_secs: u64,
        /// Instrument id → Yahoo ticker.
        #[serde(default = "default_symbol_map")]
        symbol_map: BTreeMap<String, String>,
    },

    /// CSV replay from `<dir>/<INSTRUMENT>_<TF>.csv`.
    Csv { dir: PathBuf },

    /// Deterministic random walk.
    Synthetic {
        #[serde(default = "default_seed")]
        seed: u64,
    },
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Yahoo {
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            cooldown_secs: default_cooldown_secs(),
            symbol_map: default_symbol_map(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_cooldown_secs() -> u64 {
    30 * 60
}

fn default_seed() -> u64 {
    42
}

/// Yahoo tickers for the default watchlist: forex pairs take the `=X`
/// suffix, the crypto pair maps to its USD quote.
fn default_symbol_map() -> BTreeMap<String, String> {
    DEFAULT_INSTRUMENTS
        .iter()
        .map(|id| {
            let ticker = match *id {
                "BTCUSDT" => "BTC-USD".to_string(),
                fx => format!("{fx}=X"),
            };
            (id.to_string(), ticker)
        })
        .collect()
}

/// Alert delivery target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NotifierConfig {
    /// Telegram Bot API `sendMessage`.
    Telegram {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bot_token: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chat_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_base: Option<String>,
    },

    /// Print alerts to stdout.
    Console,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub locale: Locale,
}

impl ScanConfig {
    /// Load, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without validating it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Fill missing Telegram secrets from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an
    /// explicit lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for notifier in &mut self.notifiers {
            if let NotifierConfig::Telegram {
                bot_token, chat_id, ..
            } = notifier
            {
                if bot_token.is_none() {
                    *bot_token = lookup(ENV_TELEGRAM_TOKEN).filter(|v| !v.is_empty());
                }
                if chat_id.is_none() {
                    *chat_id = lookup(ENV_TELEGRAM_CHAT_ID).filter(|v| !v.is_empty());
                }
            }
        }
    }

    /// Reject configurations the scan loop cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };

        if self.instruments.is_empty() {
            return invalid("instruments must not be empty".into());
        }
        if self.timeframes.is_empty() {
            return invalid("timeframes must not be empty".into());
        }
        if let Some(blank) = self.instruments.iter().find(|i| i.trim().is_empty()) {
            return invalid(format!("blank instrument id '{blank}'"));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.instruments.iter().find(|i| !seen.insert(i.as_str())) {
            return invalid(format!("duplicate instrument '{dup}'"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.timeframes.iter().find(|tf| !seen.insert(**tf)) {
            return invalid(format!("duplicate timeframe '{dup}'"));
        }

        for (name, value) in [
            ("window_size", self.window_size as u64),
            ("min_combo_len", self.min_combo_len as u64),
            ("forecast_len", self.forecast_len as u64),
            ("scan_interval_secs", self.scan_interval_secs),
            ("workers", self.workers as u64),
        ] {
            if value == 0 {
                return invalid(format!("{name} must be greater than 0"));
            }
        }

        if let ProviderConfig::Yahoo { timeout_secs: 0, .. } = self.provider {
            return invalid("provider.timeout_secs must be greater than 0".into());
        }

        for notifier in &self.notifiers {
            if let NotifierConfig::Telegram {
                bot_token, chat_id, ..
            } = notifier
            {
                if bot_token.as_deref().map_or(true, str::is_empty) {
                    return invalid(format!(
                        "telegram notifier needs bot_token (or {ENV_TELEGRAM_TOKEN})"
                    ));
                }
                if chat_id.as_deref().map_or(true, str::is_empty) {
                    return invalid(format!(
                        "telegram notifier needs chat_id (or {ENV_TELEGRAM_CHAT_ID})"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Every (instrument, timeframe) pair, instrument-major.
    pub fn pairs(&self) -> Vec<(String, Timeframe)> {
        self.instruments
            .iter()
            .flat_map(|i| self.timeframes.iter().map(move |tf| (i.clone(), *tf)))
            .collect()
    }
}
