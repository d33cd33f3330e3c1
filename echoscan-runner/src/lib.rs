//! Echoscan Runner: configuration, alert notifiers, and the periodic scan loop.
//!
//! This crate builds on `echoscan-core` to provide:
//! - TOML configuration with defaults and environment overrides
//! - Provider and notifier construction from configuration
//! - Notifiers (Telegram Bot API, console)
//! - The scan loop over instruments × timeframes, optionally parallel

pub mod config;
pub mod factory;
pub mod notify;
pub mod scanner;

pub use config::{AlertConfig, ConfigError, NotifierConfig, ProviderConfig, ScanConfig};
pub use factory::{build_notifiers, build_provider, NotifierBuildError};
pub use notify::{ConsoleNotifier, Notifier, NotifyError, TelegramNotifier};
pub use scanner::{CycleReport, PairOutcome, ScanError, ScanSummary, Scanner};
