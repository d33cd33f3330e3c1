//! Build providers and notifiers from configuration.

use std::sync::Arc;
use std::time::Duration;

use echoscan_core::data::{
    CircuitBreaker, CsvProvider, DataError, MarketDataProvider, SyntheticProvider, YahooProvider,
};

use crate::config::{ConfigError, NotifierConfig, ProviderConfig};
use crate::notify::{ConsoleNotifier, Notifier, NotifyError, TelegramNotifier};

pub fn build_provider(config: &ProviderConfig) -> Result<Box<dyn MarketDataProvider>, DataError> {
    match config {
        ProviderConfig::Yahoo {
            base_url,
            timeout_secs,
            max_retries,
            cooldown_secs,
            symbol_map,
        } => {
            let breaker = Arc::new(CircuitBreaker::new(Duration::from_secs(*cooldown_secs)));
            let mut yahoo = YahooProvider::new(breaker, Duration::from_secs(*timeout_secs))?
                .with_retry(*max_retries, Duration::from_millis(500))
                .with_symbol_map(symbol_map.clone().into_iter().collect());
            if let Some(url) = base_url {
                yahoo = yahoo.with_base_url(url.as_str());
            }
            Ok(Box::new(yahoo))
        }
        ProviderConfig::Csv { dir } => Ok(Box::new(CsvProvider::new(dir.clone()))),
        ProviderConfig::Synthetic { seed } => Ok(Box::new(SyntheticProvider::new(*seed))),
    }
}

/// Errors building notifiers.
#[derive(Debug, thiserror::Error)]
pub enum NotifierBuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Notifiers in configuration order. Secrets must already be resolved
/// (see `ScanConfig::apply_env_overrides`).
pub fn build_notifiers(
    configs: &[NotifierConfig],
) -> Result<Vec<Box<dyn Notifier>>, NotifierBuildError> {
    configs
        .iter()
        .map(|config| -> Result<Box<dyn Notifier>, NotifierBuildError> {
            match config {
                NotifierConfig::Telegram {
                    bot_token,
                    chat_id,
                    api_base,
                } => {
                    let (Some(token), Some(chat)) = (bot_token, chat_id) else {
                        return Err(ConfigError::Invalid(
                            "telegram notifier is missing bot_token or chat_id".into(),
                        )
                        .into());
                    };
                    let mut telegram = TelegramNotifier::new(token.as_str(), chat.as_str())?;
                    if let Some(base) = api_base {
                        telegram = telegram.with_api_base(base.as_str());
                    }
                    Ok(Box::new(telegram))
                }
                NotifierConfig::Console => Ok(Box::new(ConsoleNotifier::stdout())),
            }
        })
        .collect()
}
