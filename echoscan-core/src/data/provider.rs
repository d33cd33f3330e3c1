//! Market data provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over candle sources (Yahoo Finance,
//! CSV replay, synthetic random walk) so the scan loop can swap them and tests
//! can mock them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Candle, Timeframe};

/// Structured error types for data operations.
///
/// Every variant means "no window for this pair this cycle"; none is fatal.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("instrument not found: {instrument}")]
    SymbolNotFound { instrument: String },

    #[error("timeframe {timeframe} is not supported by {provider}")]
    UnsupportedTimeframe {
        provider: String,
        timeframe: Timeframe,
    },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a successful window fetch for one instrument/timeframe pair.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub instrument: String,
    pub timeframe: Timeframe,
    /// Chronological, at most the requested count, most recent last.
    pub candles: Vec<Candle>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvReplay,
    Synthetic,
}

/// Trait for candle sources.
///
/// Implementations return the trailing `count` candles for a pair. They must
/// be shareable across threads so the scan loop can fan out over pairs.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the most recent `count` candles, oldest first.
    fn fetch_window(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}

/// Keep only the last `count` candles.
pub fn keep_trailing(mut candles: Vec<Candle>, count: usize) -> Vec<Candle> {
    if candles.len() > count {
        candles.drain(..candles.len() - count);
    }
    candles
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candles(n: usize) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| Candle {
                time: start + Duration::minutes(i as i64),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: i as u64,
            })
            .collect()
    }

    #[test]
    fn keep_trailing_drops_oldest() {
        let kept = keep_trailing(candles(10), 3);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].volume, 7);
        assert_eq!(kept[2].volume, 9);
    }

    #[test]
    fn keep_trailing_short_window_unchanged() {
        assert_eq!(keep_trailing(candles(2), 5).len(), 2);
        assert!(keep_trailing(candles(4), 0).is_empty());
    }

    #[test]
    fn errors_display_context() {
        let err = DataError::UnsupportedTimeframe {
            provider: "csv".into(),
            timeframe: Timeframe::M12,
        };
        assert_eq!(err.to_string(), "timeframe M12 is not supported by csv");
    }
}
