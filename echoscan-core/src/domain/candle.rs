//! Candle: one sampled price bar for an instrument at a timeframe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candle. Only `open` and `close` feed the pattern core; the rest is
/// carried for resampling and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Candle {
    /// Returns true if the open or close price is missing (NaN).
    ///
    /// A void candle cannot be classified, so a window containing one is
    /// treated as malformed by the encoder.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low and both bracket open/close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() || self.high.is_nan() || self.low.is_nan() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}
