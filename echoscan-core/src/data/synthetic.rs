//! Synthetic candle source for demos and offline runs.
//!
//! Produces a tick-quantised random walk seeded from the instrument,
//! timeframe and a user seed, so the same pair always yields the same window.
//! Results are clearly fake and tagged `DataSource::Synthetic`.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataError, DataSource, FetchResult, MarketDataProvider};
use crate::domain::{Candle, Timeframe};

/// Price increment; flat candles occur when a candle moves zero ticks.
const TICK: f64 = 0.0001;

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: u64,
    end: Option<DateTime<Utc>>,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self { seed, end: None }
    }

    /// Pin the timestamp of the last candle (defaults to the current time).
    pub fn with_end_time(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    fn rng_for(&self, instrument: &str, timeframe: Timeframe) -> StdRng {
        let key = format!("{instrument}|{timeframe}|{}", self.seed);
        let seed: [u8; 32] = *blake3::hash(key.as_bytes()).as_bytes();
        StdRng::from_seed(seed)
    }

    /// Generate `count` candles ending at the aligned end time.
    pub fn generate(&self, instrument: &str, timeframe: Timeframe, count: usize) -> Vec<Candle> {
        let mut rng = self.rng_for(instrument, timeframe);
        let step = timeframe.seconds();
        let end = self.end.unwrap_or_else(Utc::now).timestamp().div_euclid(step) * step;
        let first = end - step * (count as i64 - 1).max(0);

        let mut ticks: i64 = rng.gen_range(9_000..13_000);
        (0..count)
            .map(|i| {
                let open = ticks as f64 * TICK;
                ticks = (ticks + rng.gen_range(-3..=3)).max(1);
                let close = ticks as f64 * TICK;
                let wick_up = rng.gen_range(0..=2u32) as f64 * TICK;
                let wick_down = rng.gen_range(0..=2u32) as f64 * TICK;
                let time = DateTime::<Utc>::from_timestamp(first + step * i as i64, 0)
                    .unwrap_or_else(Utc::now);
                Candle {
                    time,
                    open,
                    high: open.max(close) + wick_up,
                    low: open.min(close) - wick_down,
                    close,
                    volume: rng.gen_range(50..5_000),
                }
            })
            .collect()
    }
}

impl MarketDataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_window(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<FetchResult, DataError> {
        Ok(FetchResult {
            instrument: instrument.to_string(),
            timeframe,
            candles: self.generate(instrument, timeframe, count),
            source: DataSource::Synthetic,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
