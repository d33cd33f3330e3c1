//! Candle resampling: aggregate fine candles into a coarser timeframe.
//!
//! Needed for granularities a feed does not serve natively (Yahoo has no
//! 3-, 4-, 6-, 10- or 12-minute interval). Buckets are aligned to multiples of
//! the target length since the Unix epoch, so M12 buckets start at :00, :12,
//! :24 and so on within each UTC day.

use chrono::{DateTime, Utc};

use crate::domain::{Candle, Timeframe};

/// Aggregate chronological candles into `target` buckets.
///
/// Per bucket: first open, max high, min low, last close, summed volume.
/// Void candles are skipped. The last bucket may be partial (still forming),
/// matching what a terminal reports for the current candle.
pub fn resample(candles: &[Candle], target: Timeframe) -> Vec<Candle> {
    let step = target.seconds();
    let mut out: Vec<Candle> = Vec::new();
    let mut current_bucket: Option<i64> = None;

    for candle in candles.iter().filter(|c| !c.is_void()) {
        let bucket = candle.time.timestamp().div_euclid(step) * step;
        if current_bucket == Some(bucket) {
            if let Some(agg) = out.last_mut() {
                agg.high = agg.high.max(candle.high);
                agg.low = agg.low.min(candle.low);
                agg.close = candle.close;
                agg.volume = agg.volume.saturating_add(candle.volume);
                continue;
            }
        }
        let time = DateTime::<Utc>::from_timestamp(bucket, 0).unwrap_or(candle.time);
        out.push(Candle { time, ..*candle });
        current_bucket = Some(bucket);
    }

    out
}

/// Largest of `native` whose length divides `target`, if any.
pub fn base_timeframe(target: Timeframe, native: &[Timeframe]) -> Option<Timeframe> {
    native
        .iter()
        .copied()
        .filter(|tf| tf.minutes() <= target.minutes() && target.minutes() % tf.minutes() == 0)
        .max_by_key(|tf| tf.minutes())
}
