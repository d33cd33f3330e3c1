//! Signal composer: threshold a match and build the forecast signal.

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, SymbolSequence, Timeframe};

use super::matcher::{find_tail_repeat, Match};

/// Default minimum combo length for a signal.
pub const DEFAULT_MIN_COMBO_LEN: usize = 18;

/// Default number of forecast labels taken after the anchor occurrence.
pub const DEFAULT_FORECAST_LEN: usize = 10;

/// An accepted match, ready to render and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub instrument: String,
    pub timeframe: Timeframe,
    /// The recurring tail; its length is the signal strength.
    pub combo: SymbolSequence,
    /// Start of the prior occurrence within the window.
    pub anchor: usize,
    /// Length N of the analysed window.
    pub window_len: usize,
    /// What followed the prior occurrence, oldest first.
    pub forecast: Vec<Direction>,
}

impl Signal {
    pub fn strength(&self) -> usize {
        self.combo.len()
    }

    /// How far back the anchor sits from the end of the window, in candles.
    pub fn code(&self) -> usize {
        self.window_len - self.anchor
    }
}

/// Applies the acceptance threshold and derives the forecast template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalComposer {
    pub min_combo_len: usize,
    pub forecast_len: usize,
}

impl Default for SignalComposer {
    fn default() -> Self {
        Self {
            min_combo_len: DEFAULT_MIN_COMBO_LEN,
            forecast_len: DEFAULT_FORECAST_LEN,
        }
    }
}

impl SignalComposer {
    pub fn new(min_combo_len: usize, forecast_len: usize) -> Self {
        Self {
            min_combo_len,
            forecast_len,
        }
    }

    /// True if the match is long enough to become a signal.
    pub fn accepts(&self, found: &Match) -> bool {
        found.combo_len() >= self.min_combo_len
    }

    /// Build a signal from a match against `seq`, or `None` below threshold.
    ///
    /// The forecast covers `[anchor + L, anchor + L + forecast_len)`, clipped
    /// to the end of the sequence.
    pub fn compose(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        seq: &SymbolSequence,
        found: &Match,
    ) -> Option<Signal> {
        if !self.accepts(found) {
            return None;
        }

        let start = found.continuation_start().min(seq.len());
        let end = start.saturating_add(self.forecast_len).min(seq.len());
        let forecast = seq[start..end].iter().map(|s| s.direction()).collect();

        Some(Signal {
            instrument: instrument.to_string(),
            timeframe,
            combo: found.combo.clone(),
            anchor: found.anchor,
            window_len: seq.len(),
            forecast,
        })
    }

    /// Matcher + composer in one step. Empty sequences never produce a signal.
    pub fn analyze(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        seq: &SymbolSequence,
    ) -> Option<Signal> {
        let found = find_tail_repeat(seq)?;
        self.compose(instrument, timeframe, seq, &found)
    }
}
