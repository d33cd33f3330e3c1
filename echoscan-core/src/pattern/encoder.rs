//! Sequence encoder: candle window → symbol sequence.

use crate::domain::{Candle, Symbol, SymbolSequence};

/// Encode a chronological candle window, one symbol per candle.
///
/// A window that contains a void candle is malformed and yields an empty
/// sequence, the same as an empty window. Callers skip empty sequences.
pub fn encode(candles: &[Candle]) -> SymbolSequence {
    if candles.iter().any(Candle::is_void) {
        return SymbolSequence::default();
    }
    candles.iter().map(Symbol::from_candle).collect()
}
