//! Domain types for echoscan

pub mod candle;
pub mod symbol;
pub mod timeframe;

pub use candle::Candle;
pub use symbol::{Direction, Symbol, SymbolParseError, SymbolSequence};
pub use timeframe::{Timeframe, TimeframeParseError};

/// Instrument identifier as configured (e.g. `EURUSD`).
pub type InstrumentId = String;
