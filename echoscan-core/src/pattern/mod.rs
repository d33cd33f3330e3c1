//! Pattern core: encoder → matcher → composer, plus alert rendering.
//!
//! Everything here is pure and stateless, so a scan loop may call it from
//! any number of threads.

pub mod composer;
pub mod encoder;
pub mod matcher;
pub mod render;

pub use composer::{Signal, SignalComposer, DEFAULT_FORECAST_LEN, DEFAULT_MIN_COMBO_LEN};
pub use encoder::encode;
pub use matcher::{find_tail_repeat, find_tail_repeat_naive, Match};
pub use render::{escape_markdown, AlertRenderer, Locale};
