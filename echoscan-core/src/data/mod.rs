//! Market data: provider trait, feeds, and the shared plumbing behind them.

pub mod circuit_breaker;
pub mod csv_file;
pub mod provider;
pub mod resample;
pub mod synthetic;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use csv_file::CsvProvider;
pub use provider::{keep_trailing, DataError, DataSource, FetchResult, MarketDataProvider};
pub use resample::{base_timeframe, resample};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
