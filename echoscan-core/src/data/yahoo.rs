//! Yahoo Finance data provider.
//!
//! Fetches intraday candles from Yahoo's v8 chart API. Handles rate limiting,
//! retries with exponential backoff, response parsing, and the circuit breaker.
//! Timeframes Yahoo does not serve natively are resampled from the largest
//! native interval that divides them.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! The CSV replay provider is the fallback when Yahoo is unavailable.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::circuit_breaker::CircuitBreaker;
use super::provider::{keep_trailing, DataError, DataSource, FetchResult, MarketDataProvider};
use super::resample::{base_timeframe, resample};
use crate::domain::{Candle, Timeframe};

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Intervals the chart API serves directly.
const NATIVE: [Timeframe; 7] = [
    Timeframe::M1,
    Timeframe::M2,
    Timeframe::M5,
    Timeframe::M15,
    Timeframe::M30,
    Timeframe::H1,
    Timeframe::D1,
];

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Yahoo Finance data provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
    symbol_map: HashMap<String, String>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    /// Build a provider whose requests time out after `timeout`.
    pub fn new(circuit_breaker: Arc<CircuitBreaker>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: DEFAULT_BASE_URL.to_string(),
            symbol_map: HashMap::new(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Map configured instrument ids to Yahoo tickers (e.g. `EURUSD` → `EURUSD=X`).
    pub fn with_symbol_map(mut self, symbol_map: HashMap<String, String>) -> Self {
        self.symbol_map = symbol_map;
        self
    }

    pub fn with_retry(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Yahoo ticker for an instrument id; unmapped ids are used as-is.
    pub fn ticker<'a>(&'a self, instrument: &'a str) -> &'a str {
        self.symbol_map
            .get(instrument)
            .map(String::as_str)
            .unwrap_or(instrument)
    }

    fn interval(tf: Timeframe) -> Option<&'static str> {
        match tf {
            Timeframe::M1 => Some("1m"),
            Timeframe::M2 => Some("2m"),
            Timeframe::M5 => Some("5m"),
            Timeframe::M15 => Some("15m"),
            Timeframe::M30 => Some("30m"),
            Timeframe::H1 => Some("60m"),
            Timeframe::D1 => Some("1d"),
            _ => None,
        }
    }

    /// Smallest chart range that covers `count` target candles, capped at
    /// what Yahoo allows for the base interval.
    ///
    /// Span is tripled to ride over weekends and session gaps.
    fn range_for(base: Timeframe, target: Timeframe, count: usize) -> &'static str {
        const RANGES: [(&str, i64); 8] = [
            ("1d", 1),
            ("5d", 5),
            ("1mo", 30),
            ("3mo", 90),
            ("6mo", 180),
            ("1y", 365),
            ("2y", 730),
            ("10y", 3650),
        ];
        let max_days = match base {
            Timeframe::M1 => 5,
            Timeframe::D1 => 3650,
            Timeframe::H1 => 365,
            _ => 30,
        };
        let wanted_days = (count as i64 * i64::from(target.minutes()) * 3) / (24 * 60) + 1;
        RANGES
            .iter()
            .filter(|(_, days)| *days <= max_days)
            .find(|(_, days)| *days >= wanted_days)
            .or_else(|| RANGES.iter().filter(|(_, days)| *days <= max_days).last())
            .map(|(range, _)| *range)
            .unwrap_or("5d")
    }

    /// Build the chart API URL for a ticker, interval and range.
    fn chart_url(&self, ticker: &str, interval: &str, range: &str) -> String {
        format!(
            "{}/v8/finance/chart/{ticker}?range={range}&interval={interval}&includePrePost=false",
            self.base_url
        )
    }

    /// Parse the chart API response into candles, dropping incomplete rows.
    fn parse_response(instrument: &str, resp: ChartResponse) -> Result<Vec<Candle>, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::SymbolNotFound {
                        instrument: instrument.to_string(),
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::ResponseFormatChanged("no timestamps".into()))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut candles = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let time = DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
            })?;

            // The forming minute and session gaps come back as nulls.
            let (Some(open), Some(close)) = (
                quote.open.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
            ) else {
                continue;
            };
            let high = quote.high.get(i).copied().flatten().unwrap_or(open.max(close));
            let low = quote.low.get(i).copied().flatten().unwrap_or(open.min(close));
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);

            candles.push(Candle {
                time,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        if candles.is_empty() {
            return Err(DataError::SymbolNotFound {
                instrument: instrument.to_string(),
            });
        }

        Ok(candles)
    }

    /// Execute a single chart request with retry and circuit breaker logic.
    fn fetch_with_retry(&self, instrument: &str, url: &str) -> Result<Vec<Candle>, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        // IP ban
                        self.circuit_breaker.trip();
                        return Err(DataError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(DataError::SymbolNotFound {
                            instrument: instrument.to_string(),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error =
                            Some(DataError::Other(format!("HTTP {status} for {instrument}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse response for {instrument}: {e}"
                        ))
                    })?;

                    let candles = Self::parse_response(instrument, chart)?;
                    self.circuit_breaker.record_success();
                    return Ok(candles);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_window(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<FetchResult, DataError> {
        let base = base_timeframe(timeframe, &NATIVE).ok_or_else(|| {
            DataError::UnsupportedTimeframe {
                provider: self.name().to_string(),
                timeframe,
            }
        })?;
        let interval = Self::interval(base).ok_or_else(|| DataError::UnsupportedTimeframe {
            provider: self.name().to_string(),
            timeframe,
        })?;
        let range = Self::range_for(base, timeframe, count);
        let url = self.chart_url(self.ticker(instrument), interval, range);
        debug!(instrument, %timeframe, interval, range, "fetching chart");

        let raw = self.fetch_with_retry(instrument, &url)?;
        let candles = if base == timeframe {
            raw
        } else {
            resample(&raw, timeframe)
        };

        Ok(FetchResult {
            instrument: instrument.to_string(),
            timeframe,
            candles: keep_trailing(candles, count),
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
