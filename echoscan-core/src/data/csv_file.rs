//! CSV replay provider.
//!
//! Reads candle files laid out as `<dir>/<INSTRUMENT>_<TF>.csv`, e.g.
//! `data/EURUSD_M5.csv`, with a header row and columns
//! `time,open,high,low,close[,volume]`. `time` is RFC 3339 or Unix seconds.
//! When the exact timeframe file is missing, finer files that divide the
//! requested timeframe are resampled.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::provider::{keep_trailing, DataError, DataSource, FetchResult, MarketDataProvider};
use super::resample::resample;
use crate::domain::{Candle, Timeframe};

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<u64>,
}

/// Offline candle source backed by CSV files.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_path(&self, instrument: &str, timeframe: Timeframe) -> PathBuf {
        self.dir.join(format!("{instrument}_{timeframe}.csv"))
    }

    fn read_file(path: &Path) -> Result<Vec<Candle>, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| csv_error(path, e))?;

        let mut candles = Vec::new();
        for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| csv_error(path, e))?;
            let time = parse_time(&row.time).ok_or_else(|| {
                DataError::Parse(format!(
                    "{}: row {}: invalid time '{}'",
                    path.display(),
                    line + 1,
                    row.time
                ))
            })?;
            candles.push(Candle {
                time,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume.unwrap_or(0),
            });
        }

        candles.sort_by_key(|c| c.time);
        Ok(candles)
    }
}

fn csv_error(path: &Path, err: csv::Error) -> DataError {
    if err.is_io_error() {
        if let csv::ErrorKind::Io(io) = err.into_kind() {
            return DataError::Io(io);
        }
        return DataError::Other(format!("{}: I/O error", path.display()));
    }
    DataError::Parse(format!("{}: {err}", path.display()))
}

/// Parse RFC 3339 or Unix-seconds timestamps.
fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::<Utc>::from_timestamp(secs, 0);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl MarketDataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_replay"
    }

    fn fetch_window(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<FetchResult, DataError> {
        let exact = self.file_path(instrument, timeframe);
        let candles = if exact.exists() {
            Self::read_file(&exact)?
        } else {
            // Finest first, so the resampled window is as complete as possible.
            let base = Timeframe::ALL
                .into_iter()
                .filter(|tf| tf.minutes() < timeframe.minutes())
                .filter(|tf| timeframe.minutes() % tf.minutes() == 0)
                .find(|tf| self.file_path(instrument, *tf).exists());
            match base {
                Some(base) => resample(&Self::read_file(&self.file_path(instrument, base))?, timeframe),
                None => {
                    return Err(DataError::SymbolNotFound {
                        instrument: instrument.to_string(),
                    })
                }
            }
        };

        Ok(FetchResult {
            instrument: instrument.to_string(),
            timeframe,
            candles: keep_trailing(candles, count),
            source: DataSource::CsvReplay,
        })
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn reads_exact_file_and_keeps_trailing_window() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "EURUSD_M5.csv",
            "time,open,high,low,close,volume\n\
             2024-06-03T09:10:00Z,1.2,1.3,1.1,1.1,5\n\
             2024-06-03T09:00:00Z,1.0,1.2,1.0,1.1,5\n\
             2024-06-03T09:05:00Z,1.1,1.2,1.1,1.2,5\n",
        );
        let provider = CsvProvider::new(dir.path());
        let result = provider.fetch_window("EURUSD", Timeframe::M5, 2).unwrap();
        assert_eq!(result.source, DataSource::CsvReplay);
        assert_eq!(result.candles.len(), 2);
        // Sorted chronologically before trimming.
        assert_eq!(
            result.candles[0].time,
            Utc.with_ymd_and_hms(2024, 6, 3, 9, 5, 0).unwrap()
        );
        assert_eq!(result.candles[1].close, 1.1);
    }

    #[test]
    fn accepts_unix_seconds_without_volume() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "BTCUSD_H1.csv",
            "time,open,high,low,close\n1717405200,10,12,9,11\n",
        );
        let result = CsvProvider::new(dir.path())
            .fetch_window("BTCUSD", Timeframe::H1, 200)
            .unwrap();
        assert_eq!(result.candles.len(), 1);
        assert_eq!(result.candles[0].volume, 0);
    }

    #[test]
    fn resamples_from_finer_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from("time,open,high,low,close,volume\n");
        for minute in 0..6 {
            body.push_str(&format!(
                "2024-06-03T09:0{minute}:00Z,1.0,1.5,0.5,1.{minute},1\n"
            ));
        }
        write(dir.path(), "GBPUSD_M1.csv", &body);

        let result = CsvProvider::new(dir.path())
            .fetch_window("GBPUSD", Timeframe::M3, 200)
            .unwrap();
        assert_eq!(result.candles.len(), 2);
        assert_eq!(result.candles[1].close, 1.5);
        assert_eq!(result.candles[1].volume, 3);
    }

    #[test]
    fn missing_instrument_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvProvider::new(dir.path())
            .fetch_window("NOPE", Timeframe::M5, 10)
            .unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn bad_time_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "EURUSD_M5.csv",
            "time,open,high,low,close\nyesterday,1,1,1,1\n",
        );
        let err = CsvProvider::new(dir.path())
            .fetch_window("EURUSD", Timeframe::M5, 10)
            .unwrap_err();
        assert!(matches!(err, DataError::Parse(_)));
    }

    #[test]
    fn availability_follows_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CsvProvider::new(dir.path()).is_available());
        assert!(!CsvProvider::new(dir.path().join("missing")).is_available());
    }
}
