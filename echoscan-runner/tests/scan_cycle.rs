//! Integration tests for the scan loop with scripted providers and
//! recording notifiers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use echoscan_core::data::{DataError, DataSource, FetchResult, MarketDataProvider};
use echoscan_core::domain::{Candle, Timeframe};
use echoscan_runner::{
    Notifier, NotifierConfig, NotifyError, PairOutcome, ProviderConfig, ScanConfig, Scanner,
};

// ── Helpers ──────────────────────────────────────────────────────────

const COMBO: &str = "UUDUDDUDUUUDDUDUDD";

/// 200-symbol window whose 18-long tail recurs at index 1.
fn signal_pattern() -> String {
    format!("F{COMBO}UDUDUDUDUD{}U{COMBO}", "F".repeat(152))
}

/// 200-symbol window with no recurring tail at all.
fn quiet_pattern() -> String {
    format!("{}D", "U".repeat(199))
}

fn candles(pattern: &str) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    pattern
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let close = match c {
                'U' => 1.2,
                'D' => 0.8,
                _ => 1.0,
            };
            Candle {
                time: start + chrono::Duration::minutes(i as i64),
                open: 1.0,
                high: 1.3,
                low: 0.7,
                close,
                volume: 1,
            }
        })
        .collect()
}

/// Serves fixed patterns per pair; unknown pairs are "not found".
struct ScriptedProvider {
    windows: HashMap<(String, Timeframe), String>,
    available: bool,
    fetches: AtomicUsize,
}

impl ScriptedProvider {
    fn new(entries: &[(&str, Timeframe, String)]) -> Self {
        Self {
            windows: entries
                .iter()
                .map(|(i, tf, p)| ((i.to_string(), *tf), p.clone()))
                .collect(),
            available: true,
            fetches: AtomicUsize::new(0),
        }
    }
}

impl MarketDataProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch_window(
        &self,
        instrument: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<FetchResult, DataError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let pattern = self
            .windows
            .get(&(instrument.to_string(), timeframe))
            .ok_or_else(|| DataError::SymbolNotFound {
                instrument: instrument.to_string(),
            })?;
        let mut candles = candles(pattern);
        let excess = candles.len().saturating_sub(count);
        candles.drain(..excess);
        Ok(FetchResult {
            instrument: instrument.to_string(),
            timeframe,
            candles,
            source: DataSource::Synthetic,
        })
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

#[derive(Clone, Default)]
struct Recording(Arc<Mutex<Vec<String>>>);

impl Recording {
    fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for Recording {
    fn name(&self) -> &str {
        "recording"
    }

    fn destination(&self) -> &str {
        "memory"
    }

    fn send(&self, message: &str) -> Result<(), NotifyError> {
        self.0.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

struct Failing;

impl Notifier for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn destination(&self) -> &str {
        "nowhere"
    }

    fn send(&self, _message: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("connection refused".into()))
    }
}

fn config(instruments: &[&str], timeframes: &[Timeframe], workers: usize) -> ScanConfig {
    ScanConfig {
        instruments: instruments.iter().map(|s| s.to_string()).collect(),
        timeframes: timeframes.to_vec(),
        workers,
        scan_interval_secs: 60,
        provider: ProviderConfig::Synthetic { seed: 0 },
        notifiers: vec![NotifierConfig::Console],
        ..ScanConfig::default()
    }
}

fn scripted() -> ScriptedProvider {
    ScriptedProvider::new(&[
        ("EURUSD", Timeframe::M5, signal_pattern()),
        ("EURUSD", Timeframe::M15, quiet_pattern()),
        ("GBPUSD", Timeframe::M5, quiet_pattern()),
        ("GBPUSD", Timeframe::M15, signal_pattern()),
    ])
}

// ── Cycle behaviour ──────────────────────────────────────────────────

#[test]
fn cycle_reports_signals_and_skips() {
    let recording = Recording::default();
    let scanner = Scanner::new(
        &config(&["EURUSD", "GBPUSD", "USDJPY"], &[Timeframe::M5, Timeframe::M15], 1),
        Box::new(scripted()),
        vec![Box::new(recording.clone())],
    )
    .unwrap();

    let report = scanner.run_cycle(0);
    assert_eq!(report.pairs_scanned, 6);
    assert_eq!(report.pairs_skipped, 2); // USDJPY is unknown
    assert_eq!(report.signals.len(), 2);
    assert_eq!(report.alerts_sent, 2);
    assert_eq!(report.delivery_failures, 0);
    assert!(!report.source_unavailable);

    let first = &report.signals[0];
    assert_eq!(first.instrument, "EURUSD");
    assert_eq!(first.timeframe, Timeframe::M5);
    assert_eq!(first.strength(), 18);
    assert_eq!(first.code(), 199);
    assert_eq!(report.signals[1].instrument, "GBPUSD");
    assert_eq!(report.signals[1].timeframe, Timeframe::M15);

    let messages = recording.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("EURUSD"));
    assert!(messages[0].contains("Code: 199"));
    assert!(messages[1].contains("GBPUSD"));
}

#[test]
fn parallel_cycle_preserves_order() {
    let instruments = ["EURUSD", "GBPUSD"];
    let timeframes = [Timeframe::M5, Timeframe::M15];

    let serial = Recording::default();
    Scanner::new(
        &config(&instruments, &timeframes, 1),
        Box::new(scripted()),
        vec![Box::new(serial.clone())],
    )
    .unwrap()
    .run_cycle(0);

    let parallel = Recording::default();
    Scanner::new(
        &config(&instruments, &timeframes, 4),
        Box::new(scripted()),
        vec![Box::new(parallel.clone())],
    )
    .unwrap()
    .run_cycle(0);

    assert_eq!(serial.messages().len(), 2);
    assert_eq!(serial.messages(), parallel.messages());
}

#[test]
fn unavailable_source_skips_whole_cycle() {
    let mut provider = scripted();
    provider.available = false;
    let provider = Arc::new(provider);

    struct Shared(Arc<ScriptedProvider>);
    impl MarketDataProvider for Shared {
        fn name(&self) -> &str {
            self.0.name()
        }
        fn fetch_window(
            &self,
            instrument: &str,
            timeframe: Timeframe,
            count: usize,
        ) -> Result<FetchResult, DataError> {
            self.0.fetch_window(instrument, timeframe, count)
        }
        fn is_available(&self) -> bool {
            self.0.is_available()
        }
    }

    let scanner = Scanner::new(
        &config(&["EURUSD"], &[Timeframe::M5], 1),
        Box::new(Shared(Arc::clone(&provider))),
        vec![],
    )
    .unwrap();

    let report = scanner.run_cycle(3);
    assert!(report.source_unavailable);
    assert_eq!(report.cycle, 3);
    assert_eq!(report.pairs_scanned, 0);
    assert_eq!(provider.fetches.load(Ordering::SeqCst), 0);
}

#[test]
fn failed_delivery_is_counted_and_does_not_block_others() {
    let recording = Recording::default();
    let scanner = Scanner::new(
        &config(&["EURUSD"], &[Timeframe::M5], 1),
        Box::new(scripted()),
        vec![Box::new(Failing), Box::new(recording.clone())],
    )
    .unwrap();

    let report = scanner.run_cycle(0);
    assert_eq!(report.signals.len(), 1);
    assert_eq!(report.alerts_sent, 1);
    assert_eq!(report.delivery_failures, 1);
    assert_eq!(recording.messages().len(), 1);
}

#[test]
fn threshold_comes_from_config() {
    let mut cfg = config(&["EURUSD"], &[Timeframe::M5], 1);
    cfg.min_combo_len = 19;
    let scanner = Scanner::new(&cfg, Box::new(scripted()), vec![]).unwrap();
    assert!(matches!(
        scanner.evaluate_pair("EURUSD", Timeframe::M5),
        PairOutcome::NoSignal
    ));
    assert!(matches!(
        scanner.evaluate_pair("AUDCAD", Timeframe::M5),
        PairOutcome::Skipped(DataError::SymbolNotFound { .. })
    ));
}

#[test]
fn short_window_is_still_analysed() {
    // Only the last 40 candles: the tail combo's earlier copy is cut off.
    let mut cfg = config(&["EURUSD"], &[Timeframe::M5], 1);
    cfg.window_size = 40;
    cfg.min_combo_len = 1;
    let scanner = Scanner::new(&cfg, Box::new(scripted()), vec![]).unwrap();
    match scanner.evaluate_pair("EURUSD", Timeframe::M5) {
        PairOutcome::Signal(signal) => {
            assert_eq!(signal.window_len, 40);
            assert!(signal.strength() < 18);
        }
        other => panic!("expected a weak signal, got {other:?}"),
    }
}

#[test]
fn invalid_config_is_rejected() {
    let mut cfg = config(&["EURUSD"], &[Timeframe::M5], 1);
    cfg.forecast_len = 0;
    assert!(Scanner::new(&cfg, Box::new(scripted()), vec![]).is_err());
}

// ── Loop control ─────────────────────────────────────────────────────

#[test]
fn max_cycles_stops_without_trailing_sleep() {
    let recording = Recording::default();
    let scanner = Scanner::new(
        &config(&["EURUSD"], &[Timeframe::M5], 1),
        Box::new(scripted()),
        vec![Box::new(recording.clone())],
    )
    .unwrap();

    let started = Instant::now();
    let summary = scanner.run(Some(1), None);
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.signals, 1);
    assert_eq!(summary.alerts_sent, 1);
    assert!(!summary.cancelled);
}

#[test]
fn cancel_flag_set_before_start() {
    let scanner = Scanner::new(
        &config(&["EURUSD"], &[Timeframe::M5], 1),
        Box::new(scripted()),
        vec![],
    )
    .unwrap();
    let cancel = AtomicBool::new(true);
    let summary = scanner.run(None, Some(&cancel));
    assert_eq!(summary.cycles, 0);
    assert!(summary.cancelled);
}

#[test]
fn cancel_interrupts_sleep_between_cycles() {
    let scanner = Scanner::new(
        &config(&["EURUSD"], &[Timeframe::M5], 1),
        Box::new(scripted()),
        vec![],
    )
    .unwrap();
    let cancel = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&cancel);
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(300));
        flag.store(true, Ordering::Relaxed);
    });

    let started = Instant::now();
    let summary = scanner.run(None, Some(cancel.as_ref()));
    stopper.join().unwrap();

    // The interval is 60 s; cancellation must cut the sleep short.
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(summary.cycles, 1);
    assert!(summary.cancelled);
}
