//! Scan loop: fetch → encode → match → compose → render → notify.
//!
//! One cycle visits every (instrument, timeframe) pair once. Pairs are
//! independent, so with `workers > 1` they are evaluated on a rayon pool;
//! results are always collected in instrument-major order before any alert
//! is sent, so delivery order does not depend on the worker count.
//!
//! A pair whose fetch fails is skipped for the cycle. A notifier that fails
//! is logged and counted; the loop never retries delivery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use echoscan_core::data::{DataError, MarketDataProvider};
use echoscan_core::domain::Timeframe;
use echoscan_core::pattern::{encode, AlertRenderer, Signal, SignalComposer};

use crate::config::{ConfigError, ScanConfig};
use crate::notify::Notifier;

/// Granularity of the inter-cycle sleep; bounds how long cancellation takes.
const SLEEP_SLICE: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// What happened to one pair in one cycle.
#[derive(Debug)]
pub enum PairOutcome {
    Signal(Signal),
    NoSignal,
    Skipped(DataError),
}

/// Summary of one scan cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: usize,
    pub pairs_scanned: usize,
    pub pairs_skipped: usize,
    /// Signals in instrument-major, timeframe-minor order.
    pub signals: Vec<Signal>,
    pub alerts_sent: usize,
    pub delivery_failures: usize,
    /// Set when the provider refused the whole cycle (breaker open).
    pub source_unavailable: bool,
    pub elapsed: Duration,
}

/// Totals across all cycles of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub cycles: usize,
    pub signals: usize,
    pub alerts_sent: usize,
    pub delivery_failures: usize,
    pub pairs_skipped: usize,
    pub cycles_unavailable: usize,
    pub cancelled: bool,
}

impl ScanSummary {
    fn absorb(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.signals += report.signals.len();
        self.alerts_sent += report.alerts_sent;
        self.delivery_failures += report.delivery_failures;
        self.pairs_skipped += report.pairs_skipped;
        if report.source_unavailable {
            self.cycles_unavailable += 1;
        }
    }
}

/// The periodic scanner. Owns its provider and notifiers; everything else
/// is read-only configuration.
pub struct Scanner {
    pairs: Vec<(String, Timeframe)>,
    window_size: usize,
    interval: Duration,
    composer: SignalComposer,
    renderer: AlertRenderer,
    provider: Box<dyn MarketDataProvider>,
    notifiers: Vec<Box<dyn Notifier>>,
    thread_pool: Option<rayon::ThreadPool>,
}

impl Scanner {
    pub fn new(
        config: &ScanConfig,
        provider: Box<dyn MarketDataProvider>,
        notifiers: Vec<Box<dyn Notifier>>,
    ) -> Result<Self, ScanError> {
        config.validate()?;

        let thread_pool = if config.workers > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.workers)
                    .thread_name(|i| format!("echoscan-worker-{i}"))
                    .build()
                    .map_err(|e| ScanError::ThreadPool(e.to_string()))?,
            )
        } else {
            None
        };

        if notifiers.is_empty() {
            warn!("no notifiers configured; signals will only be logged");
        }

        Ok(Self {
            pairs: config.pairs(),
            window_size: config.window_size,
            interval: Duration::from_secs(config.scan_interval_secs),
            composer: SignalComposer::new(config.min_combo_len, config.forecast_len),
            renderer: AlertRenderer::new(config.alert.locale),
            provider,
            notifiers,
            thread_pool,
        })
    }

    pub fn pairs(&self) -> &[(String, Timeframe)] {
        &self.pairs
    }

    /// Fetch and analyse one pair.
    pub fn evaluate_pair(&self, instrument: &str, timeframe: Timeframe) -> PairOutcome {
        let window = match self
            .provider
            .fetch_window(instrument, timeframe, self.window_size)
        {
            Ok(window) => window,
            Err(e) => {
                warn!(instrument, %timeframe, error = %e, "skipping pair");
                return PairOutcome::Skipped(e);
            }
        };

        let seq = encode(&window.candles);
        if seq.is_empty() {
            debug!(
                instrument,
                %timeframe,
                candles = window.candles.len(),
                "empty or malformed window"
            );
            return PairOutcome::NoSignal;
        }

        match self.composer.analyze(instrument, timeframe, &seq) {
            Some(signal) => PairOutcome::Signal(signal),
            None => {
                debug!(instrument, %timeframe, len = seq.len(), "no signal");
                PairOutcome::NoSignal
            }
        }
    }

    /// Render a signal and hand it to every notifier. Returns (sent, failed).
    pub fn dispatch(&self, signal: &Signal) -> (usize, usize) {
        let message = self.renderer.render(signal);
        let mut sent = 0;
        let mut failed = 0;
        for notifier in &self.notifiers {
            match notifier.send(&message) {
                Ok(()) => sent += 1,
                Err(e) => {
                    error!(
                        notifier = notifier.name(),
                        destination = notifier.destination(),
                        instrument = %signal.instrument,
                        timeframe = %signal.timeframe,
                        error = %e,
                        "alert delivery failed"
                    );
                    failed += 1;
                }
            }
        }
        (sent, failed)
    }

    /// Run one full pass over every pair.
    pub fn run_cycle(&self, cycle: usize) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport {
            cycle,
            ..CycleReport::default()
        };

        if !self.provider.is_available() {
            warn!(
                cycle,
                provider = self.provider.name(),
                "data source unavailable, skipping cycle"
            );
            report.source_unavailable = true;
            report.elapsed = started.elapsed();
            return report;
        }

        let evaluate = |(instrument, tf): &(String, Timeframe)| self.evaluate_pair(instrument, *tf);
        let outcomes: Vec<PairOutcome> = match &self.thread_pool {
            Some(pool) => pool.install(|| self.pairs.par_iter().map(evaluate).collect()),
            None => self.pairs.iter().map(evaluate).collect(),
        };

        for outcome in outcomes {
            report.pairs_scanned += 1;
            match outcome {
                PairOutcome::Signal(signal) => {
                    info!(
                        instrument = %signal.instrument,
                        timeframe = %signal.timeframe,
                        strength = signal.strength(),
                        code = signal.code(),
                        "signal"
                    );
                    let (sent, failed) = self.dispatch(&signal);
                    report.alerts_sent += sent;
                    report.delivery_failures += failed;
                    report.signals.push(signal);
                }
                PairOutcome::NoSignal => {}
                PairOutcome::Skipped(_) => report.pairs_skipped += 1,
            }
        }

        report.elapsed = started.elapsed();
        info!(
            cycle,
            pairs = report.pairs_scanned,
            skipped = report.pairs_skipped,
            signals = report.signals.len(),
            delivery_failures = report.delivery_failures,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "scan cycle complete"
        );
        report
    }

    /// Run cycles until `max_cycles` is reached or `cancel` is set.
    ///
    /// Cycles start `scan_interval_secs` apart; a cycle that overruns the
    /// interval is followed immediately by the next one.
    pub fn run(&self, max_cycles: Option<usize>, cancel: Option<&AtomicBool>) -> ScanSummary {
        let cancelled = || cancel.is_some_and(|f| f.load(Ordering::Relaxed));
        let mut summary = ScanSummary::default();

        info!(
            pairs = self.pairs.len(),
            interval_secs = self.interval.as_secs(),
            provider = self.provider.name(),
            notifiers = self.notifiers.len(),
            "scanner started"
        );

        loop {
            if cancelled() {
                summary.cancelled = true;
                break;
            }

            let started = Instant::now();
            let report = self.run_cycle(summary.cycles);
            summary.absorb(&report);

            if max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }

            let deadline = started + self.interval;
            while Instant::now() < deadline {
                if cancelled() {
                    break;
                }
                let remaining = deadline.saturating_duration_since(Instant::now());
                std::thread::sleep(remaining.min(SLEEP_SLICE));
            }
        }

        info!(
            cycles = summary.cycles,
            signals = summary.signals,
            alerts_sent = summary.alerts_sent,
            cancelled = summary.cancelled,
            "scanner stopped"
        );
        summary
    }
}
