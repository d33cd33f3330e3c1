//! Echoscan CLI: run the scanner and inspect sequences by hand.
//!
//! Commands:
//! - `scan` runs the periodic scan loop from a TOML config
//! - `analyze` runs the pattern core on a literal symbol sequence
//! - `fetch` pulls one window from the configured provider and shows the match
//! - `init-config` writes a default `echoscan.toml`

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use echoscan_core::domain::{SymbolSequence, Timeframe};
use echoscan_core::pattern::{
    encode, find_tail_repeat, AlertRenderer, Locale, SignalComposer, DEFAULT_FORECAST_LEN,
    DEFAULT_MIN_COMBO_LEN,
};
use echoscan_runner::{build_notifiers, build_provider, ScanConfig, Scanner};

const DEFAULT_CONFIG_FILE: &str = "echoscan.toml";

#[derive(Parser)]
#[command(
    name = "echoscan",
    version,
    about = "Echoscan: candle-pattern tail-repeat scanner"
)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every instrument × timeframe pair once per interval.
    Scan {
        /// Path to a TOML config file. Defaults to ./echoscan.toml if present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run a single cycle and exit.
        #[arg(long, default_value_t = false)]
        once: bool,

        /// Stop after this many cycles.
        #[arg(long, conflicts_with = "once")]
        max_cycles: Option<usize>,

        /// Override the configured worker count.
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Analyse a literal symbol sequence (U/D/F, or З/К/Н).
    Analyze {
        /// Oldest first, e.g. "UUDFDU". Whitespace, commas and dashes are ignored.
        sequence: String,

        #[arg(long, default_value_t = DEFAULT_MIN_COMBO_LEN)]
        min_len: usize,

        #[arg(long, default_value_t = DEFAULT_FORECAST_LEN)]
        forecast_len: usize,

        /// Alert language: en or ru.
        #[arg(long, default_value = "en")]
        locale: Locale,

        /// Instrument name shown in the alert.
        #[arg(long, default_value = "MANUAL")]
        instrument: String,

        /// Timeframe shown in the alert.
        #[arg(long, default_value = "M5")]
        timeframe: Timeframe,
    },
    /// Fetch one window from the configured provider and show the match.
    Fetch {
        #[arg(long)]
        instrument: String,

        #[arg(long)]
        timeframe: Timeframe,

        /// Path to a TOML config file. Defaults to ./echoscan.toml if present.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a default config file.
    InitConfig {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan {
            config,
            once,
            max_cycles,
            workers,
        } => run_scan(config.as_deref(), once, max_cycles, workers),
        Commands::Analyze {
            sequence,
            min_len,
            forecast_len,
            locale,
            instrument,
            timeframe,
        } => run_analyze(
            &sequence,
            SignalComposer::new(min_len, forecast_len),
            locale,
            &instrument,
            timeframe,
        ),
        Commands::Fetch {
            instrument,
            timeframe,
            config,
        } => run_fetch(config.as_deref(), &instrument, timeframe),
        Commands::InitConfig { output, force } => run_init_config(&output, force),
    }
}

/// Logs go to stderr so stdout carries only alerts and command output.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Explicit path, else ./echoscan.toml if it exists, else built-in defaults.
fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    let path = match path {
        Some(p) => Some(p),
        None if default_path.exists() => Some(default_path),
        None => None,
    };

    match path {
        Some(p) => {
            let config = ScanConfig::load(p)
                .with_context(|| format!("loading config from {}", p.display()))?;
            info!(path = %p.display(), "config loaded");
            Ok(config)
        }
        None => {
            let mut config = ScanConfig::default();
            config.apply_env_overrides();
            config.validate().context("validating default config")?;
            info!("no config file, using defaults");
            Ok(config)
        }
    }
}

fn run_scan(
    config_path: Option<&Path>,
    once: bool,
    max_cycles: Option<usize>,
    workers: Option<usize>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(workers) = workers {
        config.workers = workers;
    }

    let provider = build_provider(&config.provider).context("building market data provider")?;
    let notifiers = build_notifiers(&config.notifiers).context("building notifiers")?;
    let scanner = Scanner::new(&config, provider, notifiers)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .context("installing Ctrl-C handler")?;

    let max_cycles = if once { Some(1) } else { max_cycles };
    let summary = scanner.run(max_cycles, Some(cancel.as_ref()));

    if summary.delivery_failures > 0 {
        warn!(
            failures = summary.delivery_failures,
            "some alerts could not be delivered"
        );
    }
    println!(
        "{} cycle(s), {} signal(s), {} alert(s) delivered",
        summary.cycles, summary.signals, summary.alerts_sent
    );
    Ok(())
}

fn run_analyze(
    sequence: &str,
    composer: SignalComposer,
    locale: Locale,
    instrument: &str,
    timeframe: Timeframe,
) -> Result<()> {
    let seq: SymbolSequence = sequence.parse().context("parsing symbol sequence")?;
    print_analysis(&seq, composer, locale, instrument, timeframe);
    Ok(())
}

fn run_fetch(config_path: Option<&Path>, instrument: &str, timeframe: Timeframe) -> Result<()> {
    let config = load_config(config_path)?;
    let provider = build_provider(&config.provider).context("building market data provider")?;
    if !provider.is_available() {
        bail!("provider {} is unavailable", provider.name());
    }

    let window = provider
        .fetch_window(instrument, timeframe, config.window_size)
        .with_context(|| format!("fetching {instrument} {timeframe}"))?;
    println!(
        "{} candles from {:?}{}",
        window.candles.len(),
        window.source,
        match (window.candles.first(), window.candles.last()) {
            (Some(first), Some(last)) => format!(" ({} → {})", first.time, last.time),
            _ => String::new(),
        }
    );

    let seq = encode(&window.candles);
    if seq.is_empty() && !window.candles.is_empty() {
        println!("window contains a candle without open/close; nothing to analyse");
        return Ok(());
    }

    let composer = SignalComposer::new(config.min_combo_len, config.forecast_len);
    print_analysis(&seq, composer, config.alert.locale, instrument, timeframe);
    Ok(())
}

fn print_analysis(
    seq: &SymbolSequence,
    composer: SignalComposer,
    locale: Locale,
    instrument: &str,
    timeframe: Timeframe,
) {
    println!("sequence ({}): {seq}", seq.len());

    let Some(found) = find_tail_repeat(seq) else {
        println!("no recurring tail");
        return;
    };
    println!(
        "longest recurring tail: {} (length {}), prior occurrence at {}, code {}",
        found.combo,
        found.combo_len(),
        found.anchor,
        seq.len() - found.anchor
    );

    match composer.compose(instrument, timeframe, seq, &found) {
        Some(signal) => {
            println!();
            println!("{}", AlertRenderer::new(locale).render(&signal));
        }
        None => println!(
            "below threshold ({} < {})",
            found.combo_len(),
            composer.min_combo_len
        ),
    }
}

fn run_init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }
    let text = ScanConfig::default()
        .to_toml()
        .context("serializing default config")?;
    std::fs::write(output, text).with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote {}", output.display());
    Ok(())
}
