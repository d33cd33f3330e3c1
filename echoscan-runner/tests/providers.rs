//! Scanner wired to real providers built from configuration.

use chrono::{TimeZone, Utc};
use echoscan_core::data::{MarketDataProvider, SyntheticProvider};
use echoscan_core::domain::Timeframe;
use echoscan_runner::{build_provider, ProviderConfig, ScanConfig, Scanner};

#[test]
fn csv_replay_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let combo = "UUDUDDUDUUUDDUDUDD";
    let pattern = format!("F{combo}UDUDUDUDUD{}U{combo}", "F".repeat(152));

    let mut body = String::from("time,open,high,low,close\n");
    let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap().timestamp();
    for (i, c) in pattern.chars().enumerate() {
        let close = match c {
            'U' => "1.1010",
            'D' => "1.0990",
            _ => "1.1000",
        };
        body.push_str(&format!(
            "{},1.1000,1.1020,1.0980,{close}\n",
            start + 300 * i as i64
        ));
    }
    std::fs::write(dir.path().join("EURUSD_M5.csv"), body).unwrap();

    let config = ScanConfig {
        instruments: vec!["EURUSD".into(), "GBPUSD".into()],
        timeframes: vec![Timeframe::M5],
        provider: ProviderConfig::Csv {
            dir: dir.path().to_path_buf(),
        },
        notifiers: vec![],
        ..ScanConfig::default()
    };
    let provider = build_provider(&config.provider).unwrap();
    let scanner = Scanner::new(&config, provider, vec![]).unwrap();

    let report = scanner.run_cycle(0);
    assert_eq!(report.pairs_scanned, 2);
    assert_eq!(report.pairs_skipped, 1);
    assert_eq!(report.signals.len(), 1);
    assert_eq!(report.signals[0].anchor, 1);
    assert_eq!(report.signals[0].code(), 199);
}

#[test]
fn synthetic_scan_is_deterministic_for_fixed_end_time() {
    let end = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
    let config = ScanConfig {
        instruments: vec!["EURUSD".into(), "GBPUSD".into(), "USDJPY".into()],
        min_combo_len: 4,
        notifiers: vec![],
        ..ScanConfig::default()
    };

    let run = || {
        let provider = SyntheticProvider::new(9).with_end_time(end);
        assert!(provider.is_available());
        Scanner::new(&config, Box::new(provider), vec![])
            .unwrap()
            .run_cycle(0)
            .signals
    };

    let first = run();
    assert_eq!(first, run());
    assert!(first.iter().all(|s| s.strength() >= 4 && s.window_len == 200));
}
