//! End-to-end pattern pipeline tests: candles → sequence → match → signal → alert.

use chrono::{Duration, TimeZone, Utc};
use echoscan_core::domain::{Candle, Direction, Symbol, SymbolSequence, Timeframe};
use echoscan_core::pattern::{
    encode, find_tail_repeat, AlertRenderer, Locale, SignalComposer, DEFAULT_MIN_COMBO_LEN,
};

// ── Helpers ──────────────────────────────────────────────────────────

/// Candles whose open/close relation spells out `pattern` (U/D/F).
fn candles_for(pattern: &str) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    pattern
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let open = 1.1000;
            let close = match c {
                'U' => 1.1005,
                'D' => 1.0995,
                _ => 1.1000,
            };
            Candle {
                time: start + Duration::minutes(5 * i as i64),
                open,
                high: 1.1010,
                low: 1.0990,
                close,
                volume: 100,
            }
        })
        .collect()
}

const COMBO_18: &str = "UUDUDDUDUUUDDUDUDD";

/// 200 candles: the 18-long combo at index 1, its continuation, a flat
/// stretch, then the combo again as the tail.
fn window_with_combo(combo: &str) -> String {
    let filler = 200 - (1 + combo.len() + 10 + 1 + combo.len());
    format!("F{combo}UDUDUDUDUD{}U{combo}", "F".repeat(filler))
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn eighteen_long_repeat_produces_alert() {
    let pattern = window_with_combo(COMBO_18);
    let seq = encode(&candles_for(&pattern));
    assert_eq!(seq.len(), 200);

    let signal = SignalComposer::default()
        .analyze("EURUSD", Timeframe::M5, &seq)
        .expect("combo of 18 meets the default threshold");

    assert_eq!(signal.strength(), DEFAULT_MIN_COMBO_LEN);
    assert_eq!(signal.anchor, 1);
    assert_eq!(signal.code(), 199);
    assert_eq!(signal.combo.to_string(), COMBO_18);
    assert_eq!(signal.forecast.len(), 10);
    assert!(signal
        .forecast
        .iter()
        .step_by(2)
        .all(|d| *d == Direction::Up));
    assert!(signal
        .forecast
        .iter()
        .skip(1)
        .step_by(2)
        .all(|d| *d == Direction::Down));

    let alert = AlertRenderer::new(Locale::En).render(&signal);
    assert!(alert.contains("EURUSD"));
    assert!(alert.contains("M5"));
    assert!(alert.contains("Code: 199"));
    assert!(alert.contains("Up, Down, Up, Down"));
}

#[test]
fn seventeen_long_repeat_is_below_default_threshold() {
    let combo = &COMBO_18[1..];
    let seq = encode(&candles_for(&window_with_combo(combo)));

    let found = find_tail_repeat(&seq).unwrap();
    assert_eq!(found.combo_len(), 17);
    assert_eq!(found.anchor, 1);

    assert!(SignalComposer::default()
        .analyze("EURUSD", Timeframe::M5, &seq)
        .is_none());
    assert!(SignalComposer::new(17, 10)
        .analyze("EURUSD", Timeframe::M5, &seq)
        .is_some());
}

#[test]
fn tail_symbol_never_seen_before_gives_no_match() {
    let pattern = format!("{}D", "U".repeat(199));
    let seq = encode(&candles_for(&pattern));
    assert!(find_tail_repeat(&seq).is_none());
    assert!(SignalComposer::new(1, 10)
        .analyze("GBPUSD", Timeframe::M3, &seq)
        .is_none());
}

#[test]
fn periodic_window_uses_longest_non_overlapping_repeat() {
    let pattern = format!("{}UD", "UDU".repeat(66));
    let seq = encode(&candles_for(&pattern));
    let signal = SignalComposer::default()
        .analyze("USDJPY", Timeframe::M15, &seq)
        .unwrap();

    // Half the window, placed as far right as non-overlap allows.
    assert_eq!(signal.strength(), 99);
    assert_eq!(signal.anchor, 2);
    assert_eq!(signal.code(), 198);
    let expected: SymbolSequence = "UUDUUDUUDU".parse().unwrap();
    let expected: Vec<Direction> = expected.iter().map(|s| s.direction()).collect();
    assert_eq!(signal.forecast, expected);
}

#[test]
fn continuation_running_into_tail_is_clipped() {
    // UDF|UDF: the occurrence at 0 is followed by exactly three symbols.
    let seq: SymbolSequence = "UDFUDF".parse().unwrap();
    let signal = SignalComposer::new(3, 10)
        .analyze("AUDCAD", Timeframe::M4, &seq)
        .unwrap();
    assert_eq!(signal.code(), 6);
    assert_eq!(
        signal.forecast,
        vec![Direction::Up, Direction::Down, Direction::Neutral]
    );
}

#[test]
fn window_with_missing_price_is_skipped() {
    let mut candles = candles_for(&window_with_combo(COMBO_18));
    candles[57].close = f64::NAN;
    let seq = encode(&candles);
    assert!(seq.is_empty());
    assert!(SignalComposer::default()
        .analyze("EURUSD", Timeframe::M5, &seq)
        .is_none());
}

#[test]
fn empty_window_has_no_signal() {
    let seq = encode(&[]);
    assert!(seq.is_empty());
    assert!(find_tail_repeat(&seq).is_none());
}

#[test]
fn russian_alert_uses_legacy_glyphs() {
    let seq = encode(&candles_for(&window_with_combo(COMBO_18)));
    let signal = SignalComposer::default()
        .analyze("EURUSD", Timeframe::M5, &seq)
        .unwrap();
    let alert = AlertRenderer::new(Locale::Ru).render(&signal);
    assert!(alert.contains("Вверх, Вниз"));
    assert!(alert.contains('З') && alert.contains('К'));
    assert!(!alert.contains('G'));
}

#[test]
fn encoder_classifies_each_candle_independently() {
    let candles = candles_for("UDF");
    let seq = encode(&candles);
    assert_eq!(seq.as_slice(), &[Symbol::Up, Symbol::Down, Symbol::Flat]);
}
