//! Alert rendering: Signal → Markdown text in a display locale.
//!
//! The symbol alphabet is locale-free internally; glyphs and labels are only
//! chosen here. Output targets Telegram's legacy Markdown (`*bold*`, `_italic_`).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, Symbol};

use super::composer::Signal;

/// Number of trailing combo symbols highlighted in the alert.
pub const HIGHLIGHT_TAIL: usize = 4;

/// Display locale for alert text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ru,
}

impl Locale {
    /// Candle colour glyph: green for up, red for down, neutral for flat.
    pub fn glyph(self, symbol: Symbol) -> char {
        match (self, symbol) {
            (Locale::En, Symbol::Up) => 'G',
            (Locale::En, Symbol::Down) => 'R',
            (Locale::En, Symbol::Flat) => 'N',
            (Locale::Ru, Symbol::Up) => 'З',
            (Locale::Ru, Symbol::Down) => 'К',
            (Locale::Ru, Symbol::Flat) => 'Н',
        }
    }

    pub fn direction_label(self, direction: Direction) -> &'static str {
        match (self, direction) {
            (Locale::En, Direction::Up) => "Up",
            (Locale::En, Direction::Neutral) => "Neutral",
            (Locale::En, Direction::Down) => "Down",
            (Locale::Ru, Direction::Up) => "Вверх",
            (Locale::Ru, Direction::Neutral) => "Нейтрал",
            (Locale::Ru, Direction::Down) => "Вниз",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "ru" => Ok(Locale::Ru),
            other => Err(format!("unknown locale '{other}' (expected en or ru)")),
        }
    }
}

/// Renders signals as Markdown alerts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertRenderer {
    pub locale: Locale,
}

impl AlertRenderer {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Combo glyphs with the final [`HIGHLIGHT_TAIL`] symbols in bold.
    pub fn combo_display(&self, combo: &[Symbol]) -> String {
        let split = combo.len().saturating_sub(HIGHLIGHT_TAIL);
        let (head, tail) = combo.split_at(split);
        let head: String = head.iter().map(|s| self.locale.glyph(*s)).collect();
        let tail: String = tail.iter().map(|s| self.locale.glyph(*s)).collect();
        format!("{head}*{tail}*")
    }

    pub fn forecast_display(&self, forecast: &[Direction]) -> String {
        forecast
            .iter()
            .map(|d| self.locale.direction_label(*d))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn render(&self, signal: &Signal) -> String {
        let instrument = escape_markdown(&signal.instrument);
        let tf = signal.timeframe;
        let combo = self.combo_display(&signal.combo);
        let forecast = self.forecast_display(&signal.forecast);
        let last = signal
            .combo
            .last()
            .map(|s| self.locale.glyph(*s))
            .unwrap_or(' ');

        match self.locale {
            Locale::En => format!(
                "*PATTERN SIGNAL*!\n\
                 Instrument: {instrument}\n\
                 Timeframe: {tf}\n\
                 Signal strength: {strength}\n\
                 Code: {code}\n\
                 Open *{tf}* candles and check that the latest candles closed as:\n\
                 >> {combo} <<\n\
                 (_the last {HIGHLIGHT_TAIL} candles are enough to confirm the signal; the rest are shown for reference._)\n\
                 \n\
                 As soon as the current *{tf}* candle of colour *{last}* closes, enter on each following candle in turn until the first win:\n\
                 *{forecast}*\n\
                 \n\
                 After the first win stop following the directions: the signal is no longer valid.",
                strength = signal.strength(),
                code = signal.code(),
            ),
            Locale::Ru => format!(
                "*ВНИМАНИЕ СИГНАЛ*!\n\
                 Актив: {instrument}\n\
                 Таймфрейм: {tf}\n\
                 Сила сигнала: {strength}\n\
                 Код: {code}\n\
                 Открываешь свечи *{tf}*, проверяешь что последняя свеча и предыдущие закрылись так:\n\
                 >> {combo} <<\n\
                 (_достаточно посмотреть на последние {HIGHLIGHT_TAIL} свечи и уже ясно что сигнал подтвердился. Остальные свечи указаны на всякий случай._)\n\
                 \n\
                 Как только текущая свеча *{tf}* цвета *{last}* закроется, открывайся по очереди на каждую следующую свечу, до первого плюса:\n\
                 *{forecast}*\n\
                 \n\
                 Как только был плюс, дальше по направлениям не идти! Сигнал уже будет не актуальным",
                strength = signal.strength(),
                code = signal.code(),
            ),
        }
    }
}

/// Escape characters that legacy Telegram Markdown treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
