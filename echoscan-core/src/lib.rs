//! Echoscan Core: candle encoding, tail-repeat matching, signal composition.
//!
//! This crate contains everything that does not depend on a schedule:
//! - Domain types (candles, symbols, timeframes)
//! - The pattern pipeline: encode a window, find the longest repeated tail,
//!   compose a forecast signal and render it as an alert
//! - Market data providers (Yahoo chart API, CSV replay, synthetic)

pub mod data;
pub mod domain;
pub mod pattern;
