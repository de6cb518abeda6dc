//! Typed strategy inputs
//!
//! Every indicator a sub-strategy may read is a named field. Values are
//! optional: a sub-strategy whose required inputs are absent produces no
//! signal. Unknown fields are rejected at deserialization.

use bastion_core::{Bar, Price, Symbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of the latest MACD line / signal line crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdCross {
    Bullish,
    Bearish,
}

/// Price context for one symbol at one timeframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarketSnapshot {
    pub symbol: Symbol,
    pub price: Price,
    /// Volume of the current (forming) bar
    #[serde(default)]
    pub volume: Option<Decimal>,
    /// Completed bars, oldest first
    #[serde(default)]
    pub bars: Vec<Bar>,
    pub timestamp: Timestamp,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<Symbol>, price: Price, timestamp: Timestamp) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            volume: None,
            bars: Vec::new(),
            timestamp,
        }
    }

    pub fn with_volume(mut self, volume: Decimal) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_bars(mut self, bars: Vec<Bar>) -> Self {
        self.bars = bars;
        self
    }

    /// Closes of the last `n` bars (fewer if history is short)
    pub fn recent_closes(&self, n: usize) -> Vec<Decimal> {
        let start = self.bars.len().saturating_sub(n);
        self.bars[start..].iter().map(|b| b.close).collect()
    }

    /// Mean volume over the last `n` bars
    pub fn average_volume(&self, n: usize) -> Option<Decimal> {
        let start = self.bars.len().saturating_sub(n);
        let window = &self.bars[start..];
        if window.is_empty() {
            return None;
        }
        let total: Decimal = window.iter().map(|b| b.volume).sum();
        Some(total / Decimal::from(window.len()))
    }
}

/// Precomputed technical indicators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndicatorSet {
    pub rsi: Option<Decimal>,
    /// Fast EMA (the class's short period)
    pub ema_short: Option<Decimal>,
    /// Slow EMA (the class's long period)
    pub ema_long: Option<Decimal>,
    pub macd: Option<Decimal>,
    pub macd_signal: Option<Decimal>,
    pub macd_histogram: Option<Decimal>,
    pub macd_cross: Option<MacdCross>,
    pub bb_upper: Option<Decimal>,
    pub bb_middle: Option<Decimal>,
    pub bb_lower: Option<Decimal>,
    /// Price position inside the band, 0 at the lower band and 1 at the upper
    pub bb_position: Option<Decimal>,
    pub cci: Option<Decimal>,

    // Series, oldest first
    pub ema_short_series: Vec<Decimal>,
    pub ema_long_series: Vec<Decimal>,
    pub rsi_series: Vec<Decimal>,
    pub macd_series: Vec<Decimal>,
    pub histogram_series: Vec<Decimal>,
}

/// Value and its predecessor at the end of a series
pub(crate) fn last_two(series: &[Decimal]) -> Option<(Decimal, Decimal)> {
    match series {
        [.., prev, last] => Some((*prev, *last)),
        _ => None,
    }
}

pub(crate) fn tail(series: &[Decimal], n: usize) -> &[Decimal] {
    &series[series.len().saturating_sub(n)..]
}

/// Values strictly greater than both neighbours
pub(crate) fn local_maxima(data: &[Decimal]) -> Vec<Decimal> {
    data.windows(3)
        .filter(|w| w[1] > w[0] && w[1] > w[2])
        .map(|w| w[1])
        .collect()
}

/// Values strictly less than both neighbours
pub(crate) fn local_minima(data: &[Decimal]) -> Vec<Decimal> {
    data.windows(3)
        .filter(|w| w[1] < w[0] && w[1] < w[2])
        .map(|w| w[1])
        .collect()
}

pub(crate) fn strictly_increasing(data: &[Decimal]) -> bool {
    data.len() >= 2 && data.windows(2).all(|w| w[1] > w[0])
}

pub(crate) fn strictly_decreasing(data: &[Decimal]) -> bool {
    data.len() >= 2 && data.windows(2).all(|w| w[1] < w[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_extrema_require_strict_neighbours() {
        let data = [dec!(1), dec!(3), dec!(2), dec!(2), dec!(5), dec!(4), dec!(1), dec!(2)];
        assert_eq!(local_maxima(&data), vec![dec!(3), dec!(5)]);
        assert_eq!(local_minima(&data), vec![dec!(1)]);
        assert!(local_maxima(&data[..2]).is_empty());
    }

    #[test]
    fn test_monotonic_checks() {
        assert!(strictly_increasing(&[dec!(1), dec!(2), dec!(3)]));
        assert!(!strictly_increasing(&[dec!(1), dec!(1), dec!(3)]));
        assert!(strictly_decreasing(&[dec!(3), dec!(2)]));
        assert!(!strictly_decreasing(&[dec!(3)]));
    }

    #[test]
    fn test_unknown_indicator_rejected() {
        let ok: IndicatorSet = serde_json::from_str(r#"{"rsi": "55", "ema_short": "99.5"}"#).unwrap();
        assert_eq!(ok.rsi, Some(dec!(55)));
        assert!(ok.macd.is_none());

        let err = serde_json::from_str::<IndicatorSet>(r#"{"rsi": "55", "stoch": "20"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_average_volume_uses_available_bars() {
        let t = Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap();
        let snapshot = MarketSnapshot::new("AAPL", dec!(100), t).with_bars(vec![
            Bar::flat(t, dec!(99), dec!(100)),
            Bar::flat(t, dec!(100), dec!(300)),
        ]);
        assert_eq!(snapshot.average_volume(10), Some(dec!(200)));
        assert_eq!(snapshot.recent_closes(1), vec![dec!(100)]);
    }
}
