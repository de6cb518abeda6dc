//! In-memory market data

use async_trait::async_trait;
use bastion_core::{Bar, Price, Timeframe};
use bastion_ports::{MarketDataError, MarketDataProvider};
use dashmap::{DashMap, DashSet};
use rust_decimal::Decimal;

/// Market data held in memory, fed by the caller
///
/// Used by the paper session and tests. Symbols can be marked unavailable to
/// exercise missing-data paths.
#[derive(Default)]
pub struct StaticMarketData {
    prices: DashMap<String, Price>,
    history: DashMap<(String, Timeframe), Vec<Bar>>,
    volumes: DashMap<String, Decimal>,
    unavailable: DashSet<String>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, symbol: &str, price: Price) {
        self.prices.insert(symbol.to_string(), price);
    }

    /// Replace the bar history (oldest first)
    pub fn set_history(&self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) {
        self.history.insert((symbol.to_string(), timeframe), bars);
    }

    pub fn set_session_volume(&self, symbol: &str, volume: Decimal) {
        self.volumes.insert(symbol.to_string(), volume);
    }

    pub fn set_unavailable(&self, symbol: &str, unavailable: bool) {
        if unavailable {
            self.unavailable.insert(symbol.to_string());
        } else {
            self.unavailable.remove(symbol);
        }
    }

    fn check(&self, symbol: &str) -> Result<(), MarketDataError> {
        if self.unavailable.contains(symbol) {
            return Err(MarketDataError::Unavailable(symbol.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataProvider for StaticMarketData {
    async fn current_price(&self, symbol: &str) -> Result<Price, MarketDataError> {
        self.check(symbol)?;
        self.prices
            .get(symbol)
            .map(|p| *p)
            .ok_or_else(|| MarketDataError::NoPrice(symbol.to_string()))
    }

    async fn history(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, MarketDataError> {
        self.check(symbol)?;
        let bars = self
            .history
            .get(&(symbol.to_string(), timeframe))
            .map(|b| b.clone())
            .unwrap_or_default();
        let skip = bars.len().saturating_sub(limit);
        Ok(bars.into_iter().skip(skip).collect())
    }

    async fn session_volume(&self, symbol: &str) -> Result<Decimal, MarketDataError> {
        self.check(symbol)?;
        Ok(self.volumes.get(symbol).map(|v| *v).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_history_returns_most_recent() {
        let md = StaticMarketData::new();
        let now = Utc::now();
        let bars: Vec<Bar> = (1..=10)
            .map(|i| Bar::flat(now, Decimal::from(i), dec!(100)))
            .collect();
        md.set_history("AAPL", Timeframe::OneDay, bars);

        let last3 = md.history("AAPL", Timeframe::OneDay, 3).await.unwrap();
        let closes: Vec<Decimal> = last3.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![dec!(8), dec!(9), dec!(10)]);
    }

    #[tokio::test]
    async fn test_unavailable_symbol() {
        let md = StaticMarketData::new();
        md.set_price("AAPL", dec!(1));
        md.set_unavailable("AAPL", true);
        assert!(md.current_price("AAPL").await.is_err());
        md.set_unavailable("AAPL", false);
        assert_eq!(md.current_price("AAPL").await.unwrap(), dec!(1));
    }
}
