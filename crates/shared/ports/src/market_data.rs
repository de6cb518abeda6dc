use async_trait::async_trait;
use bastion_core::{Bar, Price, Timeframe};
use rust_decimal::Decimal;

use crate::error::MarketDataError;

/// Source of prices and OHLCV history
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn current_price(&self, symbol: &str) -> Result<Price, MarketDataError>;

    /// Most recent `limit` bars, oldest first
    async fn history(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, MarketDataError>;

    /// Volume traded so far in the current session
    async fn session_volume(&self, symbol: &str) -> Result<Decimal, MarketDataError>;
}
