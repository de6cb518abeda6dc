use async_trait::async_trait;
use bastion_core::{Position, Timestamp, Trade};

use crate::error::StoreError;

/// Abstract persistence for the position ledger and trade journal
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn upsert_position(&self, position: &Position) -> Result<(), StoreError>;

    async fn delete_position(&self, symbol: &str) -> Result<(), StoreError>;

    async fn record_trade(&self, trade: &Trade) -> Result<(), StoreError>;

    /// Trades with `timestamp >= since`, oldest first
    async fn query_trades_since(&self, since: Timestamp) -> Result<Vec<Trade>, StoreError>;

    async fn query_all_positions(&self) -> Result<Vec<Position>, StoreError>;
}
