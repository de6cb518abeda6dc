//! In-memory persistence

use async_trait::async_trait;
use bastion_core::{Position, Timestamp, Trade};
use bastion_ports::{PositionStore, StoreError};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Position store kept in process memory
#[derive(Default)]
pub struct InMemoryStore {
    positions: DashMap<String, Position>,
    trades: RwLock<Vec<Trade>>,
    failing: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StoreError::Unavailable`
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn position(&self, symbol: &str) -> Option<Position> {
        self.positions.get(symbol).map(|p| p.clone())
    }

    pub async fn trade_count(&self) -> usize {
        self.trades.read().await.len()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store set to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PositionStore for InMemoryStore {
    async fn upsert_position(&self, position: &Position) -> Result<(), StoreError> {
        self.check()?;
        self.positions
            .insert(position.symbol.clone(), position.clone());
        Ok(())
    }

    async fn delete_position(&self, symbol: &str) -> Result<(), StoreError> {
        self.check()?;
        self.positions.remove(symbol);
        Ok(())
    }

    async fn record_trade(&self, trade: &Trade) -> Result<(), StoreError> {
        self.check()?;
        self.trades.write().await.push(trade.clone());
        Ok(())
    }

    async fn query_trades_since(&self, since: Timestamp) -> Result<Vec<Trade>, StoreError> {
        self.check()?;
        let trades = self.trades.read().await;
        let mut recent: Vec<Trade> = trades
            .iter()
            .filter(|t| t.timestamp >= since)
            .cloned()
            .collect();
        recent.sort_by_key(|t| t.timestamp);
        Ok(recent)
    }

    async fn query_all_positions(&self) -> Result<Vec<Position>, StoreError> {
        self.check()?;
        Ok(self.positions.iter().map(|p| p.value().clone()).collect())
    }
}
