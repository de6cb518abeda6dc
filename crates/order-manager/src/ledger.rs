//! Position Ledger
//!
//! Authoritative per-symbol holdings with weighted-average cost.
//!
//! Writes for one symbol are serialized through a per-symbol async mutex so
//! fills arriving from polling and push notifications at the same time apply
//! in a total order. Different symbols never contend. Readers get snapshots
//! from the sharded map without taking the writer lock.
//!
//! Every fill carries a `fill_id`; a fill id is applied at most once, which
//! makes repeated or overlapping reports harmless.
//!
//! Persistence is best effort: store failures are logged and the in-memory
//! state stays authoritative for the session.

use bastion_core::{Fill, Position, Quantity, Side, Timestamp, Trade, TradingEvent};
use bastion_ports::{EventPublisher, PositionStore, StoreError};
use chrono::Duration;
use dashmap::{DashMap, DashSet};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Outcome of one applied fill
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerUpdate {
    pub trade: Trade,
    /// Position after the fill; `None` when it was closed (or never existed)
    pub position: Option<Position>,
    /// Shares sold beyond the recorded holding
    pub oversold: Quantity,
}

pub struct PositionLedger {
    store: Arc<dyn PositionStore>,
    events: Arc<dyn EventPublisher>,
    positions: DashMap<String, Position>,
    writers: DashMap<String, Arc<Mutex<()>>>,
    applied: DashSet<String>,
    journal: RwLock<Vec<Trade>>,
    journal_retention: Duration,
}

impl PositionLedger {
    pub fn new(store: Arc<dyn PositionStore>, events: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            events,
            positions: DashMap::new(),
            writers: DashMap::new(),
            applied: DashSet::new(),
            journal: RwLock::new(Vec::new()),
            journal_retention: Duration::hours(24),
        }
    }

    /// How long trades, and the fill ids that deduplicate them, stay in memory
    pub fn with_journal_retention(mut self, retention: Duration) -> Self {
        self.journal_retention = retention;
        self
    }

    pub fn journal_retention(&self) -> Duration {
        self.journal_retention
    }

    /// Load positions and recent trades from the store.
    ///
    /// Returns the number of positions restored.
    pub async fn restore(&self, trades_since: Timestamp) -> Result<usize, StoreError> {
        let positions = self.store.query_all_positions().await?;
        let mut trades = self.store.query_trades_since(trades_since).await?;
        trades.sort_by_key(|t| t.timestamp);

        let mut count = 0;
        for position in positions {
            if position.quantity > 0 {
                self.positions.insert(position.symbol.clone(), position);
                count += 1;
            } else {
                warn!(
                    "[LEDGER] Skipping stored {} with quantity {}",
                    position.symbol, position.quantity
                );
            }
        }
        for trade in &trades {
            self.applied.insert(trade.fill_id.clone());
        }
        *self.journal.write().await = trades;

        info!("[LEDGER] Restored {} positions", count);
        Ok(count)
    }

    /// Apply one fill. Returns `None` if this fill id was already applied or
    /// the fill is malformed.
    pub async fn apply_fill(&self, fill: Fill) -> Option<LedgerUpdate> {
        if fill.quantity <= 0 || fill.price <= Decimal::ZERO {
            warn!(
                "[LEDGER] Ignoring malformed fill {}: qty={} price={}",
                fill.fill_id, fill.quantity, fill.price
            );
            return None;
        }

        let writer = self.writer(&fill.symbol);
        let _guard = writer.lock().await;

        if !self.applied.insert(fill.fill_id.clone()) {
            debug!("[LEDGER] Fill {} already applied", fill.fill_id);
            return None;
        }

        let current = self.positions.get(&fill.symbol).map(|p| p.clone());
        let (position, realized_pnl, oversold) = match (current, fill.side) {
            (None, Side::Buy) => (
                Some(Position::open(&fill.symbol, fill.quantity, fill.price, fill.timestamp)),
                None,
                0,
            ),
            (None, Side::Sell) => (None, None, fill.quantity),
            (Some(mut position), side) => {
                let effect =
                    position.apply(side, fill.quantity, fill.price, fill.commission, fill.timestamp);
                let remaining = (!effect.closed).then_some(position);
                (remaining, effect.realized_pnl, effect.oversold)
            }
        };

        if oversold > 0 {
            warn!(
                "[LEDGER] DataInconsistency: sell of {} {} exceeds holding by {}; clamped to zero",
                fill.quantity, fill.symbol, oversold
            );
        }

        match &position {
            Some(p) => {
                self.positions.insert(fill.symbol.clone(), p.clone());
                if let Err(e) = self.store.upsert_position(p).await {
                    error!("[LEDGER] Failed to persist {}: {}", fill.symbol, e);
                }
            }
            None => {
                if self.positions.remove(&fill.symbol).is_some() {
                    info!("[LEDGER] Position {} closed", fill.symbol);
                    if let Err(e) = self.store.delete_position(&fill.symbol).await {
                        error!("[LEDGER] Failed to delete {}: {}", fill.symbol, e);
                    }
                }
            }
        }

        let trade = Trade::from_fill(&fill, realized_pnl);
        if let Err(e) = self.store.record_trade(&trade).await {
            error!("[LEDGER] Failed to record trade {}: {}", trade.id, e);
        }
        self.append_journal(trade.clone()).await;

        info!(
            "[LEDGER] {} {} {} @ {} -> qty={}",
            fill.side,
            fill.quantity,
            fill.symbol,
            fill.price,
            position.as_ref().map_or(0, |p| p.quantity)
        );

        self.events
            .publish(TradingEvent::PositionUpdated {
                symbol: fill.symbol.clone(),
                position: position.clone(),
                trade: trade.clone(),
            })
            .await;

        Some(LedgerUpdate {
            trade,
            position,
            oversold,
        })
    }

    /// Snapshot of one position
    pub fn position(&self, symbol: &str) -> Option<Position> {
        self.positions.get(symbol).map(|p| p.clone())
    }

    /// Snapshot of all open positions
    pub fn positions(&self) -> Vec<Position> {
        self.positions.iter().map(|p| p.value().clone()).collect()
    }

    pub fn held_quantity(&self, symbol: &str) -> Quantity {
        self.positions.get(symbol).map_or(0, |p| p.quantity)
    }

    pub fn is_applied(&self, fill_id: &str) -> bool {
        self.applied.contains(fill_id)
    }

    /// Journal trades with `timestamp >= since`, oldest first
    pub async fn trades_since(&self, since: Timestamp) -> Vec<Trade> {
        self.journal
            .read()
            .await
            .iter()
            .filter(|t| t.timestamp >= since)
            .cloned()
            .collect()
    }

    fn writer(&self, symbol: &str) -> Arc<Mutex<()>> {
        self.writers
            .entry(symbol.to_string())
            .or_default()
            .clone()
    }

    /// Caller holds the writer lock of `trade.symbol`
    async fn append_journal(&self, trade: Trade) {
        let cutoff = trade.timestamp - self.journal_retention;
        let mut journal = self.journal.write().await;
        let expired = journal.partition_point(|t| t.timestamp < cutoff);
        // Fill ids leave the dedupe set together with their trades
        for old in journal.drain(..expired) {
            self.applied.remove(&old.fill_id);
        }
        // Keep timestamp order when fills arrive out of order
        let at = journal.partition_point(|t| t.timestamp <= trade.timestamp);
        journal.insert(at, trade);
        drop(journal);

        if expired > 0 {
            self.prune_writers();
            debug!("[LEDGER] Evicted {} trades older than {}", expired, cutoff);
        }
    }

    /// Drop writer locks of closed symbols that nobody is holding
    fn prune_writers(&self) {
        self.writers.retain(|symbol, writer| {
            Arc::strong_count(writer) > 1 || self.positions.contains_key(symbol)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_gateway::{BroadcastEventPublisher, InMemoryStore};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn ledger() -> (PositionLedger, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let events = Arc::new(BroadcastEventPublisher::new(64));
        (PositionLedger::new(store.clone(), events), store)
    }

    fn fill(id: &str, symbol: &str, side: Side, qty: Quantity, price: Decimal) -> Fill {
        Fill {
            fill_id: id.to_string(),
            order_id: format!("ord-{id}"),
            symbol: symbol.to_string(),
            side,
            quantity: qty,
            price,
            commission: Decimal::ZERO,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_weighted_average_cost() {
        let (ledger, _) = ledger();
        ledger.apply_fill(fill("f1", "AAPL", Side::Buy, 100, dec!(150))).await;
        ledger.apply_fill(fill("f2", "AAPL", Side::Buy, 50, dec!(160))).await;

        let pos = ledger.position("AAPL").unwrap();
        assert_eq!(pos.quantity, 150);
        assert_eq!(pos.avg_cost.round_dp(8), dec!(153.33333333));
    }

    #[tokio::test]
    async fn test_average_is_exact_weighted_mean() {
        let (ledger, _) = ledger();
        let buys = [(7, dec!(10.01)), (13, dec!(9.97)), (3, dec!(10.5)), (41, dec!(10.003))];
        for (i, (qty, price)) in buys.iter().enumerate() {
            ledger
                .apply_fill(fill(&format!("b{i}"), "X", Side::Buy, *qty, *price))
                .await;
        }

        let total_qty: i64 = buys.iter().map(|(q, _)| q).sum();
        let notional: Decimal = buys.iter().map(|(q, p)| Decimal::from(*q) * p).sum();
        let pos = ledger.position("X").unwrap();
        assert_eq!(pos.quantity, total_qty);
        assert_eq!(pos.avg_cost.round_dp(12), (notional / Decimal::from(total_qty)).round_dp(12));
    }

    #[tokio::test]
    async fn test_sell_keeps_cost_and_close_deletes() {
        let (ledger, store) = ledger();
        ledger.apply_fill(fill("f1", "AAPL", Side::Buy, 100, dec!(150))).await;

        let update = ledger
            .apply_fill(fill("f2", "AAPL", Side::Sell, 40, dec!(170)))
            .await
            .unwrap();
        assert_eq!(update.trade.realized_pnl, Some(dec!(800)));
        let pos = ledger.position("AAPL").unwrap();
        assert_eq!(pos.quantity, 60);
        assert_eq!(pos.avg_cost, dec!(150));

        ledger.apply_fill(fill("f3", "AAPL", Side::Sell, 60, dec!(140))).await;
        assert!(ledger.position("AAPL").is_none());
        assert!(store.position("AAPL").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_fill_applied_once() {
        let (ledger, store) = ledger();
        let first = ledger.apply_fill(fill("dup", "MSFT", Side::Buy, 10, dec!(300))).await;
        let second = ledger.apply_fill(fill("dup", "MSFT", Side::Buy, 10, dec!(300))).await;

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(ledger.held_quantity("MSFT"), 10);
        assert_eq!(store.trade_count().await, 1);
    }

    #[tokio::test]
    async fn test_oversell_clamps_and_reports() {
        let (ledger, _) = ledger();
        ledger.apply_fill(fill("f1", "TSLA", Side::Buy, 10, dec!(200))).await;
        let update = ledger
            .apply_fill(fill("f2", "TSLA", Side::Sell, 25, dec!(210)))
            .await
            .unwrap();

        assert_eq!(update.oversold, 15);
        assert!(update.position.is_none());
        assert!(ledger.position("TSLA").is_none());
    }

    #[tokio::test]
    async fn test_store_failure_does_not_lose_state() {
        let (ledger, store) = ledger();
        store.set_failing(true);

        let update = ledger.apply_fill(fill("f1", "NVDA", Side::Buy, 5, dec!(900))).await;
        assert!(update.is_some());
        assert_eq!(ledger.held_quantity("NVDA"), 5);
        assert_eq!(ledger.trades_since(Utc::now() - Duration::minutes(1)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_fills_same_symbol_serialize() {
        let (ledger, _) = ledger();
        let ledger = Arc::new(ledger);

        let mut handles = Vec::new();
        for i in 0..50 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .apply_fill(fill(&format!("c{i}"), "AMD", Side::Buy, 2, dec!(100)))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let pos = ledger.position("AMD").unwrap();
        assert_eq!(pos.quantity, 100);
        assert_eq!(pos.avg_cost, dec!(100));
    }

    #[tokio::test]
    async fn test_restore_from_store() {
        let (ledger, store) = ledger();
        ledger.apply_fill(fill("f1", "AAPL", Side::Buy, 10, dec!(150))).await;

        let events = Arc::new(BroadcastEventPublisher::new(8));
        let fresh = PositionLedger::new(store.clone(), events);
        let restored = fresh.restore(Utc::now() - Duration::hours(1)).await.unwrap();

        assert_eq!(restored, 1);
        assert_eq!(fresh.held_quantity("AAPL"), 10);
        // The journal remembers fill ids, so a replayed report is ignored
        assert!(fresh.is_applied("f1"));
        assert!(fresh.apply_fill(fill("f1", "AAPL", Side::Buy, 10, dec!(150))).await.is_none());
    }

    #[tokio::test]
    async fn test_restore_counts_only_open_positions() {
        let (ledger, store) = ledger();
        let now = Utc::now();
        store
            .upsert_position(&Position::open("AAPL", 10, dec!(150), now))
            .await
            .unwrap();
        store
            .upsert_position(&Position::open("MSFT", 0, dec!(300), now))
            .await
            .unwrap();

        let restored = ledger.restore(now - Duration::hours(1)).await.unwrap();
        assert_eq!(restored, 1);
        assert_eq!(ledger.positions().len(), 1);
        assert!(ledger.position("MSFT").is_none());
    }

    #[tokio::test]
    async fn test_old_fill_ids_and_idle_writers_are_evicted() {
        let store = Arc::new(InMemoryStore::new());
        let events = Arc::new(BroadcastEventPublisher::new(64));
        let ledger = PositionLedger::new(store, events).with_journal_retention(Duration::minutes(10));
        let start = Utc::now();

        let at = |id: &str, symbol: &str, side: Side, minutes: i64| Fill {
            timestamp: start + Duration::minutes(minutes),
            ..fill(id, symbol, side, 10, dec!(100))
        };
        ledger.apply_fill(at("f1", "AAPL", Side::Buy, 0)).await;
        ledger.apply_fill(at("f2", "AAPL", Side::Sell, 1)).await;
        ledger.apply_fill(at("f3", "MSFT", Side::Buy, 2)).await;
        assert!(ledger.writers.contains_key("AAPL"));

        ledger.apply_fill(at("f4", "NVDA", Side::Buy, 12)).await;

        assert!(!ledger.is_applied("f1"));
        assert!(!ledger.is_applied("f2"));
        assert!(ledger.is_applied("f3"));
        assert!(ledger.is_applied("f4"));
        assert_eq!(ledger.applied.len(), 2);
        assert_eq!(ledger.trades_since(start - Duration::hours(1)).await.len(), 2);

        // AAPL is closed and idle; MSFT still holds shares
        assert!(!ledger.writers.contains_key("AAPL"));
        assert!(ledger.writers.contains_key("MSFT"));
        assert_eq!(ledger.held_quantity("MSFT"), 10);
    }
}
