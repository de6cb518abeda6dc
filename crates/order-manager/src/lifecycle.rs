//! Order Lifecycle Manager
//!
//! Submits, tracks and cancels orders against the brokerage and forwards
//! every resolved fill to the [`PositionLedger`].
//!
//! ```text
//! submit ──► Pending ──► PartiallyFilled ──► Filled
//!               │              │
//!               │              └──────────► Cancelled
//!               ├──► Filled
//!               ├──► Cancelled
//!               └──► Rejected
//! ```
//!
//! Local state is never inferred from a request's own response: after a
//! cancel (or on every poll) the brokerage's status is re-queried and the
//! order reconciled from it. Reconciliation of one order is serialized, and
//! fills are identified by `(order id, cumulative filled quantity)`, so a fill
//! reaches the ledger exactly once no matter how many polls, pushes or
//! cancels observe it.

use bastion_core::{
    AccountSnapshot, Fill, Order, OrderId, OrderRequest, OrderStatus, TradingEvent,
};
use bastion_ports::{BrokerError, BrokerageApi, Clock, EventPublisher, FillDetails};
use dashmap::{DashMap, DashSet};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::gate::TradingGate;
use crate::ledger::{LedgerUpdate, PositionLedger};

/// Polling schedule for order tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackingConfig {
    /// First backoff delay
    pub initial_delay_ms: u64,
    /// Backoff ceiling
    pub max_delay_ms: u64,
    /// Status queries before giving up
    pub max_attempts: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_attempts: 30,
        }
    }
}

impl TrackingConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Double the delay, capped at the ceiling
    pub fn next_delay(&self, current: Duration) -> Duration {
        (current * 2).min(Duration::from_millis(self.max_delay_ms))
    }
}

pub struct OrderLifecycleManager {
    broker: Arc<dyn BrokerageApi>,
    ledger: Arc<PositionLedger>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    gate: Arc<TradingGate>,
    config: TrackingConfig,
    orders: DashMap<OrderId, Order>,
    order_locks: DashMap<OrderId, Arc<Mutex<()>>>,
    stop_signals: DashMap<OrderId, watch::Sender<bool>>,
    stale: DashSet<OrderId>,
    account: RwLock<Option<AccountSnapshot>>,
    connected: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl OrderLifecycleManager {
    pub fn new(
        broker: Arc<dyn BrokerageApi>,
        ledger: Arc<PositionLedger>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        gate: Arc<TradingGate>,
        config: TrackingConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            broker,
            ledger,
            events,
            clock,
            gate,
            config,
            orders: DashMap::new(),
            order_locks: DashMap::new(),
            stop_signals: DashMap::new(),
            stale: DashSet::new(),
            account: RwLock::new(None),
            connected: AtomicBool::new(false),
            shutdown,
        }
    }

    // ========================================================================
    // Connection and account
    // ========================================================================

    /// Probe the brokerage with an account query and mark the session connected
    pub async fn connect(&self) -> Result<AccountSnapshot> {
        match self.broker.get_account_info().await {
            Ok(snapshot) => {
                *self.account.write().await = Some(snapshot.clone());
                self.connected.store(true, Ordering::SeqCst);
                info!("[OLM] Connected, total assets {}", snapshot.total_assets);
                Ok(snapshot)
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                warn!("[OLM] Connect failed: {}", e);
                Err(Error::Connection(e.to_string()))
            }
        }
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        info!("[OLM] Disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Fetch and cache a fresh account snapshot
    pub async fn refresh_account(&self) -> Result<AccountSnapshot> {
        let snapshot = self.broker.get_account_info().await?;
        *self.account.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Last cached account snapshot
    pub async fn account(&self) -> Option<AccountSnapshot> {
        self.account.read().await.clone()
    }

    pub fn gate(&self) -> &Arc<TradingGate> {
        &self.gate
    }

    pub fn ledger(&self) -> &Arc<PositionLedger> {
        &self.ledger
    }

    // ========================================================================
    // Submit / cancel
    // ========================================================================

    /// Send an order and create its local `Pending` record
    pub async fn submit(&self, request: OrderRequest) -> Result<OrderId> {
        request.validate()?;
        if !self.is_connected() {
            return Err(Error::Connection("session not connected".to_string()));
        }
        self.gate.check(&request)?;

        let ack = match self.broker.submit_order(&request).await {
            Ok(ack) => ack,
            Err(BrokerError::Network(detail)) => {
                warn!(
                    "[OLM] Submit {} outcome unknown: {}",
                    request.client_order_id, detail
                );
                return Err(Error::Network(detail));
            }
            Err(e) => return Err(e.into()),
        };

        if !ack.success {
            let code = ack.error_code.unwrap_or_else(|| "UNKNOWN".to_string());
            let message = ack.message.unwrap_or_default();
            warn!(
                "[OLM] Brokerage rejected {} {} {}: [{}] {}",
                request.side, request.quantity, request.symbol, code, message
            );
            return Err(Error::BrokerRejected { code, message });
        }
        let order_id = ack
            .order_id
            .ok_or_else(|| Error::Broker("accepted order without an order id".to_string()))?;

        let now = self.clock.now();
        let order = Order::from_request(order_id.clone(), &request, now);
        self.orders.insert(order_id.clone(), order);

        info!(
            "[OLM] Submitted {} {} {} x{} ({:?}) -> {}",
            request.client_order_id,
            request.side,
            request.symbol,
            request.quantity,
            request.order_type,
            order_id
        );
        self.events
            .publish(TradingEvent::OrderStatusChanged {
                order_id: order_id.clone(),
                symbol: request.symbol.clone(),
                previous: None,
                status: OrderStatus::Pending,
                timestamp: now,
            })
            .await;

        Ok(order_id)
    }

    /// Request cancellation, then reconcile from the brokerage's status.
    ///
    /// Returns the authoritative status, which may be `Filled` if a fill won
    /// the race.
    pub async fn cancel(&self, order_id: &str) -> Result<OrderStatus> {
        if !self.is_connected() {
            return Err(Error::Connection("session not connected".to_string()));
        }
        let local = self
            .order(order_id)
            .ok_or_else(|| Error::UnknownOrder(order_id.to_string()))?;
        if local.status.is_terminal() {
            return Ok(local.status);
        }

        match self.broker.cancel_order(order_id).await {
            Ok(true) => info!("[OLM] Cancel accepted for {}", order_id),
            Ok(false) => info!("[OLM] Cancel refused for {}, re-querying", order_id),
            Err(BrokerError::Network(detail)) => {
                warn!("[OLM] Cancel for {} outcome unknown ({}), re-querying", order_id, detail)
            }
            Err(e) => return Err(e.into()),
        }

        let status = self.reconcile(order_id).await?;
        if status.is_terminal() {
            if let Some(stop) = self.stop_signals.get(order_id) {
                stop.send_replace(true);
            }
        }
        Ok(status)
    }

    // ========================================================================
    // Tracking
    // ========================================================================

    /// Poll until the order is terminal, with exponential backoff.
    ///
    /// Ends with `Err(PollingTimeout)` once the attempt budget is spent; the
    /// order keeps its last known state and is listed by [`Self::stale_orders`].
    /// [`Self::stop_tracking`] and [`Self::shutdown`] interrupt the backoff wait.
    pub async fn track(&self, order_id: &str) -> Result<OrderStatus> {
        let mut last_status = self
            .order(order_id)
            .ok_or_else(|| Error::UnknownOrder(order_id.to_string()))?
            .status;
        let mut stop = self
            .stop_signals
            .entry(order_id.to_string())
            .or_insert_with(|| watch::channel(false).0)
            .subscribe();
        let mut shutdown = self.shutdown.subscribe();
        let mut delay = self.config.initial_delay();
        let max_attempts = self.config.max_attempts;
        let (mut stop_open, mut shutdown_open) = (true, true);

        for attempt in 1..=max_attempts {
            if *stop.borrow() || *shutdown.borrow() {
                return self.tracking_stopped(order_id);
            }

            match self.reconcile(order_id).await {
                Ok(status) => {
                    last_status = status;
                    if status.is_terminal() {
                        debug!("[OLM] {} resolved {} after {} polls", order_id, status, attempt);
                        self.stop_signals.remove(order_id);
                        return Ok(status);
                    }
                }
                Err(Error::UnknownOrder(id)) => return Err(Error::UnknownOrder(id)),
                Err(e) => warn!(
                    "[OLM] Poll {}/{} for {} failed: {}",
                    attempt, max_attempts, order_id, e
                ),
            }

            if attempt == max_attempts {
                break;
            }
            // A closed channel must not turn the wait into a spin
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                res = stop.changed(), if stop_open => stop_open = res.is_ok(),
                res = shutdown.changed(), if shutdown_open => shutdown_open = res.is_ok(),
            }
            delay = self.config.next_delay(delay);
        }

        self.stop_signals.remove(order_id);
        self.stale.insert(order_id.to_string());
        warn!(
            "[OLM] {} still {} after {} polls, needs manual reconciliation",
            order_id, last_status, max_attempts
        );
        Err(Error::PollingTimeout {
            order_id: order_id.to_string(),
            attempts: max_attempts,
            last_status,
        })
    }

    /// Run [`Self::track`] as an independent task
    pub fn spawn_tracking(self: &Arc<Self>, order_id: OrderId) -> JoinHandle<Result<OrderStatus>> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.track(&order_id).await })
    }

    /// Interrupt the tracker of one order at its next wake-up
    pub fn stop_tracking(&self, order_id: &str) {
        if let Some(stop) = self.stop_signals.get(order_id) {
            stop.send_replace(true);
        }
    }

    /// Interrupt every tracker
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        info!("[OLM] Shutdown requested");
    }

    fn tracking_stopped(&self, order_id: &str) -> Result<OrderStatus> {
        self.stop_signals.remove(order_id);
        match self.order(order_id) {
            Some(order) if order.status.is_terminal() => Ok(order.status),
            _ => Err(Error::TrackingStopped(order_id.to_string())),
        }
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Re-query the brokerage and bring the local order up to date
    pub async fn reconcile(&self, order_id: &str) -> Result<OrderStatus> {
        let lock = self.order_lock(order_id);
        let _guard = lock.lock().await;

        let local = self
            .order(order_id)
            .ok_or_else(|| Error::UnknownOrder(order_id.to_string()))?;
        let status = self.broker.get_order_status(order_id).await?;

        if local.status.is_terminal() {
            if status != local.status {
                warn!(
                    "[OLM] {} is {} locally but brokerage reports {}; keeping local",
                    order_id, local.status, status
                );
            }
            return Ok(local.status);
        }

        if matches!(
            status,
            OrderStatus::PartiallyFilled | OrderStatus::Filled | OrderStatus::Cancelled
        ) {
            // A terminal status without its fills would lose them for good
            let details = self.broker.get_fill_details(order_id).await?;
            self.apply_details_locked(order_id, details).await;
        }

        Ok(self.transition_locked(order_id, status).await)
    }

    /// Feed a pushed fill report through the same idempotent path as polling
    pub async fn apply_fill_report(
        &self,
        order_id: &str,
        details: FillDetails,
    ) -> Result<Option<LedgerUpdate>> {
        let lock = self.order_lock(order_id);
        let _guard = lock.lock().await;

        let order = self
            .order(order_id)
            .ok_or_else(|| Error::UnknownOrder(order_id.to_string()))?;
        if order.status.is_terminal() {
            debug!("[OLM] Ignoring fill report for terminal order {}", order_id);
            return Ok(None);
        }

        let filled = details.filled_quantity;
        let update = self.apply_details_locked(order_id, details).await;
        let target = if filled >= order.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        if filled > 0 {
            self.transition_locked(order_id, target).await;
        }
        Ok(update)
    }

    /// Reconcile every non-terminal order once. Returns how many were checked.
    pub async fn reconcile_open_orders(&self) -> usize {
        let open: Vec<OrderId> = self.open_orders().into_iter().map(|o| o.id).collect();
        for order_id in &open {
            if let Err(e) = self.reconcile(order_id).await {
                warn!("[OLM] Reconcile of {} failed: {}", order_id, e);
            }
        }
        open.len()
    }

    /// Forget terminal orders last updated before the ledger's journal
    /// window, with their locks and tracking state. Returns how many went.
    pub fn prune_settled(&self) -> usize {
        let cutoff = self.clock.now() - self.ledger.journal_retention();
        let before = self.orders.len();
        self.orders
            .retain(|_, order| !(order.status.is_terminal() && order.updated_at < cutoff));
        let pruned = before.saturating_sub(self.orders.len());

        // A lock someone still holds stays until the next pass
        self.order_locks
            .retain(|id, lock| Arc::strong_count(lock) > 1 || self.orders.contains_key(id));
        self.stop_signals.retain(|id, _| self.orders.contains_key(id));
        self.stale.retain(|id| self.orders.contains_key(id));

        if pruned > 0 {
            debug!("[OLM] Pruned {} settled orders older than {}", pruned, cutoff);
        }
        pruned
    }

    /// Turn cumulative fill figures into an incremental fill for the ledger.
    /// Caller holds the order lock.
    async fn apply_details_locked(&self, order_id: &str, details: FillDetails) -> Option<LedgerUpdate> {
        let now = self.clock.now();
        let fill = {
            let mut order = self.orders.get_mut(order_id)?;
            let prev_qty = order.filled_quantity;
            let prev_avg = order.avg_fill_price.unwrap_or(Decimal::ZERO);
            let prev_commission = order.commission;

            let delta = order.record_fill(
                details.filled_quantity,
                details.avg_fill_price,
                details.commission,
                now,
            );
            if delta == 0 {
                return None;
            }
            if order.filled_quantity > order.quantity {
                warn!(
                    "[OLM] {} reports {} filled on an order for {}",
                    order_id, order.filled_quantity, order.quantity
                );
            }

            // Price of the new shares from the change in cumulative notional
            let notional = details.avg_fill_price * Decimal::from(details.filled_quantity)
                - prev_avg * Decimal::from(prev_qty);
            let mut price = notional / Decimal::from(delta);
            if price <= Decimal::ZERO {
                price = details.avg_fill_price;
            }

            Fill {
                fill_id: Fill::cumulative_id(order_id, details.filled_quantity),
                order_id: order_id.to_string(),
                symbol: order.symbol.clone(),
                side: order.side,
                quantity: delta,
                price,
                commission: (details.commission - prev_commission).max(Decimal::ZERO),
                timestamp: now,
            }
        };

        self.ledger.apply_fill(fill).await
    }

    /// Walk the order to `target`. Illegal edges are logged and leave the
    /// order unchanged. Caller holds the order lock.
    async fn transition_locked(&self, order_id: &str, target: OrderStatus) -> OrderStatus {
        let now = self.clock.now();
        let (symbol, status, changes) = {
            let Some(mut order) = self.orders.get_mut(order_id) else {
                return target;
            };

            let mut path = Vec::with_capacity(2);
            if order.status == OrderStatus::Pending
                && target == OrderStatus::Cancelled
                && order.filled_quantity > 0
            {
                path.push(OrderStatus::PartiallyFilled);
            }
            path.push(target);

            let mut changes = Vec::new();
            for next in path {
                let previous = order.status;
                match order.transition(next, now) {
                    Ok(true) => changes.push((previous, next)),
                    Ok(false) => {}
                    Err(e) => {
                        warn!("[OLM] Rejected transition for {}: {}", order_id, e);
                        break;
                    }
                }
            }
            (order.symbol.clone(), order.status, changes)
        };

        for (previous, next) in changes {
            info!("[OLM] {} {} -> {}", order_id, previous, next);
            self.events
                .publish(TradingEvent::OrderStatusChanged {
                    order_id: order_id.to_string(),
                    symbol: symbol.clone(),
                    previous: Some(previous),
                    status: next,
                    timestamp: now,
                })
                .await;
        }
        status
    }

    fn order_lock(&self, order_id: &str) -> Arc<Mutex<()>> {
        self.order_locks
            .entry(order_id.to_string())
            .or_default()
            .clone()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).map(|o| o.clone())
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.iter().map(|o| o.value().clone()).collect()
    }

    pub fn open_orders(&self) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|o| o.status.is_active())
            .map(|o| o.value().clone())
            .collect()
    }

    /// Orders whose tracking timed out without a terminal status
    pub fn stale_orders(&self) -> Vec<Order> {
        self.stale
            .iter()
            .filter_map(|id| self.order(id.key()))
            .filter(|o| !o.status.is_terminal())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_to_cap() {
        let config = TrackingConfig::default();
        let mut delay = config.initial_delay();
        let mut schedule = Vec::new();
        for _ in 0..7 {
            schedule.push(delay.as_secs());
            delay = config.next_delay(delay);
        }
        assert_eq!(schedule, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        let parsed: std::result::Result<TrackingConfig, _> =
            serde_json::from_str(r#"{"max_attempts": 5, "max_retries": 3}"#);
        assert!(parsed.is_err());

        let partial: TrackingConfig = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(partial.max_attempts, 5);
        assert_eq!(partial.initial_delay_ms, 1_000);
    }
}
