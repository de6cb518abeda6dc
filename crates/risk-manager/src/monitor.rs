//! Real-time Risk Monitor
//!
//! Fixed-interval control loop over the account snapshot and the position
//! ledger. Each tick evaluates every rule, raises alerts, and hands
//! mitigating orders to the Order Lifecycle Manager without waiting for them.
//!
//! ```text
//!  tick ─► purge expired alerts
//!       ─► account snapshot (fresh, else cached)
//!       ─► price + history per position ──► PositionRisk
//!       ─► account rules:  cash │ margin ─► reduce │ total loss ─► emergency
//!       ─► position rules: loss ─► stop │ concentration │ volatility
//!       ─► abnormal trading detector over the trade window
//!       ─► dispatch mitigations (one in flight per symbol, a more urgent
//!          kind withdraws the one in flight)
//!       ─► derive account status ─► TradingGate
//! ```
//!
//! Ticks never overlap: a tick that fires while the previous one is still
//! evaluating is skipped and counted.

use bastion_core::{
    AccountSnapshot, AccountStatus, AlertSeverity, AlertType, OrderId, OrderRequest, Position,
    Price, Quantity, RiskAction, RiskAlert, Side, Symbol, TimeInForce, Timeframe, Timestamp,
    TradingEvent, return_volatility,
};
use bastion_order_manager::OrderLifecycleManager;
use bastion_ports::{Clock, EventPublisher, MarketDataError, MarketDataProvider};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{RwLock, watch};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::abnormal::{AbnormalRule, AbnormalTradingDetector, DetectionContext, DetectionReport};
use crate::alerts::AlertBook;
use crate::error::Result;
use crate::position_risk::PositionRisk;
use crate::thresholds::{MarketSession, MonitorConfig, RiskThresholds};

// ============================================================================
// Mitigation types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MitigationKind {
    /// Full close of a losing position
    StopLoss,
    /// Partial close while margin usage is excessive
    Reduce,
    /// Full close during an emergency stop
    EmergencyClose,
}

impl MitigationKind {
    fn client_prefix(&self) -> &'static str {
        match self {
            MitigationKind::StopLoss | MitigationKind::EmergencyClose => "AUTO_STOP",
            MitigationKind::Reduce => "AUTO_REDUCE",
        }
    }

    /// Lower runs first when two plans target the same symbol
    fn priority(&self) -> u8 {
        match self {
            MitigationKind::EmergencyClose => 0,
            MitigationKind::StopLoss => 1,
            MitigationKind::Reduce => 2,
        }
    }
}

/// A mitigating order chosen by a rule, not yet submitted
#[derive(Debug, Clone, PartialEq)]
pub struct MitigationPlan {
    pub kind: MitigationKind,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub reference_price: Price,
}

impl MitigationPlan {
    /// Market IOC order carrying an `AUTO_STOP_` / `AUTO_REDUCE_` client id
    pub fn request(&self) -> OrderRequest {
        OrderRequest::market(self.symbol.clone(), self.side, self.quantity)
            .with_time_in_force(TimeInForce::Ioc)
            .with_client_order_id(format!("{}_{}", self.kind.client_prefix(), Uuid::new_v4()))
    }
}

/// The mitigation currently owning a symbol
#[derive(Debug, Clone)]
struct InFlight {
    kind: MitigationKind,
    seq: u64,
    /// Set once the brokerage accepts the order
    order_id: Option<OrderId>,
}

/// A mitigating order the brokerage accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationRecord {
    pub kind: MitigationKind,
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub reference_price: Price,
    pub order_id: OrderId,
    pub client_order_id: String,
    pub timestamp: Timestamp,
}

// ============================================================================
// Reports and metrics
// ============================================================================

/// Outcome of one evaluation pass
#[derive(Debug, Clone)]
pub struct TickReport {
    pub at: Timestamp,
    /// Alerts that were not already active
    pub new_alerts: Vec<RiskAlert>,
    /// Mitigations handed to the order manager this tick
    pub dispatched: Vec<MitigationPlan>,
    /// Plans dropped because an equal or more urgent mitigation owns the symbol
    pub suppressed: Vec<MitigationPlan>,
    /// Rules that could not be evaluated, with the reason
    pub failures: Vec<String>,
    pub detection: DetectionReport,
    pub status: AccountStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringMetrics {
    pub total_checks: u64,
    pub skipped_ticks: u64,
    pub last_check: Option<Timestamp>,
    pub active_alerts: usize,
    pub mitigations: usize,
    pub emergency_stops: u64,
}

/// Clears the running flag when a tick ends, including on early return
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Monitor
// ============================================================================

pub struct RiskMonitor {
    olm: Arc<OrderLifecycleManager>,
    market_data: Arc<dyn MarketDataProvider>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    thresholds: RwLock<RiskThresholds>,
    config: MonitorConfig,
    session: MarketSession,
    alerts: AlertBook,
    position_risks: DashMap<Symbol, PositionRisk>,
    in_flight: DashMap<Symbol, InFlight>,
    dispatch_seq: AtomicU64,
    mitigations: RwLock<Vec<MitigationRecord>>,
    running: AtomicBool,
    emergency: AtomicBool,
    total_checks: AtomicU64,
    skipped_ticks: AtomicU64,
    emergency_stops: AtomicU64,
    last_check: RwLock<Option<Timestamp>>,
    shutdown: watch::Sender<bool>,
}

impl RiskMonitor {
    pub fn new(
        olm: Arc<OrderLifecycleManager>,
        market_data: Arc<dyn MarketDataProvider>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        thresholds: RiskThresholds,
        config: MonitorConfig,
        session: MarketSession,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            olm,
            market_data,
            events,
            clock,
            thresholds: RwLock::new(thresholds),
            alerts: AlertBook::new(config.alert_ttl()),
            config,
            session,
            position_risks: DashMap::new(),
            in_flight: DashMap::new(),
            dispatch_seq: AtomicU64::new(0),
            mitigations: RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
            emergency: AtomicBool::new(false),
            total_checks: AtomicU64::new(0),
            skipped_ticks: AtomicU64::new(0),
            emergency_stops: AtomicU64::new(0),
            last_check: RwLock::new(None),
            shutdown,
        }
    }

    /// Tick until [`Self::stop`] is called
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = self.shutdown.subscribe();
        info!(
            "[RISK] Monitor started, tick every {}ms",
            self.config.tick_interval_ms
        );

        // stop() may land before the first poll of this task
        while !*shutdown.borrow_and_update() {
            tokio::select! {
                _ = interval.tick() => {
                    // Spawned so a slow tick makes the next one skip instead of queueing
                    let monitor = Arc::clone(&self);
                    tokio::spawn(async move {
                        monitor.tick().await;
                    });
                }
                res = shutdown.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
            }
        }
        info!("[RISK] Monitor stopped");
    }

    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Evaluate every rule once. Returns `None` when another tick is still
    /// running.
    pub async fn tick(self: &Arc<Self>) -> Option<TickReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.skipped_ticks.fetch_add(1, Ordering::SeqCst);
            debug!("[RISK] Previous tick still running, skipping");
            return None;
        }
        let _guard = TickGuard(&self.running);

        let now = self.clock.now();
        let thresholds = self.thresholds.read().await.clone();
        let mut report = TickReport {
            at: now,
            new_alerts: Vec::new(),
            dispatched: Vec::new(),
            suppressed: Vec::new(),
            failures: Vec::new(),
            detection: DetectionReport::default(),
            status: self.olm.gate().status(),
        };

        let expired = self.alerts.purge_expired(now);
        if expired > 0 {
            debug!("[RISK] {} alerts expired", expired);
        }
        self.olm.prune_settled();

        let account = match self.olm.refresh_account().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                let cached = self.olm.account().await;
                let note = if cached.is_some() { "using cached snapshot" } else { "account rules skipped" };
                report.failures.push(format!("account refresh: {e} ({note})"));
                cached
            }
        };

        let risks = self.assess_positions(&mut report).await;
        let mut plans = Vec::new();

        if let Some(account) = &account {
            self.check_account(account, &thresholds, &risks, &mut plans, &mut report)
                .await;
        }
        self.check_positions(&thresholds, &risks, &mut plans, &mut report)
            .await;
        self.check_trading(account.as_ref(), &thresholds, &risks, &mut report)
            .await;

        self.dispatch_all(plans, &mut report);
        report.status = self.update_status(now).await;

        for failure in &report.failures {
            warn!("[RISK] Rule skipped: {}", failure);
        }
        self.total_checks.fetch_add(1, Ordering::SeqCst);
        *self.last_check.write().await = Some(now);
        Some(report)
    }

    // ========================================================================
    // Rule evaluation
    // ========================================================================

    /// Price every position. A symbol without a price is left out of this
    /// tick's position rules; the others proceed. It still counts toward the
    /// portfolio value at its last known price, else at cost, so the other
    /// symbols' concentration is measured against the whole book.
    async fn assess_positions(&self, report: &mut TickReport) -> Vec<(Position, PositionRisk)> {
        let positions = self.olm.ledger().positions();
        let mut priced = Vec::with_capacity(positions.len());
        let mut unpriced_value = Decimal::ZERO;
        for position in positions {
            match self.market_data.current_price(&position.symbol).await {
                Ok(price) => priced.push((position, price)),
                Err(e) => {
                    let last = self
                        .position_risks
                        .get(&position.symbol)
                        .map_or(position.avg_cost, |r| r.current_price);
                    unpriced_value += position.market_value(last);
                    report
                        .failures
                        .push(format!("price for {}: {e}", position.symbol));
                }
            }
        }

        let portfolio_value: Decimal = priced
            .iter()
            .map(|(position, price)| position.market_value(*price))
            .sum::<Decimal>()
            + unpriced_value;

        let mut risks = Vec::with_capacity(priced.len());
        for (position, price) in priced {
            let volatility = match self.daily_volatility(&position.symbol).await {
                Ok(v) => v,
                Err(e) => {
                    report
                        .failures
                        .push(format!("volatility for {}: {e}", position.symbol));
                    None
                }
            };
            let risk = PositionRisk::assess(&position, price, portfolio_value, volatility);
            self.position_risks.insert(position.symbol.clone(), risk.clone());
            risks.push((position, risk));
        }

        // Closed positions drop out of the snapshot
        self.position_risks
            .retain(|symbol, _| risks.iter().any(|(p, _)| &p.symbol == symbol));
        risks
    }

    async fn daily_volatility(&self, symbol: &str) -> std::result::Result<Option<Decimal>, MarketDataError> {
        let bars = self
            .market_data
            .history(symbol, Timeframe::OneDay, self.config.volatility_lookback_days)
            .await?;
        let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
        Ok(return_volatility(&closes))
    }

    async fn check_account(
        &self,
        account: &AccountSnapshot,
        thresholds: &RiskThresholds,
        risks: &[(Position, PositionRisk)],
        plans: &mut Vec<MitigationPlan>,
        report: &mut TickReport,
    ) {
        let now = report.at;

        if account.available_cash < thresholds.min_cash_reserve {
            self.raise_into(
                report,
                RiskAlert::new(
                    AlertType::CashShortage,
                    AlertSeverity::High,
                    None,
                    "available cash below reserve",
                    account.available_cash,
                    thresholds.min_cash_reserve,
                    RiskAction::RequireAttention,
                    now,
                ),
            )
            .await;
        }

        if let Some(usage) = account.margin_usage()
            && usage > thresholds.max_margin_usage
        {
            self.raise_into(
                report,
                RiskAlert::new(
                    AlertType::MarginExcess,
                    AlertSeverity::Critical,
                    None,
                    "margin usage too high",
                    usage,
                    thresholds.max_margin_usage,
                    RiskAction::AutoReduce,
                    now,
                ),
            )
            .await;
            plans.extend(self.reduction_plans(risks));
        }

        if let Some(ratio) = account.total_pnl_ratio()
            && ratio < -thresholds.max_total_loss_ratio
        {
            self.raise_into(
                report,
                RiskAlert::new(
                    AlertType::TotalLoss,
                    AlertSeverity::Critical,
                    None,
                    "account total loss too large",
                    ratio.abs(),
                    thresholds.max_total_loss_ratio,
                    RiskAction::EmergencyStop,
                    now,
                ),
            )
            .await;
            self.engage_emergency_stop(report).await;
            for (position, risk) in risks {
                if let Some(plan) = close_plan(MitigationKind::EmergencyClose, position, risk.current_price) {
                    plans.push(plan);
                }
            }
        }
    }

    /// Half of each of the worst positions by loss ratio
    fn reduction_plans(&self, risks: &[(Position, PositionRisk)]) -> Vec<MitigationPlan> {
        let mut ranked: Vec<&(Position, PositionRisk)> = risks.iter().collect();
        ranked.sort_by(|a, b| b.1.loss_ratio.cmp(&a.1.loss_ratio));

        ranked
            .into_iter()
            .take(self.config.reduce_top_n)
            .filter_map(|(position, risk)| {
                let quantity = (Decimal::from(position.quantity) * self.config.reduce_fraction)
                    .trunc()
                    .to_i64()?;
                (quantity > 0).then(|| MitigationPlan {
                    kind: MitigationKind::Reduce,
                    symbol: position.symbol.clone(),
                    side: Side::Sell,
                    quantity,
                    reference_price: risk.current_price,
                })
            })
            .collect()
    }

    async fn check_positions(
        &self,
        thresholds: &RiskThresholds,
        risks: &[(Position, PositionRisk)],
        plans: &mut Vec<MitigationPlan>,
        report: &mut TickReport,
    ) {
        let now = report.at;
        for (position, risk) in risks {
            let symbol = Some(risk.symbol.clone());

            if risk.loss_ratio > thresholds.max_single_position_loss {
                self.raise_into(
                    report,
                    RiskAlert::new(
                        AlertType::PositionLoss,
                        AlertSeverity::High,
                        symbol.clone(),
                        format!("{} position loss too large", risk.symbol),
                        risk.loss_ratio,
                        thresholds.max_single_position_loss,
                        RiskAction::AutoStop,
                        now,
                    ),
                )
                .await;
                if let Some(plan) = close_plan(MitigationKind::StopLoss, position, risk.current_price) {
                    plans.push(plan);
                }
            }

            if risk.concentration > thresholds.max_position_concentration {
                self.raise_into(
                    report,
                    RiskAlert::new(
                        AlertType::Concentration,
                        AlertSeverity::Medium,
                        symbol.clone(),
                        AbnormalRule::Concentration.message(Some(&risk.symbol)),
                        risk.concentration,
                        thresholds.max_position_concentration,
                        RiskAction::RequireAttention,
                        now,
                    ),
                )
                .await;
            }

            if let Some(volatility) = risk.volatility
                && volatility > thresholds.max_price_volatility
            {
                self.raise_into(
                    report,
                    RiskAlert::new(
                        AlertType::Volatility,
                        AlertSeverity::Medium,
                        symbol,
                        format!("{} price volatility abnormal", risk.symbol),
                        volatility,
                        thresholds.max_price_volatility,
                        RiskAction::RequireAttention,
                        now,
                    ),
                )
                .await;
            }
        }
    }

    async fn check_trading(
        &self,
        account: Option<&AccountSnapshot>,
        thresholds: &RiskThresholds,
        risks: &[(Position, PositionRisk)],
        report: &mut TickReport,
    ) {
        let since = report.at - self.config.trade_window();
        let trades = self.olm.ledger().trades_since(since).await;
        if trades.is_empty() {
            return;
        }

        let mut ctx = DetectionContext {
            total_assets: account.map(|a| a.total_assets).unwrap_or_default(),
            ..Default::default()
        };
        for (_, risk) in risks {
            ctx.portfolio_value += risk.market_value;
            ctx.position_values
                .insert(risk.symbol.clone(), risk.market_value);
        }
        for trade in &trades {
            if ctx.trailing_averages.contains_key(&trade.symbol) {
                continue;
            }
            match self.trailing_average(&trade.symbol).await {
                Ok(Some(avg)) => {
                    ctx.trailing_averages.insert(trade.symbol.clone(), avg);
                }
                Ok(None) => {}
                Err(e) => report
                    .failures
                    .push(format!("trailing average for {}: {e}", trade.symbol)),
            }
        }

        let detector = AbnormalTradingDetector::new(
            thresholds.clone(),
            self.session.clone(),
            self.config.large_trade_ratio,
        );
        let detection = detector.evaluate_window(&trades, &ctx);
        if !detection.is_clean() {
            debug!(
                "[DETECT] {} trades in window, fired: {:?}",
                trades.len(),
                detection.rule_names()
            );
        }
        let now = report.at;
        for finding in &detection.findings {
            self.raise_into(report, finding.to_alert(now)).await;
        }
        report.detection = detection;
    }

    async fn trailing_average(&self, symbol: &str) -> std::result::Result<Option<Price>, MarketDataError> {
        let bars = self
            .market_data
            .history(symbol, Timeframe::OneDay, self.config.trailing_average_days)
            .await?;
        if bars.is_empty() {
            return Ok(None);
        }
        let sum: Decimal = bars.iter().map(|b| b.close).sum();
        Ok(Some(sum / Decimal::from(bars.len())))
    }

    // ========================================================================
    // Mitigation
    // ========================================================================

    /// Submit plans by priority, at most one per symbol. A symbol whose
    /// previous mitigation is still being tracked is skipped unless the new
    /// plan is more urgent, in which case the old order is withdrawn first.
    fn dispatch_all(self: &Arc<Self>, mut plans: Vec<MitigationPlan>, report: &mut TickReport) {
        plans.sort_by_key(|p| p.kind.priority());
        for plan in plans {
            let seq = self.dispatch_seq.fetch_add(1, Ordering::SeqCst);
            let claim = InFlight {
                kind: plan.kind,
                seq,
                order_id: None,
            };
            let superseded = match self.in_flight.entry(plan.symbol.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(claim);
                    None
                }
                Entry::Occupied(mut slot) => {
                    let current = slot.get().kind;
                    if plan.kind.priority() >= current.priority() {
                        debug!(
                            "[RISK] {:?} for {} skipped, {:?} already in flight",
                            plan.kind, plan.symbol, current
                        );
                        report.suppressed.push(plan);
                        continue;
                    }
                    Some(slot.insert(claim))
                }
            };

            match &superseded {
                Some(previous) => warn!(
                    "[RISK] {:?} for {} supersedes in-flight {:?}",
                    plan.kind, plan.symbol, previous.kind
                ),
                None => info!(
                    "[RISK] Dispatching {:?}: sell {} {} @~{}",
                    plan.kind, plan.quantity, plan.symbol, plan.reference_price
                ),
            }
            report.dispatched.push(plan.clone());

            let monitor = Arc::clone(self);
            tokio::spawn(async move {
                let symbol = plan.symbol.clone();
                let mut plan = plan;
                if let Some(previous) = superseded {
                    monitor.withdraw(&symbol, previous).await;
                    // Whatever the withdrawn order filled is already off the book
                    plan.quantity = plan.quantity.min(monitor.olm.ledger().held_quantity(&symbol));
                }
                if plan.quantity > 0 {
                    monitor.execute(plan, seq).await;
                }
                monitor.in_flight.remove_if(&symbol, |_, owner| owner.seq == seq);
            });
        }
    }

    /// Cancel the order of a superseded mitigation. One not yet accepted is
    /// cancelled by its own task once it sees it lost the symbol.
    async fn withdraw(&self, symbol: &str, previous: InFlight) {
        let Some(order_id) = previous.order_id else {
            return;
        };
        match self.olm.cancel(&order_id).await {
            Ok(status) => info!(
                "[RISK] Withdrew {:?} {} for {}: {}",
                previous.kind, order_id, symbol, status
            ),
            Err(e) => warn!(
                "[RISK] Withdrawing {:?} {} for {} failed: {}",
                previous.kind, order_id, symbol, e
            ),
        }
    }

    fn owns(&self, symbol: &str, seq: u64) -> bool {
        self.in_flight.get(symbol).is_some_and(|owner| owner.seq == seq)
    }

    async fn execute(&self, plan: MitigationPlan, seq: u64) {
        if !self.owns(&plan.symbol, seq) {
            debug!("[RISK] {:?} for {} superseded before submission", plan.kind, plan.symbol);
            return;
        }
        let request = plan.request();
        let client_order_id = request.client_order_id.clone();

        let order_id = match self.olm.submit(request).await {
            Ok(order_id) => order_id,
            Err(e) => {
                error!(
                    "[RISK] {:?} for {} failed: {}; re-evaluated next tick",
                    plan.kind, plan.symbol, e
                );
                return;
            }
        };

        let now = self.clock.now();
        self.mitigations.write().await.push(MitigationRecord {
            kind: plan.kind,
            symbol: plan.symbol.clone(),
            quantity: plan.quantity,
            reference_price: plan.reference_price,
            order_id: order_id.clone(),
            client_order_id,
            timestamp: now,
        });

        let (alert_type, severity, text) = match plan.kind {
            MitigationKind::Reduce => (AlertType::AutoReduce, AlertSeverity::High, "auto reduce executed"),
            MitigationKind::StopLoss | MitigationKind::EmergencyClose => {
                (AlertType::AutoStopLoss, AlertSeverity::Critical, "auto stop executed")
            }
        };
        self.raise(RiskAlert::new(
            alert_type,
            severity,
            Some(plan.symbol.clone()),
            format!("{} {}", plan.symbol, text),
            Decimal::from(plan.quantity),
            plan.reference_price,
            RiskAction::Completed,
            now,
        ))
        .await;

        let owned = match self.in_flight.get_mut(&plan.symbol) {
            Some(mut owner) if owner.seq == seq => {
                owner.order_id = Some(order_id.clone());
                true
            }
            _ => false,
        };
        if !owned {
            warn!(
                "[RISK] {:?} {} for {} superseded while submitting, cancelling",
                plan.kind, order_id, plan.symbol
            );
            if let Err(e) = self.olm.cancel(&order_id).await {
                warn!("[RISK] Cancel of superseded {} failed: {}", order_id, e);
            }
            return;
        }

        match self.olm.track(&order_id).await {
            Ok(status) => info!("[RISK] Mitigation {} for {} ended {}", order_id, plan.symbol, status),
            Err(e) => warn!("[RISK] Mitigation {} for {} unresolved: {}", order_id, plan.symbol, e),
        }
    }

    async fn engage_emergency_stop(&self, report: &mut TickReport) {
        if self.emergency.swap(true, Ordering::SeqCst) {
            return;
        }
        self.emergency_stops.fetch_add(1, Ordering::SeqCst);
        error!("[RISK] Emergency stop engaged, closing all positions");
        let now = report.at;
        self.raise_into(
            report,
            RiskAlert::new(
                AlertType::EmergencyStop,
                AlertSeverity::Critical,
                None,
                "account emergency stop triggered",
                Decimal::ZERO,
                Decimal::ZERO,
                RiskAction::Completed,
                now,
            ),
        )
        .await;
    }

    /// Clear a sticky emergency stop. Rules are re-evaluated on the next tick.
    pub async fn resume_trading(&self) -> AccountStatus {
        if self.emergency.swap(false, Ordering::SeqCst) {
            info!("[RISK] Trading resumed");
        }
        self.update_status(self.clock.now()).await
    }

    // ========================================================================
    // Alerts and status
    // ========================================================================

    async fn raise(&self, alert: RiskAlert) -> bool {
        if !self.alerts.raise(alert.clone()) {
            return false;
        }
        match alert.severity {
            AlertSeverity::Critical | AlertSeverity::High => {
                warn!("[RISK] {:?}: {} ({} vs {})", alert.alert_type, alert.message, alert.current_value, alert.threshold)
            }
            _ => info!("[RISK] {:?}: {} ({} vs {})", alert.alert_type, alert.message, alert.current_value, alert.threshold),
        }
        self.events.publish(TradingEvent::RiskAlertRaised(alert)).await;
        true
    }

    async fn raise_into(&self, report: &mut TickReport, alert: RiskAlert) {
        if self.raise(alert.clone()).await {
            report.new_alerts.push(alert);
        }
    }

    /// Derive the account status from the emergency flag and the active
    /// alerts, push it to the gate and announce changes
    async fn update_status(&self, now: Timestamp) -> AccountStatus {
        let status = if self.emergency.load(Ordering::SeqCst) {
            AccountStatus::EmergencyStop
        } else {
            match self.alerts.highest_severity() {
                Some(AlertSeverity::Critical) => AccountStatus::Critical,
                Some(AlertSeverity::High) => AccountStatus::Warning,
                _ => AccountStatus::Normal,
            }
        };

        let previous = self.olm.gate().set_status(status);
        if previous != status {
            info!("[RISK] Account status {:?} -> {:?}", previous, status);
            self.events
                .publish(TradingEvent::AccountStatusChanged {
                    previous,
                    status,
                    timestamp: now,
                })
                .await;
        }
        status
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn status(&self) -> AccountStatus {
        self.olm.gate().status()
    }

    pub fn alerts(&self) -> Vec<RiskAlert> {
        self.alerts.active()
    }

    pub fn position_risks(&self) -> HashMap<Symbol, PositionRisk> {
        self.position_risks
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    pub async fn mitigations(&self) -> Vec<MitigationRecord> {
        self.mitigations.read().await.clone()
    }

    /// Symbols with a mitigating order still being tracked
    pub fn in_flight(&self) -> Vec<Symbol> {
        self.in_flight.iter().map(|s| s.key().clone()).collect()
    }

    /// Kind of the mitigation owning `symbol`, if any
    pub fn in_flight_kind(&self, symbol: &str) -> Option<MitigationKind> {
        self.in_flight.get(symbol).map(|owner| owner.kind)
    }

    pub async fn thresholds(&self) -> RiskThresholds {
        self.thresholds.read().await.clone()
    }

    /// Replace the thresholds; takes effect on the next tick
    pub async fn update_thresholds(&self, thresholds: RiskThresholds) -> Result<()> {
        thresholds.validate()?;
        *self.thresholds.write().await = thresholds;
        info!("[RISK] Thresholds updated");
        Ok(())
    }

    pub async fn metrics(&self) -> MonitoringMetrics {
        MonitoringMetrics {
            total_checks: self.total_checks.load(Ordering::SeqCst),
            skipped_ticks: self.skipped_ticks.load(Ordering::SeqCst),
            last_check: *self.last_check.read().await,
            active_alerts: self.alerts.len(),
            mitigations: self.mitigations.read().await.len(),
            emergency_stops: self.emergency_stops.load(Ordering::SeqCst),
        }
    }
}

/// Order closing the whole position, `None` for an empty one
fn close_plan(kind: MitigationKind, position: &Position, price: Price) -> Option<MitigationPlan> {
    (position.quantity > 0).then(|| MitigationPlan {
        kind,
        symbol: position.symbol.clone(),
        side: Side::Sell,
        quantity: position.quantity,
        reference_price: price,
    })
}
