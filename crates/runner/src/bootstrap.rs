//! Bootstrap - wiring the execution and risk core together
//!
//! Builds every component from one [`BastionConfig`] and a set of external
//! collaborators (brokerage, market data, storage, clock), then owns the
//! start/stop sequence:
//!
//! 1. Connect the brokerage session and load the account snapshot
//! 2. Restore positions and the recent trade journal from storage
//! 3. Start the risk monitor loop
//!
//! Shutdown stops the monitor first so no mitigation is submitted while the
//! order tracking tasks are being cancelled.

use crate::config::{BastionConfig, ConfigError};
use bastion_core::AccountSnapshot;
use bastion_gateway::BroadcastEventPublisher;
use bastion_order_manager::{OrderLifecycleManager, PositionLedger, TradingGate};
use bastion_ports::{BrokerageApi, Clock, EventPublisher, MarketDataProvider, PositionStore};
use bastion_risk_manager::RiskMonitor;
use bastion_strategy::StrategyRegistry;
use chrono::Duration;
use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Brokerage session failed: {0}")]
    Session(#[from] bastion_order_manager::Error),
}

/// External systems the core talks to
#[derive(Clone)]
pub struct Collaborators {
    pub broker: Arc<dyn BrokerageApi>,
    pub market_data: Arc<dyn MarketDataProvider>,
    pub store: Arc<dyn PositionStore>,
    pub clock: Arc<dyn Clock>,
}

/// The assembled system
pub struct Bastion {
    pub config: BastionConfig,
    pub events: Arc<BroadcastEventPublisher>,
    pub ledger: Arc<PositionLedger>,
    pub gate: Arc<TradingGate>,
    pub orders: Arc<OrderLifecycleManager>,
    pub monitor: Arc<RiskMonitor>,
    pub strategies: StrategyRegistry,
    clock: Arc<dyn Clock>,
    monitor_task: Mutex<Option<JoinHandle<()>>>,
}

impl Bastion {
    pub fn assemble(config: BastionConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;

        let events = Arc::new(BroadcastEventPublisher::new(config.event_capacity));
        let publisher: Arc<dyn EventPublisher> = events.clone();

        let ledger = Arc::new(
            PositionLedger::new(collaborators.store, publisher.clone())
                .with_journal_retention(journal_window(&config)),
        );
        let gate = Arc::new(TradingGate::new());
        let orders = Arc::new(OrderLifecycleManager::new(
            collaborators.broker,
            ledger.clone(),
            publisher.clone(),
            collaborators.clock.clone(),
            gate.clone(),
            config.tracking.clone(),
        ));
        let monitor = Arc::new(RiskMonitor::new(
            orders.clone(),
            collaborators.market_data,
            publisher,
            collaborators.clock.clone(),
            config.risk.clone(),
            config.monitor.clone(),
            config.session.clone(),
        ));

        let mut strategies = StrategyRegistry::standard();
        for params in &config.strategies {
            strategies.set_parameters(params.clone())?;
        }

        info!(
            "[RUNNER] Assembled: {} symbols, {} strategy overrides",
            config.symbols.len(),
            config.strategies.len()
        );

        Ok(Self {
            config,
            events,
            ledger,
            gate,
            orders,
            monitor,
            strategies,
            clock: collaborators.clock,
            monitor_task: Mutex::new(None),
        })
    }

    /// Connect, restore persisted state and start monitoring.
    ///
    /// A storage failure during restore is logged and the session starts
    /// with an empty ledger; a failed connection aborts startup.
    pub async fn start(&self) -> Result<AccountSnapshot, BootstrapError> {
        let account = self.orders.connect().await?;

        let since = self.clock.now() - journal_window(&self.config);
        match self.ledger.restore(since).await {
            Ok(count) => info!("[RUNNER] Restored {} positions", count),
            Err(e) => warn!("[RUNNER] Restore failed, starting empty: {}", e),
        }

        let mut task = self.monitor_task.lock().await;
        if task.is_none() {
            *task = Some(tokio::spawn(self.monitor.clone().run()));
        }

        info!(
            "[RUNNER] Started: total_assets={} cash={}",
            account.total_assets, account.available_cash
        );
        Ok(account)
    }

    /// Stop monitoring, then cancel order tracking and close the session
    pub async fn shutdown(&self) {
        self.monitor.stop();
        if let Some(task) = self.monitor_task.lock().await.take()
            && let Err(e) = task.await
        {
            warn!("[RUNNER] Monitor task ended abnormally: {}", e);
        }
        self.orders.shutdown();
        self.orders.disconnect();
        info!("[RUNNER] Shutdown complete");
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

/// At least a day of trades, or the detector's trade window if longer
fn journal_window(config: &BastionConfig) -> Duration {
    let window = Duration::minutes(config.monitor.trade_window_minutes as i64);
    window.max(Duration::days(1))
}
