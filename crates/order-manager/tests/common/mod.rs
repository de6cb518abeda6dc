use bastion_clock::SystemClock;
use bastion_core::AccountSnapshot;
use bastion_gateway::{BroadcastEventPublisher, InMemoryStore, SimulatedBrokerage};
use bastion_order_manager::{OrderLifecycleManager, PositionLedger, TrackingConfig, TradingGate};
use bastion_ports::Clock;
use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub struct Harness {
    pub olm: Arc<OrderLifecycleManager>,
    pub sim: Arc<SimulatedBrokerage>,
    pub store: Arc<InMemoryStore>,
    pub ledger: Arc<PositionLedger>,
    pub events: Arc<BroadcastEventPublisher>,
}

pub fn account() -> AccountSnapshot {
    AccountSnapshot {
        total_assets: dec!(100000),
        available_cash: dec!(50000),
        market_value: dec!(50000),
        today_pnl: dec!(0),
        total_pnl: dec!(0),
        buying_power: dec!(50000),
        margin_used: dec!(0),
        as_of: Utc::now(),
    }
}

/// Connected lifecycle manager over a paper brokerage
pub async fn harness(config: TrackingConfig) -> Harness {
    harness_with_clock(config, Arc::new(SystemClock::new())).await
}

pub async fn harness_with_clock(config: TrackingConfig, clock: Arc<dyn Clock>) -> Harness {
    let sim = Arc::new(SimulatedBrokerage::new(clock.clone()));
    sim.set_account(&account()).await;

    let store = Arc::new(InMemoryStore::new());
    let events = Arc::new(BroadcastEventPublisher::new(256));
    let ledger = Arc::new(PositionLedger::new(store.clone(), events.clone()));
    let olm = Arc::new(OrderLifecycleManager::new(
        sim.clone(),
        ledger.clone(),
        events.clone(),
        clock,
        Arc::new(TradingGate::new()),
        config,
    ));
    olm.connect().await.unwrap();

    Harness {
        olm,
        sim,
        store,
        ledger,
        events,
    }
}
