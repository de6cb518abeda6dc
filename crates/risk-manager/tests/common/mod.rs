use async_trait::async_trait;
use bastion_clock::ManualClock;
use bastion_core::{AccountSnapshot, Bar, Fill, Price, Quantity, Side, Timeframe};
use bastion_gateway::{BroadcastEventPublisher, InMemoryStore, SimulatedBrokerage, StaticMarketData};
use bastion_order_manager::{OrderLifecycleManager, PositionLedger, TrackingConfig, TradingGate};
use bastion_ports::{Clock, MarketDataError, MarketDataProvider};
use bastion_risk_manager::{MarketSession, MonitorConfig, RiskMonitor, RiskThresholds};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub monitor: Arc<RiskMonitor>,
    pub olm: Arc<OrderLifecycleManager>,
    pub sim: Arc<SimulatedBrokerage>,
    pub market: Arc<StaticMarketData>,
    pub ledger: Arc<PositionLedger>,
    pub events: Arc<BroadcastEventPublisher>,
    pub clock: Arc<ManualClock>,
}

/// Healthy account: plenty of cash, no margin, no loss
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

pub async fn harness(thresholds: RiskThresholds) -> Harness {
    harness_with(thresholds, None).await
}

/// Harness whose price lookups take `price_delay`
pub async fn harness_with(thresholds: RiskThresholds, price_delay: Option<Duration>) -> Harness {
    // 10:00 exchange time
    let clock = Arc::new(ManualClock::at(Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap()));
    let dyn_clock: Arc<dyn Clock> = clock.clone();

    let sim = Arc::new(SimulatedBrokerage::new(dyn_clock.clone()));
    sim.set_account(&account()).await;
    let market = Arc::new(StaticMarketData::new());
    let store = Arc::new(InMemoryStore::new());
    let events = Arc::new(BroadcastEventPublisher::new(1024));
    let ledger = Arc::new(PositionLedger::new(store, events.clone()));
    let olm = Arc::new(OrderLifecycleManager::new(
        sim.clone(),
        ledger.clone(),
        events.clone(),
        dyn_clock.clone(),
        Arc::new(TradingGate::new()),
        TrackingConfig::default(),
    ));
    olm.connect().await.unwrap();

    let market_data: Arc<dyn MarketDataProvider> = match price_delay {
        Some(delay) => Arc::new(SlowMarketData {
            inner: market.clone(),
            delay,
        }),
        None => market.clone(),
    };
    let monitor = Arc::new(RiskMonitor::new(
        olm.clone(),
        market_data,
        events.clone(),
        dyn_clock,
        thresholds,
        MonitorConfig::default(),
        MarketSession::default(),
    ));

    Harness {
        monitor,
        olm,
        sim,
        market,
        ledger,
        events,
        clock,
    }
}

impl Harness {
    /// Put a position on the books and mark it
    pub async fn hold(&self, symbol: &str, quantity: Quantity, avg_cost: Price, mark: Price) {
        self.seed(symbol, quantity, avg_cost).await;
        self.mark(symbol, mark);
    }

    /// Position bought well outside the trade window
    pub async fn seed(&self, symbol: &str, quantity: Quantity, avg_cost: Price) {
        self.ledger
            .apply_fill(Fill {
                fill_id: format!("SEED-{symbol}:{quantity}"),
                order_id: format!("SEED-{symbol}"),
                symbol: symbol.to_string(),
                side: Side::Buy,
                quantity,
                price: avg_cost,
                commission: Decimal::ZERO,
                timestamp: self.clock.now() - chrono::Duration::hours(2),
            })
            .await
            .unwrap();
    }

    /// Set the price seen by both the monitor and the paper brokerage
    pub fn mark(&self, symbol: &str, price: Price) {
        self.market.set_price(symbol, price);
        self.sim.set_price(symbol, price);
    }

    pub fn daily_closes(&self, symbol: &str, closes: &[Price]) {
        let now = self.clock.now();
        let bars = closes
            .iter()
            .map(|close| Bar::flat(now, *close, dec!(1000)))
            .collect();
        self.market.set_history(symbol, Timeframe::OneDay, bars);
    }

    pub async fn set_account(&self, snapshot: AccountSnapshot) {
        self.sim.set_account(&snapshot).await;
    }
}

/// Let spawned mitigation tasks run to completion
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

struct SlowMarketData {
    inner: Arc<StaticMarketData>,
    delay: Duration,
}

#[async_trait]
impl MarketDataProvider for SlowMarketData {
    async fn current_price(&self, symbol: &str) -> Result<Price, MarketDataError> {
        tokio::time::sleep(self.delay).await;
        self.inner.current_price(symbol).await
    }

    async fn history(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, MarketDataError> {
        self.inner.history(symbol, timeframe, limit).await
    }

    async fn session_volume(&self, symbol: &str) -> Result<Decimal, MarketDataError> {
        self.inner.session_volume(symbol).await
    }
}
