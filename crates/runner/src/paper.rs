//! Paper trading session
//!
//! Runs the full core against in-process collaborators: a simulated
//! brokerage that fills at the scenario's mark prices, static market data
//! and an in-memory store. Each symbol is analysed across the frequency
//! classes it has inputs for, the recommendation is turned into an order,
//! and the risk monitor then watches the resulting book for a while.
//!
//! ```text
//!   PaperScenario ──► seed brokerage / market data / store
//!                              │
//!                       Bastion::start
//!                              │
//!   per symbol:  analyze ──► StrongBuy/Buy ──► market buy
//!                        └─► Avoid + held  ──► market sell
//!                              │
//!                   track fills into the ledger
//!                              │
//!                 risk monitor ticks for `duration_secs`
//!                              │
//!                        SessionReport
//! ```

use crate::bootstrap::{Bastion, BootstrapError, Collaborators};
use crate::config::{BastionConfig, ConfigError};
use bastion_core::{
    AccountSnapshot, AccountStatus, Bar, Order, OrderRequest, Position, Price, Quantity, RiskAlert,
    Side, Symbol, Timeframe, Timestamp,
};
use bastion_gateway::{InMemoryStore, SimulatedBrokerage, StaticMarketData};
use bastion_ports::{Clock, PositionStore};
use bastion_risk_manager::{MitigationRecord, MonitoringMetrics};
use bastion_strategy::{
    FrequencyClass, IndicatorSet, MacdCross, MarketSnapshot, MultiTimeframeAnalysis, Recommendation,
    StrategyError, TimeframeInput,
};
use chrono::Duration;
use log::{info, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaperError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error("Analysis failed: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Failed to seed store: {0}")]
    Store(#[from] bastion_ports::StoreError),
}

// ============================================================================
// Scenario
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaperAccount {
    pub total_assets: Decimal,
    pub available_cash: Decimal,
    #[serde(default)]
    pub margin_used: Decimal,
    #[serde(default)]
    pub total_pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaperHolding {
    pub quantity: Quantity,
    pub avg_cost: Price,
}

/// Inputs for one frequency class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaperTimeframe {
    pub indicators: IndicatorSet,
    /// Closing prices, oldest first
    pub closes: Vec<Decimal>,
    pub volume: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaperSymbol {
    pub symbol: Symbol,
    pub price: Price,
    #[serde(default = "default_order_quantity")]
    pub order_quantity: Quantity,
    #[serde(default)]
    pub holding: Option<PaperHolding>,
    #[serde(default)]
    pub timeframes: BTreeMap<FrequencyClass, PaperTimeframe>,
}

fn default_order_quantity() -> Quantity {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaperScenario {
    pub account: PaperAccount,
    pub symbols: Vec<PaperSymbol>,
    /// How long the risk monitor runs after the orders settle
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,
}

fn default_duration_secs() -> u64 {
    5
}

impl PaperScenario {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: String| ConfigError::Invalid { field, reason };

        if self.account.total_assets <= Decimal::ZERO {
            return Err(invalid("account.total_assets", "must be positive".to_string()));
        }
        for entry in &self.symbols {
            if entry.symbol.trim().is_empty() {
                return Err(invalid("symbols", "blank symbol".to_string()));
            }
            if entry.price <= Decimal::ZERO {
                return Err(invalid("symbols.price", format!("{} price must be positive", entry.symbol)));
            }
            if entry.order_quantity <= 0 {
                return Err(invalid(
                    "symbols.order_quantity",
                    format!("{} order quantity must be positive", entry.symbol),
                ));
            }
            if let Some(holding) = &entry.holding
                && (holding.quantity <= 0 || holding.avg_cost <= Decimal::ZERO)
            {
                return Err(invalid("symbols.holding", format!("{} holding must be positive", entry.symbol)));
            }
        }
        Ok(())
    }

    /// Three symbols: one in a clean uptrend, one weakening holding and one
    /// holding already past the stop-loss line.
    pub fn demo() -> Self {
        let uptrend: Vec<Decimal> = (0..60).map(|i| dec!(1500) + Decimal::from(i * 3)).collect();
        let flat: Vec<Decimal> = (0..30).map(|_| dec!(12)).collect();

        let bullish = PaperSymbol {
            symbol: "600519".to_string(),
            price: dec!(1680),
            order_quantity: 100,
            holding: None,
            timeframes: BTreeMap::from([
                (
                    FrequencyClass::HighFrequency,
                    PaperTimeframe {
                        indicators: IndicatorSet {
                            rsi: Some(dec!(58)),
                            ema_short: Some(dec!(1675)),
                            macd_cross: Some(MacdCross::Bullish),
                            ..Default::default()
                        },
                        ..Default::default()
                    },
                ),
                (
                    FrequencyClass::MidFrequency,
                    PaperTimeframe {
                        indicators: IndicatorSet {
                            ema_short: Some(dec!(1670)),
                            ema_long: Some(dec!(1640)),
                            macd: Some(dec!(4.2)),
                            macd_signal: Some(dec!(3.1)),
                            rsi: Some(dec!(61)),
                            ..Default::default()
                        },
                        ..Default::default()
                    },
                ),
                (
                    FrequencyClass::Daily,
                    PaperTimeframe {
                        indicators: IndicatorSet {
                            ema_long: Some(dec!(1500)),
                            rsi: Some(dec!(63)),
                            macd: Some(dec!(12.5)),
                            ..Default::default()
                        },
                        closes: uptrend,
                        volume: Some(dec!(2500000)),
                    },
                ),
            ]),
        };

        let weakening = PaperSymbol {
            symbol: "000001".to_string(),
            price: dec!(11.8),
            order_quantity: 500,
            holding: Some(PaperHolding {
                quantity: 500,
                avg_cost: dec!(12.1),
            }),
            timeframes: BTreeMap::from([
                (
                    FrequencyClass::HighFrequency,
                    PaperTimeframe {
                        indicators: IndicatorSet {
                            rsi: Some(dec!(42)),
                            ema_short: Some(dec!(12.0)),
                            macd_cross: Some(MacdCross::Bearish),
                            ..Default::default()
                        },
                        ..Default::default()
                    },
                ),
                (
                    FrequencyClass::Daily,
                    PaperTimeframe {
                        closes: flat,
                        ..Default::default()
                    },
                ),
            ]),
        };

        let losing = PaperSymbol {
            symbol: "300750".to_string(),
            price: dec!(170),
            order_quantity: 100,
            holding: Some(PaperHolding {
                quantity: 300,
                avg_cost: dec!(200),
            }),
            timeframes: BTreeMap::new(),
        };

        Self {
            account: PaperAccount {
                total_assets: dec!(1000000),
                available_cash: dec!(400000),
                margin_used: Decimal::ZERO,
                total_pnl: dec!(-9000),
            },
            symbols: vec![bullish, weakening, losing],
            duration_secs: default_duration_secs(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedOrder {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub account: AccountSnapshot,
    pub analyses: Vec<MultiTimeframeAnalysis>,
    pub orders: Vec<Order>,
    pub rejected: Vec<RejectedOrder>,
    pub positions: Vec<Position>,
    pub alerts: Vec<RiskAlert>,
    pub mitigations: Vec<MitigationRecord>,
    pub metrics: MonitoringMetrics,
    pub status: AccountStatus,
}

impl SessionReport {
    pub fn recommendation(&self, symbol: &str) -> Option<Recommendation> {
        self.analyses
            .iter()
            .find(|a| a.symbol == symbol)
            .map(|a| a.recommendation)
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }
}

pub struct PaperSession {
    config: BastionConfig,
    scenario: PaperScenario,
    clock: Arc<dyn Clock>,
}

impl PaperSession {
    pub fn new(config: BastionConfig, scenario: PaperScenario, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            scenario,
            clock,
        }
    }

    pub async fn run(self) -> Result<SessionReport, PaperError> {
        let now = self.clock.now();
        let broker = Arc::new(SimulatedBrokerage::new(self.clock.clone()));
        let market_data = Arc::new(StaticMarketData::new());
        let store = Arc::new(InMemoryStore::new());

        self.seed(&broker, &market_data, &store, now).await?;

        let bastion = Bastion::assemble(
            self.config.clone(),
            Collaborators {
                broker,
                market_data,
                store,
                clock: self.clock.clone(),
            },
        )?;
        let account = bastion.start().await?;

        let mut analyses = Vec::with_capacity(self.scenario.symbols.len());
        let mut rejected = Vec::new();
        let mut tracking = Vec::new();

        for entry in &self.scenario.symbols {
            let inputs = timeframe_inputs(entry, now);
            let analysis = bastion.strategies.analyze(&entry.symbol, &inputs)?;

            let request = match analysis.recommendation {
                Recommendation::StrongBuy | Recommendation::Buy => Some(OrderRequest::market(
                    entry.symbol.as_str(),
                    Side::Buy,
                    entry.order_quantity,
                )),
                Recommendation::Avoid => {
                    let held = bastion.ledger.held_quantity(&entry.symbol);
                    (held > 0).then(|| OrderRequest::market(entry.symbol.as_str(), Side::Sell, held))
                }
                Recommendation::Watch => None,
            };
            analyses.push(analysis);

            let Some(request) = request else {
                continue;
            };
            let (side, quantity) = (request.side, request.quantity);
            match bastion.orders.submit(request).await {
                Ok(order_id) => tracking.push(bastion.orders.spawn_tracking(order_id)),
                Err(e) => {
                    warn!("[RUNNER] {} {} {} not placed: {}", side, quantity, entry.symbol, e);
                    rejected.push(RejectedOrder {
                        symbol: entry.symbol.clone(),
                        side,
                        quantity,
                        reason: e.to_string(),
                    });
                }
            }
        }

        for handle in tracking {
            match handle.await {
                Ok(Ok(status)) => info!("[RUNNER] Order settled: {}", status),
                Ok(Err(e)) => warn!("[RUNNER] Order unresolved: {}", e),
                Err(e) => warn!("[RUNNER] Tracking task failed: {}", e),
            }
        }

        tokio::time::sleep(std::time::Duration::from_secs(self.scenario.duration_secs)).await;
        bastion.shutdown().await;

        let report = SessionReport {
            account,
            analyses,
            orders: bastion.orders.orders(),
            rejected,
            positions: bastion.ledger.positions(),
            alerts: bastion.monitor.alerts(),
            mitigations: bastion.monitor.mitigations().await,
            metrics: bastion.monitor.metrics().await,
            status: bastion.monitor.status(),
        };
        info!(
            "[RUNNER] Session done: {} orders, {} positions, {} alerts, {} mitigations",
            report.orders.len(),
            report.positions.len(),
            report.alerts.len(),
            report.mitigations.len()
        );
        Ok(report)
    }

    async fn seed(
        &self,
        broker: &SimulatedBrokerage,
        market_data: &StaticMarketData,
        store: &InMemoryStore,
        now: Timestamp,
    ) -> Result<(), PaperError> {
        let mut market_value = Decimal::ZERO;

        for entry in &self.scenario.symbols {
            broker.set_price(&entry.symbol, entry.price);
            market_data.set_price(&entry.symbol, entry.price);

            if let Some(daily) = entry.timeframes.get(&FrequencyClass::Daily) {
                market_data.set_history(&entry.symbol, Timeframe::OneDay, daily_bars(daily, now));
                if let Some(volume) = daily.volume {
                    market_data.set_session_volume(&entry.symbol, volume);
                }
            }

            if let Some(holding) = &entry.holding {
                let opened = now - Duration::days(7);
                store
                    .upsert_position(&Position::open(
                        entry.symbol.as_str(),
                        holding.quantity,
                        holding.avg_cost,
                        opened,
                    ))
                    .await?;
                market_value += Decimal::from(holding.quantity) * entry.price;
            }
        }

        let account = &self.scenario.account;
        broker
            .set_account(&AccountSnapshot {
                total_assets: account.total_assets,
                available_cash: account.available_cash,
                market_value,
                today_pnl: Decimal::ZERO,
                total_pnl: account.total_pnl,
                buying_power: account.available_cash,
                margin_used: account.margin_used,
                as_of: now,
            })
            .await;
        Ok(())
    }
}

fn daily_bars(timeframe: &PaperTimeframe, now: Timestamp) -> Vec<Bar> {
    let volume = timeframe.volume.unwrap_or_default();
    let count = timeframe.closes.len() as i64;
    timeframe
        .closes
        .iter()
        .enumerate()
        .map(|(i, close)| Bar::flat(now - Duration::days(count - i as i64), *close, volume))
        .collect()
}

fn timeframe_inputs(entry: &PaperSymbol, now: Timestamp) -> BTreeMap<FrequencyClass, TimeframeInput> {
    entry
        .timeframes
        .iter()
        .map(|(class, timeframe)| {
            let bars = timeframe
                .closes
                .iter()
                .map(|close| Bar::flat(now, *close, timeframe.volume.unwrap_or_default()))
                .collect();
            let mut market = MarketSnapshot::new(entry.symbol.as_str(), entry.price, now).with_bars(bars);
            if let Some(volume) = timeframe.volume {
                market = market.with_volume(volume);
            }
            (
                *class,
                TimeframeInput {
                    market,
                    indicators: timeframe.indicators.clone(),
                },
            )
        })
        .collect()
}
