use crate::indicators::MarketSnapshot;
use crate::strategy::SubStrategy;
use bastion_core::{Price, Symbol, Timeframe, Timestamp, clamp_unit};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
    ClosePosition,
}

/// Output of one sub-strategy evaluation.
///
/// Every field is derived from the inputs, including the timestamp, so the
/// same inputs always produce an equal signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySignal {
    pub strategy: SubStrategy,
    pub timeframe: Timeframe,
    pub symbol: Symbol,
    pub action: SignalAction,
    /// Always within [0, 1]
    pub confidence: Decimal,
    pub price: Price,
    pub reasoning: String,
    pub metadata: BTreeMap<String, Decimal>,
    pub timestamp: Timestamp,
}

impl StrategySignal {
    pub fn new(
        strategy: SubStrategy,
        market: &MarketSnapshot,
        action: SignalAction,
        confidence: Decimal,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            strategy,
            timeframe: strategy.class().timeframe(),
            symbol: market.symbol.clone(),
            action,
            confidence: clamp_unit(confidence),
            price: market.price,
            reasoning: reasoning.into(),
            metadata: BTreeMap::new(),
            timestamp: market.timestamp,
        }
    }

    /// Attach a numeric detail
    pub fn with(mut self, key: &str, value: Decimal) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn is_buy(&self) -> bool {
        self.action == SignalAction::Buy
    }

    pub fn is_sell(&self) -> bool {
        matches!(self.action, SignalAction::Sell | SignalAction::ClosePosition)
    }
}
