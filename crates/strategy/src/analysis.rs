//! Multi-timeframe analysis
//!
//! Runs every registered sub-strategy against the inputs supplied for its
//! class and folds the resulting signals into one score and recommendation.

use crate::error::Result;
use crate::indicators::{IndicatorSet, MarketSnapshot};
use crate::registry::StrategyRegistry;
use crate::signal::StrategySignal;
use crate::strategy::FrequencyClass;
use bastion_core::{Symbol, clamp_unit};
use log::info;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeMap;

/// Market context for one frequency class
#[derive(Debug, Clone)]
pub struct TimeframeInput {
    pub market: MarketSnapshot,
    pub indicators: IndicatorSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Watch,
    Avoid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiTimeframeAnalysis {
    pub symbol: Symbol,
    pub signals: Vec<StrategySignal>,
    /// 0 is unanimous selling, 1 unanimous buying
    pub score: Decimal,
    pub recommendation: Recommendation,
}

impl MultiTimeframeAnalysis {
    pub fn from_signals(symbol: impl Into<Symbol>, signals: Vec<StrategySignal>) -> Self {
        let score = overall_score(&signals);
        let recommendation = recommend(score, &signals);
        Self {
            symbol: symbol.into(),
            signals,
            score,
            recommendation,
        }
    }

    pub fn buy_count(&self) -> usize {
        self.signals.iter().filter(|s| s.is_buy()).count()
    }

    pub fn sell_count(&self) -> usize {
        self.signals.iter().filter(|s| s.is_sell()).count()
    }
}

impl StrategyRegistry {
    /// Evaluate every sub-strategy of every class present in `inputs`.
    pub fn analyze(
        &self,
        symbol: &str,
        inputs: &BTreeMap<FrequencyClass, TimeframeInput>,
    ) -> Result<MultiTimeframeAnalysis> {
        let mut signals = Vec::new();
        for (class, input) in inputs {
            for sub in self.sub_strategies(*class) {
                if let Some(signal) = self.evaluate(*sub, &input.market, &input.indicators)? {
                    signals.push(signal);
                }
            }
        }

        let analysis = MultiTimeframeAnalysis::from_signals(symbol, signals);
        info!(
            "[STRATEGY] {} analysed over {} timeframes: {} signals, score={:.3}, {:?}",
            symbol,
            inputs.len(),
            analysis.signals.len(),
            analysis.score,
            analysis.recommendation
        );
        Ok(analysis)
    }
}

/// `(buy - sell + n) / 2n` over summed confidences, clamped to [0, 1].
///
/// No signals is neutral.
pub fn overall_score(signals: &[StrategySignal]) -> Decimal {
    if signals.is_empty() {
        return dec!(0.5);
    }
    let buy: Decimal = signals.iter().filter(|s| s.is_buy()).map(|s| s.confidence).sum();
    let sell: Decimal = signals.iter().filter(|s| s.is_sell()).map(|s| s.confidence).sum();
    let n = Decimal::from(signals.len());
    clamp_unit((buy - sell + n) / (dec!(2) * n))
}

pub fn recommend(score: Decimal, signals: &[StrategySignal]) -> Recommendation {
    let buys = signals.iter().filter(|s| s.is_buy()).count();
    let sells = signals.iter().filter(|s| s.is_sell()).count();

    if score > dec!(0.7) && buys > sells {
        Recommendation::StrongBuy
    } else if score > dec!(0.5) && buys >= sells {
        Recommendation::Buy
    } else if score < dec!(0.3) || sells > buys {
        Recommendation::Avoid
    } else {
        Recommendation::Watch
    }
}
