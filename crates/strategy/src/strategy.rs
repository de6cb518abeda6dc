//! Strategy trait and classification
//!
//! A strategy implementation covers one frequency class and evaluates each
//! of that class's sub-strategies as a pure function of its inputs.

use crate::error::{Result, StrategyError};
use crate::indicators::{IndicatorSet, MarketSnapshot};
use crate::params::StrategyParameters;
use crate::signal::StrategySignal;
use bastion_core::Timeframe;
use serde::{Deserialize, Serialize};

/// Trading frequency class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyClass {
    HighFrequency,
    MidFrequency,
    LowFrequency,
    Daily,
}

impl FrequencyClass {
    pub const ALL: [FrequencyClass; 4] = [
        FrequencyClass::HighFrequency,
        FrequencyClass::MidFrequency,
        FrequencyClass::LowFrequency,
        FrequencyClass::Daily,
    ];

    pub fn timeframe(&self) -> Timeframe {
        match self {
            FrequencyClass::HighFrequency => Timeframe::OneMinute,
            FrequencyClass::MidFrequency => Timeframe::FifteenMinutes,
            FrequencyClass::LowFrequency => Timeframe::OneHour,
            FrequencyClass::Daily => Timeframe::OneDay,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrequencyClass::HighFrequency => "high_frequency",
            FrequencyClass::MidFrequency => "mid_frequency",
            FrequencyClass::LowFrequency => "low_frequency",
            FrequencyClass::Daily => "daily",
        }
    }
}

/// Named sub-strategy within a frequency class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubStrategy {
    // High frequency
    Momentum,
    MeanReversion,
    Breakout,
    // Mid frequency
    TrendFollowing,
    DualEma,
    RsiDivergence,
    // Low frequency
    SwingTrading,
    Bollinger,
    Macd,
    // Daily
    LongTrend,
    ValueReversion,
    FundamentalTrend,
}

impl SubStrategy {
    pub const ALL: [SubStrategy; 12] = [
        SubStrategy::Momentum,
        SubStrategy::MeanReversion,
        SubStrategy::Breakout,
        SubStrategy::TrendFollowing,
        SubStrategy::DualEma,
        SubStrategy::RsiDivergence,
        SubStrategy::SwingTrading,
        SubStrategy::Bollinger,
        SubStrategy::Macd,
        SubStrategy::LongTrend,
        SubStrategy::ValueReversion,
        SubStrategy::FundamentalTrend,
    ];

    pub fn class(&self) -> FrequencyClass {
        use SubStrategy::*;
        match self {
            Momentum | MeanReversion | Breakout => FrequencyClass::HighFrequency,
            TrendFollowing | DualEma | RsiDivergence => FrequencyClass::MidFrequency,
            SwingTrading | Bollinger | Macd => FrequencyClass::LowFrequency,
            LongTrend | ValueReversion | FundamentalTrend => FrequencyClass::Daily,
        }
    }

    pub fn name(&self) -> &'static str {
        use SubStrategy::*;
        match self {
            Momentum => "momentum",
            MeanReversion => "mean_reversion",
            Breakout => "breakout",
            TrendFollowing => "trend_following",
            DualEma => "dual_ema",
            RsiDivergence => "rsi_divergence",
            SwingTrading => "swing_trading",
            Bollinger => "bollinger",
            Macd => "macd",
            LongTrend => "long_trend",
            ValueReversion => "value_reversion",
            FundamentalTrend => "fundamental_trend",
        }
    }
}

/// Signal generator for one frequency class.
///
/// Implementations hold no mutable state; `generate_signal` returns
/// `Ok(None)` whenever the inputs do not satisfy a sub-strategy's entry
/// conditions, including when a required indicator is missing.
pub trait TradingStrategy: Send + Sync {
    fn class(&self) -> FrequencyClass;

    /// Sub-strategies this implementation evaluates
    fn sub_strategies(&self) -> &'static [SubStrategy];

    fn default_parameters(&self) -> StrategyParameters {
        StrategyParameters::defaults_for(self.class())
    }

    fn validate_parameters(&self, params: &StrategyParameters) -> Result<()> {
        if params.class() != self.class() {
            return Err(StrategyError::ParameterMismatch {
                expected: self.class(),
                given: params.class(),
            });
        }
        params.validate()
    }

    fn generate_signal(
        &self,
        sub: SubStrategy,
        market: &MarketSnapshot,
        indicators: &IndicatorSet,
        params: &StrategyParameters,
    ) -> Result<Option<StrategySignal>>;
}

/// Reject a sub-strategy that belongs to another class
pub(crate) fn ensure_owned(strategy: &dyn TradingStrategy, sub: SubStrategy) -> Result<()> {
    if sub.class() != strategy.class() {
        return Err(StrategyError::UnknownStrategy {
            class: strategy.class(),
            name: sub.name().to_string(),
        });
    }
    Ok(())
}
