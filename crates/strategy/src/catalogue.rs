use crate::strategy::{FrequencyClass, SubStrategy};
use bastion_core::Timeframe;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyRiskLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubStrategyDescriptor {
    pub strategy: SubStrategy,
    pub name: &'static str,
    pub description: &'static str,
    pub risk_level: StrategyRiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyDescriptor {
    pub class: FrequencyClass,
    pub name: &'static str,
    pub description: &'static str,
    pub timeframe: Timeframe,
    pub sub_strategies: Vec<SubStrategyDescriptor>,
}

impl FrequencyClass {
    pub fn description(&self) -> &'static str {
        match self {
            FrequencyClass::HighFrequency => "1-5 minute bars for short-term trading",
            FrequencyClass::MidFrequency => "15-30 minute bars for intraday trading",
            FrequencyClass::LowFrequency => "1-4 hour bars for swing trading",
            FrequencyClass::Daily => "daily bars for medium to long-term holding",
        }
    }
}

impl SubStrategy {
    pub fn description(&self) -> &'static str {
        use SubStrategy::*;
        match self {
            Momentum => "short-term momentum confirmed by EMA, RSI and MACD",
            MeanReversion => "reversal from overbought or oversold extremes",
            Breakout => "Bollinger band breakout on expanding volume",
            TrendFollowing => "trend following with multi-indicator confirmation",
            DualEma => "classic fast/slow EMA golden and death cross",
            RsiDivergence => "reversal on price/RSI divergence",
            SwingTrading => "swing entries with multi-indicator confirmation",
            Bollinger => "Bollinger squeeze breakout and expansion reversal",
            Macd => "MACD zero cross and histogram momentum",
            LongTrend => "long-term trend against the 50-day EMA",
            ValueReversion => "reversion to the 30-day mean",
            FundamentalTrend => "risk-adjusted long-term trend strength",
        }
    }

    pub fn risk_level(&self) -> StrategyRiskLevel {
        use SubStrategy::*;
        match self {
            Breakout => StrategyRiskLevel::VeryHigh,
            Momentum => StrategyRiskLevel::High,
            MeanReversion | TrendFollowing | DualEma | SwingTrading | Bollinger => {
                StrategyRiskLevel::Medium
            }
            RsiDivergence | Macd | LongTrend | ValueReversion | FundamentalTrend => {
                StrategyRiskLevel::Low
            }
        }
    }

    pub fn descriptor(&self) -> SubStrategyDescriptor {
        SubStrategyDescriptor {
            strategy: *self,
            name: self.name(),
            description: self.description(),
            risk_level: self.risk_level(),
        }
    }
}

/// Descriptors for every class, in class order
pub fn catalogue() -> Vec<StrategyDescriptor> {
    FrequencyClass::ALL
        .iter()
        .map(|class| StrategyDescriptor {
            class: *class,
            name: class.as_str(),
            description: class.description(),
            timeframe: class.timeframe(),
            sub_strategies: SubStrategy::ALL
                .iter()
                .filter(|s| s.class() == *class)
                .map(SubStrategy::descriptor)
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_covers_every_sub_strategy() {
        let entries = catalogue();
        assert_eq!(entries.len(), 4);
        let total: usize = entries.iter().map(|e| e.sub_strategies.len()).sum();
        assert_eq!(total, SubStrategy::ALL.len());

        let hf = &entries[0];
        assert_eq!(hf.timeframe, Timeframe::OneMinute);
        let breakout = hf
            .sub_strategies
            .iter()
            .find(|s| s.strategy == SubStrategy::Breakout)
            .unwrap();
        assert_eq!(breakout.risk_level, StrategyRiskLevel::VeryHigh);
    }

    #[test]
    fn test_daily_strategies_are_low_risk() {
        let daily = catalogue().into_iter().find(|e| e.class == FrequencyClass::Daily).unwrap();
        assert!(daily.sub_strategies.iter().all(|s| s.risk_level == StrategyRiskLevel::Low));
    }
}
