//! Low-frequency (1h) strategies: swing trading, Bollinger bands, MACD

use crate::error::Result;
use crate::indicators::{
    IndicatorSet, MarketSnapshot, last_two, strictly_decreasing, strictly_increasing, tail,
};
use crate::params::StrategyParameters;
use crate::signal::{SignalAction, StrategySignal};
use crate::strategy::{FrequencyClass, SubStrategy, TradingStrategy, ensure_owned};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const SQUEEZE_WIDTH: Decimal = dec!(0.1);
const EXPANSION_WIDTH: Decimal = dec!(0.2);
const MACD_MIN_SERIES: usize = 3;
const HISTOGRAM_RUN: usize = 5;

#[derive(Debug, Default, Clone, Copy)]
pub struct LowFrequencyStrategy;

impl TradingStrategy for LowFrequencyStrategy {
    fn class(&self) -> FrequencyClass {
        FrequencyClass::LowFrequency
    }

    fn sub_strategies(&self) -> &'static [SubStrategy] {
        &[SubStrategy::SwingTrading, SubStrategy::Bollinger, SubStrategy::Macd]
    }

    fn generate_signal(
        &self,
        sub: SubStrategy,
        market: &MarketSnapshot,
        indicators: &IndicatorSet,
        params: &StrategyParameters,
    ) -> Result<Option<StrategySignal>> {
        ensure_owned(self, sub)?;
        self.validate_parameters(params)?;

        Ok(match sub {
            SubStrategy::SwingTrading => swing_trading(market, indicators),
            SubStrategy::Bollinger => bollinger(market, indicators),
            _ => macd(market, indicators),
        })
    }
}

fn swing_trading(market: &MarketSnapshot, ind: &IndicatorSet) -> Option<StrategySignal> {
    let bb = ind.bb_position?;
    let cci = ind.cci?;
    let rsi = ind.rsi?;
    let hist = ind.macd_histogram?;

    let (action, reasoning) =
        if bb < dec!(0.2) && cci < dec!(-100) && rsi < dec!(40) && hist > Decimal::ZERO {
            (SignalAction::Buy, "swing low with momentum turning up")
        } else if bb > dec!(0.8) && cci > dec!(100) && rsi > dec!(60) && hist < Decimal::ZERO {
            (SignalAction::Sell, "swing high with momentum turning down")
        } else {
            return None;
        };

    Some(
        StrategySignal::new(SubStrategy::SwingTrading, market, action, dec!(0.75), reasoning)
            .with("bb_position", bb)
            .with("cci", cci)
            .with("rsi", rsi),
    )
}

/// Narrow bands trade the breakout, wide bands fade the touch
fn bollinger(market: &MarketSnapshot, ind: &IndicatorSet) -> Option<StrategySignal> {
    let upper = ind.bb_upper?;
    let middle = ind.bb_middle?;
    let lower = ind.bb_lower?;
    if middle <= Decimal::ZERO {
        return None;
    }
    let width = (upper - lower) / middle;
    let price = market.price;

    let (action, confidence, reasoning) = if width < SQUEEZE_WIDTH {
        if price > upper {
            (SignalAction::Buy, dec!(0.8), "breakout above squeezed bands")
        } else if price < lower {
            (SignalAction::Sell, dec!(0.8), "breakdown below squeezed bands")
        } else {
            return None;
        }
    } else if width > EXPANSION_WIDTH {
        if price <= lower {
            (SignalAction::Buy, dec!(0.7), "lower band touch on wide bands")
        } else if price >= upper {
            (SignalAction::Sell, dec!(0.7), "upper band touch on wide bands")
        } else {
            return None;
        }
    } else {
        return None;
    };

    Some(
        StrategySignal::new(SubStrategy::Bollinger, market, action, confidence, reasoning)
            .with("bb_width", width),
    )
}

fn macd(market: &MarketSnapshot, ind: &IndicatorSet) -> Option<StrategySignal> {
    let line = ind.macd?;
    let signal_line = ind.macd_signal?;
    ind.macd_histogram?;
    if ind.macd_series.len() < MACD_MIN_SERIES {
        return None;
    }
    let (prev, _) = last_two(&ind.macd_series)?;

    let zero_cross = if line > Decimal::ZERO && prev <= Decimal::ZERO {
        Some((SignalAction::Buy, "MACD crossed above zero"))
    } else if line < Decimal::ZERO && prev >= Decimal::ZERO {
        Some((SignalAction::Sell, "MACD crossed below zero"))
    } else {
        None
    };
    if let Some((action, reasoning)) = zero_cross {
        return Some(
            StrategySignal::new(SubStrategy::Macd, market, action, dec!(0.8), reasoning)
                .with("macd", line),
        );
    }

    if ind.histogram_series.len() < HISTOGRAM_RUN {
        return None;
    }
    let recent = tail(&ind.histogram_series, HISTOGRAM_RUN);
    let (action, reasoning) = if strictly_increasing(recent) && line < signal_line {
        (SignalAction::Buy, "histogram rising below the signal line")
    } else if strictly_decreasing(recent) && line > signal_line {
        (SignalAction::Sell, "histogram falling above the signal line")
    } else {
        return None;
    };

    Some(
        StrategySignal::new(SubStrategy::Macd, market, action, dec!(0.7), reasoning)
            .with("macd", line)
            .with("macd_signal", signal_line),
    )
}
