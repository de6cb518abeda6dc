//! Mid-frequency (15m) strategies: trend following, dual EMA cross, RSI divergence

use crate::error::Result;
use crate::indicators::{
    IndicatorSet, MarketSnapshot, last_two, local_maxima, local_minima, tail,
};
use crate::params::StrategyParameters;
use crate::signal::{SignalAction, StrategySignal};
use crate::strategy::{FrequencyClass, SubStrategy, TradingStrategy, ensure_owned};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const DIVERGENCE_WINDOW: usize = 10;

#[derive(Debug, Default, Clone, Copy)]
pub struct MidFrequencyStrategy;

impl TradingStrategy for MidFrequencyStrategy {
    fn class(&self) -> FrequencyClass {
        FrequencyClass::MidFrequency
    }

    fn sub_strategies(&self) -> &'static [SubStrategy] {
        &[SubStrategy::TrendFollowing, SubStrategy::DualEma, SubStrategy::RsiDivergence]
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
            SubStrategy::TrendFollowing => trend_following(market, indicators),
            SubStrategy::DualEma => dual_ema(market, indicators),
            _ => rsi_divergence(market, indicators),
        })
    }
}

fn trend_following(market: &MarketSnapshot, ind: &IndicatorSet) -> Option<StrategySignal> {
    let fast = ind.ema_short?;
    let slow = ind.ema_long?;
    let macd = ind.macd?;
    let signal_line = ind.macd_signal?;
    let rsi = ind.rsi?;
    if slow <= Decimal::ZERO {
        return None;
    }

    let (action, spread, reasoning) =
        if fast > slow && macd > signal_line && rsi > dec!(40) && rsi < dec!(80) {
            (SignalAction::Buy, fast - slow, "uptrend confirmed by EMA, MACD and RSI")
        } else if fast < slow && macd < signal_line && rsi > dec!(20) && rsi < dec!(60) {
            (SignalAction::Sell, slow - fast, "downtrend confirmed by EMA, MACD and RSI")
        } else {
            return None;
        };
    let confidence = dec!(0.6) + (spread / slow * dec!(5)).min(dec!(0.3));

    Some(
        StrategySignal::new(SubStrategy::TrendFollowing, market, action, confidence, reasoning)
            .with("ema_fast", fast)
            .with("ema_slow", slow)
            .with("macd", macd)
            .with("rsi", rsi),
    )
}

/// Golden / death cross between the current and previous EMA readings
fn dual_ema(market: &MarketSnapshot, ind: &IndicatorSet) -> Option<StrategySignal> {
    let fast = ind.ema_short?;
    let slow = ind.ema_long?;
    let (prev_fast, _) = last_two(&ind.ema_short_series)?;
    let (prev_slow, _) = last_two(&ind.ema_long_series)?;
    if slow <= Decimal::ZERO {
        return None;
    }

    let above = fast > slow;
    let was_above = prev_fast > prev_slow;
    let (action, reasoning) = match (above, was_above) {
        (true, false) => (SignalAction::Buy, "golden cross"),
        (false, true) => (SignalAction::Sell, "death cross"),
        _ => return None,
    };

    let strength = (fast - slow).abs() / slow;
    let confidence = dec!(0.7) + (strength * dec!(10)).min(dec!(0.2));

    Some(
        StrategySignal::new(SubStrategy::DualEma, market, action, confidence, reasoning)
            .with("cross_strength", strength),
    )
}

/// Price makes a new extreme that RSI fails to confirm
fn rsi_divergence(market: &MarketSnapshot, ind: &IndicatorSet) -> Option<StrategySignal> {
    ind.rsi?;
    if ind.rsi_series.len() < DIVERGENCE_WINDOW || market.bars.len() < DIVERGENCE_WINDOW {
        return None;
    }
    let prices = market.recent_closes(DIVERGENCE_WINDOW);
    let rsi = tail(&ind.rsi_series, DIVERGENCE_WINDOW);

    if let ([.., prev_price, last_price], [.., prev_rsi, last_rsi]) =
        (local_maxima(&prices).as_slice(), local_maxima(rsi).as_slice())
        && last_price > prev_price
        && last_rsi < prev_rsi
    {
        return Some(
            StrategySignal::new(
                SubStrategy::RsiDivergence,
                market,
                SignalAction::Sell,
                dec!(0.8),
                "bearish divergence: higher price high, lower RSI high",
            )
            .with("price_high", *last_price)
            .with("rsi_high", *last_rsi),
        );
    }

    if let ([.., prev_price, last_price], [.., prev_rsi, last_rsi]) =
        (local_minima(&prices).as_slice(), local_minima(rsi).as_slice())
        && last_price < prev_price
        && last_rsi > prev_rsi
    {
        return Some(
            StrategySignal::new(
                SubStrategy::RsiDivergence,
                market,
                SignalAction::Buy,
                dec!(0.8),
                "bullish divergence: lower price low, higher RSI low",
            )
            .with("price_low", *last_price)
            .with("rsi_low", *last_rsi),
        );
    }

    None
}
