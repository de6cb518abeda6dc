//! High-frequency (1m) strategies: momentum, mean reversion, breakout

use crate::error::{Result, StrategyError};
use crate::indicators::{IndicatorSet, MacdCross, MarketSnapshot};
use crate::params::{HighFrequencyParams, StrategyParameters};
use crate::signal::{SignalAction, StrategySignal};
use crate::strategy::{FrequencyClass, SubStrategy, TradingStrategy, ensure_owned};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const BREAKOUT_MIN_BARS: usize = 3;
const BREAKOUT_VOLUME_WINDOW: usize = 10;
const BREAKOUT_VOLUME_RATIO: Decimal = dec!(1.5);

#[derive(Debug, Default, Clone, Copy)]
pub struct HighFrequencyStrategy;

impl TradingStrategy for HighFrequencyStrategy {
    fn class(&self) -> FrequencyClass {
        FrequencyClass::HighFrequency
    }

    fn sub_strategies(&self) -> &'static [SubStrategy] {
        &[SubStrategy::Momentum, SubStrategy::MeanReversion, SubStrategy::Breakout]
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
        let StrategyParameters::HighFrequency(p) = params else {
            return Err(StrategyError::ParameterMismatch {
                expected: self.class(),
                given: params.class(),
            });
        };

        Ok(match sub {
            SubStrategy::Momentum => momentum(market, indicators, p),
            SubStrategy::MeanReversion => mean_reversion(market, indicators, p),
            _ => breakout(market, indicators),
        })
    }
}

/// Trend continuation: price above the short EMA with RSI in its upper
/// half and a bullish MACD cross buys; the mirror image sells.
fn momentum(
    market: &MarketSnapshot,
    ind: &IndicatorSet,
    p: &HighFrequencyParams,
) -> Option<StrategySignal> {
    let rsi = ind.rsi?;
    let ema = ind.ema_short?;
    let cross = ind.macd_cross?;
    let price = market.price;
    let mid = dec!(50);

    let (action, confidence, reasoning) = if price > ema
        && rsi > mid
        && rsi < p.rsi_overbought
        && cross == MacdCross::Bullish
    {
        (
            SignalAction::Buy,
            dec!(0.7) + (rsi - mid) / dec!(100),
            "price above short EMA, RSI strengthening, MACD bullish",
        )
    } else if price < ema && rsi > p.rsi_oversold && rsi < mid && cross == MacdCross::Bearish {
        (
            SignalAction::Sell,
            dec!(0.7) + (mid - rsi) / dec!(100),
            "price below short EMA, RSI weakening, MACD bearish",
        )
    } else {
        return None;
    };

    Some(
        StrategySignal::new(SubStrategy::Momentum, market, action, confidence, reasoning)
            .with("rsi", rsi)
            .with("ema", ema),
    )
}

fn mean_reversion(
    market: &MarketSnapshot,
    ind: &IndicatorSet,
    p: &HighFrequencyParams,
) -> Option<StrategySignal> {
    let rsi = ind.rsi?;
    let bb = ind.bb_position?;

    let (action, confidence, reasoning) = if rsi < p.rsi_oversold && bb < dec!(0.1) {
        (
            SignalAction::Buy,
            (p.rsi_oversold - rsi) / p.rsi_oversold + (dec!(0.1) - bb) * dec!(2),
            "RSI oversold near lower band",
        )
    } else if rsi > p.rsi_overbought && bb > dec!(0.9) {
        (
            SignalAction::Sell,
            (rsi - p.rsi_overbought) / (dec!(100) - p.rsi_overbought) + (bb - dec!(0.9)) * dec!(10),
            "RSI overbought near upper band",
        )
    } else {
        return None;
    };

    Some(
        StrategySignal::new(SubStrategy::MeanReversion, market, action, confidence, reasoning)
            .with("rsi", rsi)
            .with("bb_position", bb),
    )
}

fn breakout(market: &MarketSnapshot, ind: &IndicatorSet) -> Option<StrategySignal> {
    let upper = ind.bb_upper?;
    let lower = ind.bb_lower?;
    let volume = market.volume?;
    if market.bars.len() < BREAKOUT_MIN_BARS {
        return None;
    }
    let average = market.average_volume(BREAKOUT_VOLUME_WINDOW)?;
    if average <= Decimal::ZERO {
        return None;
    }

    let ratio = volume / average;
    if ratio <= BREAKOUT_VOLUME_RATIO {
        return None;
    }

    let (action, reasoning) = if market.price > upper {
        (SignalAction::Buy, "broke above upper band on expanding volume")
    } else if market.price < lower {
        (SignalAction::Sell, "broke below lower band on expanding volume")
    } else {
        return None;
    };
    let confidence = dec!(0.6) + ((ratio - BREAKOUT_VOLUME_RATIO) * dec!(0.2)).min(dec!(0.3));

    Some(
        StrategySignal::new(SubStrategy::Breakout, market, action, confidence, reasoning)
            .with("volume_ratio", ratio)
            .with("bb_upper", upper)
            .with("bb_lower", lower),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::Bar;
    use chrono::{TimeZone, Utc};

    fn snapshot(price: Decimal) -> MarketSnapshot {
        let t = Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap();
        MarketSnapshot::new("AAPL", price, t)
    }

    fn run(sub: SubStrategy, market: &MarketSnapshot, ind: &IndicatorSet) -> Option<StrategySignal> {
        let strategy = HighFrequencyStrategy;
        strategy
            .generate_signal(sub, market, ind, &strategy.default_parameters())
            .unwrap()
    }

    fn momentum_inputs(rsi: Decimal, ema: Decimal, cross: MacdCross) -> IndicatorSet {
        IndicatorSet {
            rsi: Some(rsi),
            ema_short: Some(ema),
            macd_cross: Some(cross),
            ..Default::default()
        }
    }

    #[test]
    fn test_momentum_buy() {
        let market = snapshot(dec!(101));
        let signal = run(
            SubStrategy::Momentum,
            &market,
            &momentum_inputs(dec!(55), dec!(100), MacdCross::Bullish),
        )
        .unwrap();

        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.confidence, dec!(0.75));
        assert!(signal.confidence >= dec!(0.7) && signal.confidence <= Decimal::ONE);
        assert_eq!(signal.metadata.get("rsi"), Some(&dec!(55)));
    }

    #[test]
    fn test_momentum_sell_mirrors_buy() {
        let market = snapshot(dec!(99));
        let signal = run(
            SubStrategy::Momentum,
            &market,
            &momentum_inputs(dec!(45), dec!(100), MacdCross::Bearish),
        )
        .unwrap();

        assert_eq!(signal.action, SignalAction::Sell);
        assert_eq!(signal.confidence, dec!(0.75));
    }

    #[test]
    fn test_momentum_ambiguous_or_missing_inputs() {
        // Bullish price and RSI but bearish MACD
        let market = snapshot(dec!(101));
        assert!(
            run(
                SubStrategy::Momentum,
                &market,
                &momentum_inputs(dec!(55), dec!(100), MacdCross::Bearish)
            )
            .is_none()
        );

        // Overbought RSI is excluded
        assert!(
            run(
                SubStrategy::Momentum,
                &market,
                &momentum_inputs(dec!(75), dec!(100), MacdCross::Bullish)
            )
            .is_none()
        );

        let mut missing = momentum_inputs(dec!(55), dec!(100), MacdCross::Bullish);
        missing.macd_cross = None;
        assert!(run(SubStrategy::Momentum, &market, &missing).is_none());
    }

    #[test]
    fn test_mean_reversion_confidence_clamped() {
        let market = snapshot(dec!(90));
        let ind = IndicatorSet {
            rsi: Some(dec!(5)),
            bb_position: Some(dec!(-0.5)),
            ..Default::default()
        };
        let signal = run(SubStrategy::MeanReversion, &market, &ind).unwrap();
        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.confidence, Decimal::ONE);

        let ind = IndicatorSet {
            rsi: Some(dec!(85)),
            bb_position: Some(dec!(0.92)),
            ..Default::default()
        };
        let signal = run(SubStrategy::MeanReversion, &market, &ind).unwrap();
        assert_eq!(signal.action, SignalAction::Sell);
        // 15/30 + 0.02 * 10
        assert_eq!(signal.confidence, dec!(0.7));
    }

    #[test]
    fn test_breakout_needs_volume_expansion() {
        let t = Utc.with_ymd_and_hms(2024, 3, 4, 2, 0, 0).unwrap();
        let bars: Vec<Bar> = (0..10).map(|_| Bar::flat(t, dec!(100), dec!(1000))).collect();
        let ind = IndicatorSet {
            bb_upper: Some(dec!(105)),
            bb_lower: Some(dec!(95)),
            ..Default::default()
        };

        let quiet = snapshot(dec!(106)).with_bars(bars.clone()).with_volume(dec!(1400));
        assert!(run(SubStrategy::Breakout, &quiet, &ind).is_none());

        let loud = snapshot(dec!(106)).with_bars(bars.clone()).with_volume(dec!(2500));
        let signal = run(SubStrategy::Breakout, &loud, &ind).unwrap();
        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.confidence, dec!(0.8));

        let collapse = snapshot(dec!(90)).with_bars(bars).with_volume(dec!(10000));
        let signal = run(SubStrategy::Breakout, &collapse, &ind).unwrap();
        assert_eq!(signal.action, SignalAction::Sell);
        assert_eq!(signal.confidence, dec!(0.9));
    }

    #[test]
    fn test_foreign_sub_strategy_rejected() {
        let strategy = HighFrequencyStrategy;
        let err = strategy
            .generate_signal(
                SubStrategy::DualEma,
                &snapshot(dec!(100)),
                &IndicatorSet::default(),
                &strategy.default_parameters(),
            )
            .unwrap_err();
        assert!(matches!(err, StrategyError::UnknownStrategy { .. }));
    }

    #[test]
    fn test_invalid_parameters_refused_before_evaluation() {
        let strategy = HighFrequencyStrategy;
        let ind = IndicatorSet {
            rsi: Some(dec!(10)),
            bb_position: Some(dec!(0.05)),
            ..Default::default()
        };
        let params = StrategyParameters::HighFrequency(HighFrequencyParams {
            rsi_oversold: Decimal::ZERO,
            ..Default::default()
        });

        let err = strategy
            .generate_signal(SubStrategy::MeanReversion, &snapshot(dec!(100)), &ind, &params)
            .unwrap_err();
        assert!(matches!(
            err,
            StrategyError::InvalidParameter { field: "rsi_oversold", .. }
        ));

        let foreign = StrategyParameters::defaults_for(FrequencyClass::Daily);
        let err = strategy
            .generate_signal(SubStrategy::Momentum, &snapshot(dec!(100)), &ind, &foreign)
            .unwrap_err();
        assert!(matches!(err, StrategyError::ParameterMismatch { .. }));
    }
}
