//! Daily (1d) strategies: long trend, value reversion, fundamental trend

use crate::error::{Result, StrategyError};
use crate::indicators::{IndicatorSet, MarketSnapshot};
use crate::params::{DailyParams, StrategyParameters};
use crate::signal::{SignalAction, StrategySignal};
use crate::strategy::{FrequencyClass, SubStrategy, TradingStrategy, ensure_owned};
use bastion_core::return_volatility;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const LONG_TREND_BARS: usize = 50;
const VALUE_WINDOW: usize = 30;
const VALUE_DEVIATION: Decimal = dec!(0.15);
const FUNDAMENTAL_WINDOW: usize = 60;
const TREND_STRENGTH: Decimal = dec!(0.3);

#[derive(Debug, Default, Clone, Copy)]
pub struct DailyStrategy;

impl TradingStrategy for DailyStrategy {
    fn class(&self) -> FrequencyClass {
        FrequencyClass::Daily
    }

    fn sub_strategies(&self) -> &'static [SubStrategy] {
        &[SubStrategy::LongTrend, SubStrategy::ValueReversion, SubStrategy::FundamentalTrend]
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
        let StrategyParameters::Daily(p) = params else {
            return Err(StrategyError::ParameterMismatch {
                expected: self.class(),
                given: params.class(),
            });
        };

        Ok(match sub {
            SubStrategy::LongTrend => long_trend(market, indicators, p),
            SubStrategy::ValueReversion => value_reversion(market, indicators),
            _ => fundamental_trend(market, indicators),
        })
    }
}

fn long_trend(market: &MarketSnapshot, ind: &IndicatorSet, p: &DailyParams) -> Option<StrategySignal> {
    let ema = ind.ema_long?;
    let rsi = ind.rsi?;
    let macd = ind.macd?;
    if market.bars.len() < LONG_TREND_BARS || ema <= Decimal::ZERO {
        return None;
    }
    let change = (market.price - ema) / ema;

    let (action, reasoning) = if change > p.trend_threshold
        && rsi > dec!(40)
        && rsi < dec!(80)
        && macd > Decimal::ZERO
    {
        (SignalAction::Buy, "price well above long EMA with positive MACD")
    } else if change < -p.trend_threshold && rsi > dec!(20) && rsi < dec!(60) && macd < Decimal::ZERO
    {
        (SignalAction::Sell, "price well below long EMA with negative MACD")
    } else {
        return None;
    };

    Some(
        StrategySignal::new(SubStrategy::LongTrend, market, action, dec!(0.8), reasoning)
            .with("price_change", change),
    )
}

fn value_reversion(market: &MarketSnapshot, ind: &IndicatorSet) -> Option<StrategySignal> {
    let rsi = ind.rsi?;
    let cci = ind.cci?;
    if market.bars.len() < VALUE_WINDOW {
        return None;
    }
    let closes = market.recent_closes(VALUE_WINDOW);
    let average = closes.iter().copied().sum::<Decimal>() / Decimal::from(closes.len());
    if average <= Decimal::ZERO {
        return None;
    }
    let deviation = (market.price - average) / average;

    let (action, reasoning) = if deviation < -VALUE_DEVIATION && rsi < dec!(35) && cci < dec!(-150) {
        (SignalAction::Buy, "trading well below its 30-day mean")
    } else if deviation > VALUE_DEVIATION && rsi > dec!(65) && cci > dec!(150) {
        (SignalAction::Sell, "trading well above its 30-day mean")
    } else {
        return None;
    };

    Some(
        StrategySignal::new(SubStrategy::ValueReversion, market, action, dec!(0.85), reasoning)
            .with("price_deviation", deviation),
    )
}

fn fundamental_trend(market: &MarketSnapshot, ind: &IndicatorSet) -> Option<StrategySignal> {
    let ema = ind.ema_long?;
    let macd = ind.macd?;
    if market.bars.len() < FUNDAMENTAL_WINDOW {
        return None;
    }
    let strength = trend_strength(&market.recent_closes(FUNDAMENTAL_WINDOW));
    let price = market.price;

    let (action, reasoning) = if strength > TREND_STRENGTH && price > ema && macd > Decimal::ZERO {
        (SignalAction::Buy, "persistent risk-adjusted uptrend")
    } else if strength < -TREND_STRENGTH && price < ema && macd < Decimal::ZERO {
        (SignalAction::Sell, "persistent risk-adjusted downtrend")
    } else {
        return None;
    };

    Some(
        StrategySignal::new(SubStrategy::FundamentalTrend, market, action, dec!(0.75), reasoning)
            .with("trend_strength", strength),
    )
}

/// Total return divided by the volatility of period returns.
///
/// Zero for fewer than ten prices or a flat series.
pub(crate) fn trend_strength(prices: &[Decimal]) -> Decimal {
    let (Some(first), Some(last)) = (prices.first(), prices.last()) else {
        return Decimal::ZERO;
    };
    if prices.len() < 10 || first.is_zero() {
        return Decimal::ZERO;
    }
    let total_return = (*last - *first) / *first;
    match return_volatility(prices) {
        Some(vol) if vol > Decimal::ZERO => total_return / vol,
        _ => Decimal::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::Bar;
    use chrono::{TimeZone, Utc};

    fn snapshot(price: Decimal, closes: &[Decimal]) -> MarketSnapshot {
        let t = Utc.with_ymd_and_hms(2024, 3, 4, 7, 0, 0).unwrap();
        let bars = closes.iter().map(|c| Bar::flat(t, *c, dec!(1000000))).collect();
        MarketSnapshot::new("600519", price, t).with_bars(bars)
    }

    fn run(sub: SubStrategy, market: &MarketSnapshot, ind: &IndicatorSet) -> Option<StrategySignal> {
        let strategy = DailyStrategy;
        strategy
            .generate_signal(sub, market, ind, &strategy.default_parameters())
            .unwrap()
    }

    #[test]
    fn test_long_trend_needs_fifty_bars() {
        let ind = IndicatorSet {
            ema_long: Some(dec!(100)),
            rsi: Some(dec!(60)),
            macd: Some(dec!(1.2)),
            ..Default::default()
        };
        let short = snapshot(dec!(115), &[dec!(100); 49]);
        assert!(run(SubStrategy::LongTrend, &short, &ind).is_none());

        let full = snapshot(dec!(115), &[dec!(100); 50]);
        let signal = run(SubStrategy::LongTrend, &full, &ind).unwrap();
        assert_eq!((signal.action, signal.confidence), (SignalAction::Buy, dec!(0.8)));
        assert_eq!(signal.metadata.get("price_change"), Some(&dec!(0.15)));
    }

    #[test]
    fn test_value_reversion_below_mean() {
        let ind = IndicatorSet {
            rsi: Some(dec!(30)),
            cci: Some(dec!(-180)),
            ..Default::default()
        };
        let market = snapshot(dec!(80), &[dec!(100); 30]);
        let signal = run(SubStrategy::ValueReversion, &market, &ind).unwrap();
        assert_eq!((signal.action, signal.confidence), (SignalAction::Buy, dec!(0.85)));

        // -10% is inside the band
        let near = snapshot(dec!(90), &[dec!(100); 30]);
        assert!(run(SubStrategy::ValueReversion, &near, &ind).is_none());
    }

    #[test]
    fn test_fundamental_trend_on_steady_climb() {
        // Alternating +2% / +1% daily steps: strong return, low volatility
        let mut closes = Vec::with_capacity(60);
        let mut price = dec!(100);
        for i in 0..60 {
            closes.push(price);
            let step = if i % 2 == 0 { dec!(1.02) } else { dec!(1.01) };
            price = (price * step).round_dp(4);
        }
        let last = *closes.last().unwrap();
        assert!(trend_strength(&closes) > TREND_STRENGTH);

        let ind = IndicatorSet {
            ema_long: Some(last * dec!(0.9)),
            macd: Some(dec!(2)),
            ..Default::default()
        };
        let signal = run(SubStrategy::FundamentalTrend, &snapshot(last, &closes), &ind).unwrap();
        assert_eq!((signal.action, signal.confidence), (SignalAction::Buy, dec!(0.75)));
    }

    #[test]
    fn test_trend_strength_degenerate_inputs() {
        assert_eq!(trend_strength(&[dec!(100); 5]), Decimal::ZERO);
        assert_eq!(trend_strength(&[dec!(100); 20]), Decimal::ZERO);
    }
}
