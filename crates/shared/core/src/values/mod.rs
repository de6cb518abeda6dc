use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Share quantity. Equities trade in whole shares.
pub type Quantity = i64;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Ticker symbol of a listed equity
pub type Symbol = String;

/// Square root approximation for Decimal using Newton's method
pub fn sqrt_decimal(x: Decimal) -> Decimal {
    if x <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    // Start above the root so the iteration decreases monotonically
    let mut guess = if x > Decimal::ONE { x / Decimal::TWO } else { Decimal::ONE };

    for _ in 0..64 {
        let new_guess = (guess + x / guess) / Decimal::TWO;
        if (new_guess - guess).abs() < dec!(0.000000001) {
            return new_guess;
        }
        guess = new_guess;
    }
    guess
}

/// Clamp a ratio into [0, 1]
pub fn clamp_unit(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO).min(Decimal::ONE)
}

/// Population standard deviation of simple returns over a price series.
///
/// Returns `None` when fewer than two prices are given or a price is zero.
pub fn return_volatility(prices: &[Decimal]) -> Option<Decimal> {
    if prices.len() < 2 {
        return None;
    }

    let mut returns = Vec::with_capacity(prices.len() - 1);
    for pair in prices.windows(2) {
        if pair[0].is_zero() {
            return None;
        }
        returns.push((pair[1] - pair[0]) / pair[0]);
    }

    let n = Decimal::from(returns.len());
    let mean = returns.iter().copied().sum::<Decimal>() / n;
    let variance = returns
        .iter()
        .map(|r| (*r - mean) * (*r - mean))
        .sum::<Decimal>()
        / n;

    Some(sqrt_decimal(variance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqrt_decimal() {
        assert!((sqrt_decimal(dec!(4)) - dec!(2)).abs() < dec!(0.000001));
        assert!((sqrt_decimal(dec!(0.0009)) - dec!(0.03)).abs() < dec!(0.000001));
        assert!((sqrt_decimal(dec!(1000000)) - dec!(1000)).abs() < dec!(0.000001));
        assert_eq!(sqrt_decimal(dec!(-1)), Decimal::ZERO);
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(dec!(1.4)), Decimal::ONE);
        assert_eq!(clamp_unit(dec!(-0.2)), Decimal::ZERO);
        assert_eq!(clamp_unit(dec!(0.65)), dec!(0.65));
    }

    #[test]
    fn test_return_volatility() {
        // Constant returns have zero dispersion
        let flat = [dec!(100), dec!(110), dec!(121)];
        assert!(return_volatility(&flat).unwrap() < dec!(0.000001));

        // +10% then -10%: mean 0, stddev 0.1
        let swing = [dec!(100), dec!(110), dec!(99)];
        let vol = return_volatility(&swing).unwrap();
        assert!((vol - dec!(0.1)).abs() < dec!(0.000001));

        assert!(return_volatility(&[dec!(100)]).is_none());
    }
}
