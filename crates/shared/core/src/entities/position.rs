use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;
use crate::values::{Price, Quantity, Symbol};

/// Long equity holding in one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,

    /// Shares held (always positive while the position exists)
    pub quantity: Quantity,

    /// Weighted average purchase price
    pub avg_cost: Price,

    /// When the position was opened
    pub opened_at: DateTime<Utc>,

    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// Result of applying one fill to a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillEffect {
    /// Realized P&L, present for reducing fills
    pub realized_pnl: Option<Decimal>,
    /// Shares sold beyond the recorded holding (clamped away)
    pub oversold: Quantity,
    /// Quantity reached zero; the position should be removed
    pub closed: bool,
}

impl Position {
    /// Open a position from a first buy
    pub fn open(symbol: impl Into<Symbol>, quantity: Quantity, price: Price, at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            avg_cost: price,
            opened_at: at,
            updated_at: at,
        }
    }

    /// Apply a fill in place.
    ///
    /// Buys re-weight the average cost. Sells leave it untouched and clamp at zero.
    pub fn apply(
        &mut self,
        side: Side,
        quantity: Quantity,
        price: Price,
        commission: Decimal,
        at: DateTime<Utc>,
    ) -> FillEffect {
        self.updated_at = at;
        match side {
            Side::Buy => {
                let new_qty = self.quantity + quantity;
                self.avg_cost = if new_qty > 0 {
                    (Decimal::from(self.quantity) * self.avg_cost + Decimal::from(quantity) * price)
                        / Decimal::from(new_qty)
                } else {
                    price
                };
                self.quantity = new_qty;
                FillEffect {
                    realized_pnl: None,
                    oversold: 0,
                    closed: new_qty == 0,
                }
            }
            Side::Sell => {
                let reduced = quantity.min(self.quantity);
                let oversold = quantity - reduced;
                let realized = (price - self.avg_cost) * Decimal::from(reduced) - commission;
                self.quantity -= reduced;
                FillEffect {
                    realized_pnl: Some(realized),
                    oversold,
                    closed: self.quantity == 0,
                }
            }
        }
    }

    /// Total purchase cost of the shares held
    pub fn cost_basis(&self) -> Decimal {
        Decimal::from(self.quantity) * self.avg_cost
    }

    /// Value at the given mark price
    pub fn market_value(&self, price: Price) -> Decimal {
        Decimal::from(self.quantity) * price
    }

    /// Unrealized P&L at the given mark price
    pub fn unrealized_pnl(&self, price: Price) -> Decimal {
        (price - self.avg_cost) * Decimal::from(self.quantity)
    }

    /// `max(-unrealizedPnL, 0) / costBasis`; zero for an empty cost basis
    pub fn unrealized_loss_ratio(&self, price: Price) -> Decimal {
        let basis = self.cost_basis();
        if basis <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (-self.unrealized_pnl(price)).max(Decimal::ZERO) / basis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_buy_reweights_average_cost() {
        let now = Utc::now();
        let mut pos = Position::open("AAPL", 100, dec!(150), now);
        let effect = pos.apply(Side::Buy, 50, dec!(160), dec!(1), now);

        assert_eq!(pos.quantity, 150);
        assert_eq!(pos.avg_cost.round_dp(8), dec!(153.33333333));
        assert_eq!(effect.realized_pnl, None);
    }

    #[test]
    fn test_sell_keeps_average_cost() {
        let now = Utc::now();
        let mut pos = Position::open("AAPL", 100, dec!(150), now);
        let effect = pos.apply(Side::Sell, 40, dec!(155), dec!(2), now);

        assert_eq!(pos.quantity, 60);
        assert_eq!(pos.avg_cost, dec!(150));
        // (155 - 150) * 40 - 2
        assert_eq!(effect.realized_pnl, Some(dec!(198)));
        assert!(!effect.closed);
    }

    #[test]
    fn test_oversell_clamps_to_zero() {
        let now = Utc::now();
        let mut pos = Position::open("AAPL", 10, dec!(100), now);
        let effect = pos.apply(Side::Sell, 15, dec!(90), Decimal::ZERO, now);

        assert_eq!(pos.quantity, 0);
        assert_eq!(effect.oversold, 5);
        assert!(effect.closed);
        assert_eq!(effect.realized_pnl, Some(dec!(-100)));
    }

    #[test]
    fn test_loss_ratio() {
        let pos = Position::open("AAPL", 100, dec!(150), Utc::now());
        // 5000 loss on a 15000 basis
        assert_eq!(pos.unrealized_loss_ratio(dec!(100)).round_dp(4), dec!(0.3333));
        assert_eq!(pos.unrealized_loss_ratio(dec!(200)), Decimal::ZERO);
        assert_eq!(pos.unrealized_pnl(dec!(100)), dec!(-5000));
    }
}
