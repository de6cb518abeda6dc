//! Per-position risk figures

use bastion_core::{Position, Price, Quantity, Symbol};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Risk level from the unrealized loss ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_loss_ratio(loss_ratio: Decimal) -> Self {
        if loss_ratio > dec!(0.15) {
            RiskLevel::Critical
        } else if loss_ratio > dec!(0.10) {
            RiskLevel::High
        } else if loss_ratio > dec!(0.05) {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRisk {
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub avg_cost: Price,
    pub current_price: Price,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    /// `max(-unrealizedPnL, 0) / costBasis`
    pub loss_ratio: Decimal,
    /// `|marketValue| / portfolioValue`, zero for an empty portfolio
    pub concentration: Decimal,
    /// `None` when price history was unavailable
    pub volatility: Option<Decimal>,
    pub level: RiskLevel,
}

impl PositionRisk {
    pub fn assess(
        position: &Position,
        current_price: Price,
        portfolio_value: Decimal,
        volatility: Option<Decimal>,
    ) -> Self {
        let market_value = position.market_value(current_price);
        let loss_ratio = position.unrealized_loss_ratio(current_price);
        let concentration = if portfolio_value > Decimal::ZERO {
            market_value.abs() / portfolio_value
        } else {
            Decimal::ZERO
        };

        Self {
            symbol: position.symbol.clone(),
            quantity: position.quantity,
            avg_cost: position.avg_cost,
            current_price,
            market_value,
            unrealized_pnl: position.unrealized_pnl(current_price),
            loss_ratio,
            concentration,
            volatility,
            level: RiskLevel::from_loss_ratio(loss_ratio),
        }
    }
}
