use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OrderId, Side};
use crate::values::{Price, Quantity, Symbol};

/// Unique identifier for a trade
pub type TradeId = Uuid;

/// One execution to be applied to the ledger.
///
/// `fill_id` identifies the execution across every source that reports it
/// (polling, push notifications, reconciliation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub fill_id: String,
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
    pub commission: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    /// Fill identity derived from the order and its cumulative executed shares
    pub fn cumulative_id(order_id: &str, cumulative_quantity: Quantity) -> String {
        format!("{order_id}:{cumulative_quantity}")
    }

    /// Traded value (price * quantity)
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A fill as recorded in the trade journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub fill_id: String,
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
    pub commission: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Set only when the fill reduced or closed a position
    pub realized_pnl: Option<Decimal>,
}

impl Trade {
    pub fn from_fill(fill: &Fill, realized_pnl: Option<Decimal>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fill_id: fill.fill_id.clone(),
            order_id: fill.order_id.clone(),
            symbol: fill.symbol.clone(),
            side: fill.side,
            quantity: fill.quantity,
            price: fill.price,
            commission: fill.commission,
            timestamp: fill.timestamp,
            realized_pnl,
        }
    }

    /// Traded value (price * quantity)
    pub fn notional(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}
