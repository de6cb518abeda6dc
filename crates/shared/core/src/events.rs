//! Outbound notifications for UI and notification collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{AccountStatus, OrderId, OrderStatus, Position, RiskAlert, Trade};
use crate::values::Symbol;

/// Event published by the execution and risk core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TradingEvent {
    RiskAlertRaised(RiskAlert),
    OrderStatusChanged {
        order_id: OrderId,
        symbol: Symbol,
        /// `None` for a freshly submitted order
        previous: Option<OrderStatus>,
        status: OrderStatus,
        timestamp: DateTime<Utc>,
    },
    PositionUpdated {
        symbol: Symbol,
        /// `None` once the position is closed
        position: Option<Position>,
        trade: Trade,
    },
    AccountStatusChanged {
        previous: AccountStatus,
        status: AccountStatus,
        timestamp: DateTime<Utc>,
    },
}

impl TradingEvent {
    /// Symbol the event concerns, if any
    pub fn symbol(&self) -> Option<&str> {
        match self {
            TradingEvent::RiskAlertRaised(alert) => alert.symbol.as_deref(),
            TradingEvent::OrderStatusChanged { symbol, .. } => Some(symbol),
            TradingEvent::PositionUpdated { symbol, .. } => Some(symbol),
            TradingEvent::AccountStatusChanged { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TradingEvent::RiskAlertRaised(_) => "RiskAlertRaised",
            TradingEvent::OrderStatusChanged { .. } => "OrderStatusChanged",
            TradingEvent::PositionUpdated { .. } => "PositionUpdated",
            TradingEvent::AccountStatusChanged { .. } => "AccountStatusChanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = TradingEvent::OrderStatusChanged {
            order_id: "ord-7".to_string(),
            symbol: "MSFT".to_string(),
            previous: Some(OrderStatus::Pending),
            status: OrderStatus::PartiallyFilled,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "order_status_changed");
        assert_eq!(json["status"], "partially_filled");
        assert_eq!(event.symbol(), Some("MSFT"));
    }
}
