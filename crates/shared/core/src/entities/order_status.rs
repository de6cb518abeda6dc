use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Order lifecycle status.
///
/// ```text
/// Pending ──► PartiallyFilled ──► Filled
///    │               │
///    │               └──────────► Cancelled
///    ├──► Filled
///    ├──► Cancelled
///    └──► Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted by the brokerage, nothing executed yet
    Pending,
    /// Some but not all shares executed
    PartiallyFilled,
    /// Every share executed
    Filled,
    /// Canceled before completing
    Cancelled,
    /// Refused by the brokerage
    Rejected,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Returns true if the order is still active
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::PartiallyFilled)
    }

    /// Legal edges of the lifecycle. Self-transitions are not edges; further
    /// partial fills update fill fields without a status change.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, PartiallyFilled)
                | (Pending, Filled)
                | (Pending, Cancelled)
                | (Pending, Rejected)
                | (PartiallyFilled, Filled)
                | (PartiallyFilled, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status string not recognised by [`OrderStatus::from_str`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" | "new" | "submitted" => Ok(OrderStatus::Pending),
            "partially_filled" | "partial" => Ok(OrderStatus::PartiallyFilled),
            "filled" => Ok(OrderStatus::Filled),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            "rejected" => Ok(OrderStatus::Rejected),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}
