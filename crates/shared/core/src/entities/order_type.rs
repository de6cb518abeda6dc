use serde::{Deserialize, Serialize};

/// Order execution type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Execute immediately at the best available price
    Market,
    /// Execute at the limit price or better
    Limit,
    /// Becomes a market order once the stop price trades
    Stop,
    /// Becomes a limit order once the stop price trades
    StopLimit,
}

impl OrderType {
    /// Whether a limit price must accompany the order
    pub fn requires_price(&self) -> bool {
        matches!(self, OrderType::Limit | OrderType::StopLimit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
            OrderType::Stop => "stop",
            OrderType::StopLimit => "stop_limit",
        }
    }
}
