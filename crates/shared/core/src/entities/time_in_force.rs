use serde::{Deserialize, Serialize};

/// Time-in-force instructions for order validity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Day order: automatically canceled at end of trading day
    #[default]
    #[serde(rename = "DAY")]
    Day,

    /// Good Till Canceled: order remains active until explicitly canceled
    #[serde(rename = "GTC")]
    Gtc,

    /// Immediate or Cancel: execute immediately (partially or fully) and cancel unfilled portion
    #[serde(rename = "IOC")]
    Ioc,

    /// Fill or Kill: execute immediately and completely, or cancel entire order
    #[serde(rename = "FOK")]
    Fok,
}

impl TimeInForce {
    /// Wire value expected by the brokerage
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Day => "DAY",
            TimeInForce::Gtc => "GTC",
            TimeInForce::Ioc => "IOC",
            TimeInForce::Fok => "FOK",
        }
    }

    /// Returns true if partial fills are allowed
    pub fn allows_partial_fill(&self) -> bool {
        !matches!(self, TimeInForce::Fok)
    }
}
