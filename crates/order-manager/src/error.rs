//! Order Manager errors

use bastion_core::{OrderId, OrderStatus, RequestInvalid, TransitionError};
use bastion_ports::BrokerError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Not connected; the order was never attempted
    #[error("Not connected to brokerage: {0}")]
    Connection(String),

    /// Rejected locally before any network call
    #[error("Invalid order: {0}")]
    Validation(#[from] RequestInvalid),

    /// Vetoed before reaching the brokerage
    #[error("Risk rejected {symbol}: {reason}")]
    RiskRejected { symbol: String, reason: String },

    /// Outcome unknown. Re-query order status before any retry.
    #[error("Network error, outcome unknown (re-query before retrying): {0}")]
    Network(String),

    #[error("Brokerage rejected order [{code}]: {message}")]
    BrokerRejected { code: String, message: String },

    #[error("Brokerage error: {0}")]
    Broker(String),

    /// Unresolved after the attempt budget; the order is flagged stale
    #[error("Order {order_id} unresolved after {attempts} polls, last status {last_status}")]
    PollingTimeout {
        order_id: OrderId,
        attempts: u32,
        last_status: OrderStatus,
    },

    #[error("Tracking of order {0} was stopped")]
    TrackingStopped(OrderId),

    #[error("Unknown order: {0}")]
    UnknownOrder(OrderId),

    #[error(transparent)]
    IllegalTransition(#[from] TransitionError),
}

impl Error {
    /// Whether the caller should treat this as an actionable state rather
    /// than a failure
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::PollingTimeout { .. })
    }
}

impl From<BrokerError> for Error {
    fn from(e: BrokerError) -> Self {
        match e {
            BrokerError::Network(detail) => Error::Network(detail),
            BrokerError::Rejected { code, message } => Error::BrokerRejected { code, message },
            BrokerError::UnknownOrder(id) => Error::UnknownOrder(id),
            BrokerError::Malformed(detail) => Error::Broker(detail),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
