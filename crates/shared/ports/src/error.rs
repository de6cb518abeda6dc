use thiserror::Error;

/// Failures talking to the brokerage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Outcome unknown; the request may or may not have reached the brokerage
    #[error("Network failure: {0}")]
    Network(String),

    #[error("Brokerage rejected request [{code}]: {message}")]
    Rejected { code: String, message: String },

    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    #[error("Malformed brokerage response: {0}")]
    Malformed(String),
}

pub type BrokerResult<T> = std::result::Result<T, BrokerError>;

/// Failures reading market data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketDataError {
    #[error("No price available for {0}")]
    NoPrice(String),

    #[error("Insufficient history for {symbol}: need {needed}, have {available}")]
    InsufficientHistory {
        symbol: String,
        needed: usize,
        available: usize,
    },

    #[error("Market data unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the persistence collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store write failed: {0}")]
    WriteFailed(String),
}
