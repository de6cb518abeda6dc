//! Error types for the gateway crate

use bastion_ports::BrokerError;
use thiserror::Error;

/// Gateway-level errors (wire conversion)
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Message conversion error: {0}")]
    Conversion(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<GatewayError> for BrokerError {
    fn from(e: GatewayError) -> Self {
        BrokerError::Malformed(e.to_string())
    }
}
