use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("invalid {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, RiskError>;

pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> RiskError {
    RiskError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}
