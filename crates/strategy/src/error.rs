use crate::strategy::FrequencyClass;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("invalid parameter {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("{given:?} parameters passed to a {expected:?} strategy")]
    ParameterMismatch {
        expected: FrequencyClass,
        given: FrequencyClass,
    },

    #[error("unknown strategy {name} for {class:?}")]
    UnknownStrategy { class: FrequencyClass, name: String },
}

pub type Result<T> = std::result::Result<T, StrategyError>;

pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> StrategyError {
    StrategyError::InvalidParameter {
        field,
        reason: reason.into(),
    }
}
