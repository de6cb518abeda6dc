use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::values::Symbol;

/// Rule category that raised an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    CashShortage,
    MarginExcess,
    TotalLoss,
    PositionLoss,
    Concentration,
    Volatility,
    FrequentTrading,
    LargeTrading,
    PriceAnomaly,
    OffHoursTrading,
    AutoStopLoss,
    AutoReduce,
    EmergencyStop,
}

/// Alert severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Action recommended (or already taken) for an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskAction {
    None,
    RequireAttention,
    AutoReduce,
    AutoStop,
    EmergencyStop,
    /// Mitigation was submitted
    Completed,
}

/// Alert raised by the risk monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub symbol: Option<Symbol>,
    pub message: String,
    pub current_value: Decimal,
    pub threshold: Decimal,
    pub action: RiskAction,
    pub timestamp: DateTime<Utc>,
}

impl RiskAlert {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        alert_type: AlertType,
        severity: AlertSeverity,
        symbol: Option<Symbol>,
        message: impl Into<String>,
        current_value: Decimal,
        threshold: Decimal,
        action: RiskAction,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type,
            severity,
            symbol,
            message: message.into(),
            current_value,
            threshold,
            action,
            timestamp,
        }
    }

    /// Two alerts with the same key are the same alert
    pub fn dedupe_key(&self) -> (AlertType, &str) {
        (self.alert_type, self.message.as_str())
    }
}
