use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Brokerage account figures, refreshed on demand and treated as read-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub total_assets: Decimal,
    pub available_cash: Decimal,
    pub market_value: Decimal,
    pub today_pnl: Decimal,
    pub total_pnl: Decimal,
    pub buying_power: Decimal,
    pub margin_used: Decimal,
    pub as_of: DateTime<Utc>,
}

impl AccountSnapshot {
    /// `marginUsed / totalAssets`, `None` when assets are not positive
    pub fn margin_usage(&self) -> Option<Decimal> {
        (self.total_assets > Decimal::ZERO).then(|| self.margin_used / self.total_assets)
    }

    /// `totalPnL / totalAssets`, `None` when assets are not positive
    pub fn total_pnl_ratio(&self) -> Option<Decimal> {
        (self.total_assets > Decimal::ZERO).then(|| self.total_pnl / self.total_assets)
    }
}

/// Trading status derived by the risk monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Normal,
    /// A high-severity alert is active
    Warning,
    /// A critical alert is active
    Critical,
    /// All positions are being closed; new exposure is refused
    EmergencyStop,
}

impl AccountStatus {
    /// Whether orders that add exposure may be sent
    pub fn allows_new_exposure(&self) -> bool {
        !matches!(self, AccountStatus::EmergencyStop)
    }
}
