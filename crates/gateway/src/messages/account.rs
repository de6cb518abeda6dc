//! Account message types

use bastion_core::{AccountSnapshot, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Response to an account info query
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfoResponse {
    pub total_assets: Decimal,
    pub available_cash: Decimal,
    pub market_value: Decimal,
    #[serde(rename = "todayPnL")]
    pub today_pnl: Decimal,
    #[serde(rename = "totalPnL")]
    pub total_pnl: Decimal,
    pub buying_power: Decimal,
    pub margin_used: Decimal,
}

impl AccountInfoResponse {
    pub fn into_snapshot(self, as_of: Timestamp) -> AccountSnapshot {
        AccountSnapshot {
            total_assets: self.total_assets,
            available_cash: self.available_cash,
            market_value: self.market_value,
            today_pnl: self.today_pnl,
            total_pnl: self.total_pnl,
            buying_power: self.buying_power,
            margin_used: self.margin_used,
            as_of,
        }
    }
}

impl From<&AccountSnapshot> for AccountInfoResponse {
    fn from(s: &AccountSnapshot) -> Self {
        Self {
            total_assets: s.total_assets,
            available_cash: s.available_cash,
            market_value: s.market_value,
            today_pnl: s.today_pnl,
            total_pnl: s.total_pnl,
            buying_power: s.buying_power,
            margin_used: s.margin_used,
        }
    }
}
