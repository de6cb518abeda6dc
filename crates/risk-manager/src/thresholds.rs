//! Risk thresholds and monitor settings
//!
//! All three structs deserialize with `deny_unknown_fields` so a misspelled
//! key in a config file is an error, not a silently ignored limit.

use chrono::{FixedOffset, Timelike};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use bastion_core::Timestamp;

use crate::error::{Result, invalid};

/// Limits every rule of the monitor and detector compares against.
/// A rule fires only when its value is strictly beyond the limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskThresholds {
    /// Cash below this raises a shortage alert
    pub min_cash_reserve: Decimal,
    /// marginUsed / totalAssets
    pub max_margin_usage: Decimal,
    /// Loss as a fraction of total assets before the emergency stop
    pub max_total_loss_ratio: Decimal,
    /// Unrealized loss as a fraction of cost basis before auto stop
    pub max_single_position_loss: Decimal,
    /// Position value as a fraction of the portfolio
    pub max_position_concentration: Decimal,
    /// Standard deviation of daily returns
    pub max_price_volatility: Decimal,
    /// Trade count allowed inside the detection window
    pub max_trades_per_hour: usize,
    /// Traded value allowed inside the detection window
    pub max_hourly_trade_value: Decimal,
    /// Deviation from the trailing average price
    pub max_price_deviation: Decimal,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            min_cash_reserve: dec!(1000),
            max_margin_usage: dec!(0.8),
            max_total_loss_ratio: dec!(0.1),
            max_single_position_loss: dec!(0.05),
            max_position_concentration: dec!(0.3),
            max_price_volatility: dec!(0.03),
            max_trades_per_hour: 60,
            max_hourly_trade_value: dec!(100000),
            max_price_deviation: dec!(0.05),
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> Result<()> {
        if self.min_cash_reserve < Decimal::ZERO {
            return Err(invalid("min_cash_reserve", "must not be negative"));
        }
        if self.max_hourly_trade_value <= Decimal::ZERO {
            return Err(invalid("max_hourly_trade_value", "must be positive"));
        }
        if self.max_trades_per_hour == 0 {
            return Err(invalid("max_trades_per_hour", "must be positive"));
        }
        for (field, value) in [
            ("max_margin_usage", self.max_margin_usage),
            ("max_total_loss_ratio", self.max_total_loss_ratio),
            ("max_single_position_loss", self.max_single_position_loss),
            ("max_position_concentration", self.max_position_concentration),
            ("max_price_volatility", self.max_price_volatility),
            ("max_price_deviation", self.max_price_deviation),
        ] {
            check_ratio(field, value)?;
        }
        Ok(())
    }
}

/// Local trading session. Hours are inclusive: with the defaults a trade at
/// 15:59 is inside the session and one at 16:00 is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarketSession {
    pub open_hour: u32,
    pub close_hour: u32,
    /// Exchange offset from UTC
    pub utc_offset_minutes: i32,
}

impl Default for MarketSession {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 15,
            utc_offset_minutes: 480,
        }
    }
}

impl MarketSession {
    pub fn validate(&self) -> Result<()> {
        if self.close_hour > 23 {
            return Err(invalid("close_hour", "must be an hour of the day"));
        }
        if self.open_hour > self.close_hour {
            return Err(invalid("open_hour", "must not be after close_hour"));
        }
        if self.offset().is_none() {
            return Err(invalid("utc_offset_minutes", "out of range"));
        }
        Ok(())
    }

    fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }

    /// Hour of `ts` in exchange-local time
    pub fn local_hour(&self, ts: Timestamp) -> u32 {
        match self.offset() {
            Some(offset) => ts.with_timezone(&offset).hour(),
            None => ts.hour(),
        }
    }

    pub fn is_open(&self, ts: Timestamp) -> bool {
        let hour = self.local_hour(ts);
        hour >= self.open_hour && hour <= self.close_hour
    }
}

/// Control loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    pub tick_interval_ms: u64,
    /// Alerts older than this are dropped
    pub alert_ttl_secs: u64,
    /// Look-back of the abnormal trading window
    pub trade_window_minutes: u64,
    /// Fraction of each position sold by auto-reduce
    pub reduce_fraction: Decimal,
    /// How many of the worst positions auto-reduce touches
    pub reduce_top_n: usize,
    /// Days in the trailing average used for price anomalies
    pub trailing_average_days: usize,
    /// Single trade value as a fraction of total assets
    pub large_trade_ratio: Decimal,
    /// Daily closes used for the volatility estimate
    pub volatility_lookback_days: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            alert_ttl_secs: 3_600,
            trade_window_minutes: 30,
            reduce_fraction: dec!(0.5),
            reduce_top_n: 3,
            trailing_average_days: 5,
            large_trade_ratio: dec!(0.2),
            volatility_lookback_days: 20,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms", "must be positive"));
        }
        if self.alert_ttl_secs == 0 {
            return Err(invalid("alert_ttl_secs", "must be positive"));
        }
        if self.trade_window_minutes == 0 {
            return Err(invalid("trade_window_minutes", "must be positive"));
        }
        if self.reduce_top_n == 0 {
            return Err(invalid("reduce_top_n", "must be positive"));
        }
        if self.trailing_average_days == 0 {
            return Err(invalid("trailing_average_days", "must be positive"));
        }
        if self.volatility_lookback_days < 2 {
            return Err(invalid("volatility_lookback_days", "needs at least two closes"));
        }
        check_ratio("reduce_fraction", self.reduce_fraction)?;
        check_ratio("large_trade_ratio", self.large_trade_ratio)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn alert_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.alert_ttl_secs as i64)
    }

    pub fn trade_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.trade_window_minutes as i64)
    }
}

fn check_ratio(field: &'static str, value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO || value > Decimal::ONE {
        return Err(invalid(field, format!("{value} is outside (0, 1]")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiskError;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_defaults_are_valid() {
        assert!(RiskThresholds::default().validate().is_ok());
        assert!(MonitorConfig::default().validate().is_ok());
        assert!(MarketSession::default().validate().is_ok());
    }

    #[test]
    fn test_ratio_out_of_range_rejected() {
        let thresholds = RiskThresholds {
            max_margin_usage: dec!(1.5),
            ..Default::default()
        };
        assert_eq!(
            thresholds.validate(),
            Err(RiskError::InvalidConfig {
                field: "max_margin_usage",
                reason: "1.5 is outside (0, 1]".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_threshold_field_rejected() {
        let parsed: std::result::Result<RiskThresholds, _> =
            serde_json::from_str(r#"{"max_margin_usage": "0.7", "max_leverage": "3"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_session_hours_in_local_time() {
        let session = MarketSession::default();
        // 01:30 UTC is 09:30 at UTC+8
        let open = Utc.with_ymd_and_hms(2024, 3, 4, 1, 30, 0).unwrap();
        // 07:59 UTC is 15:59 local, last minute of the session
        let closing = Utc.with_ymd_and_hms(2024, 3, 4, 7, 59, 0).unwrap();
        // 08:00 UTC is 16:00 local
        let after = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
        // 00:59 UTC is 08:59 local
        let before = Utc.with_ymd_and_hms(2024, 3, 4, 0, 59, 0).unwrap();

        assert!(session.is_open(open));
        assert!(session.is_open(closing));
        assert!(!session.is_open(after));
        assert!(!session.is_open(before));
    }
}
