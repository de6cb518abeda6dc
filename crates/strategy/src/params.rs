//! Parameter sets, one per frequency class.
//!
//! Deserialization requires every field and rejects unknown ones; use
//! `Default` for the documented defaults.

use crate::error::{Result, invalid};
use crate::strategy::FrequencyClass;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HighFrequencyParams {
    pub rsi_period: u32,
    pub ema_period: u32,
    pub rsi_overbought: Decimal,
    pub rsi_oversold: Decimal,
    pub confidence_threshold: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

impl Default for HighFrequencyParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            ema_period: 9,
            rsi_overbought: dec!(70),
            rsi_oversold: dec!(30),
            confidence_threshold: dec!(0.6),
            stop_loss: dec!(0.02),
            take_profit: dec!(0.04),
        }
    }
}

impl HighFrequencyParams {
    pub fn validate(&self) -> Result<()> {
        check_period("rsi_period", self.rsi_period)?;
        check_period("ema_period", self.ema_period)?;
        if self.rsi_oversold <= Decimal::ZERO
            || self.rsi_overbought >= dec!(100)
            || self.rsi_oversold >= self.rsi_overbought
        {
            return Err(invalid(
                "rsi_oversold",
                format!(
                    "need 0 < oversold ({}) < overbought ({}) < 100",
                    self.rsi_oversold, self.rsi_overbought
                ),
            ));
        }
        check_exits(self.confidence_threshold, self.stop_loss, self.take_profit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MidFrequencyParams {
    pub ema_fast: u32,
    pub ema_slow: u32,
    pub rsi_period: u32,
    pub kdj_period: u32,
    pub confidence_threshold: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

impl Default for MidFrequencyParams {
    fn default() -> Self {
        Self {
            ema_fast: 12,
            ema_slow: 26,
            rsi_period: 14,
            kdj_period: 9,
            confidence_threshold: dec!(0.65),
            stop_loss: dec!(0.03),
            take_profit: dec!(0.06),
        }
    }
}

impl MidFrequencyParams {
    pub fn validate(&self) -> Result<()> {
        check_period("ema_fast", self.ema_fast)?;
        if self.ema_slow <= self.ema_fast {
            return Err(invalid(
                "ema_slow",
                format!("{} must exceed ema_fast {}", self.ema_slow, self.ema_fast),
            ));
        }
        check_period("rsi_period", self.rsi_period)?;
        check_period("kdj_period", self.kdj_period)?;
        check_exits(self.confidence_threshold, self.stop_loss, self.take_profit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LowFrequencyParams {
    pub bb_period: u32,
    pub bb_multiplier: Decimal,
    pub cci_period: u32,
    pub rsi_period: u32,
    pub confidence_threshold: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

impl Default for LowFrequencyParams {
    fn default() -> Self {
        Self {
            bb_period: 20,
            bb_multiplier: dec!(2.0),
            cci_period: 20,
            rsi_period: 14,
            confidence_threshold: dec!(0.7),
            stop_loss: dec!(0.05),
            take_profit: dec!(0.10),
        }
    }
}

impl LowFrequencyParams {
    pub fn validate(&self) -> Result<()> {
        check_period("bb_period", self.bb_period)?;
        if self.bb_multiplier <= Decimal::ZERO {
            return Err(invalid("bb_multiplier", format!("{} must be positive", self.bb_multiplier)));
        }
        check_period("cci_period", self.cci_period)?;
        check_period("rsi_period", self.rsi_period)?;
        check_exits(self.confidence_threshold, self.stop_loss, self.take_profit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DailyParams {
    pub ema_period: u32,
    pub rsi_period: u32,
    /// Minimum relative distance from the long EMA that counts as a trend
    pub trend_threshold: Decimal,
    pub confidence_threshold: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

impl Default for DailyParams {
    fn default() -> Self {
        Self {
            ema_period: 50,
            rsi_period: 14,
            trend_threshold: dec!(0.1),
            confidence_threshold: dec!(0.75),
            stop_loss: dec!(0.08),
            take_profit: dec!(0.15),
        }
    }
}

impl DailyParams {
    pub fn validate(&self) -> Result<()> {
        check_period("ema_period", self.ema_period)?;
        check_period("rsi_period", self.rsi_period)?;
        if self.trend_threshold <= Decimal::ZERO {
            return Err(invalid(
                "trend_threshold",
                format!("{} must be positive", self.trend_threshold),
            ));
        }
        check_exits(self.confidence_threshold, self.stop_loss, self.take_profit)
    }
}

/// Parameters tagged by the class they belong to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyParameters {
    HighFrequency(HighFrequencyParams),
    MidFrequency(MidFrequencyParams),
    LowFrequency(LowFrequencyParams),
    Daily(DailyParams),
}

impl StrategyParameters {
    pub fn defaults_for(class: FrequencyClass) -> Self {
        match class {
            FrequencyClass::HighFrequency => Self::HighFrequency(HighFrequencyParams::default()),
            FrequencyClass::MidFrequency => Self::MidFrequency(MidFrequencyParams::default()),
            FrequencyClass::LowFrequency => Self::LowFrequency(LowFrequencyParams::default()),
            FrequencyClass::Daily => Self::Daily(DailyParams::default()),
        }
    }

    pub fn class(&self) -> FrequencyClass {
        match self {
            Self::HighFrequency(_) => FrequencyClass::HighFrequency,
            Self::MidFrequency(_) => FrequencyClass::MidFrequency,
            Self::LowFrequency(_) => FrequencyClass::LowFrequency,
            Self::Daily(_) => FrequencyClass::Daily,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::HighFrequency(p) => p.validate(),
            Self::MidFrequency(p) => p.validate(),
            Self::LowFrequency(p) => p.validate(),
            Self::Daily(p) => p.validate(),
        }
    }

    /// Minimum confidence for a signal to be acted on
    pub fn confidence_threshold(&self) -> Decimal {
        match self {
            Self::HighFrequency(p) => p.confidence_threshold,
            Self::MidFrequency(p) => p.confidence_threshold,
            Self::LowFrequency(p) => p.confidence_threshold,
            Self::Daily(p) => p.confidence_threshold,
        }
    }
}

fn check_period(field: &'static str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(invalid(field, "must be greater than zero"));
    }
    Ok(())
}

fn check_exits(confidence: Decimal, stop_loss: Decimal, take_profit: Decimal) -> Result<()> {
    if confidence < Decimal::ZERO || confidence > Decimal::ONE {
        return Err(invalid("confidence_threshold", format!("{} outside [0, 1]", confidence)));
    }
    for (field, value) in [("stop_loss", stop_loss), ("take_profit", take_profit)] {
        if value <= Decimal::ZERO || value > Decimal::ONE {
            return Err(invalid(field, format!("{} outside (0, 1]", value)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StrategyError;

    #[test]
    fn test_defaults_are_valid() {
        for class in FrequencyClass::ALL {
            let params = StrategyParameters::defaults_for(class);
            assert_eq!(params.class(), class);
            params.validate().unwrap();
        }
    }

    #[test]
    fn test_zero_period_rejected() {
        let params = HighFrequencyParams {
            ema_period: 0,
            ..Default::default()
        };
        assert_eq!(
            params.validate(),
            Err(StrategyError::InvalidParameter {
                field: "ema_period",
                reason: "must be greater than zero".to_string(),
            })
        );
    }

    #[test]
    fn test_slow_ema_must_exceed_fast() {
        let params = MidFrequencyParams {
            ema_fast: 26,
            ema_slow: 12,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(StrategyError::InvalidParameter { field: "ema_slow", .. })
        ));
    }

    #[test]
    fn test_missing_and_unknown_fields_rejected() {
        let missing = r#"{"high_frequency": {"rsi_period": 14}}"#;
        assert!(serde_json::from_str::<StrategyParameters>(missing).is_err());

        let unknown = r#"{"daily": {
            "ema_period": 50, "rsi_period": 14, "trend_threshold": "0.1",
            "confidence_threshold": "0.75", "stop_loss": "0.08", "take_profit": "0.15",
            "leverage": 3
        }}"#;
        assert!(serde_json::from_str::<StrategyParameters>(unknown).is_err());

        let complete = r#"{"daily": {
            "ema_period": 50, "rsi_period": 14, "trend_threshold": "0.1",
            "confidence_threshold": "0.75", "stop_loss": "0.08", "take_profit": "0.15"
        }}"#;
        let parsed: StrategyParameters = serde_json::from_str(complete).unwrap();
        assert_eq!(parsed, StrategyParameters::Daily(DailyParams::default()));
    }
}
