//! Runtime configuration
//!
//! One JSON document configures every component. Each section falls back to
//! its defaults when omitted; unknown keys are rejected.

use bastion_order_manager::TrackingConfig;
use bastion_risk_manager::{MarketSession, MonitorConfig, RiskError, RiskThresholds};
use bastion_strategy::{StrategyError, StrategyParameters};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid risk config: {0}")]
    Risk(#[from] RiskError),

    #[error("Invalid strategy config: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BastionConfig {
    pub risk: RiskThresholds,
    pub monitor: MonitorConfig,
    pub tracking: TrackingConfig,
    pub session: MarketSession,
    /// Parameter overrides; classes not listed keep their defaults
    pub strategies: Vec<StrategyParameters>,
    /// Symbols the session trades and analyses
    pub symbols: Vec<String>,
    /// Buffer size of the outward event channel
    pub event_capacity: usize,
}

impl Default for BastionConfig {
    fn default() -> Self {
        Self {
            risk: RiskThresholds::default(),
            monitor: MonitorConfig::default(),
            tracking: TrackingConfig::default(),
            session: MarketSession::default(),
            strategies: Vec::new(),
            symbols: Vec::new(),
            event_capacity: 1024,
        }
    }
}

impl BastionConfig {
    /// Load and validate configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;

        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.risk.validate()?;
        self.monitor.validate()?;
        self.session.validate()?;
        validate_tracking(&self.tracking)?;

        for params in &self.strategies {
            params.validate()?;
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "event_capacity",
                reason: "must be positive".to_string(),
            });
        }
        if let Some(blank) = self.symbols.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "symbols",
                reason: format!("blank symbol {:?}", blank),
            });
        }
        Ok(())
    }
}

fn validate_tracking(tracking: &TrackingConfig) -> Result<(), ConfigError> {
    let invalid = |field, reason: &str| ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    };
    if tracking.initial_delay_ms == 0 {
        return Err(invalid("tracking.initial_delay_ms", "must be positive"));
    }
    if tracking.max_delay_ms < tracking.initial_delay_ms {
        return Err(invalid(
            "tracking.max_delay_ms",
            "must not be below initial_delay_ms",
        ));
    }
    if tracking.max_attempts == 0 {
        return Err(invalid("tracking.max_attempts", "must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_strategy::FrequencyClass;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = BastionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.risk.max_margin_usage, dec!(0.8));
        assert_eq!(config.monitor.tick_interval_ms, 1000);
        assert_eq!(config.session.utc_offset_minutes, 480);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BastionConfig::from_json(
            r#"{
                "symbols": ["600519", "000001"],
                "risk": { "max_single_position_loss": "0.08" },
                "tracking": { "max_attempts": 10 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.symbols.len(), 2);
        assert_eq!(config.risk.max_single_position_loss, dec!(0.08));
        assert_eq!(config.risk.max_margin_usage, dec!(0.8));
        assert_eq!(config.tracking.max_attempts, 10);
        assert_eq!(config.tracking.initial_delay_ms, 1000);
    }

    #[test]
    fn test_strategy_overrides_are_validated() {
        let config = BastionConfig::from_json(
            r#"{
                "strategies": [{"mid_frequency": {
                    "ema_fast": 5, "ema_slow": 20, "rsi_period": 14, "kdj_period": 9,
                    "confidence_threshold": "0.6", "stop_loss": "0.03", "take_profit": "0.06"
                }}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.strategies[0].class(), FrequencyClass::MidFrequency);

        let err = BastionConfig::from_json(
            r#"{
                "strategies": [{"mid_frequency": {
                    "ema_fast": 20, "ema_slow": 5, "rsi_period": 14, "kdj_period": 9,
                    "confidence_threshold": "0.6", "stop_loss": "0.03", "take_profit": "0.06"
                }}]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Strategy(_)));
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            BastionConfig::from_json(r#"{"risk": {"max_margin_usage": "1.5"}}"#),
            Err(ConfigError::Risk(_))
        ));
        assert!(matches!(
            BastionConfig::from_json(r#"{"session": {"open_hour": 16, "close_hour": 9}}"#),
            Err(ConfigError::Risk(_))
        ));
        assert!(matches!(
            BastionConfig::from_json(r#"{"tracking": {"max_attempts": 0}}"#),
            Err(ConfigError::Invalid { field: "tracking.max_attempts", .. })
        ));
        assert!(matches!(
            BastionConfig::from_json(r#"{"event_capacity": 0}"#),
            Err(ConfigError::Invalid { field: "event_capacity", .. })
        ));
        assert!(matches!(
            BastionConfig::from_json(r#"{"symbolz": []}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = BastionConfig::from_file("/nonexistent/bastion.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
