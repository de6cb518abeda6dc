//! Abnormal Trading Detector
//!
//! Stateless rules over a single trade or a window of recent trades. The
//! detector reads its inputs and returns findings; it never mutates anything.
//!
//! | Rule | Fires when | Severity |
//! |------|------------|----------|
//! | large_trade | trade value > ratio of total assets | high |
//! | frequent_trading | trades in window > max trades | medium |
//! | large_hourly_value | traded value in window > max value | high |
//! | price_anomaly | deviation from trailing average > max deviation | medium |
//! | off_hours | trade outside the local session | medium |
//! | concentration | position value / portfolio > max concentration | medium |

use bastion_core::{
    AlertSeverity, AlertType, Price, RiskAction, RiskAlert, Symbol, Timestamp, Trade,
};
use log::debug;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

use crate::thresholds::{MarketSession, RiskThresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbnormalRule {
    LargeTrade,
    FrequentTrading,
    LargeHourlyValue,
    PriceAnomaly,
    OffHours,
    Concentration,
}

impl AbnormalRule {
    pub fn name(&self) -> &'static str {
        match self {
            AbnormalRule::LargeTrade => "large_trade",
            AbnormalRule::FrequentTrading => "frequent_trading",
            AbnormalRule::LargeHourlyValue => "large_hourly_value",
            AbnormalRule::PriceAnomaly => "price_anomaly",
            AbnormalRule::OffHours => "off_hours",
            AbnormalRule::Concentration => "concentration",
        }
    }

    pub fn severity(&self) -> AlertSeverity {
        match self {
            AbnormalRule::LargeTrade | AbnormalRule::LargeHourlyValue => AlertSeverity::High,
            _ => AlertSeverity::Medium,
        }
    }

    pub fn alert_type(&self) -> AlertType {
        match self {
            AbnormalRule::LargeTrade | AbnormalRule::LargeHourlyValue => AlertType::LargeTrading,
            AbnormalRule::FrequentTrading => AlertType::FrequentTrading,
            AbnormalRule::PriceAnomaly => AlertType::PriceAnomaly,
            AbnormalRule::OffHours => AlertType::OffHoursTrading,
            AbnormalRule::Concentration => AlertType::Concentration,
        }
    }

    /// Alert text. It carries no figures so repeated findings dedupe.
    pub fn message(&self, symbol: Option<&str>) -> String {
        let text = match self {
            AbnormalRule::LargeTrade => "large single trade",
            AbnormalRule::FrequentTrading => "trading frequency too high",
            AbnormalRule::LargeHourlyValue => "traded value in window too high",
            AbnormalRule::PriceAnomaly => "trade price deviates from average",
            AbnormalRule::OffHours => "trade outside market session",
            AbnormalRule::Concentration => "position concentration too high",
        };
        match symbol {
            Some(symbol) => format!("{symbol} {text}"),
            None => text.to_string(),
        }
    }
}

/// One fired rule
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub rule: AbnormalRule,
    pub symbol: Option<Symbol>,
    pub current_value: Decimal,
    pub threshold: Decimal,
}

impl Finding {
    pub fn severity(&self) -> AlertSeverity {
        self.rule.severity()
    }

    pub fn to_alert(&self, at: Timestamp) -> RiskAlert {
        RiskAlert::new(
            self.rule.alert_type(),
            self.rule.severity(),
            self.symbol.clone(),
            self.rule.message(self.symbol.as_deref()),
            self.current_value,
            self.threshold,
            RiskAction::RequireAttention,
            at,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionReport {
    pub findings: Vec<Finding>,
}

impl DetectionReport {
    /// Highest severity among the findings, `None` when nothing fired
    pub fn max_severity(&self) -> Option<AlertSeverity> {
        self.findings.iter().map(Finding::severity).max()
    }

    /// Names of the fired rules, each once, in firing order
    pub fn rule_names(&self) -> Vec<&'static str> {
        let mut seen = HashSet::new();
        self.findings
            .iter()
            .map(|f| f.rule.name())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    fn push(&mut self, finding: Finding) {
        let duplicate = self
            .findings
            .iter()
            .any(|f| f.rule == finding.rule && f.symbol == finding.symbol);
        if !duplicate {
            debug!(
                "[DETECT] {} fired for {} ({} > {})",
                finding.rule.name(),
                finding.symbol.as_deref().unwrap_or("account"),
                finding.current_value,
                finding.threshold
            );
            self.findings.push(finding);
        }
    }
}

/// Account and market figures the rules are evaluated against
#[derive(Debug, Clone, Default)]
pub struct DetectionContext {
    pub total_assets: Decimal,
    /// Sum of all position values
    pub portfolio_value: Decimal,
    /// Current value of each held position
    pub position_values: HashMap<Symbol, Decimal>,
    /// Trailing average price per symbol
    pub trailing_averages: HashMap<Symbol, Price>,
}

#[derive(Debug, Clone)]
pub struct AbnormalTradingDetector {
    thresholds: RiskThresholds,
    session: MarketSession,
    large_trade_ratio: Decimal,
}

impl AbnormalTradingDetector {
    pub fn new(thresholds: RiskThresholds, session: MarketSession, large_trade_ratio: Decimal) -> Self {
        Self {
            thresholds,
            session,
            large_trade_ratio,
        }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Rules that look at one trade
    pub fn evaluate_trade(&self, trade: &Trade, ctx: &DetectionContext) -> DetectionReport {
        let mut report = DetectionReport::default();
        self.check_trade(trade, ctx, &mut report);
        report
    }

    /// Window rules plus every per-trade rule over `trades`
    pub fn evaluate_window(&self, trades: &[Trade], ctx: &DetectionContext) -> DetectionReport {
        let mut report = DetectionReport::default();
        let limits = &self.thresholds;

        let count = trades.len();
        if count > limits.max_trades_per_hour {
            report.push(Finding {
                rule: AbnormalRule::FrequentTrading,
                symbol: None,
                current_value: Decimal::from(count),
                threshold: Decimal::from(limits.max_trades_per_hour),
            });
        }

        let traded_value: Decimal = trades.iter().map(Trade::notional).sum();
        if traded_value > limits.max_hourly_trade_value {
            report.push(Finding {
                rule: AbnormalRule::LargeHourlyValue,
                symbol: None,
                current_value: traded_value,
                threshold: limits.max_hourly_trade_value,
            });
        }

        for trade in trades {
            self.check_trade(trade, ctx, &mut report);
        }
        report
    }

    fn check_trade(&self, trade: &Trade, ctx: &DetectionContext, report: &mut DetectionReport) {
        let limits = &self.thresholds;
        let symbol = Some(trade.symbol.clone());

        if ctx.total_assets > Decimal::ZERO {
            let limit = ctx.total_assets * self.large_trade_ratio;
            let value = trade.notional();
            if value > limit {
                report.push(Finding {
                    rule: AbnormalRule::LargeTrade,
                    symbol: symbol.clone(),
                    current_value: value,
                    threshold: limit,
                });
            }
        }

        if let Some(avg) = ctx.trailing_averages.get(&trade.symbol)
            && *avg > Decimal::ZERO
        {
            let deviation = (trade.price - *avg).abs() / *avg;
            if deviation > limits.max_price_deviation {
                report.push(Finding {
                    rule: AbnormalRule::PriceAnomaly,
                    symbol: symbol.clone(),
                    current_value: deviation,
                    threshold: limits.max_price_deviation,
                });
            }
        }

        if !self.session.is_open(trade.timestamp) {
            report.push(Finding {
                rule: AbnormalRule::OffHours,
                symbol: symbol.clone(),
                current_value: Decimal::from(self.session.local_hour(trade.timestamp)),
                threshold: Decimal::from(self.session.close_hour),
            });
        }

        if ctx.portfolio_value > Decimal::ZERO
            && let Some(value) = ctx.position_values.get(&trade.symbol)
        {
            let ratio = value.abs() / ctx.portfolio_value;
            if ratio > limits.max_position_concentration {
                report.push(Finding {
                    rule: AbnormalRule::Concentration,
                    symbol,
                    current_value: ratio,
                    threshold: limits.max_position_concentration,
                });
            }
        }
    }
}
