//! Bastion Risk Manager
//!
//! Real-time account and position risk control. Unlike the order manager's
//! trading gate (a passive veto), this crate is active:
//!
//! - **Risk Monitor**: fixed-interval control loop raising alerts and
//!   submitting mitigating orders (stop-loss, reduce, emergency close)
//! - **Abnormal Trading Detector**: pure rules over recent trades
//! - **Alert Book**: de-duplication by `(type, message)` with a TTL
//! - **Position Risk**: loss ratio, concentration, volatility, risk level
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Risk Monitor                          │
//! │                                                             │
//! │  AccountSnapshot ───► cash / margin / total loss rules      │
//! │                                                             │
//! │  Position Ledger ───► PositionRisk ───► loss / conc. / vol. │
//! │  Market Data     ──┘                                        │
//! │                                                             │
//! │  Trade window ──────► AbnormalTradingDetector               │
//! │                                                             │
//! │  AlertBook (dedupe, 1h TTL) ───► AccountStatus              │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │ MitigationPlan                │ status
//!                ▼                               ▼
//!      Order Lifecycle Manager  ◄──────────  TradingGate
//!     (fire-and-forget, tracked)
//! ```
//!
//! ## Boundary policy
//!
//! Every rule compares with strict inequality: a value exactly at its
//! threshold never fires.

pub mod abnormal;
pub mod alerts;
pub mod error;
pub mod monitor;
pub mod position_risk;
pub mod thresholds;

// Re-export main types
pub use abnormal::{
    AbnormalRule, AbnormalTradingDetector, DetectionContext, DetectionReport, Finding,
};
pub use alerts::AlertBook;
pub use error::{Result, RiskError};
pub use monitor::{
    MitigationKind, MitigationPlan, MitigationRecord, MonitoringMetrics, RiskMonitor, TickReport,
};
pub use position_risk::{PositionRisk, RiskLevel};
pub use thresholds::{MarketSession, MonitorConfig, RiskThresholds};
