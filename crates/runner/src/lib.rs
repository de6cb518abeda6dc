//! Bastion Runner
//!
//! Composition root for the execution and risk core:
//! - JSON configuration for every component, validated on load
//! - `Bastion`: wires ledger, order lifecycle, risk monitor and strategies
//!   around external collaborators and owns start/shutdown
//! - Paper trading session against the in-process simulator
//!
//! ## Architecture
//!
//! ```text
//!                    BastionConfig (JSON)
//!                           │
//!   ┌───────────────────────▼────────────────────────┐
//!   │                    Bastion                     │
//!   │                                                │
//!   │  StrategyRegistry ──► OrderLifecycleManager ◄──┼── BrokerageApi
//!   │                         │            ▲         │
//!   │                  fills  ▼            │ mitigations
//!   │                  PositionLedger ◄── RiskMonitor┼── MarketDataProvider
//!   │                         │                      │
//!   │                         ▼                      │
//!   │                   PositionStore                │
//!   └───────────────────────┬────────────────────────┘
//!                           │ TradingEvent
//!                           ▼
//!                  BroadcastEventPublisher
//! ```

pub mod bootstrap;
pub mod config;
pub mod paper;

pub use bootstrap::{Bastion, BootstrapError, Collaborators};
pub use config::{BastionConfig, ConfigError};
pub use paper::{
    PaperAccount, PaperError, PaperHolding, PaperScenario, PaperSession, PaperSymbol,
    PaperTimeframe, RejectedOrder, SessionReport,
};
