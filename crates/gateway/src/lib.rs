//! Bastion Gateway
//!
//! Gateway layer for the Bastion execution and risk core. Provides:
//! - Wire message types of the brokerage trading API
//! - A paper brokerage speaking those messages in-process
//! - In-memory market data and persistence adapters
//! - Broadcast delivery of outbound trading events
//!
//! ## Architecture
//!
//! ```text
//!   Brokerage API / paper broker          Market data     Storage
//!            │                                 │              │
//!       ┌────▼─────┐                    ┌──────▼─────┐  ┌─────▼─────┐
//!       │ Brokerage│                    │ MarketData │  │ Position  │
//!       │   Api    │                    │  Provider  │  │  Store    │
//!       └────┬─────┘                    └──────┬─────┘  └─────┬─────┘
//!            │ ports (bastion-ports)           │              │
//!       ┌────▼─────────────────────────────────▼──────────────▼───┐
//!       │      order lifecycle / ledger / risk monitor            │
//!       └────────────────────────┬────────────────────────────────┘
//!                                │ TradingEvent
//!                        ┌───────▼────────┐
//!                        │ Broadcast      │──► UI / notifications
//!                        │ EventPublisher │
//!                        └────────────────┘
//! ```

pub mod adapters;
pub mod error;
pub mod messages;

// Re-export commonly used types
pub use adapters::{
    BroadcastEventPublisher, InMemoryStore, ScriptStep, SimulatedBrokerage, StaticMarketData,
};
pub use error::GatewayError;
