//! Bastion Core Domain
//!
//! Pure domain types for the Bastion execution and risk core.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod events;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    // Account and risk types
    AccountSnapshot,
    AccountStatus,
    AlertSeverity,
    AlertType,
    Bar,
    // Core trading entities
    Fill,
    FillEffect,
    Order,
    OrderId,
    OrderRequest,
    OrderStatus,
    OrderType,
    Position,
    RequestInvalid,
    RiskAction,
    RiskAlert,
    Side,
    TimeInForce,
    Timeframe,
    Trade,
    TradeId,
    TransitionError,
    UnknownStatus,
};
pub use events::TradingEvent;
pub use values::{Price, Quantity, Symbol, Timestamp, clamp_unit, return_volatility, sqrt_decimal};
