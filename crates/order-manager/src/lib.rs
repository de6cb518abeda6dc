//! Bastion Order Manager
//!
//! The Order Manager sits between decision makers (user, risk monitor) and the
//! brokerage, responsible for:
//! - **Order Lifecycle**: submit, track with backoff, cancel with reconciliation
//! - **Position Ledger**: per-symbol holdings with exact weighted-average cost
//! - **Trading Gate**: local veto of new exposure while trading is halted
//!
//! ## Architecture
//!
//! ```text
//! User / Risk Monitor ──► OrderRequest
//!                              │
//!            ┌─────────────────▼──────────────────────┐
//!            │        Order Lifecycle Manager         │
//!            │  validate ─► connected? ─► gate check  │
//!            │                  │                     │
//!            │          BrokerageApi.submit           │
//!            │                  │                     │
//!            │   tracker (backoff 1s→30s, stop signal)│
//!            │                  │ status + fill query │
//!            │           reconcile (per order lock)   │
//!            └──────────────────┬─────────────────────┘
//!                               │ Fill (id = order:cumQty)
//!            ┌──────────────────▼─────────────────────┐
//!            │           Position Ledger              │
//!            │  per-symbol writer lock, fill-id dedupe│
//!            │  PositionStore (best effort)           │
//!            └──────────────────┬─────────────────────┘
//!                               │
//!                    TradingEvent ──► EventPublisher
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bastion_order_manager::OrderLifecycleManager;
//!
//! olm.connect().await?;
//! let order_id = olm.submit(OrderRequest::limit("AAPL", Side::Buy, 100, dec!(150))).await?;
//! let status = olm.spawn_tracking(order_id).await??;
//! ```

pub mod error;
pub mod gate;
pub mod ledger;
pub mod lifecycle;

// Re-export main types
pub use error::{Error, Result};
pub use gate::TradingGate;
pub use ledger::{LedgerUpdate, PositionLedger};
pub use lifecycle::{OrderLifecycleManager, TrackingConfig};
