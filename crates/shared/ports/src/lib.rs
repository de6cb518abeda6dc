//! Bastion Ports
//!
//! Port definitions (traits) for the Bastion execution and risk core.
//! These define the boundaries between domain logic and the external
//! collaborators: brokerage, market data, persistence, event delivery, time.

mod brokerage;
mod clock;
mod error;
mod events;
mod market_data;
mod store;

pub use brokerage::{BrokerageApi, FillDetails, SubmitAck};
pub use clock::Clock;
pub use error::{BrokerError, BrokerResult, MarketDataError, StoreError};
pub use events::EventPublisher;
pub use market_data::MarketDataProvider;
pub use store::PositionStore;
