//! Adapters for the core's ports
//!
//! A paper brokerage plus in-memory market data, persistence and event
//! delivery. Real brokerage or storage adapters implement the same traits.

pub mod events;
pub mod market_data;
pub mod simulator;
pub mod store;

pub use events::BroadcastEventPublisher;
pub use market_data::StaticMarketData;
pub use simulator::{ScriptStep, SimulatedBrokerage};
pub use store::InMemoryStore;
