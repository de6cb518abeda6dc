//! Paper brokerage
//!
//! Speaks the brokerage wire messages in-process so the core can run a full
//! session (or a scripted test scenario) without a network.

mod brokerage;
mod script;

pub use brokerage::SimulatedBrokerage;
pub use script::ScriptStep;
