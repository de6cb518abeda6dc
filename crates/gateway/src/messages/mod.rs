//! Brokerage wire message types
//!
//! JSON shapes (camelCase) of the brokerage trading API, with conversions
//! into the domain types the core consumes.

pub mod account;
pub mod order;
