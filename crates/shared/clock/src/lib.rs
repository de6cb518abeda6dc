//! Bastion Clock Infrastructure
//!
//! Wall-clock time for live sessions and a manually driven clock for
//! deterministic tests of time-window rules (trade windows, alert expiry,
//! market-session checks).
//!
//! ```ignore
//! use bastion_clock::{ManualClock, SystemClock};
//! use chrono::Duration;
//!
//! let live = SystemClock::new();
//! let test = ManualClock::at(start);
//! test.advance(Duration::minutes(31)); // trade falls out of the 30 min window
//! ```

mod manual;
mod system;

pub use manual::ManualClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use bastion_ports::Clock;
