//! Bastion Strategy Signal Engine
//!
//! Deterministic signal generation over precomputed indicators:
//! - Typed indicator and parameter schemas (unknown fields rejected)
//! - Four frequency classes, three named sub-strategies each
//! - Registry keyed by (class, sub-strategy name), built at startup
//! - Multi-timeframe analysis folding signals into a recommendation
//!
//! Every sub-strategy is a pure function of its inputs. The engine holds no
//! mutable state during evaluation, so symbols can be evaluated in parallel
//! against one shared registry.
//!
//! ## Architecture
//!
//! ```text
//!   MarketSnapshot + IndicatorSet (per timeframe)
//!                    │
//!                    ▼
//!          ┌───────────────────┐    (class, name)
//!          │ StrategyRegistry  │◄──────────────── caller
//!          └─────────┬─────────┘
//!                    │ route + class parameters
//!     ┌──────────────┼──────────────┬──────────────┐
//!     ▼              ▼              ▼              ▼
//!  HighFreq       MidFreq        LowFreq         Daily
//!   (1m)           (15m)          (1h)           (1d)
//!     └──────────────┴──────┬───────┴──────────────┘
//!                           ▼
//!                Option<StrategySignal>
//!                           │
//!                           ▼
//!               MultiTimeframeAnalysis
//!            (score, StrongBuy/Buy/Watch/Avoid)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bastion_strategy::{FrequencyClass, StrategyRegistry};
//!
//! let registry = StrategyRegistry::standard();
//! let signal = registry.generate(FrequencyClass::HighFrequency, "momentum", &market, &indicators)?;
//! ```

pub mod analysis;
pub mod catalogue;
pub mod daily;
pub mod error;
pub mod high_frequency;
pub mod indicators;
pub mod low_frequency;
pub mod mid_frequency;
pub mod params;
pub mod registry;
pub mod signal;
pub mod strategy;

// Re-export main types
pub use analysis::{MultiTimeframeAnalysis, Recommendation, TimeframeInput, overall_score, recommend};
pub use catalogue::{StrategyDescriptor, StrategyRiskLevel, SubStrategyDescriptor, catalogue};
pub use daily::DailyStrategy;
pub use error::{Result, StrategyError};
pub use high_frequency::HighFrequencyStrategy;
pub use indicators::{IndicatorSet, MacdCross, MarketSnapshot};
pub use low_frequency::LowFrequencyStrategy;
pub use mid_frequency::MidFrequencyStrategy;
pub use params::{
    DailyParams, HighFrequencyParams, LowFrequencyParams, MidFrequencyParams, StrategyParameters,
};
pub use registry::StrategyRegistry;
pub use signal::{SignalAction, StrategySignal};
pub use strategy::{FrequencyClass, SubStrategy, TradingStrategy};
