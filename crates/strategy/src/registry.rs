//! Strategy lookup table
//!
//! Built once at startup. Each `(class, sub-strategy name)` pair routes to
//! the implementation for that class together with the class's validated
//! parameter set.

use crate::daily::DailyStrategy;
use crate::error::{Result, StrategyError};
use crate::high_frequency::HighFrequencyStrategy;
use crate::indicators::{IndicatorSet, MarketSnapshot};
use crate::low_frequency::LowFrequencyStrategy;
use crate::mid_frequency::MidFrequencyStrategy;
use crate::params::StrategyParameters;
use crate::signal::StrategySignal;
use crate::strategy::{FrequencyClass, SubStrategy, TradingStrategy};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};

pub struct StrategyRegistry {
    strategies: BTreeMap<FrequencyClass, Box<dyn TradingStrategy>>,
    routes: HashMap<FrequencyClass, HashMap<&'static str, SubStrategy>>,
    parameters: HashMap<FrequencyClass, StrategyParameters>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: BTreeMap::new(),
            routes: HashMap::new(),
            parameters: HashMap::new(),
        }
    }

    /// All four frequency classes with default parameters
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(HighFrequencyStrategy));
        registry.register(Box::new(MidFrequencyStrategy));
        registry.register(Box::new(LowFrequencyStrategy));
        registry.register(Box::new(DailyStrategy));
        registry
    }

    /// Add (or replace) the implementation for a class.
    pub fn register(&mut self, strategy: Box<dyn TradingStrategy>) {
        let class = strategy.class();
        let table = strategy
            .sub_strategies()
            .iter()
            .map(|sub| (sub.name(), *sub))
            .collect();
        self.routes.insert(class, table);
        self.parameters.insert(class, strategy.default_parameters());
        debug!(
            "[STRATEGY] Registered {} with {} sub-strategies",
            class.as_str(),
            strategy.sub_strategies().len()
        );
        self.strategies.insert(class, strategy);
    }

    /// Replace a class's parameters after validating them
    pub fn set_parameters(&mut self, params: StrategyParameters) -> Result<()> {
        let class = params.class();
        let strategy = self.strategy(class)?;
        strategy.validate_parameters(&params)?;
        info!("[STRATEGY] Parameters updated for {}", class.as_str());
        self.parameters.insert(class, params);
        Ok(())
    }

    pub fn parameters(&self, class: FrequencyClass) -> Option<&StrategyParameters> {
        self.parameters.get(&class)
    }

    pub fn classes(&self) -> impl Iterator<Item = FrequencyClass> + '_ {
        self.strategies.keys().copied()
    }

    pub fn sub_strategies(&self, class: FrequencyClass) -> &'static [SubStrategy] {
        self.strategies
            .get(&class)
            .map(|s| s.sub_strategies())
            .unwrap_or(&[])
    }

    /// Resolve a sub-strategy by name within a class
    pub fn resolve(&self, class: FrequencyClass, name: &str) -> Result<SubStrategy> {
        self.routes
            .get(&class)
            .and_then(|table| table.get(name))
            .copied()
            .ok_or_else(|| StrategyError::UnknownStrategy {
                class,
                name: name.to_string(),
            })
    }

    /// Evaluate a named sub-strategy with the class's configured parameters
    pub fn generate(
        &self,
        class: FrequencyClass,
        name: &str,
        market: &MarketSnapshot,
        indicators: &IndicatorSet,
    ) -> Result<Option<StrategySignal>> {
        let sub = self.resolve(class, name)?;
        self.evaluate(sub, market, indicators)
    }

    pub fn evaluate(
        &self,
        sub: SubStrategy,
        market: &MarketSnapshot,
        indicators: &IndicatorSet,
    ) -> Result<Option<StrategySignal>> {
        let class = sub.class();
        let strategy = self.strategy(class)?;
        let params = self
            .parameters
            .get(&class)
            .ok_or_else(|| StrategyError::UnknownStrategy {
                class,
                name: sub.name().to_string(),
            })?;

        let signal = strategy.generate_signal(sub, market, indicators, params)?;
        if let Some(s) = &signal {
            debug!(
                "[STRATEGY] {} {} {:?} confidence={} ({})",
                market.symbol,
                sub.name(),
                s.action,
                s.confidence,
                s.reasoning
            );
        }
        Ok(signal)
    }

    fn strategy(&self, class: FrequencyClass) -> Result<&dyn TradingStrategy> {
        self.strategies
            .get(&class)
            .map(|s| &**s)
            .ok_or_else(|| StrategyError::UnknownStrategy {
                class,
                name: class.as_str().to_string(),
            })
    }
}
