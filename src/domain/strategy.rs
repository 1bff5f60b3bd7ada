//! Strategy contract and per-symbol routing.
//!
//! The engine only ever sees `dyn Strategy`. Concrete signal formulas live in
//! [`crate::domain::strategies`].

use std::collections::{BTreeSet, HashMap};

use super::error::StrategyError;
use super::observation::MarketObservation;
use super::position::Position;
use super::signal::Signal;
use super::strategies::{Combined, Momentum, MovingAverageCrossover};

/// Produces one signal per observation it is shown.
///
/// Implementations keep their own bounded history; the engine passes each
/// observation exactly once, in timestamp order, together with a read-only view
/// of the current position in that observation's symbol.
pub trait Strategy {
    fn name(&self) -> &str;

    fn on_observation(
        &mut self,
        observation: &MarketObservation,
        position: Option<&Position>,
    ) -> Result<Signal, StrategyError>;
}

/// Strategy selection and parameters, as read from configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyConfig {
    MovingAverageCrossover {
        short_window: usize,
        long_window: usize,
        trade_qty: Option<i64>,
    },
    Momentum {
        lookback: usize,
        threshold: f64,
        trade_qty: Option<i64>,
    },
}

impl StrategyConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyConfig::MovingAverageCrossover { .. } => "ma_crossover",
            StrategyConfig::Momentum { .. } => "momentum",
        }
    }

    /// Checks parameters without keeping an instance.
    pub fn validate(&self) -> Result<(), StrategyError> {
        self.build("").map(|_| ())
    }

    /// Builds a strategy instance bound to `symbol`.
    pub fn build(&self, symbol: &str) -> Result<Box<dyn Strategy>, StrategyError> {
        match *self {
            StrategyConfig::MovingAverageCrossover {
                short_window,
                long_window,
                trade_qty,
            } => Ok(Box::new(MovingAverageCrossover::new(
                symbol,
                short_window,
                long_window,
                trade_qty,
            )?)),
            StrategyConfig::Momentum {
                lookback,
                threshold,
                trade_qty,
            } => Ok(Box::new(Momentum::new(
                symbol,
                lookback,
                threshold,
                trade_qty,
            )?)),
        }
    }
}

/// Splits a `kind` value such as `ma_crossover, Momentum` into lowercase names.
pub fn parse_kinds(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

type StrategyFactory = Box<dyn FnMut(&str) -> Result<Box<dyn Strategy>, StrategyError>>;

/// Routes each observation to a strategy instance owned by its symbol.
///
/// Instances are created on first sight of a symbol and never share history.
pub struct PerSymbol {
    name: String,
    symbols: Option<BTreeSet<String>>,
    factory: StrategyFactory,
    instances: HashMap<String, Box<dyn Strategy>>,
}

impl PerSymbol {
    pub fn new(
        name: impl Into<String>,
        factory: impl FnMut(&str) -> Result<Box<dyn Strategy>, StrategyError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            symbols: None,
            factory: Box::new(factory),
            instances: HashMap::new(),
        }
    }

    pub fn from_config(config: StrategyConfig) -> Self {
        Self::from_configs(vec![config])
    }

    /// One instance per symbol running every config in `configs`; more than
    /// one config is wrapped in [`Combined`].
    pub fn from_configs(configs: Vec<StrategyConfig>) -> Self {
        let name = configs
            .iter()
            .map(StrategyConfig::kind)
            .collect::<Vec<_>>()
            .join("+");
        Self::new(name, move |symbol| match configs.as_slice() {
            [single] => single.build(symbol),
            many => {
                let members = many
                    .iter()
                    .map(|c| c.build(symbol))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Box::new(Combined::new(members)) as Box<dyn Strategy>)
            }
        })
    }

    /// Restricts trading to `symbols`; everything else is held.
    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = Some(symbols.into_iter().map(Into::into).collect());
        self
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

impl Strategy for PerSymbol {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_observation(
        &mut self,
        observation: &MarketObservation,
        position: Option<&Position>,
    ) -> Result<Signal, StrategyError> {
        if let Some(symbols) = &self.symbols {
            if !symbols.contains(&observation.symbol) {
                return Ok(Signal::Hold);
            }
        }

        if !self.instances.contains_key(&observation.symbol) {
            let instance = (self.factory)(&observation.symbol)?;
            self.instances.insert(observation.symbol.clone(), instance);
        }

        match self.instances.get_mut(&observation.symbol) {
            Some(strategy) => strategy.on_observation(observation, position),
            None => Ok(Signal::Hold),
        }
    }
}
