//! Backtest engine and event loop.
//!
//! One pass over a pre-sorted, fully materialized feed:
//! observation -> strategy signal -> sized order -> ledger fill -> equity point.
//! Per-tick failures are recorded in the [`ErrorLog`] and never end the run.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::error::{TickError, TickreplayError};
use super::error_log::ErrorLog;
use super::execution::{ExecutionConfig, SizingPolicy, size_order};
use super::observation::{MarketObservation, TimeBucket};
use super::order::Order;
use super::portfolio::{EquityPoint, PortfolioLedger};
use super::signal::Signal;
use super::strategy::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub risk_free_rate: f64,
    pub sizing: SizingPolicy,
    pub error_bucket: TimeBucket,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            commission_per_trade: 0.0,
            commission_pct: 0.0,
            risk_free_rate: 0.02,
            sizing: SizingPolicy::default(),
            error_bucket: TimeBucket::default(),
            start: None,
            end: None,
        }
    }
}

impl BacktestConfig {
    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            commission_per_trade: self.commission_per_trade,
            commission_pct: self.commission_pct,
        }
    }

    /// Fresh ledger funded with `initial_capital` and this config's commissions.
    pub fn ledger(&self) -> PortfolioLedger {
        PortfolioLedger::with_execution(self.initial_capital, self.execution_config())
    }
}

/// Everything a run produces. The equity curve has exactly one point per
/// observation.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub equity_curve: Vec<EquityPoint>,
    pub trade_log: Vec<Order>,
    pub error_log: ErrorLog,
    pub ledger: PortfolioLedger,
    pub ticks_processed: usize,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.total_equity)
            .unwrap_or_else(|| self.ledger.total_equity())
    }

    pub fn filled_orders(&self) -> impl Iterator<Item = &Order> {
        self.trade_log.iter().filter(|o| o.is_filled())
    }
}

/// What a successfully processed tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub signal: Signal,
    pub order: Option<Order>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestEngine {
    sizing: SizingPolicy,
    error_bucket: TimeBucket,
}

impl Default for BacktestEngine {
    fn default() -> Self {
        Self::new(SizingPolicy::default(), TimeBucket::default())
    }
}

/// Mutable state of a single run.
struct RunState {
    ledger: PortfolioLedger,
    next_order_id: u64,
    last_timestamp: Option<NaiveDateTime>,
}

impl BacktestEngine {
    pub fn new(sizing: SizingPolicy, error_bucket: TimeBucket) -> Self {
        Self {
            sizing,
            error_bucket,
        }
    }

    pub fn from_config(config: &BacktestConfig) -> Self {
        Self::new(config.sizing, config.error_bucket)
    }

    pub fn sizing(&self) -> SizingPolicy {
        self.sizing
    }

    /// Replays `observations` through `strategy`, filling against `ledger`.
    ///
    /// Fails only when there is nothing to replay.
    pub fn run(
        &self,
        observations: &[MarketObservation],
        strategy: &mut dyn Strategy,
        ledger: PortfolioLedger,
    ) -> Result<BacktestResult, TickreplayError> {
        if observations.is_empty() {
            return Err(TickreplayError::EmptyFeed);
        }

        info!(
            ticks = observations.len(),
            strategy = strategy.name(),
            initial_cash = ledger.cash(),
            "starting backtest"
        );

        let mut state = RunState {
            ledger,
            next_order_id: 1,
            last_timestamp: None,
        };
        let mut equity_curve = Vec::with_capacity(observations.len());
        let mut trade_log = Vec::new();
        let mut error_log = ErrorLog::new();

        for observation in observations {
            match self.process_tick(&mut state, observation, strategy) {
                Ok(TickOutcome {
                    order: Some(order), ..
                }) => trade_log.push(order),
                Ok(_) => {}
                Err(err) => {
                    warn!(
                        timestamp = %observation.timestamp,
                        symbol = %observation.symbol,
                        kind = err.kind(),
                        "tick skipped: {err}"
                    );
                    error_log.record_tick(self.error_bucket, observation.timestamp, &err);
                }
            }
            equity_curve.push(state.ledger.snapshot(observation.timestamp));
        }

        let result = BacktestResult {
            equity_curve,
            trade_log,
            error_log,
            ledger: state.ledger,
            ticks_processed: observations.len(),
        };

        info!(
            orders = result.trade_log.len(),
            filled = result.filled_orders().count(),
            errors = result.error_log.total(),
            final_equity = result.final_equity(),
            "backtest complete"
        );

        Ok(result)
    }

    fn process_tick(
        &self,
        state: &mut RunState,
        observation: &MarketObservation,
        strategy: &mut dyn Strategy,
    ) -> Result<TickOutcome, TickError> {
        observation.validate()?;
        if let Some(last) = state.last_timestamp {
            if observation.timestamp < last {
                return Err(TickError::MalformedObservation {
                    reason: format!(
                        "timestamp {} is earlier than previous tick {}",
                        observation.timestamp, last
                    ),
                });
            }
        }
        state.last_timestamp = Some(observation.timestamp);
        state
            .ledger
            .mark_to_market(&observation.symbol, observation.price);

        let position = state.ledger.position(&observation.symbol);
        let signal = match strategy.on_observation(observation, position) {
            Ok(signal) => signal,
            Err(source) => {
                return Err(TickError::StrategyFailure {
                    strategy: strategy.name().to_string(),
                    source,
                });
            }
        };

        let quantity = size_order(
            &signal,
            &observation.symbol,
            observation.price,
            self.sizing,
            &state.ledger,
        );
        if quantity == 0 {
            if !signal.is_hold() {
                debug!(symbol = %observation.symbol, %signal, "signal sized to zero, no order");
            }
            return Ok(TickOutcome {
                signal,
                order: None,
            });
        }

        let order = Order::pending(
            state.next_order_id,
            observation.timestamp,
            observation.symbol.as_str(),
            quantity,
            observation.price,
        );
        state.next_order_id += 1;

        let fill = state
            .ledger
            .apply_fill(&observation.symbol, quantity, observation.price);
        let order = order.resolve(&fill);

        match &order.reject_reason {
            None => debug!(
                id = order.id,
                symbol = %order.symbol,
                quantity = order.quantity,
                price = observation.price,
                "order filled"
            ),
            Some(reason) => debug!(
                id = order.id,
                symbol = %order.symbol,
                quantity = order.quantity,
                "order rejected: {reason}"
            ),
        }

        Ok(TickOutcome {
            signal,
            order: Some(order),
        })
    }
}
