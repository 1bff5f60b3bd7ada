//! Moving-average crossover.
//!
//! diff = SMA(short) - SMA(long) over the last `long` prices.
//! BUY when diff crosses from <= 0 to > 0, SELL when it crosses from >= 0 to < 0
//! and something is held. The first full window only seeds the previous diff.

use crate::domain::error::StrategyError;
use crate::domain::observation::MarketObservation;
use crate::domain::position::Position;
use crate::domain::signal::Signal;
use crate::domain::strategy::Strategy;

use super::PriceWindow;

#[derive(Debug, Clone)]
pub struct MovingAverageCrossover {
    symbol: String,
    short_window: usize,
    long_window: usize,
    trade_qty: Option<i64>,
    window: PriceWindow,
    prev_diff: Option<f64>,
}

impl MovingAverageCrossover {
    pub fn new(
        symbol: &str,
        short_window: usize,
        long_window: usize,
        trade_qty: Option<i64>,
    ) -> Result<Self, StrategyError> {
        if short_window < 1 || short_window >= long_window {
            return Err(StrategyError::new(format!(
                "require 1 <= short_window < long_window, got {short_window} and {long_window}"
            )));
        }
        if let Some(qty) = trade_qty {
            if qty < 1 {
                return Err(StrategyError::new(format!(
                    "trade_qty must be at least 1, got {qty}"
                )));
            }
        }
        Ok(Self {
            symbol: symbol.to_string(),
            short_window,
            long_window,
            trade_qty,
            window: PriceWindow::new(long_window),
            prev_diff: None,
        })
    }
}

impl Strategy for MovingAverageCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn on_observation(
        &mut self,
        observation: &MarketObservation,
        position: Option<&Position>,
    ) -> Result<Signal, StrategyError> {
        if observation.symbol != self.symbol {
            return Ok(Signal::Hold);
        }

        self.window.push(observation.price);
        if !self.window.is_full() {
            return Ok(Signal::Hold);
        }

        let (Some(short_ma), Some(long_ma)) = (
            self.window.mean_last(self.short_window),
            self.window.mean_last(self.long_window),
        ) else {
            return Err(StrategyError::new("price window shorter than its capacity"));
        };
        let diff = short_ma - long_ma;

        let signal = match self.prev_diff {
            Some(prev) if prev <= 0.0 && diff > 0.0 => Signal::Buy {
                quantity: self.trade_qty,
            },
            Some(prev) if prev >= 0.0 && diff < 0.0 => {
                let held = position.map_or(0, |p| p.quantity);
                if held > 0 {
                    Signal::Sell {
                        quantity: self.trade_qty.map(|q| q.min(held)),
                    }
                } else {
                    Signal::Hold
                }
            }
            _ => Signal::Hold,
        };

        self.prev_diff = Some(diff);
        Ok(signal)
    }
}
