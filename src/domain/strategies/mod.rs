//! Signal formulas behind the [`Strategy`](crate::domain::strategy::Strategy) trait.
//!
//! - `MovingAverageCrossover`: short vs long simple moving average cross
//! - `Momentum`: percentage change over a fixed lookback
//! - `Combined`: several of the above on one symbol, first non-HOLD wins
//!
//! The first two keep a bounded [`PriceWindow`] per instance and only react to their
//! own symbol.

pub mod combined;
pub mod ma_crossover;
pub mod momentum;

pub use combined::Combined;
pub use ma_crossover::MovingAverageCrossover;
pub use momentum::Momentum;

use std::collections::VecDeque;

/// Fixed-capacity FIFO of recent prices.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    capacity: usize,
    prices: VecDeque<f64>,
}

impl PriceWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            prices: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, price: f64) {
        if self.prices.len() == self.capacity {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    pub fn is_full(&self) -> bool {
        self.prices.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn oldest(&self) -> Option<f64> {
        self.prices.front().copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.prices.back().copied()
    }

    /// Mean of the most recent `n` prices, `None` if fewer are held.
    pub fn mean_last(&self, n: usize) -> Option<f64> {
        if n == 0 || n > self.prices.len() {
            return None;
        }
        let sum: f64 = self.prices.iter().rev().take(n).sum();
        Some(sum / n as f64)
    }
}
