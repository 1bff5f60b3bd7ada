//! Core domain types and logic.

pub mod observation;
pub mod signal;
pub mod position;
pub mod order;
pub mod portfolio;
pub mod execution;
pub mod strategy;
pub mod strategies;
pub mod error_log;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
