//! Configuration validation.
//!
//! Validates all config fields before a backtest runs so that a bad value
//! fails fast instead of surfacing as per-tick errors.

use crate::domain::error::TickreplayError;
use crate::domain::observation::{TimeBucket, parse_timestamp};
use crate::domain::strategy::parse_kinds;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDateTime;
use std::str::FromStr;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TickreplayError> {
    validate_initial_capital(config)?;
    validate_commission(config)?;
    validate_risk_free_rate(config)?;
    validate_sizing(config)?;
    validate_error_bucket(config)?;
    validate_window(config)?;
    validate_json_compact(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TickreplayError> {
    let kinds = config
        .get_string("strategy", "kind")
        .map(|k| parse_kinds(&k))
        .filter(|k| !k.is_empty())
        .ok_or_else(|| TickreplayError::ConfigMissing {
            section: "strategy".to_string(),
            key: "kind".to_string(),
        })?;

    for (i, kind) in kinds.iter().enumerate() {
        if kinds[..i].contains(kind) {
            return Err(invalid(
                "strategy",
                "kind",
                format!("strategy '{kind}' is listed more than once"),
            ));
        }
        match kind.as_str() {
            "ma_crossover" => validate_crossover_windows(config)?,
            "momentum" => validate_momentum(config)?,
            other => {
                return Err(invalid(
                    "strategy",
                    "kind",
                    format!("unknown strategy '{other}', expected ma_crossover or momentum"),
                ));
            }
        }
    }
    validate_trade_qty(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: String) -> TickreplayError {
    TickreplayError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason,
    }
}

/// Parses the raw value of `[section] key`; `None` when the key is absent.
///
/// The adapter getters fall back to their default on garbage, so every
/// numeric check goes through here instead.
fn parse_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    expected: &str,
) -> Result<Option<T>, TickreplayError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            invalid(section, key, format!("{key} must be {expected}, got '{raw}'"))
        }),
    }
}

fn double_or(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TickreplayError> {
    Ok(parse_value(config, section, key, "a number")?.unwrap_or(default))
}

fn int_or(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, TickreplayError> {
    Ok(parse_value(config, section, key, "a whole number")?.unwrap_or(default))
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), TickreplayError> {
    let value = double_or(config, "backtest", "initial_capital", 10_000.0)?;
    if value <= 0.0 || !value.is_finite() {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive".to_string(),
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), TickreplayError> {
    for key in ["commission_per_trade", "commission_pct"] {
        let value = double_or(config, "backtest", key, 0.0)?;
        if value < 0.0 || !value.is_finite() {
            return Err(invalid("backtest", key, format!("{key} must be non-negative")));
        }
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), TickreplayError> {
    let value = double_or(config, "backtest", "risk_free_rate", 0.02)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), TickreplayError> {
    let sizing = config
        .get_string("backtest", "sizing")
        .unwrap_or_else(|| "fixed".to_string());
    match sizing.trim().to_lowercase().as_str() {
        "fixed" => {
            if int_or(config, "backtest", "lot_size", 1)? < 1 {
                return Err(invalid(
                    "backtest",
                    "lot_size",
                    "lot_size must be at least 1".to_string(),
                ));
            }
            Ok(())
        }
        "all_in" => Ok(()),
        other => Err(invalid(
            "backtest",
            "sizing",
            format!("unknown sizing '{other}', expected fixed or all_in"),
        )),
    }
}

fn validate_error_bucket(config: &dyn ConfigPort) -> Result<(), TickreplayError> {
    match config.get_string("backtest", "error_bucket") {
        None => Ok(()),
        Some(s) if TimeBucket::parse(&s).is_some() => Ok(()),
        Some(s) => Err(invalid(
            "backtest",
            "error_bucket",
            format!("unknown bucket '{s}', expected minute, hour or day"),
        )),
    }
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), TickreplayError> {
    let start = parse_optional_timestamp(config, "start")?;
    let end = parse_optional_timestamp(config, "end")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(invalid(
                "backtest",
                "start",
                "start must be before end".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_json_compact(config: &dyn ConfigPort) -> Result<(), TickreplayError> {
    match config.get_string("report", "json_compact") {
        None => Ok(()),
        Some(s) if matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "false" | "yes" | "no" | "1" | "0"
        ) => Ok(()),
        Some(s) => Err(invalid(
            "report",
            "json_compact",
            format!("json_compact must be true or false, got '{s}'"),
        )),
    }
}

pub(crate) fn parse_optional_timestamp(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<NaiveDateTime>, TickreplayError> {
    match config.get_string("backtest", key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s).map(Some).ok_or_else(|| {
            invalid(
                "backtest",
                key,
                format!("invalid {key} format, expected YYYY-MM-DDTHH:MM:SS"),
            )
        }),
    }
}

fn validate_crossover_windows(config: &dyn ConfigPort) -> Result<(), TickreplayError> {
    let short = int_or(config, "strategy", "short_window", 5)?;
    let long = int_or(config, "strategy", "long_window", 20)?;
    if short < 1 {
        return Err(invalid(
            "strategy",
            "short_window",
            "short_window must be at least 1".to_string(),
        ));
    }
    if long <= short {
        return Err(invalid(
            "strategy",
            "long_window",
            "long_window must be greater than short_window".to_string(),
        ));
    }
    Ok(())
}

fn validate_momentum(config: &dyn ConfigPort) -> Result<(), TickreplayError> {
    if int_or(config, "strategy", "lookback", 10)? < 1 {
        return Err(invalid(
            "strategy",
            "lookback",
            "lookback must be at least 1".to_string(),
        ));
    }
    let threshold = double_or(config, "strategy", "threshold", 0.01)?;
    if threshold < 0.0 || !threshold.is_finite() {
        return Err(invalid(
            "strategy",
            "threshold",
            "threshold must be non-negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_trade_qty(config: &dyn ConfigPort) -> Result<(), TickreplayError> {
    if let Some(qty) = parse_value::<i64>(config, "strategy", "trade_qty", "a whole number")? {
        if qty < 1 {
            return Err(invalid(
                "strategy",
                "trade_qty",
                "trade_qty must be at least 1".to_string(),
            ));
        }
    }
    Ok(())
}
