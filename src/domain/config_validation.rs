//! Configuration validation.
//!
//! Checks every config field a command relies on before anything runs.

use crate::domain::catalog::parse_span;
use crate::domain::error::StocksimError;
use crate::domain::strategy::StrategySpec;
use crate::ports::config_port::{ConfigPort, parse_bool};

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), StocksimError> {
    validate_strategy(config)?;
    validate_cash(config)?;
    validate_unit_interval(config, "threshold")?;
    validate_unit_interval(config, "volatility")?;
    validate_allow_short(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), StocksimError> {
    validate_span(config, "period")?;
    validate_span(config, "interval")?;
    Ok(())
}

pub fn validate_store_config(config: &dyn ConfigPort) -> Result<(), StocksimError> {
    validate_positive_int(config, "store", "pool_size")?;
    validate_positive_int(config, "store", "ttl_days")?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StocksimError {
    StocksimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_strategy(config: &dyn ConfigPort) -> Result<(), StocksimError> {
    match config.get_string("run", "strategy") {
        Some(s) if s == StrategySpec::FIXED_SCHEDULE || s == StrategySpec::THRESHOLD => Ok(()),
        Some(s) => Err(invalid(
            "run",
            "strategy",
            format!("unknown strategy '{s}' (expected 'A' or 'percent')"),
        )),
        None => Ok(()),
    }
}

fn validate_cash(config: &dyn ConfigPort) -> Result<(), StocksimError> {
    let Some(raw) = config.get_string("run", "cash") else {
        return Ok(());
    };
    match raw.trim().parse::<i64>() {
        Ok(v) if v >= 0 => Ok(()),
        Ok(_) => Err(invalid("run", "cash", "cash must be non-negative")),
        Err(_) => Err(invalid("run", "cash", "cash must be a whole number")),
    }
}

fn validate_unit_interval(config: &dyn ConfigPort, key: &str) -> Result<(), StocksimError> {
    let Some(raw) = config.get_string("run", key) else {
        return Ok(());
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if (0.0..=1.0).contains(&v) => Ok(()),
        _ => Err(invalid("run", key, format!("{key} must be between 0 and 1"))),
    }
}

fn validate_allow_short(config: &dyn ConfigPort) -> Result<(), StocksimError> {
    match config.get_string("run", "allow_short") {
        Some(raw) if parse_bool(&raw).is_none() => Err(invalid(
            "run",
            "allow_short",
            "allow_short must be a boolean",
        )),
        _ => Ok(()),
    }
}

fn validate_span(config: &dyn ConfigPort, key: &str) -> Result<(), StocksimError> {
    match config.get_string("data", key) {
        Some(raw) => parse_span(&raw)
            .map(|_| ())
            .map_err(|_| {
                invalid("data", key, format!("'{raw}' is not a span like 7d or 1m"))
            }),
        None => Ok(()),
    }
}

fn validate_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<(), StocksimError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(());
    };
    match raw.trim().parse::<i64>() {
        Ok(v) if v > 0 => Ok(()),
        _ => Err(invalid(section, key, format!("{key} must be a positive integer"))),
    }
}
