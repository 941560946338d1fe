//! Symbol registration and lookup on top of the data and snapshot ports.

use chrono::Duration;

use super::error::StocksimError;
use super::price_series::PriceSeries;
use crate::ports::data_port::DataPort;
use crate::ports::snapshot_port::SnapshotPort;

/// History window requested from the provider when registering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
    pub period: String,
    pub interval: String,
}

impl Default for FetchWindow {
    fn default() -> Self {
        FetchWindow {
            period: "7d".to_string(),
            interval: "1m".to_string(),
        }
    }
}

/// Parse a span such as `"30m"`, `"4h"`, `"7d"` or `"2wk"`.
pub fn parse_span(span: &str) -> Result<Duration, StocksimError> {
    let span = span.trim();
    let split = span
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(span.len());
    let (digits, unit) = span.split_at(split);
    let invalid =
        |reason: &str| StocksimError::invalid_parameter("span", format!("'{span}': {reason}"));

    let count: i64 = digits.parse().map_err(|_| invalid("expected a leading count"))?;
    if count <= 0 {
        return Err(invalid("count must be positive"));
    }
    match unit {
        "m" => Ok(Duration::minutes(count)),
        "h" => Ok(Duration::hours(count)),
        "d" => Ok(Duration::days(count)),
        "wk" => Ok(Duration::weeks(count)),
        _ => Err(invalid("unit must be one of m, h, d, wk")),
    }
}

/// Return the stored series for `instrument`, loading and storing it first
/// if the store has no live snapshot.
pub fn register(
    data: &dyn DataPort,
    store: &dyn SnapshotPort,
    instrument: &str,
    window: &FetchWindow,
) -> Result<PriceSeries, StocksimError> {
    if instrument.is_empty() {
        return Err(StocksimError::EmptyKey);
    }

    if let Some(existing) = store.load(instrument)? {
        tracing::debug!(instrument, "already registered");
        return Ok(existing);
    }

    let observations = data.load(instrument, &window.period, &window.interval)?;
    if observations.is_empty() {
        return Err(StocksimError::data_unavailable(
            instrument,
            format!("no observations for {} at {}", window.period, window.interval),
        ));
    }

    let series = PriceSeries::from_observations(instrument, observations);
    store.save(&series)?;
    tracing::info!(instrument, observations = series.len(), "registered");
    Ok(series)
}

/// Load every named series from the store, failing on the first one missing.
pub fn resolve(
    store: &dyn SnapshotPort,
    instruments: &[String],
) -> Result<Vec<PriceSeries>, StocksimError> {
    instruments
        .iter()
        .map(|name| {
            store
                .load(name)?
                .ok_or_else(|| StocksimError::data_unavailable(name, "not registered"))
        })
        .collect()
}
