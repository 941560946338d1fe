//! Per-instrument price history indexed by tick.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::clock::Tick;
use super::error::StocksimError;

/// One sampled bar of a price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Observation {
    pub fn get(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::Close => self.close,
            PriceField::High => self.high,
            PriceField::Low => self.low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    Close,
    High,
    Low,
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceField::Open => "open",
            PriceField::Close => "close",
            PriceField::High => "high",
            PriceField::Low => "low",
        };
        f.write_str(name)
    }
}

/// Prices of several instruments sampled at one tick, ordered by name.
pub type Quotes = BTreeMap<String, f64>;

/// Immutable price history of one instrument.
///
/// Lookups past the end clamp to the last observation, so a run that ticks
/// beyond the data keeps seeing the final bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    instrument: String,
    observations: Vec<Observation>,
}

impl PriceSeries {
    pub fn new(instrument: impl Into<String>, observations: Vec<Observation>) -> Self {
        Self {
            instrument: instrument.into(),
            observations,
        }
    }

    /// Build from raw provider rows, ordering them by timestamp.
    pub fn from_observations(
        instrument: impl Into<String>,
        mut observations: Vec<Observation>,
    ) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        Self::new(instrument, observations)
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observation_at(&self, tick: Tick, field: PriceField) -> Result<f64, StocksimError> {
        let last = self
            .observations
            .len()
            .checked_sub(1)
            .ok_or_else(|| StocksimError::EmptySeries {
                instrument: self.instrument.clone(),
            })?;
        let index = usize::try_from(tick).map_or(last, |t| t.min(last));
        Ok(self.observations[index].get(field))
    }

    pub fn values(&self, field: PriceField) -> Vec<f64> {
        self.observations.iter().map(|o| o.get(field)).collect()
    }
}

/// Sample `field` of every series at `tick`.
///
/// Series with the same instrument name collapse into one entry; callers
/// validate uniqueness beforehand when that matters.
pub fn quotes(
    series: &[PriceSeries],
    tick: Tick,
    field: PriceField,
) -> Result<Quotes, StocksimError> {
    series
        .iter()
        .map(|s| Ok((s.instrument().to_string(), s.observation_at(tick, field)?)))
        .collect()
}
