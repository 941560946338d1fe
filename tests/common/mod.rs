#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::Cell;
use std::collections::HashMap;
use stocksim::domain::error::StocksimError;
use stocksim::domain::price_series::{Observation, PriceSeries};
use stocksim::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Observation>>,
    pub errors: HashMap<String, String>,
    pub calls: Cell<usize>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: Cell::new(0),
        }
    }

    pub fn with_closes(mut self, instrument: &str, closes: &[f64]) -> Self {
        self.data
            .insert(instrument.to_string(), make_observations(closes));
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors
            .insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn load(
        &self,
        instrument: &str,
        _period: &str,
        _interval: &str,
    ) -> Result<Vec<Observation>, StocksimError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(reason) = self.errors.get(instrument) {
            return Err(StocksimError::data_unavailable(instrument, reason.clone()));
        }
        Ok(self.data.get(instrument).cloned().unwrap_or_default())
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

/// One-minute observations whose open equals the close.
pub fn make_observations(closes: &[f64]) -> Vec<Observation> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Observation {
            timestamp: start() + Duration::minutes(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
        })
        .collect()
}

pub fn make_series(instrument: &str, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(instrument, make_observations(closes))
}

pub fn flat_series(instrument: &str, price: f64, len: usize) -> PriceSeries {
    make_series(instrument, &vec![price; len])
}
