//! CSV file price history adapter.
//!
//! Reads `<base>/<instrument>_<interval>.csv` with the header
//! `timestamp,open,high,low,close[,volume]`.

use crate::domain::catalog::parse_span;
use crate::domain::error::StocksimError;
use crate::domain::price_series::Observation;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str, interval: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", instrument, interval))
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_price(record: &csv::StringRecord, index: usize, column: &str) -> Result<f64, String> {
    let raw = record
        .get(index)
        .ok_or_else(|| format!("missing {column} column"))?
        .trim();
    let value: f64 = raw
        .parse()
        .map_err(|e| format!("invalid {column} value: {e}"))?;
    if !value.is_finite() {
        return Err(format!("invalid {column} value: {raw}"));
    }
    Ok(value)
}

fn parse_record(record: &csv::StringRecord) -> Result<Observation, String> {
    let ts = record.get(0).ok_or("missing timestamp column")?;
    let timestamp =
        parse_timestamp(ts.trim()).ok_or_else(|| format!("invalid timestamp: {ts}"))?;

    Ok(Observation {
        timestamp,
        open: parse_price(record, 1, "open")?,
        high: parse_price(record, 2, "high")?,
        low: parse_price(record, 3, "low")?,
        close: parse_price(record, 4, "close")?,
    })
}

impl DataPort for CsvAdapter {
    fn load(
        &self,
        instrument: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<Observation>, StocksimError> {
        let span = parse_span(period)?;
        parse_span(interval)?;

        let path = self.csv_path(instrument, interval);
        let content = fs::read_to_string(&path).map_err(|e| {
            let reason = format!("failed to read {}: {}", path.display(), e);
            StocksimError::data_unavailable(instrument, reason)
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut observations = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| {
                StocksimError::data_unavailable(instrument, format!("CSV parse error: {e}"))
            })?;
            let observation = parse_record(&record)
                .map_err(|reason| StocksimError::data_unavailable(instrument, reason))?;
            observations.push(observation);
        }

        observations.sort_by_key(|o| o.timestamp);

        if let Some(last) = observations.last().map(|o| o.timestamp) {
            let start = last - span;
            observations.retain(|o| o.timestamp >= start);
        }

        tracing::debug!(
            instrument,
            period,
            interval,
            rows = observations.len(),
            path = %path.display(),
            "loaded price history"
        );
        Ok(observations)
    }
}
