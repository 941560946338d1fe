//! Serializable views handed to the presentation boundary.

use serde::Serialize;

use super::clock::Tick;
use super::holding::Holding;
use super::price_series::{PriceField, PriceSeries};
use super::transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesInfo {
    pub openings: Vec<f64>,
    pub closings: Vec<f64>,
}

impl From<&PriceSeries> for SeriesInfo {
    fn from(series: &PriceSeries) -> Self {
        SeriesInfo {
            openings: series.values(PriceField::Open),
            closings: series.values(PriceField::Close),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every tick ran and the strategy's terminal step executed.
    Completed,
    /// A trade failure ended the run early.
    Halted,
    /// The caller stopped stepping before the timeline ended.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub id: String,
    pub strategy: String,
    pub status: RunStatus,
    pub ticks: Tick,
    pub transactions: Vec<Transaction>,
    pub final_cash: f64,
    pub holdings: Vec<Holding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<String>,
}

impl RunReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price_series::Observation;
    use crate::domain::transaction::Side;
    use chrono::NaiveDate;

    #[test]
    fn series_info_columns() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let series = PriceSeries::new(
            "msft",
            vec![
                Observation {
                    timestamp: ts,
                    open: 1.0,
                    high: 3.0,
                    low: 0.5,
                    close: 2.0,
                },
                Observation {
                    timestamp: ts + chrono::Duration::minutes(1),
                    open: 2.0,
                    high: 4.0,
                    low: 1.5,
                    close: 3.0,
                },
            ],
        );
        let info = SeriesInfo::from(&series);
        assert_eq!(info.openings, vec![1.0, 2.0]);
        assert_eq!(info.closings, vec![2.0, 3.0]);
    }

    #[test]
    fn report_json_fields() {
        let report = RunReport {
            id: "abc".into(),
            strategy: "percent".into(),
            status: RunStatus::Completed,
            ticks: 5,
            transactions: vec![Transaction::new(2, Side::Buy, "msft", 1, 80.0)],
            final_cash: 1040.0,
            holdings: vec![Holding::new("msft", 0, 120.0)],
            halted: None,
        };
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["final_cash"], 1040.0);
        assert_eq!(json["transactions"][0]["side"], "buy");
        assert_eq!(json["holdings"][0]["quantity"], 0);
        assert!(json.get("halted").is_none());
    }
}
