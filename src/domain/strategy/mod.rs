//! Strategy selection and the per-tick driving interface.
//!
//! A strategy is chosen once, before the run, from a closed set
//! ([`StrategySpec`]). The runner then calls [`Strategy::on_start`], one
//! [`Strategy::on_tick`] per clock tick, and [`Strategy::on_finish`].

pub mod fixed_schedule;
pub mod threshold;

use std::fmt;

use super::clock::Tick;
use super::error::{StocksimError, TradeError};
use super::ledger::Ledger;
use super::price_series::{quotes, PriceField, PriceSeries, Quotes};

pub use fixed_schedule::FixedSchedule;
pub use threshold::Threshold;

/// What a strategy sees and may mutate during one callback.
pub struct TickContext<'a> {
    pub tick: Tick,
    pub total_ticks: Tick,
    pub series: &'a [PriceSeries],
    pub ledger: &'a mut Ledger,
}

impl TickContext<'_> {
    /// Prices of every series at the current tick.
    pub fn quotes(&self, field: PriceField) -> Result<Quotes, StocksimError> {
        quotes(self.series, self.tick, field)
    }
}

/// A trade failure that stopped the run.
#[derive(Debug, Clone, PartialEq)]
pub struct Halt {
    pub tick: Tick,
    pub instrument: String,
    pub error: TradeError,
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick {} {}: {}", self.tick, self.instrument, self.error)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue,
    Halt(Halt),
}

pub trait Strategy {
    fn name(&self) -> &'static str;

    fn on_start(&mut self, _ctx: &mut TickContext<'_>) -> Result<(), StocksimError> {
        Ok(())
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> Result<Flow, StocksimError>;

    fn on_finish(&mut self, _ctx: &mut TickContext<'_>) -> Result<(), StocksimError> {
        Ok(())
    }
}

/// The closed set of strategies a run can be started with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrategySpec {
    /// Selector `"A"`.
    FixedSchedule,
    /// Selector `"percent"`.
    Threshold { threshold: f64, volatility: f64 },
}

impl StrategySpec {
    pub const FIXED_SCHEDULE: &'static str = "A";
    pub const THRESHOLD: &'static str = "percent";

    /// Resolve a selector. Numeric parameters only apply to `"percent"`.
    pub fn parse(selector: &str, threshold: f64, volatility: f64) -> Result<Self, StocksimError> {
        let spec = match selector.trim() {
            Self::FIXED_SCHEDULE => StrategySpec::FixedSchedule,
            Self::THRESHOLD => StrategySpec::Threshold {
                threshold,
                volatility,
            },
            other => {
                return Err(StocksimError::invalid_parameter(
                    "strategy",
                    format!("unknown strategy '{other}' (expected 'A' or 'percent')"),
                ));
            }
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), StocksimError> {
        if let StrategySpec::Threshold {
            threshold,
            volatility,
        } = *self
        {
            check_unit_interval("threshold", threshold)?;
            check_unit_interval("volatility", volatility)?;
        }
        Ok(())
    }

    pub fn selector(&self) -> &'static str {
        match self {
            StrategySpec::FixedSchedule => Self::FIXED_SCHEDULE,
            StrategySpec::Threshold { .. } => Self::THRESHOLD,
        }
    }

    /// Whether the ledger for this strategy permits short positions by default.
    pub fn default_allow_short(&self) -> bool {
        matches!(self, StrategySpec::Threshold { .. })
    }

    pub fn build(&self, initial_cash: f64) -> Box<dyn Strategy> {
        match *self {
            StrategySpec::FixedSchedule => Box::new(FixedSchedule::new(initial_cash)),
            StrategySpec::Threshold {
                threshold,
                volatility,
            } => Box::new(Threshold::new(threshold, volatility)),
        }
    }
}

pub(crate) fn check_unit_interval(name: &str, value: f64) -> Result<(), StocksimError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(StocksimError::invalid_parameter(
            name,
            format!("{value} is outside [0, 1]"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fixed_schedule() {
        let spec = StrategySpec::parse("A", 5.0, -1.0).unwrap();
        assert_eq!(spec, StrategySpec::FixedSchedule);
        assert_eq!(spec.selector(), "A");
        assert!(!spec.default_allow_short());
    }

    #[test]
    fn parse_threshold() {
        let spec = StrategySpec::parse("percent", 0.1, 0.5).unwrap();
        assert_eq!(
            spec,
            StrategySpec::Threshold {
                threshold: 0.1,
                volatility: 0.5
            }
        );
        assert_eq!(spec.selector(), "percent");
        assert!(spec.default_allow_short());
    }

    #[test]
    fn parse_unknown_selector() {
        let err = StrategySpec::parse("B", 0.5, 0.5).unwrap_err();
        assert!(matches!(err, StocksimError::InvalidParameter { name, .. } if name == "strategy"));
    }

    #[test]
    fn threshold_bounds_are_inclusive() {
        assert!(StrategySpec::parse("percent", 0.0, 1.0).is_ok());
        assert!(StrategySpec::parse("percent", 1.0, 0.0).is_ok());
    }

    #[test]
    fn threshold_out_of_range() {
        let err = StrategySpec::parse("percent", 1.5, 0.5).unwrap_err();
        assert!(matches!(err, StocksimError::InvalidParameter { name, .. } if name == "threshold"));

        let err = StrategySpec::parse("percent", 0.5, -0.1).unwrap_err();
        assert!(matches!(
            err,
            StocksimError::InvalidParameter { name, .. } if name == "volatility"
        ));
    }

    #[test]
    fn nan_parameters_rejected() {
        assert!(StrategySpec::parse("percent", f64::NAN, 0.5).is_err());
    }

    #[test]
    fn build_names() {
        assert_eq!(StrategySpec::FixedSchedule.build(100.0).name(), "fixed-schedule");
        let spec = StrategySpec::Threshold {
            threshold: 0.1,
            volatility: 0.5,
        };
        assert_eq!(spec.build(100.0).name(), "threshold");
    }
}
