//! Simulation runner.
//!
//! [`RunConfig`] defines one run's parameters. A [`Simulation`] owns the
//! run's private clock and ledger and borrows the price series, so several
//! simulations can share the same series concurrently.

use std::collections::HashSet;

use super::clock::{Clock, Tick};
use super::error::StocksimError;
use super::ledger::Ledger;
use super::price_series::{quotes, PriceField, PriceSeries};
use super::report::{RunReport, RunStatus};
use super::strategy::{Flow, Halt, Strategy, StrategySpec, TickContext};

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub strategy: StrategySpec,
    pub cash: f64,
    /// Overrides the strategy's default short-selling permission.
    pub allow_short: Option<bool>,
}

impl RunConfig {
    pub fn new(strategy: StrategySpec, cash: f64) -> Self {
        RunConfig {
            strategy,
            cash,
            allow_short: None,
        }
    }

    pub fn allow_short(&self) -> bool {
        self.allow_short
            .unwrap_or_else(|| self.strategy.default_allow_short())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Halted,
}

/// Reject a run before it starts.
///
/// Parameters must be in range, every series non-empty, all series the same
/// length and named uniquely.
pub fn validate_run(config: &RunConfig, series: &[PriceSeries]) -> Result<(), StocksimError> {
    config.strategy.validate()?;

    if !config.cash.is_finite() || config.cash < 0.0 {
        return Err(StocksimError::invalid_parameter(
            "cash",
            format!("{} must be a non-negative amount", config.cash),
        ));
    }

    let first = series.first().ok_or_else(|| {
        StocksimError::invalid_parameter("instruments", "at least one price series is required")
    })?;

    if config.strategy == StrategySpec::FixedSchedule && series.len() != 1 {
        return Err(StocksimError::invalid_parameter(
            "instruments",
            format!(
                "strategy 'A' trades exactly one instrument, got {}",
                series.len()
            ),
        ));
    }

    let mut seen = HashSet::new();
    for s in series {
        if s.is_empty() {
            return Err(StocksimError::EmptySeries {
                instrument: s.instrument().to_string(),
            });
        }
        if s.len() != first.len() {
            return Err(StocksimError::data_unavailable(
                s.instrument(),
                format!(
                    "{} observations, expected {} to align with {}",
                    s.len(),
                    first.len(),
                    first.instrument()
                ),
            ));
        }
        if !seen.insert(s.instrument()) {
            return Err(StocksimError::invalid_parameter(
                "instruments",
                format!("duplicate instrument: {}", s.instrument()),
            ));
        }
    }

    Ok(())
}

pub struct Simulation<'a> {
    series: &'a [PriceSeries],
    strategy: Box<dyn Strategy>,
    selector: &'static str,
    clock: Clock,
    ledger: Ledger,
    total_ticks: Tick,
    state: RunState,
    halt: Option<Halt>,
}

impl<'a> Simulation<'a> {
    pub fn new(config: &RunConfig, series: &'a [PriceSeries]) -> Result<Self, StocksimError> {
        validate_run(config, series)?;

        let id = uuid::Uuid::new_v4().to_string();
        let mut clock = Clock::new();
        clock.reset();

        Ok(Simulation {
            series,
            strategy: config.strategy.build(config.cash),
            selector: config.strategy.selector(),
            clock,
            ledger: Ledger::new(id, config.cash, config.allow_short()),
            total_ticks: series[0].len() as Tick,
            state: RunState::NotStarted,
            halt: None,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn tick(&self) -> Tick {
        self.clock.value()
    }

    pub fn total_ticks(&self) -> Tick {
        self.total_ticks
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, RunState::Completed | RunState::Halted)
    }

    fn with_context<R>(
        &mut self,
        f: impl FnOnce(&mut dyn Strategy, &mut TickContext<'_>) -> R,
    ) -> R {
        let mut ctx = TickContext {
            tick: self.clock.value(),
            total_ticks: self.total_ticks,
            series: self.series,
            ledger: &mut self.ledger,
        };
        f(self.strategy.as_mut(), &mut ctx)
    }

    /// Advance by one tick. Returns `false` once the run has finished.
    ///
    /// The strategy's terminal step runs as part of the last tick.
    pub fn step(&mut self) -> Result<bool, StocksimError> {
        match self.state {
            RunState::Completed | RunState::Halted => return Ok(false),
            RunState::NotStarted => {
                tracing::info!(
                    ledger = %self.ledger.id(),
                    strategy = self.strategy.name(),
                    instruments = self.series.len(),
                    ticks = self.total_ticks,
                    "simulation started"
                );
                self.with_context(|strategy, ctx| strategy.on_start(ctx))?;
                self.state = RunState::Running;
            }
            RunState::Running => {}
        }

        match self.with_context(|strategy, ctx| strategy.on_tick(ctx))? {
            Flow::Continue => self.clock.tick(),
            Flow::Halt(halt) => {
                self.halt = Some(halt);
                self.state = RunState::Halted;
                return Ok(false);
            }
        }

        if self.clock.value() >= self.total_ticks {
            self.with_context(|strategy, ctx| strategy.on_finish(ctx))?;
            self.state = RunState::Completed;
            tracing::info!(
                ledger = %self.ledger.id(),
                trades = self.ledger.all_transactions().len(),
                cash = self.ledger.cash(),
                "simulation completed"
            );
            return Ok(false);
        }

        Ok(true)
    }

    /// Drive the remaining ticks to completion.
    pub fn run_to_end(&mut self) -> Result<(), StocksimError> {
        while self.step()? {}
        Ok(())
    }

    /// Stop here and report. Unfinished runs skip the terminal step.
    pub fn finish(self) -> Result<RunReport, StocksimError> {
        let status = match self.state {
            RunState::Completed => RunStatus::Completed,
            RunState::Halted => RunStatus::Halted,
            RunState::NotStarted | RunState::Running => RunStatus::Stopped,
        };
        let closes = quotes(self.series, self.clock.value(), PriceField::Close)?;
        let holdings = self.ledger.holdings(&closes);

        Ok(RunReport {
            id: self.ledger.id().to_string(),
            strategy: self.selector.to_string(),
            status,
            ticks: self.clock.value(),
            final_cash: self.ledger.cash(),
            transactions: self.ledger.all_transactions().to_vec(),
            holdings,
            halted: self.halt.map(|h| h.to_string()),
        })
    }
}

/// Validate, run every tick, and report.
pub fn run(config: &RunConfig, series: &[PriceSeries]) -> Result<RunReport, StocksimError> {
    let mut simulation = Simulation::new(config, series)?;
    simulation.run_to_end()?;
    simulation.finish()
}
