//! Fixed-schedule strategy (`"A"`).
//!
//! Buys a fifth of the starting cash at five fixed points of the timeline and
//! sells the most recent lot at five others, trading at the open.

use std::collections::BTreeSet;

use super::{Flow, Halt, Strategy, TickContext};
use crate::domain::clock::Tick;
use crate::domain::error::{StocksimError, TradeError};
use crate::domain::price_series::PriceField;

pub const BUY_FRACTIONS: [f64; 5] = [0.05, 0.35, 0.65, 0.75, 0.95];
pub const SELL_FRACTIONS: [f64; 5] = [0.25, 0.41, 0.70, 0.90, 0.99];

/// Ticks at `floor(fraction * total)`; coinciding checkpoints collapse.
pub fn checkpoints(fractions: &[f64], total: Tick) -> BTreeSet<Tick> {
    fractions
        .iter()
        .map(|f| (f * total as f64).floor() as Tick)
        .collect()
}

#[derive(Debug, Clone)]
pub struct FixedSchedule {
    lot_cash: f64,
    buys: BTreeSet<Tick>,
    sells: BTreeSet<Tick>,
    // Quantity of the latest buy only; sells never reach older lots.
    rolling_quantity: u64,
}

impl FixedSchedule {
    pub fn new(initial_cash: f64) -> Self {
        FixedSchedule {
            lot_cash: initial_cash / 5.0,
            buys: BTreeSet::new(),
            sells: BTreeSet::new(),
            rolling_quantity: 0,
        }
    }

    pub fn buy_ticks(&self) -> &BTreeSet<Tick> {
        &self.buys
    }

    pub fn sell_ticks(&self) -> &BTreeSet<Tick> {
        &self.sells
    }
}

impl Strategy for FixedSchedule {
    fn name(&self) -> &'static str {
        "fixed-schedule"
    }

    fn on_start(&mut self, ctx: &mut TickContext<'_>) -> Result<(), StocksimError> {
        self.buys = checkpoints(&BUY_FRACTIONS, ctx.total_ticks);
        self.sells = checkpoints(&SELL_FRACTIONS, ctx.total_ticks);
        tracing::debug!(buys = ?self.buys, sells = ?self.sells, "fixed schedule checkpoints");
        Ok(())
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> Result<Flow, StocksimError> {
        let tick = ctx.tick;
        let is_buy = self.buys.contains(&tick);
        let is_sell = self.sells.contains(&tick);
        if !is_buy && !is_sell {
            return Ok(Flow::Continue);
        }

        let series = &ctx.series[0];
        let instrument = series.instrument();
        let price = series.observation_at(tick, PriceField::Open)?;

        if is_buy {
            match ctx.ledger.buy_amount(tick, instrument, self.lot_cash, price) {
                Ok(quantity) => self.rolling_quantity = quantity,
                Err(error) => return Ok(halt(tick, instrument, error)),
            }
        }

        if is_sell {
            if let Err(error) = ctx.ledger.sell(tick, instrument, self.rolling_quantity, price) {
                return Ok(halt(tick, instrument, error));
            }
        }

        Ok(Flow::Continue)
    }
}

fn halt(tick: Tick, instrument: &str, error: TradeError) -> Flow {
    tracing::warn!(tick, instrument, error = %error, "fixed schedule halted");
    Flow::Halt(Halt {
        tick,
        instrument: instrument.to_string(),
        error,
    })
}
