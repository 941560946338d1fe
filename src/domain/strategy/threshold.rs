//! Threshold strategy (`"percent"`).
//!
//! Each instrument carries a locked reference price. A close that has moved
//! more than `threshold` away from the lock triggers a buy (on a drop) or a
//! sell (on a rise) sized at `cash * threshold`, after which the lock is
//! blended toward the market price by `volatility`. Every position is
//! squared off once the timeline ends.

use std::collections::BTreeMap;

use super::{Flow, Strategy, TickContext};
use crate::domain::clock::Tick;
use crate::domain::error::{StocksimError, TradeError};
use crate::domain::ledger::Ledger;
use crate::domain::price_series::{PriceField, Quotes};

#[derive(Debug, Clone)]
pub struct Threshold {
    threshold: f64,
    volatility: f64,
    locks: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Threshold {
    pub fn new(threshold: f64, volatility: f64) -> Self {
        Threshold {
            threshold,
            volatility,
            locks: BTreeMap::new(),
        }
    }

    pub fn locked_price(&self, instrument: &str) -> Option<f64> {
        self.locks.get(instrument).copied()
    }

    fn signal(&self, locked: f64, current: f64) -> Signal {
        if locked <= 0.0 {
            return Signal::Hold;
        }
        let diff = (locked - current) / locked;
        if diff > self.threshold {
            Signal::Buy
        } else if -diff > self.threshold {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }

    fn reprice(&self, locked: f64, current: f64) -> f64 {
        (1.0 - self.volatility) * locked + self.volatility * current
    }

    fn act(
        &self,
        ledger: &mut Ledger,
        tick: Tick,
        instrument: &str,
        signal: Signal,
        budget: f64,
        price: f64,
    ) -> Result<(), TradeError> {
        match signal {
            Signal::Buy => ledger.buy_amount(tick, instrument, budget, price).map(|_| ()),
            Signal::Sell => ledger.sell_amount(tick, instrument, budget, price).map(|_| ()),
            Signal::Hold => Ok(()),
        }
    }
}

impl Strategy for Threshold {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn on_start(&mut self, ctx: &mut TickContext<'_>) -> Result<(), StocksimError> {
        self.locks = ctx.quotes(PriceField::Close)?;
        Ok(())
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> Result<Flow, StocksimError> {
        let tick = ctx.tick;
        // Prices and sizing are fixed for the whole tick, so no instrument
        // sees another instrument's trade from the same tick.
        let closes = ctx.quotes(PriceField::Close)?;
        let budget = ctx.ledger.cash() * self.threshold;

        for (instrument, &price) in &closes {
            let Some(&locked) = self.locks.get(instrument) else {
                continue;
            };
            let signal = self.signal(locked, price);
            if signal == Signal::Hold {
                continue;
            }

            match self.act(ctx.ledger, tick, instrument, signal, budget, price) {
                Ok(()) => {
                    let repriced = self.reprice(locked, price);
                    tracing::debug!(
                        tick,
                        instrument = %instrument,
                        locked,
                        repriced,
                        "lock repriced"
                    );
                    self.locks.insert(instrument.clone(), repriced);
                }
                Err(TradeError::InsufficientShares { .. }) => {
                    tracing::debug!(
                        tick,
                        instrument = %instrument,
                        "short sell refused, squaring off"
                    );
                    let single: Quotes = [(instrument.clone(), price)].into_iter().collect();
                    ctx.ledger.square_off(tick, &single);
                }
                Err(error) => {
                    tracing::trace!(
                        tick,
                        instrument = %instrument,
                        error = %error,
                        "opportunity skipped"
                    );
                }
            }
        }

        Ok(Flow::Continue)
    }

    fn on_finish(&mut self, ctx: &mut TickContext<'_>) -> Result<(), StocksimError> {
        let closes = ctx.quotes(PriceField::Close)?;
        tracing::info!(
            tick = ctx.tick,
            instruments = closes.len(),
            "squaring off remaining positions"
        );
        ctx.ledger.square_off(ctx.tick, &closes);
        Ok(())
    }
}
