//! Cash and position accounting for one simulation run.
//!
//! The ledger is the only place cash and positions change. Every accepted
//! trade moves value between cash and a position without creating or
//! destroying any: `cash + Σ position * price` is the same before and after
//! at a fixed price.

use std::collections::BTreeMap;

use super::clock::Tick;
use super::error::TradeError;
use super::holding::Holding;
use super::price_series::Quotes;
use super::transaction::{Side, Transaction};

/// Outcome of neutralising one instrument during a square-off.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareOff {
    pub instrument: String,
    /// `Ok(None)` when the position was already flat.
    pub result: Result<Option<Transaction>, TradeError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    id: String,
    cash: f64,
    allow_short: bool,
    positions: BTreeMap<String, i64>,
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn new(id: impl Into<String>, initial_cash: f64, allow_short: bool) -> Self {
        Ledger {
            id: id.into(),
            cash: initial_cash,
            allow_short,
            positions: BTreeMap::new(),
            transactions: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn allow_short(&self) -> bool {
        self.allow_short
    }

    pub fn position(&self, instrument: &str) -> i64 {
        self.positions.get(instrument).copied().unwrap_or(0)
    }

    pub fn buy(
        &mut self,
        tick: Tick,
        instrument: &str,
        quantity: u64,
        unit_price: f64,
    ) -> Result<Transaction, TradeError> {
        let position = self.next_position(instrument, Side::Buy, quantity, unit_price)?;

        let cost = quantity as f64 * unit_price;
        if cost > self.cash {
            return Err(TradeError::InsufficientFunds {
                needed: cost,
                available: self.cash,
            });
        }

        let tx = Transaction::new(tick, Side::Buy, instrument, quantity, unit_price);
        Ok(self.record(tx, position))
    }

    /// Buy as many whole units as `cash_amount` affords. Returns the quantity bought.
    pub fn buy_amount(
        &mut self,
        tick: Tick,
        instrument: &str,
        cash_amount: f64,
        unit_price: f64,
    ) -> Result<u64, TradeError> {
        let quantity = quantity_for(cash_amount, unit_price);
        self.buy(tick, instrument, quantity, unit_price)?;
        Ok(quantity)
    }

    pub fn sell(
        &mut self,
        tick: Tick,
        instrument: &str,
        quantity: u64,
        unit_price: f64,
    ) -> Result<Transaction, TradeError> {
        let position = self.next_position(instrument, Side::Sell, quantity, unit_price)?;

        if !self.allow_short && position < 0 {
            return Err(TradeError::InsufficientShares {
                instrument: instrument.to_string(),
                requested: quantity,
                held: self.position(instrument),
            });
        }

        let tx = Transaction::new(tick, Side::Sell, instrument, quantity, unit_price);
        Ok(self.record(tx, position))
    }

    /// Sell as many whole units as `cash_amount` is worth. Returns the quantity sold.
    pub fn sell_amount(
        &mut self,
        tick: Tick,
        instrument: &str,
        cash_amount: f64,
        unit_price: f64,
    ) -> Result<u64, TradeError> {
        let quantity = quantity_for(cash_amount, unit_price);
        self.sell(tick, instrument, quantity, unit_price)?;
        Ok(quantity)
    }

    /// Flatten every quoted instrument at its quoted price.
    ///
    /// Longs are sold, shorts bought back. Each instrument reports its own
    /// outcome; a buy-back the ledger cannot fund does not stop the others.
    pub fn square_off(&mut self, tick: Tick, quotes: &Quotes) -> Vec<SquareOff> {
        quotes
            .iter()
            .map(|(instrument, &price)| SquareOff {
                instrument: instrument.clone(),
                result: self.flatten(tick, instrument, price),
            })
            .collect()
    }

    fn flatten(
        &mut self,
        tick: Tick,
        instrument: &str,
        price: f64,
    ) -> Result<Option<Transaction>, TradeError> {
        let held = self.position(instrument);
        let quantity = held.unsigned_abs();
        let result = if held > 0 {
            self.sell(tick, instrument, quantity, price).map(Some)
        } else if held < 0 {
            self.buy(tick, instrument, quantity, price).map(Some)
        } else {
            Ok(None)
        };
        if let Err(ref e) = result {
            tracing::warn!(instrument, tick, error = %e, "square-off failed");
        }
        result
    }

    /// Every instrument ever traded, in name order, valued at its quote.
    ///
    /// Flat positions are included. An instrument without a quote is valued
    /// at zero.
    pub fn holdings(&self, quotes: &Quotes) -> Vec<Holding> {
        self.positions
            .iter()
            .map(|(instrument, &quantity)| {
                let price = quotes.get(instrument).copied().unwrap_or(0.0);
                Holding::new(instrument, quantity, price)
            })
            .collect()
    }

    pub fn total_value(&self, quotes: &Quotes) -> f64 {
        let positions: f64 = self
            .holdings(quotes)
            .iter()
            .map(|h| h.valuation)
            .sum();
        self.cash + positions
    }

    pub fn transactions_for(&self, instrument: &str) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.instrument == instrument)
            .collect()
    }

    pub fn all_transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Position after trading `quantity` units, refusing trades that cannot
    /// be represented: zero or oversized quantities, bad prices, amounts that
    /// overflow.
    fn next_position(
        &self,
        instrument: &str,
        side: Side,
        quantity: u64,
        unit_price: f64,
    ) -> Result<i64, TradeError> {
        if quantity == 0 {
            return Err(TradeError::InvalidQuantity);
        }
        if !unit_price.is_finite() || unit_price <= 0.0 {
            return Err(TradeError::InvalidPrice { price: unit_price });
        }
        if !(quantity as f64 * unit_price).is_finite() {
            return Err(TradeError::InvalidQuantity);
        }

        let units = i64::try_from(quantity).map_err(|_| TradeError::InvalidQuantity)?;
        let held = self.position(instrument);
        match side {
            Side::Buy => held.checked_add(units),
            Side::Sell => held.checked_sub(units),
        }
        .ok_or(TradeError::InvalidQuantity)
    }

    fn record(&mut self, tx: Transaction, position: i64) -> Transaction {
        tracing::debug!(
            ledger = %self.id,
            tick = tx.tick,
            side = %tx.side,
            instrument = %tx.instrument,
            quantity = tx.quantity,
            price = tx.price,
            amount = tx.amount,
            "trade accepted"
        );
        match tx.side {
            Side::Buy => self.cash -= tx.amount,
            Side::Sell => self.cash += tx.amount,
        }
        self.positions.insert(tx.instrument.clone(), position);
        self.transactions.push(tx.clone());
        tx
    }
}

/// Whole units of `unit_price` that `cash_amount` covers; 0 for nonsensical inputs.
fn quantity_for(cash_amount: f64, unit_price: f64) -> u64 {
    let usable = cash_amount.is_finite() && unit_price.is_finite();
    if !usable || cash_amount <= 0.0 || unit_price <= 0.0 {
        return 0;
    }
    (cash_amount / unit_price).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quotes(pairs: &[(&str, f64)]) -> Quotes {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn new_ledger() {
        let ledger = Ledger::new("run-1", 1000.0, false);
        assert_eq!(ledger.id(), "run-1");
        assert_eq!(ledger.cash(), 1000.0);
        assert!(!ledger.allow_short());
        assert!(ledger.all_transactions().is_empty());
        assert_eq!(ledger.position("msft"), 0);
    }

    #[test]
    fn buy_debits_cash_and_credits_position() {
        let mut ledger = Ledger::new("l", 1000.0, false);
        let tx = ledger.buy(3, "msft", 4, 100.0).unwrap();

        assert_eq!(tx.tick, 3);
        assert_eq!(tx.side, Side::Buy);
        assert_eq!(tx.amount, 400.0);
        assert_eq!(ledger.cash(), 600.0);
        assert_eq!(ledger.position("msft"), 4);
        assert_eq!(ledger.all_transactions().len(), 1);
    }

    #[test]
    fn buy_zero_quantity_rejected() {
        let mut ledger = Ledger::new("l", 1000.0, false);
        assert_eq!(ledger.buy(0, "msft", 0, 10.0), Err(TradeError::InvalidQuantity));
        assert_eq!(ledger.cash(), 1000.0);
        assert!(ledger.all_transactions().is_empty());
    }

    #[test]
    fn buy_beyond_cash_rejected() {
        let mut ledger = Ledger::new("l", 100.0, false);
        let err = ledger.buy(0, "msft", 2, 60.0).unwrap_err();
        assert_eq!(
            err,
            TradeError::InsufficientFunds {
                needed: 120.0,
                available: 100.0
            }
        );
        assert_eq!(ledger.position("msft"), 0);
        assert_eq!(ledger.cash(), 100.0);
    }

    #[test]
    fn buy_can_spend_exact_balance() {
        let mut ledger = Ledger::new("l", 100.0, false);
        ledger.buy(0, "msft", 2, 50.0).unwrap();
        assert_eq!(ledger.cash(), 0.0);
    }

    #[test]
    fn buy_amount_floors_quantity() {
        let mut ledger = Ledger::new("l", 1000.0, false);
        let q = ledger.buy_amount(0, "msft", 250.0, 80.0).unwrap();
        assert_eq!(q, 3);
        assert_eq!(ledger.cash(), 760.0);
    }

    #[test]
    fn buy_amount_too_small_is_invalid_quantity() {
        let mut ledger = Ledger::new("l", 1000.0, false);
        assert_eq!(
            ledger.buy_amount(0, "msft", 50.0, 80.0),
            Err(TradeError::InvalidQuantity)
        );
    }

    #[test]
    fn buy_amount_rejects_non_positive_price() {
        let mut ledger = Ledger::new("l", 1000.0, false);
        assert_eq!(
            ledger.buy_amount(0, "msft", 50.0, 0.0),
            Err(TradeError::InvalidQuantity)
        );
        assert_eq!(
            ledger.buy_amount(0, "msft", 50.0, -1.0),
            Err(TradeError::InvalidQuantity)
        );
        assert_eq!(
            ledger.buy_amount(0, "msft", f64::NAN, 1.0),
            Err(TradeError::InvalidQuantity)
        );
    }

    #[test]
    fn sell_credits_cash() {
        let mut ledger = Ledger::new("l", 1000.0, false);
        ledger.buy(0, "msft", 5, 100.0).unwrap();
        let tx = ledger.sell(1, "msft", 3, 120.0).unwrap();

        assert_eq!(tx.side, Side::Sell);
        assert_eq!(tx.amount, 360.0);
        assert_eq!(ledger.cash(), 860.0);
        assert_eq!(ledger.position("msft"), 2);
    }

    #[test]
    fn sell_zero_quantity_rejected() {
        let mut ledger = Ledger::new("l", 1000.0, true);
        assert_eq!(ledger.sell(0, "msft", 0, 10.0), Err(TradeError::InvalidQuantity));
    }

    #[test]
    fn sell_without_shares_rejected_when_short_disallowed() {
        let mut ledger = Ledger::new("l", 1000.0, false);
        ledger.buy(0, "msft", 2, 10.0).unwrap();
        let err = ledger.sell(1, "msft", 3, 10.0).unwrap_err();
        assert_eq!(
            err,
            TradeError::InsufficientShares {
                instrument: "msft".into(),
                requested: 3,
                held: 2
            }
        );
        assert_eq!(ledger.position("msft"), 2);
        assert_eq!(ledger.cash(), 980.0);
        assert_eq!(ledger.all_transactions().len(), 1);
    }

    #[test]
    fn sell_huge_quantity_rejected_when_short_disallowed() {
        let mut ledger = Ledger::new("l", 1000.0, false);
        assert!(matches!(
            ledger.sell(0, "msft", u64::MAX, 1.0),
            Err(TradeError::InsufficientShares { .. })
        ));
    }

    #[test]
    fn sell_beyond_holdings_goes_short_when_allowed() {
        let mut ledger = Ledger::new("l", 1000.0, true);
        ledger.sell(0, "msft", 4, 50.0).unwrap();
        assert_eq!(ledger.position("msft"), -4);
        assert_eq!(ledger.cash(), 1200.0);
    }

    #[test]
    fn sell_amount_floors_quantity() {
        let mut ledger = Ledger::new("l", 0.0, true);
        let q = ledger.sell_amount(0, "msft", 99.0, 20.0).unwrap();
        assert_eq!(q, 4);
        assert_eq!(ledger.position("msft"), -4);
    }

    #[test]
    fn square_off_flattens_long_and_short() {
        let mut ledger = Ledger::new("l", 1000.0, true);
        ledger.buy(0, "aapl", 3, 100.0).unwrap();
        ledger.sell(0, "msft", 2, 50.0).unwrap();

        let outcomes = ledger.square_off(1, &quotes(&[("aapl", 110.0), ("msft", 40.0)]));

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].instrument, "aapl");
        let sold = outcomes[0].result.clone().unwrap().unwrap();
        assert_eq!(sold.side, Side::Sell);
        assert_eq!(sold.quantity, 3);
        let bought = outcomes[1].result.clone().unwrap().unwrap();
        assert_eq!(bought.side, Side::Buy);
        assert_eq!(bought.quantity, 2);

        assert_eq!(ledger.position("aapl"), 0);
        assert_eq!(ledger.position("msft"), 0);
        // 1000 - 300 + 100 + 330 - 80
        assert_eq!(ledger.cash(), 1050.0);
    }

    #[test]
    fn square_off_flat_instrument_is_noop() {
        let mut ledger = Ledger::new("l", 1000.0, false);
        let outcomes = ledger.square_off(0, &quotes(&[("msft", 10.0)]));
        assert_eq!(outcomes[0].result, Ok(None));
        assert!(ledger.all_transactions().is_empty());
    }

    #[test]
    fn square_off_reports_unfunded_buy_back_and_continues() {
        let mut ledger = Ledger::new("l", 0.0, true);
        ledger.sell(0, "aapl", 1, 10.0).unwrap();
        ledger.sell(0, "msft", 10, 10.0).unwrap();
        // cash = 110; buying back msft at 50 costs 500
        let outcomes = ledger.square_off(1, &quotes(&[("aapl", 10.0), ("msft", 50.0)]));

        assert!(outcomes[0].result.is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(TradeError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.position("aapl"), 0);
        assert_eq!(ledger.position("msft"), -10);
    }

    #[test]
    fn holdings_include_flat_positions_in_name_order() {
        let mut ledger = Ledger::new("l", 1000.0, false);
        ledger.buy(0, "msft", 2, 10.0).unwrap();
        ledger.buy(0, "aapl", 1, 10.0).unwrap();
        ledger.sell(1, "aapl", 1, 10.0).unwrap();

        let holdings = ledger.holdings(&quotes(&[("msft", 15.0)]));
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0], Holding::new("aapl", 0, 0.0));
        assert_eq!(holdings[1], Holding::new("msft", 2, 15.0));
    }

    #[test]
    fn total_value_includes_positions() {
        let mut ledger = Ledger::new("l", 1000.0, false);
        ledger.buy(0, "msft", 5, 100.0).unwrap();
        assert_eq!(ledger.total_value(&quotes(&[("msft", 100.0)])), 1000.0);
        assert_eq!(ledger.total_value(&quotes(&[("msft", 120.0)])), 1100.0);
    }

    #[test]
    fn transactions_filtered_by_instrument() {
        let mut ledger = Ledger::new("l", 1000.0, true);
        ledger.buy(0, "msft", 1, 10.0).unwrap();
        ledger.sell(1, "aapl", 1, 10.0).unwrap();
        ledger.sell(2, "msft", 1, 12.0).unwrap();

        let msft = ledger.transactions_for("msft");
        assert_eq!(msft.len(), 2);
        assert!(msft.iter().all(|t| t.instrument == "msft"));
        assert_eq!(ledger.all_transactions().len(), 3);
        assert!(ledger.transactions_for("goog").is_empty());
    }

    #[test]
    fn quantity_beyond_position_range_is_refused() {
        let mut ledger = Ledger::new("l", 0.0, true);
        assert_eq!(
            ledger.sell(0, "msft", u64::MAX, 1.0),
            Err(TradeError::InvalidQuantity)
        );
        assert_eq!(ledger.position("msft"), 0);
        assert_eq!(ledger.cash(), 0.0);
        assert!(ledger.all_transactions().is_empty());
    }

    #[test]
    fn position_overflow_is_refused() {
        let mut ledger = Ledger::new("l", 0.0, true);
        ledger.sell(0, "msft", i64::MAX as u64, 1.0).unwrap();
        let cash = ledger.cash();

        assert_eq!(
            ledger.sell(1, "msft", 2, 1.0),
            Err(TradeError::InvalidQuantity)
        );
        assert_eq!(ledger.position("msft"), -i64::MAX);
        assert_eq!(ledger.cash(), cash);
        assert_eq!(ledger.all_transactions().len(), 1);
    }

    #[test]
    fn oversized_amount_trade_is_refused() {
        let mut ledger = Ledger::new("l", 1e30, true);
        assert_eq!(
            ledger.buy_amount(0, "msft", 1e30, 1e-3),
            Err(TradeError::InvalidQuantity)
        );
        assert_eq!(ledger.cash(), 1e30);
        assert_eq!(ledger.position("msft"), 0);
    }

    #[test]
    fn non_finite_or_non_positive_price_is_refused() {
        let mut ledger = Ledger::new("l", 1000.0, true);
        for price in [f64::NAN, f64::INFINITY, 0.0, -5.0] {
            assert!(matches!(
                ledger.buy(0, "msft", 1, price),
                Err(TradeError::InvalidPrice { .. })
            ));
            assert!(matches!(
                ledger.sell(0, "msft", 1, price),
                Err(TradeError::InvalidPrice { .. })
            ));
        }
        assert_eq!(ledger.cash(), 1000.0);
        assert_eq!(ledger.position("msft"), 0);
        assert!(ledger.all_transactions().is_empty());
    }
}
