//! Trade records appended to a ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::clock::Tick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("buy"),
            Side::Sell => f.write_str("sell"),
        }
    }
}

/// An accepted trade. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub tick: Tick,
    pub side: Side,
    pub instrument: String,
    pub quantity: u64,
    pub price: f64,
    pub amount: f64,
}

impl Transaction {
    pub fn new(tick: Tick, side: Side, instrument: &str, quantity: u64, price: f64) -> Self {
        Transaction {
            tick,
            side,
            instrument: instrument.to_string(),
            quantity,
            price,
            amount: quantity as f64 * price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_is_quantity_times_price() {
        let tx = Transaction::new(7, Side::Buy, "msft", 4, 165.0);
        assert_eq!(tx.amount, 660.0);
        assert_eq!(tx.tick, 7);
        assert_eq!(tx.instrument, "msft");
    }

    #[test]
    fn side_serializes_lowercase() {
        let tx = Transaction::new(1, Side::Sell, "msft", 1, 2.0);
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["side"], "sell");
        assert_eq!(json["amount"], 2.0);
    }
}
