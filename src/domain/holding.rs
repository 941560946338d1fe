//! Derived per-instrument holding view.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub instrument: String,
    pub quantity: i64,
    pub valuation: f64,
}

impl Holding {
    pub fn new(instrument: &str, quantity: i64, price: f64) -> Self {
        Holding {
            instrument: instrument.to_string(),
            quantity,
            valuation: quantity as f64 * price,
        }
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }
}
