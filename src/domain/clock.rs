//! Simulated time cursor.
//!
//! Every run owns its own [`Clock`]; nothing in the crate shares one globally.

pub type Tick = u64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clock {
    tick: Tick,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) {
        self.tick += 1;
    }

    pub fn value(&self) -> Tick {
        self.tick
    }

    pub fn reset(&mut self) {
        self.tick = 0;
    }
}
