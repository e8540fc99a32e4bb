use crate::models::InstrumentKey;
use std::collections::HashMap;
use std::time::Instant;

/// Cross-cycle memory of the poller. Owned by one [`super::PricePoller`] and
/// only mutated from inside a cycle.
#[derive(Debug, Default, Clone)]
pub struct PollState {
    last_price: HashMap<InstrumentKey, f64>,
    last_accepted: HashMap<InstrumentKey, Instant>,
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_price(&self, key: &InstrumentKey) -> Option<f64> {
        self.last_price.get(key).copied()
    }

    pub fn record_price(&mut self, key: &InstrumentKey, price: f64) {
        self.last_price.insert(key.clone(), price);
    }

    pub fn last_accepted(&self, key: &InstrumentKey) -> Option<Instant> {
        self.last_accepted.get(key).copied()
    }

    pub fn record_accepted(&mut self, key: &InstrumentKey, at: Instant) {
        self.last_accepted.insert(key.clone(), at);
    }

    /// Number of instruments with a known price.
    pub fn tracked(&self) -> usize {
        self.last_price.len()
    }
}
