//! Per-instrument bounded price history.
//!
//! [`PriceHistoryStore`] keeps one FIFO ring buffer of prices per
//! instrument. Buffers are created on the first append for an unseen
//! instrument and live as long as the store. Each instrument's buffer sits
//! behind its own shard entry, so ticks for different instruments never
//! contend on a shared lock.

use std::collections::VecDeque;

use dashmap::DashMap;

use crate::config::DEFAULT_HISTORY_CAPACITY;

/// One instrument's buffer plus the number of prices ever appended to it.
#[derive(Debug, Default)]
struct History {
    prices: VecDeque<f64>,
    appended: u64,
}

/// Result of an append: the buffer as it stood right after the push.
#[derive(Debug, Clone, PartialEq)]
pub struct Appended {
    /// 1 for the instrument's first price, increasing by one per append.
    pub sequence: u64,
    /// The updated history, oldest first.
    pub prices: Vec<f64>,
}

#[derive(Debug)]
pub struct PriceHistoryStore {
    capacity: usize,
    histories: DashMap<String, History>,
}

impl PriceHistoryStore {
    /// Creates a store holding at most `capacity` prices per instrument.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            histories: DashMap::new(),
        }
    }

    /// Appends `price` to the instrument's buffer, evicting the oldest
    /// value once the buffer is over capacity, and returns the buffer as
    /// this append left it.
    ///
    /// Any value is accepted; ticks are validated before they get here.
    pub fn append(&self, instrument: &str, price: f64) -> Appended {
        // Push, eviction and the copy all happen under one entry guard.
        let mut history = self
            .histories
            .entry(instrument.to_string())
            .or_insert_with(|| History {
                prices: VecDeque::with_capacity(self.capacity + 1),
                appended: 0,
            });
        history.prices.push_back(price);
        while history.prices.len() > self.capacity {
            history.prices.pop_front();
        }
        history.appended += 1;

        Appended {
            sequence: history.appended,
            prices: history.prices.iter().copied().collect(),
        }
    }

    /// Returns the instrument's prices, oldest first. Unseen instruments
    /// yield an empty vector.
    #[must_use]
    pub fn get(&self, instrument: &str) -> Vec<f64> {
        self.histories
            .get(instrument)
            .map(|history| history.prices.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, instrument: &str) -> usize {
        self.histories.get(instrument).map_or(0, |h| h.prices.len())
    }
}

impl Default for PriceHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
