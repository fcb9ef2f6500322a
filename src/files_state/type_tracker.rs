//! Weighted round-robin accumulator driving the compressed/uncompressed pop order.

use crate::types::CompressionClass;
use crate::utils::config::{TYPE_TRACKER_AGE_FACTOR, TYPE_TRACKER_MEMORY};
use std::collections::HashMap;

#[derive(Debug)]
pub struct TypeTracker {
    weight: HashMap<CompressionClass, f64>,
    fetch_accumulator: HashMap<CompressionClass, f64>,
}

impl Default for TypeTracker {
    fn default() -> Self {
        let mut weight = HashMap::new();
        let mut fetch_accumulator = HashMap::new();
        for class in CompressionClass::ALL {
            weight.insert(class, 1.0);
            fetch_accumulator.insert(class, 0.0);
        }
        Self {
            weight,
            fetch_accumulator,
        }
    }
}

impl TypeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that one more item of `class` was queued; ages both weights down
    /// once their sum exceeds [`TYPE_TRACKER_MEMORY`].
    pub fn record_insert(&mut self, class: CompressionClass) {
        *self.weight.get_mut(&class).unwrap() += 1.0;
        let total: f64 = self.weight.values().sum();
        if total > TYPE_TRACKER_MEMORY {
            for w in self.weight.values_mut() {
                *w *= TYPE_TRACKER_AGE_FACTOR;
            }
        }
    }

    /// This class's share of the combined weight (0.5 each when both are
    /// untouched or the tracker has never recorded an insert yet).
    pub fn share(&self, class: CompressionClass) -> f64 {
        let total: f64 = self.weight.values().sum();
        if total <= 0.0 {
            return 0.5;
        }
        self.weight[&class] / total
    }

    /// Advance each class's fetch accumulator by its share; return the class
    /// whose accumulator crosses 1.0 first, reducing it by 1.0 (mod-reduce).
    ///
    /// Because shares always sum to 1.0, the combined accumulator mass grows by
    /// exactly 1.0 per call, so with two classes at least one must reach >= 1.0
    /// within two calls (pigeonhole); this loop always terminates.
    pub fn advance(&mut self) -> CompressionClass {
        loop {
            for class in CompressionClass::ALL {
                let s = self.share(class);
                *self.fetch_accumulator.get_mut(&class).unwrap() += s;
            }
            let winner = CompressionClass::ALL
                .into_iter()
                .filter(|c| self.fetch_accumulator[c] >= 1.0)
                .max_by(|a, b| {
                    self.fetch_accumulator[a]
                        .partial_cmp(&self.fetch_accumulator[b])
                        .unwrap()
                });
            if let Some(winner) = winner {
                *self.fetch_accumulator.get_mut(&winner).unwrap() -= 1.0;
                return winner;
            }
        }
    }
}
