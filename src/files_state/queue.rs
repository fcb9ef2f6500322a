//! The two per-class priority queues, ordered ascending on cost (highest cost
//! pops first), plus `MAX_QUEUE_LENGTH` trimming proportional to type-tracker
//! share.

use crate::types::{CompressionClass, FragRecord};
use crate::utils::config::{MAX_QUEUE_LENGTH, MIN_CLASS_TARGET};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::path::PathBuf;

/// Wraps a [`FragRecord`] for `BinaryHeap` ordering by ascending cost (so the
/// heap's max -- the next pop -- is the highest-cost record).
#[derive(Debug, Clone)]
struct QueuedRecord(FragRecord);

impl PartialEq for QueuedRecord {
    fn eq(&self, other: &Self) -> bool {
        self.0.cost == other.0.cost
    }
}
impl Eq for QueuedRecord {}
impl PartialOrd for QueuedRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for QueuedRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        // total_cmp: costs are never NaN in practice, but this keeps ordering
        // total as spec.md 3 requires ("Queue ordering is total and stable on cost").
        self.0.cost.total_cmp(&other.0.cost)
    }
}

#[derive(Default)]
pub struct Queues {
    heaps: HashMap<CompressionClass, BinaryHeap<QueuedRecord>>,
}

impl Queues {
    pub fn new() -> Self {
        let mut heaps = HashMap::new();
        for class in CompressionClass::ALL {
            heaps.insert(class, BinaryHeap::new());
        }
        Self { heaps }
    }

    pub fn len(&self) -> usize {
        self.heaps.values().map(|h| h.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn class_len(&self, class: CompressionClass) -> usize {
        self.heaps[&class].len()
    }

    /// True if `short_path` is queued in either class.
    pub fn contains(&self, short_path: &PathBuf) -> bool {
        self.heaps
            .values()
            .any(|h| h.iter().any(|q| &q.0.short_path == short_path))
    }

    /// Remove any queued record with this short path (supersession), from
    /// either class. Returns whether one was found.
    pub fn remove_short_path(&mut self, short_path: &PathBuf) -> bool {
        let mut found = false;
        for heap in self.heaps.values_mut() {
            if heap.iter().any(|q| &q.0.short_path == short_path) {
                found = true;
                let kept: Vec<QueuedRecord> = heap
                    .drain()
                    .filter(|q| &q.0.short_path != short_path)
                    .collect();
                *heap = kept.into_iter().collect();
            }
        }
        found
    }

    /// Insert a record already known not to be a duplicate of a queued path.
    pub fn push(&mut self, record: FragRecord) {
        let class = record.class();
        self.heaps.get_mut(&class).unwrap().push(QueuedRecord(record));
    }

    /// Pop the highest-cost record from `class`, or `None` if that class is empty.
    pub fn pop_class(&mut self, class: CompressionClass) -> Option<FragRecord> {
        self.heaps.get_mut(&class).unwrap().pop().map(|q| q.0)
    }

    /// Enforce `MAX_QUEUE_LENGTH` by trimming lowest-cost entries, proportional
    /// to `shares` (class -> target fraction), each class keeping at least
    /// [`MIN_CLASS_TARGET`]. Slack from an under-filled class goes to the other.
    /// Returns true if anything was trimmed (caller uses this purely for
    /// observability logging).
    pub fn enforce_cap(&mut self, shares: &HashMap<CompressionClass, f64>) -> bool {
        let total = self.len();
        if total <= MAX_QUEUE_LENGTH {
            return false;
        }

        let mut targets: HashMap<CompressionClass, usize> = HashMap::new();
        for class in CompressionClass::ALL {
            let share = *shares.get(&class).unwrap_or(&0.5);
            let raw = (MAX_QUEUE_LENGTH as f64 * share).round() as usize;
            targets.insert(class, raw.max(MIN_CLASS_TARGET));
        }
        // Give slack from an under-filled class to the other.
        let mut slack = 0i64;
        for class in CompressionClass::ALL {
            let have = self.class_len(class) as i64;
            let target = targets[&class] as i64;
            if have < target {
                slack += target - have;
                targets.insert(class, have.max(MIN_CLASS_TARGET as i64) as usize);
            }
        }
        if slack > 0 {
            // Route slack to whichever class actually has overflow to absorb it.
            for class in CompressionClass::ALL {
                let have = self.class_len(class) as i64;
                let target = targets[&class] as i64;
                if have > target {
                    let new_target = (target + slack).min(have);
                    targets.insert(class, new_target as usize);
                    slack -= new_target - target;
                }
            }
        }

        let mut trimmed = false;
        for class in CompressionClass::ALL {
            let target = targets[&class];
            let heap = self.heaps.get_mut(&class).unwrap();
            if heap.len() > target {
                // into_sorted_vec is ascending; drop the lowest-cost prefix and
                // keep the highest-cost `target` entries.
                let sorted = std::mem::take(heap).into_sorted_vec();
                let drop_count = sorted.len() - target;
                *heap = sorted.into_iter().skip(drop_count).collect();
                trimmed = true;
            }
        }
        trimmed
    }
}
