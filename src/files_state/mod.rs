//! Files-State (C3): the daemon's in-memory model of "what's worth
//! defragmenting right now". Three independently-locked pieces so that the
//! fatrace-ingest thread (write tracker), the slow-scan/defrag threads
//! (queues, threshold, recent set), and the stat thread can each make
//! progress without serializing on one global lock (spec.md 5,
//! "Concurrency & Resource Model").

mod queue;
mod recent_set;
mod threshold;
mod type_tracker;
mod write_tracker;

use crate::types::{CompressionClass, CostAchievement, FragRecord};
use queue::Queues;
use recent_set::FuzzyEventTracker;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Instant, SystemTime};
use threshold::ThresholdTracker;
use type_tracker::TypeTracker;
use write_tracker::WriteTracker;

pub use recent_set::tick_period_secs;

struct Fragmentation {
    queues: Queues,
    threshold: ThresholdTracker,
    type_tracker: TypeTracker,
    recent: FuzzyEventTracker,
}

/// Shared, thread-safe handle to the three independently-locked pieces of
/// files state. Cloning is cheap (an `Arc` inside each field would also work,
/// but spec.md calls for one process-wide instance, so this crate just holds
/// it behind `Mutex` and hands out `&FilesState`).
pub struct FilesState {
    fragmentation: Mutex<Fragmentation>,
    writes: Mutex<WriteTracker>,
}

impl FilesState {
    pub fn new() -> Self {
        Self {
            fragmentation: Mutex::new(Fragmentation {
                queues: Queues::new(),
                threshold: ThresholdTracker::new(),
                type_tracker: TypeTracker::new(),
                recent: FuzzyEventTracker::new(),
            }),
            writes: Mutex::new(WriteTracker::new()),
        }
    }

    /// Ingest freshly measured records from a scan/rescan batch: drop any
    /// queued entry superseded by a fresh measurement, insert the new ones
    /// (bumping the type tracker), then enforce the queue cap. Returns the
    /// number actually queued (a record whose cost doesn't clear the
    /// threshold is measured but not queued). `threshold_multiplier` narrows
    /// the admission bar for write-origin batches (spec.md 4.3); `None` is
    /// the full bar used by the slow scan.
    pub fn update_files(&self, records: Vec<FragRecord>, now: Instant, threshold_multiplier: Option<f64>) -> usize {
        let mult = threshold_multiplier.unwrap_or(1.0);
        let mut frag = self.fragmentation.lock().unwrap();
        frag.threshold.refresh(now); // refreshes the cache if it's gone stale
        let mut queued = 0usize;
        for record in records {
            frag.queues.remove_short_path(&record.short_path);
            let class = record.class();
            if frag.threshold.below_threshold(class, record.cost, mult) {
                continue;
            }
            frag.queues.push(record);
            frag.type_tracker.record_insert(class);
            queued += 1;
        }
        let shares: HashMap<CompressionClass, f64> = CompressionClass::ALL
            .into_iter()
            .map(|c| (c, frag.type_tracker.share(c)))
            .collect();
        frag.queues.enforce_cap(&shares);
        queued
    }

    /// Pop the single most worth-defragmenting file, advancing the weighted
    /// round-robin class selector. Falls back to the other class if the
    /// selected one is empty; `None` if both are empty.
    pub fn pop_most_interesting(&self) -> Option<FragRecord> {
        let mut frag = self.fragmentation.lock().unwrap();
        let primary = frag.type_tracker.advance();
        if let Some(record) = frag.queues.pop_class(primary) {
            return Some(record);
        }
        let fallback = CompressionClass::ALL.into_iter().find(|c| *c != primary)?;
        frag.queues.pop_class(fallback)
    }

    /// Record a live write, used by the fatrace-ingest thread.
    pub fn file_written_to(&self, short_path: PathBuf, at: SystemTime) {
        let mut writes = self.writes.lock().unwrap();
        writes.record_write(short_path, at);
    }

    /// Paths ready to fold into a re-scan batch; also drains them from the
    /// write tracker so the caller owns dispatching the re-scan exactly once.
    pub fn drain_ready_writes(&self, now: SystemTime, commit_delay_secs: u64, fuzz_secs: i64) -> Vec<PathBuf> {
        let mut writes = self.writes.lock().unwrap();
        let ready = writes.ready_for_consolidation(now, commit_delay_secs, fuzz_secs);
        writes.remove_all(&ready);
        ready
    }

    pub fn write_tracker_len(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    /// Append a post-defrag cost sample to `class`'s achievement history.
    pub fn historize_cost_achievement(&self, class: CompressionClass, achievement: CostAchievement) {
        let mut frag = self.fragmentation.lock().unwrap();
        frag.threshold.record(class, achievement);
    }

    /// Whether `cost` is low enough (with `MIN_EXPECTED_BENEFIT` headroom,
    /// scaled by `threshold_multiplier`) that defragmenting it further isn't
    /// worth doing. `None` is the full bar.
    pub fn below_threshold_cost(&self, class: CompressionClass, cost: f64, threshold_multiplier: Option<f64>) -> bool {
        let frag = self.fragmentation.lock().unwrap();
        frag.threshold.below_threshold(class, cost, threshold_multiplier.unwrap_or(1.0))
    }

    /// `class`'s current weighted-average achieved final cost, for
    /// `DriveGeometry::defrag_time`'s `average_cost(class)` parameter.
    pub fn average_cost(&self, class: CompressionClass) -> f64 {
        let mut frag = self.fragmentation.lock().unwrap();
        frag.threshold.refresh(Instant::now());
        frag.threshold.average_cost(class)
    }

    /// Mark `short_path` as just defragmented, so it's skipped for a while.
    pub fn mark_defragmented(&self, short_path: &Path) {
        let mut frag = self.fragmentation.lock().unwrap();
        frag.recent.mark(short_path);
    }

    pub fn recently_defragmented(&self, short_path: &Path) -> bool {
        let frag = self.fragmentation.lock().unwrap();
        frag.recent.is_recent(short_path)
    }

    /// Age the recently-defragmented bit array by one tick.
    pub fn tick_recent_set(&self) {
        let mut frag = self.fragmentation.lock().unwrap();
        frag.recent.tick();
    }

    pub fn queue_len(&self) -> usize {
        self.fragmentation.lock().unwrap().queues.len()
    }

    pub fn queue_class_len(&self, class: CompressionClass) -> usize {
        self.fragmentation.lock().unwrap().queues.class_len(class)
    }

    pub fn history_len(&self, class: CompressionClass) -> usize {
        self.fragmentation.lock().unwrap().threshold.len(class)
    }
}

impl Default for FilesState {
    fn default() -> Self {
        Self::new()
    }
}
