//! Write-Event Record: tracks files touched by live writes (via fatrace
//! ingestion) until they're old enough to consolidate into a re-scan batch.

use crate::types::WriteEvent;
use crate::utils::config::{MAX_TRACKED_WRITTEN_FILES, MAX_WRITES_DELAY_SECS};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

#[derive(Default)]
pub struct WriteTracker {
    events: HashMap<PathBuf, WriteEvent>,
}

impl WriteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write to `short_path` at `at`; evicts the oldest-`first_write`
    /// entry if this would exceed [`MAX_TRACKED_WRITTEN_FILES`] and `short_path`
    /// is new (spec.md 4.3, "Write tracker capacity").
    pub fn record_write(&mut self, short_path: PathBuf, at: SystemTime) {
        if let Some(event) = self.events.get_mut(&short_path) {
            event.touch(at);
            return;
        }
        if self.events.len() >= MAX_TRACKED_WRITTEN_FILES {
            if let Some(oldest) = self
                .events
                .iter()
                .min_by_key(|(_, e)| e.first_write)
                .map(|(p, _)| p.clone())
            {
                self.events.remove(&oldest);
            }
        }
        self.events.insert(short_path, WriteEvent::new(at));
    }

    /// Paths whose write activity has settled enough to re-measure: either quiet
    /// for `commit_delay + 5s` since the last write, or tracked for longer than
    /// [`MAX_WRITES_DELAY_SECS`] regardless of recent activity (so a
    /// continuously-written file still eventually gets re-scanned). `fuzz_secs`
    /// jitters the settle point per spec.md 4.3's
    /// `DEFRAG_CHECK_DISTRIBUTION_PERIOD_SECS` smear, so consolidation isn't
    /// thundering-herd synchronized across many files written at once.
    pub fn ready_for_consolidation(
        &self,
        now: SystemTime,
        commit_delay_secs: u64,
        fuzz_secs: i64,
    ) -> Vec<PathBuf> {
        let mut ready = Vec::new();
        for (path, event) in &self.events {
            let quiet_for = now
                .duration_since(event.last_write)
                .unwrap_or_default()
                .as_secs() as i64;
            let settle_point = commit_delay_secs as i64 + 5 + fuzz_secs;
            let tracked_for = now
                .duration_since(event.first_write)
                .unwrap_or_default()
                .as_secs();
            if quiet_for >= settle_point.max(0) || tracked_for >= MAX_WRITES_DELAY_SECS {
                ready.push(path.clone());
            }
        }
        ready
    }

    /// Drop entries once they've been folded into a re-scan batch.
    pub fn remove_all(&mut self, paths: &[PathBuf]) {
        for path in paths {
            self.events.remove(path);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
