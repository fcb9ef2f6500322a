//! Defrag loop: continuously pops the most interesting queued file, re-checks
//! it's still worth doing, gets admission from the usage policy, runs the
//! external defrag command, and hands the path to the stat loop for
//! post-defrag re-measurement.

use crate::cost_model::DriveGeometry;
use crate::external::{btrfs_cmd, filefrag};
use crate::files_state::FilesState;
use crate::orchestrator::mount_options::MountOptions;
use crate::orchestrator::stat_loop::PendingDefrag;
use crate::types::FragRecord;
use crate::utils::config::{MAX_DELAY_BETWEEN_DEFRAGS_SECS, MAX_QUEUE_LENGTH, MIN_DELAY_BETWEEN_DEFRAGS_SECS};
use crate::usage_policy::UsagePolicy;
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Linear interpolation of the inter-defrag sleep between the min and max
/// bounds, based on how full the queue currently is (a fuller queue -> work
/// through it faster; a near-empty queue -> no rush).
pub fn inter_defrag_sleep_secs(queue_len: usize) -> f64 {
    let fill = (queue_len as f64 / MAX_QUEUE_LENGTH as f64).clamp(0.0, 1.0);
    MAX_DELAY_BETWEEN_DEFRAGS_SECS - fill * (MAX_DELAY_BETWEEN_DEFRAGS_SECS - MIN_DELAY_BETWEEN_DEFRAGS_SECS)
}

pub struct DefragLoop {
    root: std::path::PathBuf,
    files_state: Arc<FilesState>,
    usage_policy: Arc<Mutex<UsagePolicy>>,
    geometry: DriveGeometry,
    btrfs_binary: String,
    filefrag_binary: String,
    target_extent_size: u64,
    stat_tx: Sender<PendingDefrag>,
    stop: Arc<AtomicBool>,
}

impl DefragLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        root: std::path::PathBuf,
        files_state: Arc<FilesState>,
        usage_policy: Arc<Mutex<UsagePolicy>>,
        geometry: DriveGeometry,
        btrfs_binary: String,
        filefrag_binary: String,
        target_extent_size: u64,
        stat_tx: Sender<PendingDefrag>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            root,
            files_state,
            usage_policy,
            geometry,
            btrfs_binary,
            filefrag_binary,
            target_extent_size,
            stat_tx,
            stop,
        }
    }

    /// Runs until `stop` is set. Blocks (with a short sleep) whenever the
    /// queue is empty.
    pub fn run(&self, mount_options: MountOptions) {
        while !self.stop.load(Ordering::Relaxed) {
            let Some(record) = self.files_state.pop_most_interesting() else {
                std::thread::sleep(Duration::from_millis(500));
                continue;
            };
            self.handle_one(record, mount_options);

            let queue_len = self.files_state.queue_len();
            std::thread::sleep(Duration::from_secs_f64(inter_defrag_sleep_secs(queue_len)));
        }
    }

    fn handle_one(&self, record: FragRecord, mount_options: MountOptions) {
        let abs_path = self.root.join(&record.short_path);
        if !abs_path.exists() {
            debug!("defrag loop: {} no longer exists, dropping", abs_path.display());
            return;
        }

        // Re-measure before committing device time: the file may have
        // changed (or been defragmented by something else) since it was
        // queued.
        let fresh = self.remeasure(&abs_path);
        let Some(fresh) = fresh else {
            return;
        };
        if self.files_state.below_threshold_cost(fresh.class(), fresh.cost, None) {
            debug!("defrag loop: {} no longer above threshold, skipping", abs_path.display());
            return;
        }
        if self.files_state.recently_defragmented(&record.short_path) {
            debug!("defrag loop: {} already recently defragmented, skipping", abs_path.display());
            return;
        }

        // Mark before launch (spec.md 4.5): a defrag in flight must not be
        // picked up again by the slow scan or a live write re-measurement.
        self.files_state.mark_defragmented(&record.short_path);

        let estimate = self.geometry.defrag_time(&fresh, self.files_state.average_cost(fresh.class()));
        if !self.wait_for_admission(estimate) {
            return;
        }

        let compress = mount_options.compress || mount_options.compress_force;
        let start = Instant::now();
        let result = btrfs_cmd::defragment(&self.btrfs_binary, &abs_path, compress, self.target_extent_size);
        let actual = start.elapsed().as_secs_f64();

        {
            let mut policy = self.usage_policy.lock().unwrap();
            policy.record(Instant::now(), actual, estimate);
        }

        match result {
            Ok(()) => {
                info!("defragmented {} in {actual:.2}s (estimate {estimate:.2}s)", abs_path.display());
                let pending = PendingDefrag {
                    short_path: record.short_path.clone(),
                    initial_cost: fresh.cost,
                    size_bytes: fresh.size,
                    queued_at: Instant::now(),
                    best_cost_so_far: fresh.cost,
                    last_improvement_at: Instant::now(),
                };
                if self.stat_tx.send(pending).is_err() {
                    warn!("defrag loop: stat loop channel closed, dropping {}", abs_path.display());
                }
            }
            Err(e) => warn!("defrag loop: {} failed: {e}", abs_path.display()),
        }
    }

    /// Re-run filefrag for a single path and return its fresh cost record.
    fn remeasure(&self, abs_path: &Path) -> Option<FragRecord> {
        let output = filefrag::run_batch(&self.filefrag_binary, &[abs_path]).ok()?;
        let (mut records, _errors) = crate::extent_parser::parse_extent_listing(&self.geometry, &output);
        let mut record = records.pop()?;
        record.short_path = crate::types::short_path(abs_path, &self.root).unwrap_or(record.short_path);
        Some(record)
    }

    /// Block (retrying with a short sleep) until the usage policy admits a
    /// defrag estimated to take `estimate_secs`, or until `stop` fires.
    fn wait_for_admission(&self, estimate_secs: f64) -> bool {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return false;
            }
            let allowed = {
                let mut policy = self.usage_policy.lock().unwrap();
                policy.allows(Instant::now(), estimate_secs)
            };
            if allowed {
                return true;
            }
            std::thread::sleep(Duration::from_millis(250));
        }
    }
}
