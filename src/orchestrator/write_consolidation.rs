//! Write consolidation: the periodic sweep that folds live write activity
//! (tracked by the Supervisor's fatrace-ingest thread via
//! `FilesState::file_written_to`) back into the same queue the slow scan
//! feeds, so a file rewritten between slow-scan passes doesn't have to wait
//! for the next pass to be reconsidered.

use crate::cost_model::DriveGeometry;
use crate::external::filefrag;
use crate::files_state::FilesState;
use crate::orchestrator::mount_options::MountOptions;
use crate::utils::config::{DEFRAG_CHECK_DISTRIBUTION_PERIOD_SECS, IGNORE_AFTER_DEFRAG_DELAY_SECS, TRACKED_WRITTEN_FILES_CONSOLIDATION_PERIOD_SECS};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub struct WriteConsolidation {
    root: PathBuf,
    files_state: Arc<FilesState>,
    geometry: DriveGeometry,
    filefrag_binary: String,
    full_scan_time_secs: u64,
    stop: Arc<AtomicBool>,
}

impl WriteConsolidation {
    pub fn new(
        root: PathBuf,
        files_state: Arc<FilesState>,
        geometry: DriveGeometry,
        filefrag_binary: String,
        full_scan_time_secs: u64,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            root,
            files_state,
            geometry,
            filefrag_binary,
            full_scan_time_secs,
            stop,
        }
    }

    /// Runs until `stop` is set, ticking every
    /// `TRACKED_WRITTEN_FILES_CONSOLIDATION_PERIOD_SECS`.
    pub fn run(&self, mount_options: MountOptions) {
        while !self.stop.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_secs(TRACKED_WRITTEN_FILES_CONSOLIDATION_PERIOD_SECS));
            if self.stop.load(Ordering::Relaxed) {
                return;
            }
            self.tick(mount_options);
        }
    }

    /// A modulus-based spread (spec.md 4.3) so simultaneous writers across
    /// many files don't all settle and re-measure on the exact same tick.
    fn fuzz_secs(&self, now: SystemTime) -> i64 {
        let secs = now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        let half = (DEFRAG_CHECK_DISTRIBUTION_PERIOD_SECS / 2) as i64;
        (secs % DEFRAG_CHECK_DISTRIBUTION_PERIOD_SECS) as i64 - half
    }

    fn tick(&self, mount_options: MountOptions) {
        let now = SystemTime::now();
        let fuzz = self.fuzz_secs(now);
        let ready = self.files_state.drain_ready_writes(now, mount_options.commit_delay_secs, fuzz);
        if ready.is_empty() {
            return;
        }

        let mut paths = Vec::with_capacity(ready.len());
        for short_path in &ready {
            let abs = self.root.join(short_path);
            if abs.is_file() {
                paths.push(abs);
            }
        }
        if paths.is_empty() {
            return;
        }

        let refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();
        let output = filefrag::run_all(&self.filefrag_binary, &refs);
        let (mut records, errors) = crate::extent_parser::parse_extent_listing(&self.geometry, &output);
        if errors > 0 {
            warn!("write consolidation: {errors} unparseable lines in this batch");
        }
        for record in &mut records {
            if let Some(sp) = crate::types::short_path(&record.short_path, &self.root) {
                record.short_path = sp;
            }
        }

        // Write-origin detections get a narrowed admission bar (spec.md 4.3)
        // so they can't outcompete the slow scan's share of the queue over
        // the long run: capped at the fraction of the ignore window one full
        // scan pass actually takes.
        let multiplier = (self.full_scan_time_secs as f64 / IGNORE_AFTER_DEFRAG_DELAY_SECS as f64).min(1.0);
        let queued = self.files_state.update_files(records, Instant::now(), Some(multiplier));
        debug!("write consolidation: batch of {} paths, {queued} newly queued", paths.len());
    }
}
