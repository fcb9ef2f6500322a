//! Slow scan: a paced, checkpointed full traversal of the filesystem that
//! feeds batches of paths through `filefrag` and into `FilesState`. Runs
//! slowly on purpose -- `full_scan_time` spreads the traversal over days so
//! it never competes meaningfully with the host workload for device time.

use crate::external::filefrag;
use crate::files_state::FilesState;
use crate::orchestrator::mount_options::MountOptions;
use crate::persist::{FileStore, KvStore};
use crate::utils::config::{
    BATCH_GROWTH_FACTOR, MAX_FILES_BATCH_SIZE_BASE, MAX_DELAY_BETWEEN_FILEFRAGS_SECS,
    MIN_DEFRAG_FILE_SIZE, MIN_DELAY_BETWEEN_FILEFRAGS_SECS_BASE, MIN_FILES_BATCH_SIZE,
    NO_DEFRAG_BLACKLIST_NAME, SLOW_SCAN_CATCHUP_WAIT_SECS,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

const CHECKPOINT_KEY: &str = "scan_checkpoint";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Checkpoint {
    /// Last short path fully processed, in sorted-walk order. `None` means
    /// "start from the top" -- either first run, or the previous pass
    /// finished.
    resume_after: Option<PathBuf>,
    pass_started: Option<SystemTime>,
}

/// Decide whether `path` should be skipped by the slow scan, given its
/// metadata and current recency state. Pure so it's directly unit-testable.
pub fn should_skip(
    size: u64,
    is_file: bool,
    mtime: SystemTime,
    now: SystemTime,
    commit_delay_secs: u64,
    recently_defragmented: bool,
) -> bool {
    if !is_file {
        return true;
    }
    if size <= MIN_DEFRAG_FILE_SIZE {
        return true;
    }
    if recently_defragmented {
        return true;
    }
    let settle = Duration::from_secs(commit_delay_secs + 5);
    match now.duration_since(mtime) {
        Ok(age) if age < settle => true,
        _ => false,
    }
}

/// Grow the batch size when the scan is behind its pace target, otherwise hold
/// steady; always clamped to `[MIN_FILES_BATCH_SIZE, MAX_FILES_BATCH_SIZE_BASE *
/// speed_multiplier]`.
pub fn next_batch_size(current: usize, behind_schedule: bool, speed_multiplier: f64) -> usize {
    let max = ((MAX_FILES_BATCH_SIZE_BASE as f64) * speed_multiplier).round() as usize;
    let max = max.max(MIN_FILES_BATCH_SIZE);
    let grown = if behind_schedule {
        ((current as f64) * BATCH_GROWTH_FACTOR).round() as usize
    } else {
        current
    };
    grown.clamp(MIN_FILES_BATCH_SIZE, max)
}

/// Inter-batch sleep, clamped and scaled by `speed_multiplier` (a faster
/// multiplier shortens the floor, never the ceiling).
pub fn inter_batch_sleep_secs(speed_multiplier: f64) -> f64 {
    let floor = MIN_DELAY_BETWEEN_FILEFRAGS_SECS_BASE / speed_multiplier.max(0.01);
    floor.clamp(0.0, MAX_DELAY_BETWEEN_FILEFRAGS_SECS)
}

pub struct SlowScan {
    root: PathBuf,
    files_state: Arc<FilesState>,
    store: Arc<FileStore>,
    geometry: crate::cost_model::DriveGeometry,
    filefrag_binary: String,
    speed_multiplier: f64,
    full_scan_time_secs: u64,
    stop: Arc<AtomicBool>,
}

impl SlowScan {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        root: PathBuf,
        files_state: Arc<FilesState>,
        store: Arc<FileStore>,
        geometry: crate::cost_model::DriveGeometry,
        filefrag_binary: String,
        speed_multiplier: f64,
        full_scan_time_secs: u64,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            root,
            files_state,
            store,
            geometry,
            filefrag_binary,
            speed_multiplier,
            full_scan_time_secs,
            stop,
        }
    }

    fn load_checkpoint(&self) -> Checkpoint {
        self.store.load(CHECKPOINT_KEY).unwrap_or_default()
    }

    fn save_checkpoint(&self, checkpoint: &Checkpoint) {
        if let Err(e) = self.store.save(CHECKPOINT_KEY, checkpoint) {
            warn!("slow scan: failed to persist checkpoint: {e}");
        }
    }

    /// Run one full pass, honoring a resume checkpoint; blocks until the pass
    /// completes or `stop` is set. Intended to be called in a loop by the
    /// owning thread so a completed pass immediately starts the next one.
    pub fn run_pass(&self, mount_options: MountOptions) {
        let mut checkpoint = self.load_checkpoint();
        let resume_after = checkpoint.resume_after.take();
        if resume_after.is_some() {
            info!("slow scan: resuming {} after {:?}", self.root.display(), resume_after);
            std::thread::sleep(Duration::from_secs(SLOW_SCAN_CATCHUP_WAIT_SECS.min(1)));
        }
        checkpoint.pass_started.get_or_insert(SystemTime::now());

        let mut batch: Vec<PathBuf> = Vec::new();
        let mut batch_size = MIN_FILES_BATCH_SIZE;
        let mut skipping = resume_after.is_some();
        let resume_marker = resume_after.clone();

        let walker = WalkDir::new(&self.root).sort_by_file_name().into_iter().filter_entry(|entry| {
            if entry.file_type().is_dir() {
                let blacklist = entry.path().join(NO_DEFRAG_BLACKLIST_NAME);
                if blacklist.exists() {
                    debug!("slow scan: pruning {} ({NO_DEFRAG_BLACKLIST_NAME} present)", entry.path().display());
                    return false;
                }
            }
            true
        });

        for entry in walker {
            if self.stop.load(Ordering::Relaxed) {
                return;
            }
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("slow scan: walk error: {e}");
                    continue;
                }
            };
            let path = entry.path().to_path_buf();

            if skipping {
                if Some(&path) == resume_marker.as_ref() {
                    skipping = false;
                }
                continue;
            }

            let Ok(meta) = entry.metadata() else { continue };
            let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let recent = crate::types::short_path(&path, &self.root)
                .map(|sp| self.files_state.recently_defragmented(&sp))
                .unwrap_or(false);
            if should_skip(meta.len(), meta.is_file(), mtime, SystemTime::now(), mount_options.commit_delay_secs, recent) {
                continue;
            }

            batch.push(path);
            if batch.len() >= batch_size {
                self.flush_batch(&mut batch, &mut checkpoint);
                // Behind schedule if this pass has already run longer than its
                // target duration and still isn't done; catch up by batching
                // more paths per filefrag invocation.
                let behind = checkpoint
                    .pass_started
                    .and_then(|started| SystemTime::now().duration_since(started).ok())
                    .is_some_and(|elapsed| elapsed.as_secs() > self.full_scan_time_secs);
                batch_size = next_batch_size(batch_size, behind, self.speed_multiplier);
                std::thread::sleep(Duration::from_secs_f64(inter_batch_sleep_secs(self.speed_multiplier)));
            }
        }
        if !batch.is_empty() {
            self.flush_batch(&mut batch, &mut checkpoint);
        }

        checkpoint.resume_after = None;
        checkpoint.pass_started = None;
        self.save_checkpoint(&checkpoint);
    }

    fn flush_batch(&self, batch: &mut Vec<PathBuf>, checkpoint: &mut Checkpoint) {
        let refs: Vec<&Path> = batch.iter().map(|p| p.as_path()).collect();
        let output = filefrag::run_all(&self.filefrag_binary, &refs);
        let (mut records, errors) = crate::extent_parser::parse_extent_listing(&self.geometry, &output);
        if errors > 0 {
            warn!("slow scan: {errors} unparseable lines in this batch");
        }
        for record in &mut records {
            if let Some(sp) = crate::types::short_path(&record.short_path, &self.root) {
                record.short_path = sp;
            }
        }
        let queued = self.files_state.update_files(records, std::time::Instant::now(), None);
        debug!("slow scan: batch of {} paths, {queued} newly queued", batch.len());

        checkpoint.resume_after = batch.last().cloned();
        self.save_checkpoint(checkpoint);
        batch.clear();
    }
}
