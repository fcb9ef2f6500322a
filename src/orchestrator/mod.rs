//! Per-Filesystem Orchestrator (C5): owns one filesystem's `FilesState`,
//! `UsagePolicy`, and its five always-on worker threads (slow scan, write
//! consolidation, defrag, stat, recent-set decay). Live writes themselves are
//! ingested by the Supervisor's fatrace thread straight into `FilesState`;
//! the write-consolidation thread here is what drains and re-measures them.

pub mod defrag_loop;
pub mod mount_options;
pub mod slow_scan;
pub mod stat_loop;
pub mod write_consolidation;

use crate::config::AppConfig;
use crate::files_state::FilesState;
use crate::persist::FileStore;
use crate::usage_policy::UsagePolicy;
use crossbeam_channel::unbounded;
use defrag_loop::DefragLoop;
use mount_options::MountOptions;
use slow_scan::SlowScan;
use stat_loop::StatLoop;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use write_consolidation::WriteConsolidation;

const FILEFRAG_BINARY: &str = "filefrag";
const BTRFS_BINARY: &str = "btrfs";

/// One mounted Btrfs filesystem's scheduling state and worker threads.
pub struct PerFsOrchestrator {
    pub root: PathBuf,
    pub files_state: Arc<FilesState>,
    usage_policy: Arc<Mutex<UsagePolicy>>,
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl PerFsOrchestrator {
    /// Build the orchestrator's state and spawn its three worker threads.
    /// `store_dir` should already be unique to this filesystem (the
    /// Supervisor derives it from the mount point).
    pub fn start(root: PathBuf, store_dir: PathBuf, config: &AppConfig, mount_options: MountOptions) -> anyhow::Result<Self> {
        let store = Arc::new(FileStore::new(store_dir)?);
        let files_state = Arc::new(FilesState::new());
        let usage_policy = Arc::new(Mutex::new(UsagePolicy::new()));
        let geometry = config.drive_geometry();
        let stop = Arc::new(AtomicBool::new(false));
        let (stat_tx, stat_rx) = unbounded();

        let mut handles = Vec::new();

        {
            let root = root.clone();
            let files_state = files_state.clone();
            let store = store.clone();
            let stop = stop.clone();
            let speed_multiplier = config.speed_multiplier;
            let full_scan_time_secs = config.full_scan_time_secs;
            handles.push(std::thread::spawn(move || {
                let scan = SlowScan::new(
                    root,
                    files_state,
                    store,
                    geometry,
                    FILEFRAG_BINARY.to_string(),
                    speed_multiplier,
                    full_scan_time_secs,
                    stop.clone(),
                );
                while !stop.load(Ordering::Relaxed) {
                    scan.run_pass(mount_options);
                }
            }));
        }

        {
            let root = root.clone();
            let files_state = files_state.clone();
            let usage_policy = usage_policy.clone();
            let stop = stop.clone();
            let target_extent_size = config.target_extent_size;
            handles.push(std::thread::spawn(move || {
                let loop_ = DefragLoop::new(
                    root,
                    files_state,
                    usage_policy,
                    geometry,
                    BTRFS_BINARY.to_string(),
                    FILEFRAG_BINARY.to_string(),
                    target_extent_size,
                    stat_tx,
                    stop,
                );
                loop_.run(mount_options);
            }));
        }

        {
            let root = root.clone();
            let files_state = files_state.clone();
            let stop = stop.clone();
            handles.push(std::thread::spawn(move || {
                let loop_ = StatLoop::new(root, files_state, geometry, FILEFRAG_BINARY.to_string(), stat_rx, stop);
                loop_.run();
            }));
        }

        {
            let root = root.clone();
            let files_state = files_state.clone();
            let stop = stop.clone();
            let full_scan_time_secs = config.full_scan_time_secs;
            handles.push(std::thread::spawn(move || {
                let consolidation = WriteConsolidation::new(
                    root,
                    files_state,
                    geometry,
                    FILEFRAG_BINARY.to_string(),
                    full_scan_time_secs,
                    stop,
                );
                consolidation.run(mount_options);
            }));
        }

        {
            let files_state = files_state.clone();
            let stop = stop.clone();
            handles.push(std::thread::spawn(move || {
                let period = crate::files_state::tick_period_secs();
                while !stop.load(Ordering::Relaxed) {
                    std::thread::sleep(std::time::Duration::from_secs(period));
                    if stop.load(Ordering::Relaxed) {
                        return;
                    }
                    files_state.tick_recent_set();
                }
            }));
        }

        Ok(Self {
            root,
            files_state,
            usage_policy,
            stop,
            handles,
        })
    }

    /// Signal every worker thread to stop at its next checkpoint. Handles are
    /// abandoned, not joined (spec.md 5 Cancellation): an in-flight external
    /// defrag subprocess is not awaited.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.handles.clear();
    }

    pub fn usage_policy(&self) -> Arc<Mutex<UsagePolicy>> {
        self.usage_policy.clone()
    }
}
