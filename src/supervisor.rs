//! Supervisor: the top-level lifecycle manager. Owns the single
//! fatrace-ingest thread and the mount-detection loop, starting and stopping
//! a [`PerFsOrchestrator`] as qualifying Btrfs mounts appear and disappear.

use crate::config::AppConfig;
use crate::external::mount_table::MountEntry;
use crate::external::{btrfs_cmd, fatrace, mount_table};
use crate::orchestrator::PerFsOrchestrator;
use crate::orchestrator::mount_options::MountOptions;
use anyhow::Result;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

const MOUNTS_PATH: &str = "/proc/mounts";
const FATRACE_BINARY: &str = "fatrace";
const BTRFS_BINARY: &str = "btrfs";

/// A managed mount must not already run the kernel's own `autodefrag` and
/// must be a "top volume": every one of its subvolumes is itself a
/// mountpoint, so a nested subvolume of an already-managed filesystem is
/// never double-managed under its own mount (spec.md 4.6).
fn is_top_volume(entry: &MountEntry, all_mount_points: &HashSet<PathBuf>) -> bool {
    if entry.options.iter().any(|o| o == "autodefrag") {
        return false;
    }
    let subvolumes = match btrfs_cmd::list_subvolumes(BTRFS_BINARY, &entry.mount_point) {
        Ok(v) => v,
        Err(e) => {
            warn!("supervisor: subvolume list for {} failed: {e}", entry.mount_point.display());
            return false;
        }
    };
    subvolumes
        .iter()
        .all(|relative| all_mount_points.contains(&entry.mount_point.join(relative)))
}

/// Sanitize a mount point into a directory-name-safe component, so each
/// filesystem gets its own subdirectory under `AppConfig::store_dir`.
fn store_subdir(store_dir: &Path, mount_point: &Path) -> PathBuf {
    let safe: String = mount_point
        .to_string_lossy()
        .chars()
        .map(|c| if c == '/' { '_' } else { c })
        .collect();
    let safe = if safe.is_empty() { "_root".to_string() } else { safe };
    store_dir.join(safe)
}

pub struct Supervisor {
    config: Arc<AppConfig>,
    orchestrators: Mutex<HashMap<PathBuf, PerFsOrchestrator>>,
}

impl Supervisor {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            orchestrators: Mutex::new(HashMap::new()),
        }
    }

    /// Run forever: spawns the fatrace-ingest thread, then loops the
    /// mount-detection sweep at `FS_DETECT_PERIOD_SECS`, never returning in
    /// normal operation.
    pub fn run(self: Arc<Self>) -> Result<()> {
        let fatrace_handle = {
            let this = self.clone();
            std::thread::spawn(move || this.run_fatrace_ingest())
        };

        loop {
            if let Err(e) = self.detect_mounts() {
                warn!("supervisor: mount detection failed: {e}");
            }
            std::thread::sleep(Duration::from_secs(crate::utils::config::FS_DETECT_PERIOD_SECS));
            if fatrace_handle.is_finished() {
                warn!("supervisor: fatrace-ingest thread exited; restarting");
                let this = self.clone();
                std::thread::spawn(move || this.run_fatrace_ingest());
            }
        }
    }

    /// One mount-table sweep: start orchestrators for new Btrfs mounts, stop
    /// them for mounts that disappeared, and refresh mount options for
    /// survivors (a remount may have changed `compress=`/`commit=`).
    fn detect_mounts(&self) -> Result<()> {
        let entries = mount_table::read_mounts(MOUNTS_PATH)?;
        let btrfs = mount_table::btrfs_mounts(&entries);
        let all_mount_points: HashSet<PathBuf> = entries.iter().map(|e| e.mount_point.clone()).collect();
        let btrfs: Vec<MountEntry> = btrfs.into_iter().filter(|e| is_top_volume(e, &all_mount_points)).collect();
        let seen: HashSet<PathBuf> = btrfs.iter().map(|e| e.mount_point.clone()).collect();

        let mut orchestrators = self.orchestrators.lock().unwrap();

        // `stop()` consumes the orchestrator, so disappeared mounts are
        // removed and stopped in one pass rather than via `retain` (whose
        // closure only gets `&mut`).
        let gone: Vec<PathBuf> = orchestrators.keys().filter(|mp| !seen.contains(*mp)).cloned().collect();
        for mount_point in gone {
            info!("supervisor: {} no longer mounted, stopping orchestrator", mount_point.display());
            if let Some(orch) = orchestrators.remove(&mount_point) {
                orch.stop();
            }
        }

        for entry in &btrfs {
            let options = MountOptions::from_entry(entry);
            if let Some(_existing) = orchestrators.get(&entry.mount_point) {
                debug!("supervisor: {} still mounted", entry.mount_point.display());
                continue;
            }
            info!("supervisor: new btrfs mount {}, starting orchestrator", entry.mount_point.display());
            let store_dir = store_subdir(&self.config.store_dir, &entry.mount_point);
            match PerFsOrchestrator::start(entry.mount_point.clone(), store_dir, &self.config, options) {
                Ok(orch) => {
                    orchestrators.insert(entry.mount_point.clone(), orch);
                }
                Err(e) => warn!("supervisor: failed to start orchestrator for {}: {e}", entry.mount_point.display()),
            }
        }

        Ok(())
    }

    /// Routes write events from the single fatrace subprocess to the
    /// orchestrator whose root is the longest matching prefix of the
    /// written path. Restarts the subprocess on exit (proactively every
    /// `FATRACE_TTL_SECS`, reactively on failure).
    fn run_fatrace_ingest(&self) {
        loop {
            let mut process = match fatrace::FatraceProcess::spawn(FATRACE_BINARY) {
                Ok(p) => p,
                Err(e) => {
                    warn!("supervisor: failed to spawn fatrace: {e}");
                    std::thread::sleep(Duration::from_secs(crate::utils::config::FATRACE_RESTART_BACKOFF_SECS));
                    continue;
                }
            };
            let mut reader = match process.reader() {
                Ok(r) => r,
                Err(e) => {
                    warn!("supervisor: fatrace has no stdout: {e}");
                    std::thread::sleep(Duration::from_secs(crate::utils::config::FATRACE_RESTART_BACKOFF_SECS));
                    continue;
                }
            };

            let deadline = SystemTime::now() + Duration::from_secs(crate::utils::config::FATRACE_TTL_SECS);
            while SystemTime::now() < deadline {
                let paths = fatrace::drain_write_events(&mut reader);
                if paths.is_empty() {
                    std::thread::sleep(Duration::from_millis(200));
                    continue;
                }
                self.route_write_events(paths);
            }
            debug!("supervisor: recycling fatrace subprocess (TTL reached)");
            process.kill();
        }
    }

    fn route_write_events(&self, paths: Vec<PathBuf>) {
        let orchestrators = self.orchestrators.lock().unwrap();
        let now = SystemTime::now();
        for path in paths {
            let best = orchestrators
                .keys()
                .filter(|root| path.starts_with(root.as_path()))
                .max_by_key(|root| root.as_os_str().len());
            let Some(root) = best else { continue };
            if let Some(short) = crate::types::short_path(&path, root) {
                orchestrators[root].files_state.file_written_to(short, now);
            }
        }
    }
}
