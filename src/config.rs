//! `AppConfig`: the daemon's immutable, process-wide configuration, built once
//! from CLI flags in `main.rs` and handed to every component as `&AppConfig`
//! (or inside an `Arc` where a component outlives the constructing scope).
//! No global state lives outside of this struct.

use crate::cost_model::DriveGeometry;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Overall scheduling aggressiveness: scales usage-policy windows and
    /// slow-scan batch pacing. 1.0 is the conservative default.
    pub speed_multiplier: f64,
    /// Number of physical drives backing the filesystem (striped/mirrored
    /// setups get proportionally higher transfer rate in the cost model).
    pub drive_count: f64,
    /// Target wall-clock time for one full slow-scan pass, in seconds.
    pub full_scan_time_secs: u64,
    /// Target extent size passed to the external defrag command.
    pub target_extent_size: u64,
    /// If set, the slow scan starts paced from the very first pass instead of
    /// racing through an assumed-empty cost-achievement history.
    pub slow_start: bool,
    /// Root directory for persisted state (filecounts/costs/recent).
    pub store_dir: PathBuf,
    pub verbose: bool,
    pub debug: bool,
}

impl AppConfig {
    /// The drive geometry implied by `drive_count`, built once and shared by
    /// reference everywhere the cost model is consulted.
    pub fn drive_geometry(&self) -> DriveGeometry {
        DriveGeometry::new(self.drive_count)
    }
}
