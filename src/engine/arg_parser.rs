use clap::Parser;
use std::path::PathBuf;

/// Opportunistic online defragmentation daemon for Btrfs on rotating disks.
#[derive(Clone, Parser)]
#[command(name = "defragd")]
#[command(about = "Schedule online defragmentation of fragmented files on Btrfs, bounded by a fraction of device time.")]
pub struct Cli {
    /// Verbose output. Default: false.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Debug-level logging (implies --verbose). Default: false.
    #[arg(long)]
    pub debug: bool,

    /// Target wall-clock duration, in seconds, for one full slow-scan pass.
    #[arg(long, default_value_t = crate::utils::config::SLOW_SCAN_PERIOD_SECS_DEFAULT)]
    pub full_scan_time: u64,

    /// Target extent size (bytes) passed to the external defrag command.
    #[arg(long, default_value_t = 32 * 1024 * 1024)]
    pub target_extent_size: u64,

    /// Overall scheduling aggressiveness; scales usage-policy windows and
    /// slow-scan pacing. 1.0 is the conservative default.
    #[arg(long, default_value_t = 1.0)]
    pub speed_multiplier: f64,

    /// Number of physical drives backing the filesystem.
    #[arg(long, default_value_t = 1.0)]
    pub drive_count: f64,

    /// Pace the slow scan from the very first pass instead of assuming an
    /// empty achievement history. Default: false.
    #[arg(long)]
    pub slow_start: bool,

    /// Directory for persisted state (filecounts/costs/recent).
    #[arg(long)]
    pub store_dir: Option<PathBuf>,
}
