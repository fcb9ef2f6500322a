//! Tunable constants for the scheduling engine.
//! Mirrors the teacher's convention of keeping all tuning and thresholds in one place.

// ---- Queue (C3) ----

/// Total cap shared by the compressed + uncompressed queues.
pub const MAX_QUEUE_LENGTH: usize = 2000;
/// Each class may reserve up to half the total cap.
pub const MAX_QUEUE_LENGTH_PER_CLASS: usize = MAX_QUEUE_LENGTH / 2;
/// Floor on a class's target size during trimming, so neither class starves.
pub const MIN_CLASS_TARGET: usize = 2;

// ---- Type tracker (C3) ----

/// Total weight above which the type tracker ages its running weights multiplicatively.
pub const TYPE_TRACKER_MEMORY: f64 = 10_000.0;
/// Multiplicative aging factor applied once the memory constant is exceeded.
pub const TYPE_TRACKER_AGE_FACTOR: f64 = 0.5;

// ---- Cost-achievement history / thresholds (C3) ----

/// Max history entries retained per compression class.
pub const MAX_HISTORY_LEN: usize = 2000;
/// Weighted percentile (of size*recency-weighted final_cost) the threshold is derived from.
pub const COST_THRESHOLD_PERCENTILE: f64 = 50.0;
/// Safety multiplier applied to the percentile cost to get the admission threshold.
pub const MIN_EXPECTED_BENEFIT: f64 = 1.05;
/// Minimum interval between threshold recomputation.
pub const COST_COMPUTE_DELAY_SECS: u64 = 60;

/// Cold-start seed size (bytes) used to synthesize the two bootstrap history entries.
pub const COLD_START_SEED_SIZE: u64 = 1_000_000;
/// Cold-start seed final cost, compressed class.
pub const COLD_START_SEED_COST_COMPRESSED: f64 = 2.65;
/// Cold-start seed final cost, uncompressed class.
pub const COLD_START_SEED_COST_UNCOMPRESSED: f64 = 1.02;

// ---- Write tracker (C3) ----

/// Consolidation sweep period.
pub const TRACKED_WRITTEN_FILES_CONSOLIDATION_PERIOD_SECS: u64 = 5;
/// Upper bound on how long a write record may sit untouched before forced consolidation.
pub const MAX_WRITES_DELAY_SECS: u64 = 2 * 3600;
/// Modulus (seconds) used to spread bursts of simultaneous writers across the sweep.
pub const DEFRAG_CHECK_DISTRIBUTION_PERIOD_SECS: u64 = 120;
/// Write-tracker capacity; oldest `last_write` entries are evicted beyond this.
pub const MAX_TRACKED_WRITTEN_FILES: usize = 10_000;

// ---- Recently-defragmented set (C3) ----

/// log2 of the number of entries in the fixed bit array.
pub const RECENT_SET_LOG2_ENTRIES: u32 = 18;
/// Bits dedicated to each entry's decay level.
pub const RECENT_SET_BITS_PER_ENTRY: u32 = 4;
/// Window after which an unrefreshed entry has fully decayed.
pub const IGNORE_AFTER_DEFRAG_DELAY_SECS: u64 = 12 * 3600;
/// Number of decay ticks spanning the ignore window (`IGNORE_AFTER_DEFRAG_DELAY / 15`).
pub const RECENT_SET_TICKS: u64 = 15;

// ---- Usage policy (C4) ----

/// (window_secs, fraction_of_window_allowed) pairs, before speed-multiplier scaling.
pub const USAGE_WINDOWS: &[(u64, f64)] = &[(5, 0.5), (60, 0.25)];

// ---- Slow scan (C5) ----

/// Default full-traversal target, in seconds (7 days).
pub const SLOW_SCAN_PERIOD_SECS_DEFAULT: u64 = 7 * 24 * 3600;
/// Sleep before resuming a checkpointed scan on first pass after restart.
pub const SLOW_SCAN_CATCHUP_WAIT_SECS: u64 = 600;
/// Files below this size are never worth defragmenting.
pub const MIN_DEFRAG_FILE_SIZE: u64 = 4096;
/// Initial / minimum batch size for a filefrag invocation during slow scan.
pub const MIN_FILES_BATCH_SIZE: usize = 50;
/// Growth factor applied to the adaptive batch size when the scan falls behind schedule.
pub const BATCH_GROWTH_FACTOR: f64 = 1.10;
/// Upper bound on adaptive batch size, before the speed multiplier.
pub const MAX_FILES_BATCH_SIZE_BASE: usize = 250;
/// Floor on the inter-batch sleep, before the speed multiplier divides it in.
pub const MIN_DELAY_BETWEEN_FILEFRAGS_SECS_BASE: f64 = 5.0;
/// Ceiling on the inter-batch sleep.
pub const MAX_DELAY_BETWEEN_FILEFRAGS_SECS: f64 = 180.0;
/// Checkpoint is persisted when processed count regresses or advances by more than this fraction.
pub const CHECKPOINT_ADVANCE_FRACTION: f64 = 0.01;
/// Default mount `commit=` delay (seconds) when the mount table doesn't specify one.
pub const DEFAULT_COMMIT_DELAY_SECS: u64 = 30;
/// Blacklist file name (relative to a directory) that prunes that subtree from the slow scan.
pub const NO_DEFRAG_BLACKLIST_NAME: &str = ".no_defrag";

// ---- Defrag loop (C5) ----

pub const MIN_DELAY_BETWEEN_DEFRAGS_SECS: f64 = 0.1;
pub const MAX_DELAY_BETWEEN_DEFRAGS_SECS: f64 = 10.0;

// ---- Post-defrag stat loop (C5) ----

pub const STAT_LOOP_POLL_SECS: u64 = 5;
/// A record settles if this many seconds pass with no further cost improvement, after at least one.
pub const STAT_SETTLE_STALL_SECS: u64 = 6;
/// A record settles unconditionally after this many seconds since queueing.
pub const STAT_SETTLE_MAX_AGE_SECS: u64 = 35;

// ---- Supervisor ----

pub const FS_DETECT_PERIOD_SECS: u64 = 60;
/// Fatrace subprocess is restarted (proactively) every this many seconds.
pub const FATRACE_TTL_SECS: u64 = 24 * 3600;
/// Sleep before restarting the fatrace subprocess after it dies unexpectedly.
pub const FATRACE_RESTART_BACKOFF_SECS: u64 = 60;

// ---- External interface ----

/// Default max argv byte length for a single filefrag invocation (platform limit minus headroom).
pub const FILEFRAG_ARG_MAX_DEFAULT: usize = 131072 - 100 - 4096;

// ---- Persistent state ----

/// Default directory for persisted state files.
pub const DEFAULT_STORE_DIR: &str = "/root/.btrfs_defrag";
pub const FILECOUNTS_KEY: &str = "filecounts";
pub const COSTS_KEY: &str = "costs";
pub const RECENT_KEY: &str = "recent";
