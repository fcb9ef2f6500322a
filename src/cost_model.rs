//! Pure fragmentation cost model (C1). Nominal 7200 RPM rotational geometry.
//!
//! Every function here is pure: given the same inputs it returns the same output,
//! with no I/O and no shared state, so it is unit-testable in isolation (spec
//! properties 6-7).

use crate::types::FragRecord;

/// Bytes per 4 KiB block, as reported by the extent-listing tool.
pub const BLOCK_SIZE_BYTES: u64 = 4096;
/// Btrfs compression extent block count: a backward seek within this many blocks
/// is treated as zero (overlapping adjacent extents in a compressed file).
pub const COMPRESSION_OVERLAP_BLOCKS: u64 = 32;
/// Ratio applied to defrag time estimates for compressed files.
pub const EXPECTED_COMPRESS_RATIO: f64 = 0.5;

/// Drive geometry derived once from the configured drive count, then shared
/// (by reference) across every cost computation.
#[derive(Clone, Copy, Debug)]
pub struct DriveGeometry {
    /// Bytes per track.
    pub track_size_bytes: f64,
    /// Seconds per revolution.
    pub revolution_secs: f64,
    /// Track-to-track minimum seek, seconds.
    pub min_seek_secs: f64,
    /// Whole-disk maximum seek, seconds.
    pub max_seek_secs: f64,
    /// Average seek, seconds (midpoint of min/max).
    pub avg_seek_secs: f64,
    /// Bytes/sec, scaled linearly by drive count.
    pub transfer_rate_bytes_per_sec: f64,
    /// Total track count assumed for a whole-disk seek; a geometry constant that,
    /// combined with drive_count, sets the denominator of the long-seek formula.
    pub total_track_count: f64,
    pub drive_count: f64,
}

impl DriveGeometry {
    const TRACK_SIZE_BYTES: f64 = 1.25 * 1024.0 * 1024.0;
    const REVOLUTION_SECS: f64 = 1.0 / 120.0;
    const MIN_SEEK_SECS: f64 = 0.002;
    const MAX_SEEK_SECS: f64 = 0.016;
    /// Nominal whole-disk track count for a 7200 RPM drive of typical capacity.
    const TOTAL_TRACK_COUNT: f64 = 200_000.0;

    pub fn new(drive_count: f64) -> Self {
        let drive_count = if drive_count >= 1.0 { drive_count } else { 1.0 };
        Self {
            track_size_bytes: Self::TRACK_SIZE_BYTES,
            revolution_secs: Self::REVOLUTION_SECS,
            min_seek_secs: Self::MIN_SEEK_SECS,
            max_seek_secs: Self::MAX_SEEK_SECS,
            avg_seek_secs: (Self::MIN_SEEK_SECS + Self::MAX_SEEK_SECS) / 2.0,
            transfer_rate_bytes_per_sec: Self::TRACK_SIZE_BYTES / Self::REVOLUTION_SECS * drive_count,
            total_track_count: Self::TOTAL_TRACK_COUNT,
            drive_count,
        }
    }

    /// Seconds to seek from one physical block to another.
    ///
    /// A backward seek within `COMPRESSION_OVERLAP_BLOCKS` is treated as zero (the
    /// extent listing may report overlapping adjacent extents for compressed
    /// files). A seek shorter than one track flies over data on the same track,
    /// scaled linearly within the revolution. Anything further uses the
    /// min/max-seek interpolation scaled by total disk size.
    pub fn seek_time(&self, from_block: u64, to_block: u64) -> f64 {
        if to_block < from_block && (from_block - to_block) <= COMPRESSION_OVERLAP_BLOCKS {
            return 0.0;
        }
        let block_delta = from_block.abs_diff(to_block);
        let distance_bytes = block_delta as f64 * BLOCK_SIZE_BYTES as f64;

        if distance_bytes < self.track_size_bytes {
            return self.revolution_secs * (distance_bytes / self.track_size_bytes);
        }

        let denom = self.total_track_count * self.track_size_bytes * self.drive_count;
        self.min_seek_secs + (self.max_seek_secs - self.min_seek_secs) * (distance_bytes / denom)
    }

    /// Dimensionless fragmentation cost, >= 1.0. 1.0 for a zero-seek (perfectly
    /// sequential) file regardless of size.
    pub fn fragmentation_cost(&self, size: u64, total_seek_time: f64) -> f64 {
        if size == 0 || total_seek_time <= 0.0 {
            return 1.0;
        }
        let sequential = self.avg_seek_secs + size as f64 / self.transfer_rate_bytes_per_sec;
        (sequential + total_seek_time) / sequential
    }

    /// Estimated wall-clock seconds to defragment `record`, given the class's
    /// current average-cost-achieved-after-defrag (from the history).
    pub fn defrag_time(&self, record: &FragRecord, average_achieved_cost: f64) -> f64 {
        let transfer_secs = record.size as f64 / self.transfer_rate_bytes_per_sec;
        let read_time = transfer_secs * record.cost + self.avg_seek_secs;
        let write_time = (transfer_secs + self.avg_seek_secs) * average_achieved_cost;
        let total = read_time + write_time;
        if record.compressed {
            total * EXPECTED_COMPRESS_RATIO
        } else {
            total
        }
    }
}
