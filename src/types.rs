//! Core data types shared across the scheduling engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Which priority queue / history bucket a file belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionClass {
    Compressed,
    Uncompressed,
}

impl CompressionClass {
    pub fn of(compressed: bool) -> Self {
        if compressed {
            CompressionClass::Compressed
        } else {
            CompressionClass::Uncompressed
        }
    }

    pub fn is_compressed(self) -> bool {
        matches!(self, CompressionClass::Compressed)
    }

    pub const ALL: [CompressionClass; 2] = [CompressionClass::Compressed, CompressionClass::Uncompressed];
}

/// One file's fragmentation state, as produced by the extent-map parser.
///
/// Immutable once queued: a re-measurement produces a new `FragRecord` that
/// supersedes (by `short_path`) whatever was queued before, it is never mutated
/// in place.
#[derive(Clone, Debug, PartialEq)]
pub struct FragRecord {
    /// Path relative to the owning filesystem's root. Canonical identity key.
    pub short_path: PathBuf,
    pub size: u64,
    pub compressed: bool,
    /// Dimensionless fragmentation cost, >= 1.0.
    pub cost: f64,
}

impl FragRecord {
    pub fn class(&self) -> CompressionClass {
        CompressionClass::of(self.compressed)
    }
}

/// A single extent as reported by the extent-listing tool. Transient: lives only
/// inside the parser while it accumulates seek time for one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extent {
    pub logical_start: u64,
    pub physical_start_block: u64,
    pub len_blocks: u64,
    pub encoded: bool,
}

/// Per-path record of write activity, held by the write tracker until consolidated
/// into the queue or evicted under capacity pressure.
#[derive(Clone, Copy, Debug)]
pub struct WriteEvent {
    pub first_write: SystemTime,
    pub last_write: SystemTime,
}

impl WriteEvent {
    pub fn new(at: SystemTime) -> Self {
        Self {
            first_write: at,
            last_write: at,
        }
    }

    pub fn touch(&mut self, at: SystemTime) {
        self.last_write = at;
    }
}

/// One `(initial_cost, final_cost, size_bytes)` sample appended to a class's
/// cost-achievement history after a post-defrag re-measurement.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CostAchievement {
    pub initial_cost: f64,
    pub final_cost: f64,
    pub size_bytes: u64,
}

/// Normalize an absolute path to a short path relative to `root`. Returns `None`
/// if `path` is not under `root`.
pub fn short_path(path: &Path, root: &Path) -> Option<PathBuf> {
    path.strip_prefix(root).ok().map(|p| p.to_path_buf())
}
