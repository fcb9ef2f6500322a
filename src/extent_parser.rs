//! Extent-map parser (C2). Consumes the textual output of one batched extent-listing
//! invocation (e.g. `filefrag -v path1 path2 ...`) and emits a [`FragRecord`] per
//! file. This is the *only* module that understands that tool's textual format;
//! everything that invokes the binary (`external::filefrag`) hands its stdout
//! straight to [`parse_extent_listing`].
//!
//! Recognized line shapes (spec.md 4.2):
//! - header: `File size of <path> is <size>[ (...)]`
//! - extent: an ext number, a logical range, a physical range, a length, and an
//!   optional comma-separated flag list (flags contain `encoded` for compressed
//!   extents)
//! - footer: `<path>: <n> extents found`
//!
//! Any other line is logged and the in-progress file is dropped (its accumulator
//! resets); parsing continues with the next header.

use crate::cost_model::DriveGeometry;
use crate::types::{CompressionClass, Extent, FragRecord};
use log::warn;
use std::path::PathBuf;

#[derive(Default)]
struct InProgress {
    path: PathBuf,
    size: u64,
    total_seek_time: f64,
    prev_physical_end: Option<u64>,
    compressed_blocks: u64,
    uncompressed_blocks: u64,
    started: bool,
}

/// Parse a batched extent-listing, returning the records it could make sense of
/// and a count of lines it could not (each already logged via [`log::warn`]).
pub fn parse_extent_listing(geo: &DriveGeometry, text: &str) -> (Vec<FragRecord>, usize) {
    let mut records = Vec::new();
    let mut errors = 0usize;
    let mut cur = InProgress::default();
    // Once a file's entry has been dropped (or before the very first header),
    // every line up to the next header is a remnant of that file, already
    // accounted for by the one error that dropped it -- skip them silently
    // instead of re-reporting each one.
    let mut any_header_seen = false;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with("Filesystem type is") {
            continue;
        }
        if let Some((path, size)) = parse_header(line) {
            any_header_seen = true;
            if cur.started {
                // A new header without a footer for the previous file: protocol error.
                warn!("extent listing: unterminated entry for {:?}", cur.path);
                errors += 1;
            }
            cur = InProgress {
                path,
                size,
                started: true,
                ..Default::default()
            };
            continue;
        }
        if !cur.started {
            // A header-like column banner ("ext: logical_offset: ..."), or a
            // remnant of a just-dropped entry; only genuinely unparseable
            // noise before the very first header counts as its own error.
            if line.starts_with("ext:") || any_header_seen {
                continue;
            }
            warn!("extent listing: unrecognized line before any header: {line:?}");
            errors += 1;
            continue;
        }
        if line.starts_with("ext:") {
            continue;
        }
        if let Some(n_extents) = parse_footer(line, &cur.path) {
            let _ = n_extents;
            let class = if cur.compressed_blocks > cur.uncompressed_blocks {
                CompressionClass::Compressed
            } else {
                CompressionClass::Uncompressed
            };
            let cost = geo.fragmentation_cost(cur.size, cur.total_seek_time);
            records.push(FragRecord {
                short_path: cur.path.clone(),
                size: cur.size,
                compressed: class.is_compressed(),
                cost,
            });
            cur = InProgress::default();
            continue;
        }
        match parse_extent_line(line) {
            Some(extent) => {
                if let Some(prev_end) = cur.prev_physical_end {
                    cur.total_seek_time += geo.seek_time(prev_end, extent.physical_start_block);
                }
                cur.prev_physical_end = Some(extent.physical_start_block + extent.len_blocks);
                if extent.encoded {
                    cur.compressed_blocks += extent.len_blocks;
                } else {
                    cur.uncompressed_blocks += extent.len_blocks;
                }
            }
            None => {
                warn!("extent listing: unrecognized line: {line:?}");
                errors += 1;
                // Reset and continue with the next file, per spec.md 4.2.
                cur = InProgress::default();
            }
        }
    }

    if cur.started {
        warn!("extent listing: truncated output, dropping entry for {:?}", cur.path);
        errors += 1;
    }

    (records, errors)
}

/// `File size of <path> is <size>[ (...)]` -> (path, size_bytes).
fn parse_header(line: &str) -> Option<(PathBuf, u64)> {
    let rest = line.strip_prefix("File size of ")?;
    let (path_part, after) = rest.split_once(" is ")?;
    let size_token = after.split_whitespace().next()?;
    let size: u64 = size_token.trim_end_matches(',').parse().ok()?;
    Some((PathBuf::from(path_part.trim()), size))
}

/// `<path>: <n> extent(s) found` -> n. The tool prints the singular "1 extent
/// found" for exactly one extent and "<n> extents found" otherwise. Returns
/// None if this line isn't that footer (regardless of whether the path prefix
/// matches; a path mismatch is tolerated since some tool versions print a bare
/// basename).
fn parse_footer(line: &str, _path: &std::path::Path) -> Option<u64> {
    let rest = line
        .strip_suffix(" extents found")
        .or_else(|| line.strip_suffix(" extent found"))?;
    let (_prefix, n) = rest.rsplit_once(' ')?;
    n.trim_end_matches(':').parse().ok()
}

/// One data row of the extent table: an ext number, a logical range, a physical
/// range, a length (in 4 KiB blocks), and an optional flags column.
fn parse_extent_line(line: &str) -> Option<Extent> {
    let fields: Vec<&str> = line.split(':').map(str::trim).collect();
    if fields.len() < 4 {
        return None;
    }
    // First field must be an extent index.
    fields[0].parse::<u64>().ok()?;

    let ranges: Vec<(u64, u64)> = fields
        .iter()
        .filter_map(|f| parse_range(f))
        .collect();
    let (logical_start, _logical_end) = *ranges.first()?;
    let (physical_start, _physical_end) = *ranges.get(1)?;

    // Length is the first purely-numeric field after the physical-range field.
    let physical_idx = fields.iter().position(|f| parse_range(f) == Some((physical_start, _physical_end)))?;
    let length: u64 = fields
        .iter()
        .skip(physical_idx + 1)
        .find_map(|f| f.parse::<u64>().ok())?;

    let flags_field = fields.last().copied().unwrap_or("");
    let encoded = flags_field.split(',').any(|f| f.trim() == "encoded");

    Some(Extent {
        logical_start,
        physical_start_block: physical_start,
        len_blocks: length,
        encoded,
    })
}

/// Parse `"  123..   456"` -> (123, 456).
fn parse_range(field: &str) -> Option<(u64, u64)> {
    let (a, b) = field.split_once("..")?;
    let a: u64 = a.trim().parse().ok()?;
    let b: u64 = b.trim().parse().ok()?;
    Some((a, b))
}
