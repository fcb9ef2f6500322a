//! Mount-table enumeration, for discovering which mounted filesystems are
//! Btrfs and worth running an orchestrator against.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: PathBuf,
    pub fs_type: String,
    pub options: Vec<String>,
}

/// Parse `/proc/mounts`-shaped text (device, mount point, fs type, options,
/// two trailing dump/pass integers, space separated, one mount per line).
pub fn parse_mounts(text: &str) -> Vec<MountEntry> {
    let mut entries = Vec::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            continue;
        }
        entries.push(MountEntry {
            device: fields[0].to_string(),
            mount_point: PathBuf::from(fields[1]),
            fs_type: fields[2].to_string(),
            options: fields[3].split(',').map(str::to_string).collect(),
        });
    }
    entries
}

/// Read and parse `path` (normally `/proc/mounts`).
pub fn read_mounts(path: &str) -> Result<Vec<MountEntry>> {
    let text = fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    Ok(parse_mounts(&text))
}

/// Only the Btrfs entries, deduplicated by mount point. A mount point can be
/// stacked on (e.g. a later bind mount shadowing an earlier one); the table
/// lists mounts oldest-first, so reading it in reverse and keeping the first
/// occurrence per mount point keeps the currently-active mount, not a stale
/// one underneath it.
pub fn btrfs_mounts(entries: &[MountEntry]) -> Vec<MountEntry> {
    let mut seen = std::collections::HashSet::new();
    let mut current: Vec<MountEntry> = entries
        .iter()
        .rev()
        .filter(|e| e.fs_type == "btrfs")
        .filter(|e| seen.insert(e.mount_point.clone()))
        .cloned()
        .collect();
    current.reverse();
    current
}
