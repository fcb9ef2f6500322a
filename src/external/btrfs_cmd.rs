//! Invocation of `btrfs filesystem defragment` and `btrfs subvolume list`.

use anyhow::{Context, Result};
use log::warn;
use std::path::Path;
use std::process::Command;

/// Run `binary filesystem defragment [-c] [-t target_extent_size] <path>`.
/// `compress` requests recompression during defrag (spec.md 4.5: compressed
/// files are re-defragmented with compression on, so the result stays
/// compressed). The tool's exit code is ignored (spec.md 4.5/6): a failed
/// defrag of one file is logged and the loop moves on, it never aborts the
/// caller.
pub fn defragment(binary: &str, path: &Path, compress: bool, target_extent_size: u64) -> Result<()> {
    let mut cmd = Command::new(binary);
    cmd.arg("filesystem").arg("defragment");
    if compress {
        cmd.arg("-c");
    }
    cmd.arg("-t").arg(target_extent_size.to_string());
    cmd.arg(path);

    let output = cmd.output().with_context(|| format!("spawn {binary} filesystem defragment"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("{binary} filesystem defragment {} exited non-zero: {stderr}", path.display());
    }
    Ok(())
}

/// Run `binary subvolume list -o <mount_point>`, returning the relative path
/// of each of its own read-write subvolumes (lines end in `path
/// <relative_path>`, per the tool's textual contract).
pub fn list_subvolumes(binary: &str, mount_point: &Path) -> Result<Vec<String>> {
    let output = Command::new(binary)
        .arg("subvolume")
        .arg("list")
        .arg("-o")
        .arg(mount_point)
        .output()
        .with_context(|| format!("spawn {binary} subvolume list"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("{binary} subvolume list {} exited non-zero: {stderr}", mount_point.display());
        return Ok(Vec::new());
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_subvolume_list(&stdout))
}

/// Extract the `path` field from each line of `btrfs subvolume list` output.
pub fn parse_subvolume_list(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.rsplit_once(" path ").map(|(_, p)| p.trim().to_string()))
        .collect()
}
