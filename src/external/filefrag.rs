//! Batched invocation of the extent-listing tool (`filefrag -v`). Splits a
//! large path list into batches that stay under the kernel's argv size limit,
//! and hands each batch's combined stdout to [`crate::extent_parser`].

use crate::utils::config::FILEFRAG_ARG_MAX_DEFAULT;
use anyhow::{Context, Result, bail};
use log::warn;
use std::path::Path;
use std::process::Command;

/// Split `paths` into batches whose combined byte length (plus a per-arg
/// separator) stays under `arg_max`, so a single invocation never exceeds the
/// kernel's `ARG_MAX`.
pub fn batch_paths<'a>(paths: &'a [&'a Path], arg_max: usize) -> Vec<Vec<&'a Path>> {
    let mut batches = Vec::new();
    let mut current: Vec<&Path> = Vec::new();
    let mut current_len = 0usize;

    for &path in paths {
        let len = path.as_os_str().len() + 1;
        if !current.is_empty() && current_len + len > arg_max {
            batches.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push(path);
        current_len += len;
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Run `binary -v <paths...>` for one batch and return its stdout. A nonzero
/// exit status is tolerated (filefrag exits nonzero if *any* listed path
/// failed, but still prints output for the paths that succeeded) as long as
/// stdout isn't empty; a fully failed invocation is an error.
pub fn run_batch(binary: &str, paths: &[&Path]) -> Result<String> {
    if paths.is_empty() {
        return Ok(String::new());
    }
    let output = Command::new(binary)
        .arg("-v")
        .args(paths)
        .output()
        .with_context(|| format!("spawn {binary}"))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() && stdout.trim().is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{binary} failed with no output: {stderr}");
    }
    if !output.status.success() {
        warn!("{binary} exited non-zero but produced output; some paths in this batch may be missing");
    }
    Ok(stdout)
}

/// Run `binary -v` over `paths`, batching to respect [`FILEFRAG_ARG_MAX_DEFAULT`],
/// and return the concatenated stdout of every batch that didn't fail outright.
pub fn run_all(binary: &str, paths: &[&Path]) -> String {
    let mut combined = String::new();
    for batch in batch_paths(paths, FILEFRAG_ARG_MAX_DEFAULT) {
        match run_batch(binary, &batch) {
            Ok(out) => combined.push_str(&out),
            Err(e) => warn!("{binary} batch of {} paths failed: {e}", batch.len()),
        }
    }
    combined
}
