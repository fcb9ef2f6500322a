//! Streaming ingestion of `fatrace` output: one line per filesystem event,
//! of which the daemon only cares about writes/closes-after-write under a
//! watched filesystem root.
//!
//! fatrace line shape: `<comm>(<pid>): <types> <path>`, where `<types>` is a
//! combination of letters (`W` write, `O` open, `C` close, `R` read, `D`
//! delete, ...). A trailing ` -> <path>` on rename events is ignored; renames
//! aren't write events.

use anyhow::{Context, Result};
use log::warn;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// The daemon's own binary name, so its own defrag writes never get read
/// back as fresh fragmentation activity (spec.md 6: fatrace lines whose
/// process name is our own defrag tool are filtered out).
const OWN_PROCESS_NAME: &str = "defragd";

pub struct FatraceProcess {
    child: Child,
}

impl FatraceProcess {
    /// Spawn `binary` with stdout piped, ready for [`FatraceProcess::reader`].
    pub fn spawn(binary: &str) -> Result<Self> {
        let child = Command::new(binary)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn {binary}"))?;
        Ok(Self { child })
    }

    /// A line reader over the child's stdout; call [`parse_line`] on each line.
    pub fn reader(&mut self) -> Result<BufReader<std::process::ChildStdout>> {
        let stdout = self.child.stdout.take().context("fatrace child has no stdout")?;
        Ok(BufReader::new(stdout))
    }

    pub fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for FatraceProcess {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Read every available line from `reader`, returning write-relevant paths
/// (an empty vec on a clean EOF, which callers treat as "the process exited,
/// restart it").
pub fn drain_write_events(reader: &mut impl BufRead) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                if let Some(path) = parse_write_line(line.trim_end()) {
                    paths.push(path);
                }
            }
            Err(e) => {
                warn!("fatrace: read error: {e}");
                break;
            }
        }
    }
    paths
}

/// Parse one fatrace line, returning the path if its event types include a
/// write (`W`) or a close-after-write (`C` alone is ambiguous and ignored;
/// only `W` is treated as a definite write, matching spec.md 4.1 "fatrace
/// event filtering"), and the writer isn't our own process (spec.md 6).
fn parse_write_line(line: &str) -> Option<PathBuf> {
    let (comm_pid, rest) = line.split_once(": ")?;
    if comm(comm_pid) == OWN_PROCESS_NAME {
        return None;
    }
    let (types, path_part) = rest.split_once(' ')?;
    if !types.contains('W') {
        return None;
    }
    let path_part = path_part.split(" -> ").next().unwrap_or(path_part);
    Some(PathBuf::from(path_part.trim()))
}

/// Extract the process name from a fatrace `comm(pid)` prefix.
fn comm(comm_pid: &str) -> &str {
    comm_pid.split('(').next().unwrap_or(comm_pid)
}

/// Whether `path` lives under `root` -- events outside the watched filesystem
/// are discarded before they ever reach the write tracker.
pub fn under_root(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}
