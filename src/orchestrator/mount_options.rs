//! Per-mount option lookup: whether the mount uses compression, and its
//! `commit=` interval, both re-derived whenever the Supervisor notices the
//! mount table has changed.

use crate::external::mount_table::MountEntry;
use crate::utils::config::DEFAULT_COMMIT_DELAY_SECS;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MountOptions {
    pub compress: bool,
    pub compress_force: bool,
    pub commit_delay_secs: u64,
}

impl MountOptions {
    /// Derive options from a mount entry's comma-separated option list.
    pub fn from_entry(entry: &MountEntry) -> Self {
        let mut compress = false;
        let mut compress_force = false;
        let mut commit_delay_secs = DEFAULT_COMMIT_DELAY_SECS;

        for opt in &entry.options {
            if opt.starts_with("compress-force=") || opt == "compress-force" {
                compress_force = true;
                compress = true;
            } else if opt.starts_with("compress=") || opt == "compress" {
                compress = true;
            } else if let Some(value) = opt.strip_prefix("commit=") {
                if let Ok(secs) = value.parse() {
                    commit_delay_secs = secs;
                }
            }
        }

        Self {
            compress,
            compress_force,
            commit_delay_secs,
        }
    }
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            compress: false,
            compress_force: false,
            commit_delay_secs: DEFAULT_COMMIT_DELAY_SECS,
        }
    }
}
