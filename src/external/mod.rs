//! Thin wrappers around the external binaries the daemon shells out to:
//! `filefrag` (extent listings), `fatrace` (live write events), `btrfs`
//! (the defrag command itself), and `/proc/mounts` (mount table). Each
//! takes the binary name/path as a parameter rather than hardcoding it, so
//! tests can point at a fake script instead of the real tool.

pub mod btrfs_cmd;
pub mod fatrace;
pub mod filefrag;
pub mod mount_table;
