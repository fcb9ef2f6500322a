//! Key/value persistence for daemon state (filecounts, costs, recent), under
//! `STORE_DIR`. Each key is one file; reads and read-modify-writes take an
//! advisory exclusive lock over the whole operation, and writes go through a
//! temp-file-then-rename so a partial write is never observable (the same
//! pattern the teacher uses for its index database in
//! `utils::tempfiles::prepare_index_work_path` / `rename_temp_to_final`).
//!
//! Modeled as a small capability interface (spec.md 9 "mixin-style shared
//! behavior") so `FilesState` and the slow-scan loop depend on [`KvStore`], not
//! on file-locking mechanics.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;

use crate::utils::flock::ExclusiveLock;

/// A keyed persister: load and save serializable values by key.
pub trait KvStore {
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T>;
    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()>;
}

/// JSON-backed `KvStore` rooted at a directory (spec.md `STORE_DIR`, default
/// `/root/.btrfs_defrag`).
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root).with_context(|| format!("create store dir {}", root.display()))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.tmp"))
    }
}

impl KvStore for FileStore {
    /// Load `key`, falling back to `None` (caller supplies the default) on any
    /// I/O, lock, or schema error -- each logged, never propagated (spec.md 7,
    /// Persistence errors).
    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("{}: open for read: {e}", path.display());
                return None;
            }
        };
        let _lock = match ExclusiveLock::acquire(&file) {
            Ok(l) => l,
            Err(e) => {
                log::warn!("{}: lock for read: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_reader(&file) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("{}: corrupt or mismatched schema, using defaults: {e}", path.display());
                None
            }
        }
    }

    /// Write `value` for `key`: lock a temp file, write it fully, then rename
    /// over the real path (atomic on the same filesystem), so a reader never
    /// observes a partial write.
    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path_for(key);
        let temp_path = self.temp_path_for(key);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("open temp state file {}", temp_path.display()))?;
        let _lock = ExclusiveLock::acquire(&file).context("lock temp state file")?;
        serde_json::to_writer_pretty(&file, value).context("serialize state")?;
        file.sync_all().ok();
        drop(_lock);
        fs::rename(&temp_path, &path)
            .with_context(|| format!("rename {} -> {}", temp_path.display(), path.display()))?;
        Ok(())
    }
}

/// Default store directory path, honoring `AppConfig::store_dir`.
pub fn default_store_dir() -> PathBuf {
    PathBuf::from(crate::utils::config::DEFAULT_STORE_DIR)
}
