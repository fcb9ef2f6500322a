//! Advisory exclusive file locking, used to guard read-modify-write of persisted state.
//! Direct `libc::flock`, in the same spirit as the teacher's direct use of `libc::getrlimit`
//! / `libc::geteuid` for OS facilities with no ambient crate in the retrieval pack.

use anyhow::{Context, Result};
use std::fs::File;
use std::os::unix::io::AsRawFd;

/// An exclusive advisory lock held for the lifetime of the guard. Released on drop.
pub struct ExclusiveLock<'a> {
    file: &'a File,
}

impl<'a> ExclusiveLock<'a> {
    /// Block until an exclusive advisory lock on `file` is acquired.
    pub fn acquire(file: &'a File) -> Result<Self> {
        let fd = file.as_raw_fd();
        let rc = unsafe { libc::flock(fd, libc::LOCK_EX) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error()).context("acquire exclusive flock");
        }
        Ok(Self { file })
    }
}

impl Drop for ExclusiveLock<'_> {
    fn drop(&mut self) {
        let fd = self.file.as_raw_fd();
        unsafe {
            libc::flock(fd, libc::LOCK_UN);
        }
    }
}
