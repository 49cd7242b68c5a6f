//! Advisory File Locking
//!
//! Cross-process mutual exclusion over a named lock file (`flock(2)` on
//! Linux, through `std::fs::File::lock`).
//! The lock is held for the lifetime of a [`FileLockGuard`] and released when
//! the guard is dropped, so every exit path (including `?` early returns and
//! panics that unwind) gives the lock back.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Lock mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many readers, no writer
    Shared,
    /// Single writer
    Exclusive,
}

/// Scoped advisory lock on a lock file
///
/// ## Examples
/// ```rust,no_run
/// use platform::file_lock::{FileLockGuard, LockMode};
///
/// let guard = FileLockGuard::acquire("/run/grid/sftp.lock", LockMode::Exclusive)?;
/// // critical section
/// drop(guard);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct FileLockGuard {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl FileLockGuard {
    /// Block until the lock is granted
    ///
    /// The lock file is created if missing; it never holds any data.
    pub fn acquire(path: impl AsRef<Path>, mode: LockMode) -> io::Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;

        match mode {
            LockMode::Shared => file.lock_shared()?,
            LockMode::Exclusive => file.lock()?,
        }

        tracing::trace!(path = %path.display(), ?mode, "Acquired file lock");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            mode,
        })
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode the lock is held in
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        match self.file.unlock() {
            Ok(()) => tracing::trace!(path = %self.path.display(), "Released file lock"),
            // Closing the descriptor right after releases the lock anyway.
            Err(err) => tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "Failed to release file lock"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn try_lock(path: &Path, mode: LockMode) -> bool {
        let file = OpenOptions::new().write(true).open(path).unwrap();
        match mode {
            LockMode::Shared => file.try_lock_shared().is_ok(),
            LockMode::Exclusive => file.try_lock().is_ok(),
        }
    }

    #[test]
    fn test_creates_lock_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sftp.lock");

        let guard = FileLockGuard::acquire(&path, LockMode::Exclusive).unwrap();
        assert!(path.exists());
        assert_eq!(guard.path(), path.as_path());
        assert_eq!(guard.mode(), LockMode::Exclusive);
    }

    #[test]
    fn test_exclusive_excludes_others() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sftp.lock");

        let guard = FileLockGuard::acquire(&path, LockMode::Exclusive).unwrap();
        assert!(!try_lock(&path, LockMode::Shared));
        assert!(!try_lock(&path, LockMode::Exclusive));

        drop(guard);
        assert!(try_lock(&path, LockMode::Exclusive));
    }

    #[test]
    fn test_shared_allows_readers_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sftp.lock");

        let _guard = FileLockGuard::acquire(&path, LockMode::Shared).unwrap();
        assert!(try_lock(&path, LockMode::Shared));
        assert!(!try_lock(&path, LockMode::Exclusive));
    }

    #[test]
    fn test_released_on_early_return() {
        fn critical_section(path: &Path) -> io::Result<()> {
            let _guard = FileLockGuard::acquire(path, LockMode::Exclusive)?;
            Err(io::Error::other("save failed"))
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sftp.lock");

        assert!(critical_section(&path).is_err());
        assert!(try_lock(&path, LockMode::Exclusive));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("sftp.lock");
        assert!(FileLockGuard::acquire(&path, LockMode::Shared).is_err());
    }
}
