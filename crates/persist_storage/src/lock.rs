//! Advisory lock token files.
//!
//! On-disk stores serialize access through a sibling token file at
//! `<location>.lock`. Readers open it read-only and take a shared lock,
//! writers open it for writing and take an exclusive lock. The token file
//! is created on first use and never deleted.

use crate::backend::LockMode;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Suffix appended to a store location to name its token file.
pub const LOCK_SUFFIX: &str = ".lock";

/// Returns the token file path for a store location.
#[must_use]
pub fn lock_path_for(location: &Path) -> PathBuf {
    let mut name = location.as_os_str().to_os_string();
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

/// A lock token file and the lock currently held on it, if any.
///
/// The handle is owned by one store; two stores on the same location hold
/// separate handles and contend like separate processes would.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    held: Option<(File, LockMode)>,
}

impl LockFile {
    /// Creates a lock handle for the store at `location`. Nothing is
    /// touched on disk until a lock is requested.
    #[must_use]
    pub fn for_location(location: &Path) -> Self {
        Self {
            path: lock_path_for(location),
            held: None,
        }
    }

    /// Path of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The mode currently held, if any.
    #[must_use]
    pub fn mode(&self) -> Option<LockMode> {
        self.held.as_ref().map(|(_, mode)| *mode)
    }

    /// Blocks until `mode` is granted.
    ///
    /// Re-requesting the held mode is a no-op. Requesting a different mode
    /// releases the current lock first, so the transition is not atomic.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Lock`] if the token file cannot be created or
    /// opened, or the lock cannot be taken.
    pub fn acquire(&mut self, mode: LockMode) -> StorageResult<()> {
        if self.mode() == Some(mode) {
            return Ok(());
        }
        self.release()?;

        let file = self.open_token(mode)?;
        let locked = match mode {
            LockMode::Shared => FileExt::lock_shared(&file),
            LockMode::Exclusive => FileExt::lock_exclusive(&file),
        };
        locked.map_err(|e| self.lock_error(e))?;

        trace!(path = %self.path.display(), %mode, "lock acquired");
        self.held = Some((file, mode));
        Ok(())
    }

    /// Takes `mode` if it is free right now.
    ///
    /// Returns `Ok(false)` without blocking when another holder conflicts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Lock`] if the token file cannot be created or
    /// opened, or locking fails for a reason other than contention.
    pub fn try_acquire(&mut self, mode: LockMode) -> StorageResult<bool> {
        if self.mode() == Some(mode) {
            return Ok(true);
        }
        self.release()?;

        let file = self.open_token(mode)?;
        let attempt = match mode {
            LockMode::Shared => FileExt::try_lock_shared(&file),
            LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
        };
        match attempt {
            Ok(()) => {
                trace!(path = %self.path.display(), %mode, "lock acquired");
                self.held = Some((file, mode));
                Ok(true)
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(false),
            Err(e) => Err(self.lock_error(e)),
        }
    }

    /// Releases the held lock. Releasing nothing is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Lock`] if unlocking fails; the handle is
    /// dropped regardless, which releases the lock at the OS level.
    pub fn release(&mut self) -> StorageResult<()> {
        if let Some((file, mode)) = self.held.take() {
            FileExt::unlock(&file).map_err(|e| self.lock_error(e))?;
            trace!(path = %self.path.display(), %mode, "lock released");
        }
        Ok(())
    }

    fn open_token(&self, mode: LockMode) -> StorageResult<File> {
        let opened = match mode {
            LockMode::Shared => {
                if !self.path.exists() {
                    self.create_token()?;
                }
                File::open(&self.path)
            }
            LockMode::Exclusive => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&self.path),
        };
        opened.map_err(|e| self.lock_error(e))
    }

    fn create_token(&self) -> StorageResult<()> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map(drop)
            .map_err(|e| self.lock_error(e))
    }

    fn lock_error(&self, source: io::Error) -> StorageError {
        StorageError::Lock {
            path: self.path.clone(),
            source,
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        // Closing the handle releases the lock even if unlock fails.
        let _ = self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn lock_path_appends_suffix() {
        assert_eq!(
            lock_path_for(Path::new("/tmp/people.db")),
            PathBuf::from("/tmp/people.db.lock")
        );
    }

    #[test]
    fn token_file_created_on_first_use() {
        let dir = tempdir().unwrap();
        let mut lock = LockFile::for_location(&dir.path().join("data"));
        assert!(!lock.path().exists());

        lock.acquire(LockMode::Shared).unwrap();
        assert!(lock.path().exists());
        assert_eq!(lock.mode(), Some(LockMode::Shared));

        lock.release().unwrap();
        assert_eq!(lock.mode(), None);
        assert!(lock.path().exists());
    }

    #[test]
    fn release_without_lock_is_noop() {
        let dir = tempdir().unwrap();
        let mut lock = LockFile::for_location(&dir.path().join("data"));
        lock.release().unwrap();
        lock.release().unwrap();
    }

    #[test]
    fn shared_locks_coexist() {
        let dir = tempdir().unwrap();
        let location = dir.path().join("data");
        let mut a = LockFile::for_location(&location);
        let mut b = LockFile::for_location(&location);

        a.acquire(LockMode::Shared).unwrap();
        assert!(b.try_acquire(LockMode::Shared).unwrap());
    }

    #[test]
    fn exclusive_excludes_shared() {
        let dir = tempdir().unwrap();
        let location = dir.path().join("data");
        let mut writer = LockFile::for_location(&location);
        let mut reader = LockFile::for_location(&location);

        writer.acquire(LockMode::Exclusive).unwrap();
        assert!(!reader.try_acquire(LockMode::Shared).unwrap());

        writer.release().unwrap();
        assert!(reader.try_acquire(LockMode::Shared).unwrap());
    }

    #[test]
    fn exclusive_waits_for_all_shared_holders() {
        let dir = tempdir().unwrap();
        let location = dir.path().join("data");
        let mut first = LockFile::for_location(&location);
        let mut second = LockFile::for_location(&location);
        first.acquire(LockMode::Shared).unwrap();
        second.acquire(LockMode::Shared).unwrap();

        let granted = Arc::new(AtomicBool::new(false));
        let writer = {
            let granted = Arc::clone(&granted);
            let location = location.clone();
            thread::spawn(move || {
                let mut lock = LockFile::for_location(&location);
                lock.acquire(LockMode::Exclusive).unwrap();
                granted.store(true, Ordering::SeqCst);
                lock.release().unwrap();
            })
        };

        thread::sleep(Duration::from_millis(100));
        assert!(!granted.load(Ordering::SeqCst));

        first.release().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(!granted.load(Ordering::SeqCst));

        second.release().unwrap();
        writer.join().unwrap();
        assert!(granted.load(Ordering::SeqCst));
    }

    #[test]
    fn missing_directory_is_lock_error() {
        let dir = tempdir().unwrap();
        let mut lock = LockFile::for_location(&dir.path().join("no/such/dir/data"));
        assert!(matches!(
            lock.acquire(LockMode::Exclusive),
            Err(StorageError::Lock { .. })
        ));
        assert_eq!(lock.mode(), None);
    }
}
