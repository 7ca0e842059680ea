//! Mutual exclusion for mutating site operations.
//!
//! Two layers, both try-only:
//!
//! - [`ProcessLock`]: one in-flight mutating operation per process, across
//!   all site names.
//! - [`SiteLock`]: an OS file lock on `<store>/<name>.lock`, guarding the
//!   site directory against other controller processes.
//!
//! Failing to take either lock returns [`DrError::InProgress`] immediately.

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::constants::{LOCK_SUFFIX, PROCESS_LOCK_TARGET};
use crate::core::{DrError, Result};

/// Process-wide operation lock, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ProcessLock {
    inner: Arc<Mutex<()>>,
}

impl ProcessLock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<OwnedMutexGuard<()>> {
        Arc::clone(&self.inner).try_lock_owned().map_err(|_| DrError::InProgress {
            target: PROCESS_LOCK_TARGET.to_string(),
        })
    }

    /// True while some operation holds the lock.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

/// Exclusive lock on the `.lock` sidecar of one site directory.
///
/// Released when dropped. The sidecar file itself is left in place.
#[derive(Debug)]
pub struct SiteLock {
    file: File,
    path: PathBuf,
}

impl SiteLock {
    /// Sidecar path for `name` under `store_dir`.
    #[must_use]
    pub fn path_for(store_dir: &Path, name: &str) -> PathBuf {
        store_dir.join(format!("{name}{LOCK_SUFFIX}"))
    }

    pub async fn try_acquire(store_dir: &Path, name: &str) -> Result<Self> {
        tokio::fs::create_dir_all(store_dir)
            .await
            .map_err(|e| DrError::fs("create store directory", store_dir, &e))?;

        let path = Self::path_for(store_dir, name);
        let target = name.to_string();
        let lock_path = path.clone();
        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)
                .map_err(|e| DrError::fs("open lock file", &lock_path, &e))?;
            match file.try_lock_exclusive() {
                Ok(true) => Ok(file),
                Ok(false) => Err(DrError::InProgress {
                    target,
                }),
                Err(e) => Err(DrError::fs("lock", &lock_path, &e)),
            }
        })
        .await
        .map_err(|e| DrError::TaskFailed {
            operation: "site lock".to_string(),
            reason: e.to_string(),
        })??;

        debug!(target: "site::lock", path = %path.display(), "site lock acquired");
        Ok(Self {
            file,
            path,
        })
    }
}

impl Drop for SiteLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(target: "site::lock", "failed to unlock {}: {e}", self.path.display());
        }
    }
}

/// Both locks, held for the duration of one operation.
///
/// Fields drop in declaration order: the site lock goes first.
#[derive(Debug)]
pub struct OperationGuard {
    _site: SiteLock,
    _process: OwnedMutexGuard<()>,
}

impl OperationGuard {
    /// Take the process lock, then the site lock; fail fast on either.
    pub async fn acquire(process: &ProcessLock, store_dir: &Path, name: &str) -> Result<Self> {
        let process_guard = process.try_acquire()?;
        let site = SiteLock::try_acquire(store_dir, name).await?;
        Ok(Self {
            _site: site,
            _process: process_guard,
        })
    }
}
