//! Per-path async locks.
//!
//! Two operations that read-modify-write the same config file would
//! otherwise race and drop one side's channel. Staging a path takes its
//! lock; the guard lives as long as the operation's [`FsRollback`].
//!
//! [`FsRollback`]: crate::FsRollback

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Shared table of path locks. Cheap to clone.
#[derive(Clone, Default)]
pub struct FileLocks {
    table: Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>,
}

/// Held lock on one path. Released on drop.
pub struct PathGuard {
    path: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl PathGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`.
    pub async fn lock(&self, path: &Path) -> PathGuard {
        let mutex = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries nobody holds or waits on are dropped here.
            table.retain(|_, m| Arc::strong_count(m) > 1);
            Arc::clone(table.entry(path.to_path_buf()).or_default())
        };

        if mutex.try_lock().is_err() {
            tracing::debug!(path = %path.display(), "Waiting for file lock");
        }
        PathGuard {
            path: path.to_path_buf(),
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of paths currently locked or awaited.
    pub fn active(&self) -> usize {
        let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.values().filter(|m| Arc::strong_count(m) > 1).count()
    }
}
