//! Filesystem rollback engine.
//!
//! Every path an operation is about to create, overwrite, or delete is
//! staged first. Staging an existing regular file snapshots its bytes;
//! staging a directory or a missing path records it as created, so undo
//! deletes it wholesale. Callers must therefore only stage directories they
//! are prepared to see removed on failure. Existing directories are removed
//! through [`FsRollback::stash_dir`], which moves them aside instead.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::locks::{FileLocks, PathGuard};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An I/O failure on a specific path.
#[derive(Debug, thiserror::Error)]
#[error("Failed to {action} {}: {source}", path.display())]
pub struct FsError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FsError {
    pub fn new(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Undo steps that failed. Every other step was still attempted.
#[derive(Debug, thiserror::Error)]
pub struct RollbackError {
    pub failures: Vec<(PathBuf, io::Error)>,
}

impl fmt::Display for RollbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File rollback failed for {} path(s)", self.failures.len())?;
        for (i, (path, err)) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{} ({err})", path.display())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Backup records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    /// A regular file that existed before staging; restored from snapshot.
    Existed,
    /// A path that did not exist, or a directory; deleted on undo.
    Created,
    /// A directory moved aside to `stash`; renamed back on undo and deleted
    /// once the operation is cleared.
    Stashed,
}

#[derive(Debug, Clone)]
pub struct BackupRecord {
    pub path: PathBuf,
    pub kind: BackupKind,
    pub snapshot: Option<Vec<u8>>,
    pub stash: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// FsRollback
// ---------------------------------------------------------------------------

/// Staged filesystem state of one orchestrated operation.
pub struct FsRollback {
    records: Vec<BackupRecord>,
    index: HashMap<PathBuf, usize>,
    locks: FileLocks,
    guards: Vec<PathGuard>,
    locked: HashSet<PathBuf>,
}

impl FsRollback {
    pub fn new(locks: FileLocks) -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            locks,
            guards: Vec::new(),
            locked: HashSet::new(),
        }
    }

    /// Take the lock on `path` for the rest of the operation without
    /// recording anything. Check-then-act sequences lock first.
    pub async fn lock(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if self.locked.insert(path.to_path_buf()) {
            self.guards.push(self.locks.lock(path).await);
        }
    }

    /// Record `path` so that a following mutation can be undone.
    ///
    /// The first call for a path wins; later calls are no-ops, so the
    /// snapshot always holds the content from before the operation. Also
    /// takes the path's lock, held until this engine is cleared or dropped.
    pub async fn stage(&mut self, path: impl AsRef<Path>) -> Result<(), FsError> {
        let path = path.as_ref();
        if self.index.contains_key(path) {
            return Ok(());
        }

        self.lock(path).await;

        let record = match fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {
                let bytes = fs::read(path)
                    .await
                    .map_err(|e| FsError::new("snapshot", path, e))?;
                tracing::debug!(path = %path.display(), bytes = bytes.len(), "Staged file snapshot");
                BackupRecord {
                    path: path.to_path_buf(),
                    kind: BackupKind::Existed,
                    snapshot: Some(bytes),
                    stash: None,
                }
            }
            Ok(_) => {
                tracing::debug!(path = %path.display(), "Staged existing directory for removal");
                BackupRecord {
                    path: path.to_path_buf(),
                    kind: BackupKind::Created,
                    snapshot: None,
                    stash: None,
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Staged new path");
                BackupRecord {
                    path: path.to_path_buf(),
                    kind: BackupKind::Created,
                    snapshot: None,
                    stash: None,
                }
            }
            Err(e) => return Err(FsError::new("inspect", path, e)),
        };

        self.index.insert(path.to_path_buf(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Create `dir` and its missing ancestors, staging the outermost one
    /// that did not exist. Existing directories are left untracked.
    pub async fn create_dir_all(&mut self, dir: impl AsRef<Path>) -> Result<(), FsError> {
        let dir = dir.as_ref();
        let mut outermost_missing = None;
        let mut cursor = Some(dir);
        while let Some(candidate) = cursor {
            if candidate.as_os_str().is_empty() || path_exists(candidate).await {
                break;
            }
            outermost_missing = Some(candidate);
            cursor = candidate.parent();
        }

        if let Some(missing) = outermost_missing {
            self.stage(missing).await?;
            fs::create_dir_all(dir)
                .await
                .map_err(|e| FsError::new("create directory", dir, e))?;
        }
        Ok(())
    }

    /// Remove the directory `dir` so that undo can bring it back whole.
    ///
    /// The directory is renamed to a hidden sibling; undo renames it back
    /// and [`clear`](Self::clear) deletes it. A directory created earlier in
    /// the same operation is deleted outright. Returns `false` when `dir`
    /// does not exist.
    pub async fn stash_dir(&mut self, dir: impl AsRef<Path>) -> Result<bool, FsError> {
        let dir = dir.as_ref();
        self.lock(dir).await;

        match fs::symlink_metadata(dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(FsError::new(
                    "stash",
                    dir,
                    io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
                ))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(FsError::new("inspect", dir, e)),
        }

        if self.created_here(dir) {
            fs::remove_dir_all(dir)
                .await
                .map_err(|e| FsError::new("remove", dir, e))?;
            tracing::debug!(path = %dir.display(), "Removed directory created by this operation");
            return Ok(true);
        }

        let stash = stash_sibling(dir);
        fs::rename(dir, &stash)
            .await
            .map_err(|e| FsError::new("stash", dir, e))?;
        tracing::debug!(path = %dir.display(), stash = %stash.display(), "Stashed directory");

        self.index.insert(dir.to_path_buf(), self.records.len());
        self.records.push(BackupRecord {
            path: dir.to_path_buf(),
            kind: BackupKind::Stashed,
            snapshot: None,
            stash: Some(stash),
        });
        Ok(true)
    }

    /// Whether the current content at `dir` came from this operation: an
    /// ancestor was recorded as created, or `dir` itself was already stashed.
    fn created_here(&self, dir: &Path) -> bool {
        dir.ancestors().any(|a| match self.record(a) {
            Some(r) if r.kind == BackupKind::Created => true,
            Some(r) => r.kind == BackupKind::Stashed && a == dir,
            None => false,
        })
    }

    /// Whether `path` has a content snapshot.
    pub fn has_backup(&self, path: impl AsRef<Path>) -> bool {
        self.record(path.as_ref())
            .is_some_and(|r| r.kind == BackupKind::Existed)
    }

    /// Whether `path` has been staged in any form.
    pub fn is_tracked(&self, path: impl AsRef<Path>) -> bool {
        self.index.contains_key(path.as_ref())
    }

    pub fn record(&self, path: &Path) -> Option<&BackupRecord> {
        self.index.get(path).map(|&i| &self.records[i])
    }

    /// Number of content snapshots.
    pub fn backup_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.kind == BackupKind::Existed)
            .count()
    }

    /// Number of paths that undo would delete.
    pub fn created_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.kind == BackupKind::Created)
            .count()
    }

    /// Number of directories moved aside.
    pub fn stashed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.kind == BackupKind::Stashed)
            .count()
    }

    /// Keep every change: delete stashed directories, drop all tracked
    /// state and release every lock. A stash that cannot be deleted is
    /// logged and left behind.
    pub async fn clear(&mut self) {
        // Later stashes may contain earlier ones.
        for record in self.records.drain(..).rev() {
            if let Some(stash) = record.stash {
                match fs::remove_dir_all(&stash).await {
                    Err(e) if e.kind() != io::ErrorKind::NotFound => {
                        tracing::warn!(stash = %stash.display(), error = %e, "Failed to delete stashed directory");
                    }
                    _ => {}
                }
            }
        }
        self.index.clear();
        self.guards.clear();
        self.locked.clear();
    }

    /// Revert every staged path.
    ///
    /// Created paths and stashed directories are reverted latest first, with
    /// runs of created paths deleted deepest first. Snapshots are rewritten
    /// last. Every step is attempted; failures are collected. Tracked state
    /// and locks are released either way.
    pub async fn undo(&mut self) -> Result<(), RollbackError> {
        let records = std::mem::take(&mut self.records);
        self.index.clear();

        tracing::info!(
            unstashes = records.iter().filter(|r| r.kind == BackupKind::Stashed).count(),
            restores = records.iter().filter(|r| r.kind == BackupKind::Existed).count(),
            deletions = records.iter().filter(|r| r.kind == BackupKind::Created).count(),
            "Undoing staged file changes",
        );

        let mut failures = Vec::new();
        let mut created = Vec::new();
        let mut snapshots = Vec::new();

        for record in records.into_iter().rev() {
            match (record.kind, record.snapshot, record.stash) {
                (BackupKind::Stashed, _, Some(stash)) => {
                    remove_created(&mut created, &mut failures).await;
                    match unstash(&stash, &record.path).await {
                        Ok(()) => tracing::debug!(path = %record.path.display(), "Restored directory"),
                        Err(e) => {
                            tracing::error!(path = %record.path.display(), error = %e, "Failed to restore directory");
                            failures.push((record.path, e));
                        }
                    }
                }
                (BackupKind::Existed, Some(bytes), _) => snapshots.push((record.path, bytes)),
                _ => created.push(record.path),
            }
        }
        remove_created(&mut created, &mut failures).await;

        for (path, bytes) in snapshots {
            match restore_file(&path, &bytes).await {
                Ok(()) => tracing::debug!(path = %path.display(), "Restored file"),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Failed to restore file");
                    failures.push((path, e));
                }
            }
        }

        self.guards.clear();
        self.locked.clear();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RollbackError { failures })
        }
    }
}

fn depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

async fn remove_created(created: &mut Vec<PathBuf>, failures: &mut Vec<(PathBuf, io::Error)>) {
    created.sort_by_key(|p| std::cmp::Reverse(depth(p)));
    for path in created.drain(..) {
        if let Err(e) = remove_path(&path).await {
            tracing::error!(path = %path.display(), error = %e, "Failed to remove created path");
            failures.push((path, e));
        }
    }
}

fn stash_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.stash", uuid::Uuid::new_v4().simple()))
}

/// Put a stashed directory back, replacing anything created at its path.
async fn unstash(stash: &Path, path: &Path) -> io::Result<()> {
    remove_path(path).await?;
    fs::rename(stash, path).await
}

async fn restore_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, bytes).await
}

async fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}

async fn remove_path(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Already gone, skipping");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => {
            if other.is_ok() {
                tracing::debug!(path = %path.display(), "Removed created path");
            }
            other
        }
    }
}
