//! Directory and file operations that stage every path they touch.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::fs_rollback::{FsError, FsRollback};

/// Write `bytes` to a sibling temp file, then rename it over `path`.
///
/// A crash mid-write leaves at most a stray temp file, never a truncated
/// `path`. The parent directory must exist.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), FsError> {
    let tmp = temp_sibling(path);
    fs::write(&tmp, bytes)
        .await
        .map_err(|e| FsError::new("write", &tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(FsError::new("replace", path, e));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

/// Copy one file, staging the destination first.
pub async fn copy_file(files: &mut FsRollback, src: &Path, dst: &Path) -> Result<u64, FsError> {
    files.stage(dst).await?;
    fs::copy(src, dst)
        .await
        .map_err(|e| FsError::new("copy", src, e))
}

/// Recursively copy `src` into `dst`, staging every destination path.
///
/// A missing `dst` is staged as a whole, so undo removes the entire copy.
/// Returns the number of files copied.
pub async fn copy_dir_tracked(files: &mut FsRollback, src: &Path, dst: &Path) -> Result<u64, FsError> {
    match fs::metadata(src).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(FsError::new(
                "copy",
                src,
                io::Error::new(io::ErrorKind::InvalidInput, "source is not a directory"),
            ))
        }
        Err(e) => return Err(FsError::new("copy", src, e)),
    }

    files.create_dir_all(dst).await?;

    let mut copied = 0u64;
    let mut pending = vec![(src.to_path_buf(), dst.to_path_buf())];
    while let Some((from, to)) = pending.pop() {
        let mut entries = fs::read_dir(&from)
            .await
            .map_err(|e| FsError::new("read directory", &from, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FsError::new("read directory", &from, e))?
        {
            let src_path = entry.path();
            let dst_path = to.join(entry.file_name());
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| FsError::new("inspect", &src_path, e))?;

            if file_type.is_dir() {
                files.create_dir_all(&dst_path).await?;
                pending.push((src_path, dst_path));
            } else {
                copy_file(files, &src_path, &dst_path).await?;
                copied += 1;
            }
        }
    }

    tracing::debug!(src = %src.display(), dst = %dst.display(), copied, "Copied directory");
    Ok(copied)
}

/// Delete `path` (file or directory) so that undo brings it back. Files
/// are snapshotted; directories are stashed. Returns `false` when it did not
/// exist.
pub async fn remove_tracked(files: &mut FsRollback, path: &Path) -> Result<bool, FsError> {
    files.lock(path).await;
    let meta = match fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Nothing to remove");
            return Ok(false);
        }
        Err(e) => return Err(FsError::new("inspect", path, e)),
    };

    if meta.is_dir() {
        return files.stash_dir(path).await;
    }

    files.stage(path).await?;
    fs::remove_file(path)
        .await
        .map_err(|e| FsError::new("remove", path, e))?;
    tracing::debug!(path = %path.display(), "Removed");
    Ok(true)
}

/// Remove `dir` only if it exists and is empty. Returns whether it was
/// removed.
pub async fn remove_dir_if_empty(files: &mut FsRollback, dir: &Path) -> Result<bool, FsError> {
    files.lock(dir).await;
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(FsError::new("read directory", dir, e)),
    };
    let has_entries = entries
        .next_entry()
        .await
        .map_err(|e| FsError::new("read directory", dir, e))?
        .is_some();
    if has_entries {
        tracing::debug!(dir = %dir.display(), "Directory not empty, keeping");
        return Ok(false);
    }

    files.stash_dir(dir).await
}
