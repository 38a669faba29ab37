//! Project-level files a website registers itself in.
//!
//! - `vite.config.js`: the `basePathMap` entry mapping `{host}-{brand}` to
//!   the public base path.
//! - `package.json`: dev/build scripts and the uni-app build entry.
//! - `prebuild/build/{brand}/`: `manifest.json` and `pages-{host}.json`.
//! - `src/static/img-{brand}`: image assets copied from the template brand.
//!
//! Every mutation is staged on the caller's [`FsRollback`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use brandcfg_core::config::FileLayout;
use brandcfg_core::kinds::platform_key;
use brandcfg_core::project_files::{self, PackageManifest, PlatformEntry, ProjectFileError};
use brandcfg_saga::{fsops, FsError, FsRollback};
use tokio::fs;

use crate::error::WebsiteError;

#[derive(Clone)]
pub struct ProjectFileService {
    layout: Arc<FileLayout>,
}

impl ProjectFileService {
    pub fn new(layout: Arc<FileLayout>) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }

    // -----------------------------------------------------------------------
    // Build registration
    // -----------------------------------------------------------------------

    /// Register `entry` in `vite.config.js` and `package.json`. Entries that
    /// are already present are left untouched.
    pub async fn register_platform(
        &self,
        files: &mut FsRollback,
        entry: &PlatformEntry,
        script_base: &str,
    ) -> Result<(), WebsiteError> {
        let key = entry.key();

        let vite = &self.layout.vite_config_file;
        files.stage(vite).await?;
        let source = read_text(vite).await?;
        match project_files::add_base_path(&source, &key, script_base).map_err(edit_error(vite))? {
            Some(updated) => {
                fsops::write_atomic(vite, updated.as_bytes()).await?;
                tracing::info!(key = %key, base = script_base, "Registered base path");
            }
            None => tracing::warn!(key = %key, "Base path already registered, keeping it"),
        }

        let package = &self.layout.package_file;
        files.stage(package).await?;
        let mut manifest =
            PackageManifest::parse(&read_text(package).await?).map_err(edit_error(package))?;
        if manifest.add_platform(entry).map_err(edit_error(package))? {
            let text = manifest.render().map_err(edit_error(package))?;
            fsops::write_atomic(package, text.as_bytes()).await?;
            tracing::info!(key = %key, "Registered package scripts");
        } else {
            tracing::warn!(key = %key, "Package scripts already registered, keeping them");
        }
        Ok(())
    }

    /// Undo [`register_platform`](Self::register_platform) and delete the
    /// channel's pages file. Missing entries and files are skipped.
    pub async fn unregister_platform(
        &self,
        files: &mut FsRollback,
        brand: &str,
        host: &str,
    ) -> Result<(), WebsiteError> {
        let key = platform_key(brand, host);

        let vite = &self.layout.vite_config_file;
        files.stage(vite).await?;
        if let Some(source) = read_text_if_exists(vite).await? {
            match project_files::remove_base_path(&source, &key).map_err(edit_error(vite))? {
                Some(updated) => fsops::write_atomic(vite, updated.as_bytes()).await?,
                None => tracing::warn!(key = %key, "No base path registered"),
            }
        }

        let package = &self.layout.package_file;
        files.stage(package).await?;
        if let Some(text) = read_text_if_exists(package).await? {
            let mut manifest = PackageManifest::parse(&text).map_err(edit_error(package))?;
            if manifest.remove_platform(&key) {
                let text = manifest.render().map_err(edit_error(package))?;
                fsops::write_atomic(package, text.as_bytes()).await?;
            } else {
                tracing::warn!(key = %key, "No package scripts registered");
            }
        }

        fsops::remove_tracked(files, &self.layout.pages_file(brand, host)).await?;
        tracing::info!(key = %key, "Unregistered platform");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Prebuild and static assets
    // -----------------------------------------------------------------------

    /// Generate the brand manifest and the channel's pages file if absent.
    pub async fn ensure_prebuild(
        &self,
        files: &mut FsRollback,
        brand: &str,
        host: &str,
        app_name: &str,
    ) -> Result<(), WebsiteError> {
        files
            .create_dir_all(self.layout.prebuild_brand_dir(brand))
            .await?;

        let manifest = self.layout.manifest_file(brand);
        write_json_if_absent(files, &manifest, &project_files::prebuild_manifest(brand, app_name)).await?;

        let pages = self.layout.pages_file(brand, host);
        write_json_if_absent(files, &pages, &project_files::prebuild_pages(app_name)).await?;
        Ok(())
    }

    /// Copy the template image directory to `img-{brand}`. Returns `false`
    /// when the brand already has one.
    pub async fn copy_static_assets(&self, files: &mut FsRollback, brand: &str) -> Result<bool, WebsiteError> {
        let dst = self.layout.static_brand_dir(brand);
        files.lock(&dst).await;
        if path_exists(&dst).await {
            tracing::debug!(brand, "Static assets already present");
            return Ok(false);
        }
        let copied = fsops::copy_dir_tracked(files, &self.layout.static_template_dir(), &dst).await?;
        tracing::info!(brand, copied, "Copied static assets");
        Ok(true)
    }

    pub async fn remove_prebuild_host(
        &self,
        files: &mut FsRollback,
        brand: &str,
        host: &str,
    ) -> Result<bool, WebsiteError> {
        Ok(fsops::remove_tracked(files, &self.layout.prebuild_host_dir(brand, host)).await?)
    }

    /// Delete every per-brand file: the four config documents, the prebuild
    /// directory and the static image directory. Directories are stashed so
    /// a later failure brings them back.
    pub async fn remove_brand_files(&self, files: &mut FsRollback, brand: &str) -> Result<(), WebsiteError> {
        let mut targets: Vec<PathBuf> = self.layout.brand_config_files(brand);
        targets.push(self.layout.prebuild_brand_dir(brand));
        targets.push(self.layout.static_brand_dir(brand));

        for path in targets {
            if fsops::remove_tracked(files, &path).await? {
                tracing::info!(brand, path = %path.display(), "Removed brand file");
            }
        }
        Ok(())
    }
}

fn edit_error(path: &Path) -> impl Fn(ProjectFileError) -> WebsiteError + '_ {
    move |source| WebsiteError::ProjectFile {
        path: path.to_path_buf(),
        source,
    }
}

async fn path_exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

async fn read_text(path: &Path) -> Result<String, FsError> {
    fs::read_to_string(path)
        .await
        .map_err(|e| FsError::new("read", path, e))
}

async fn read_text_if_exists(path: &Path) -> Result<Option<String>, FsError> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Project file missing, skipping");
            Ok(None)
        }
        Err(e) => Err(FsError::new("read", path, e)),
    }
}

async fn write_json_if_absent(
    files: &mut FsRollback,
    path: &Path,
    value: &serde_json::Value,
) -> Result<(), WebsiteError> {
    files.lock(path).await;
    if path_exists(path).await {
        tracing::debug!(path = %path.display(), "Prebuild file exists, keeping it");
        return Ok(());
    }
    files.stage(path).await?;
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|e| FsError::new("serialize", path, io::Error::other(e)))?;
    text.push('\n');
    fsops::write_atomic(path, text.as_bytes()).await?;
    Ok(())
}
