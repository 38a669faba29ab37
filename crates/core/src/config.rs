//! Process configuration.
//!
//! Built once at startup and shared by `Arc`; nothing re-reads the
//! environment after that.

use std::path::{Path, PathBuf};

use crate::kinds::ConfigKind;

/// Default root of the edited front-end checkout.
pub const DEFAULT_BASE_PATH: &str = "/opt/websites/novel_h5_webconfig/funNovel_edit";

/// Default database location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://brandcfg.db?mode=rwc";

/// Directory copied into every new brand's static image directory.
pub const STATIC_TEMPLATE_DIR: &str = "img-jinse";

/// File name of the shared novel config document.
pub const NOVEL_CONFIG_FILE: &str = "novelConfig.js";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// sqlx connection string.
    pub database_url: String,
    /// Pool size (default: `5`).
    pub max_connections: u32,
    /// Locations of every generated file.
    pub files: FileLayout,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default                                          |
    /// |----------------------|--------------------------------------------------|
    /// | `DATABASE_URL`       | `sqlite://brandcfg.db?mode=rwc`                  |
    /// | `DB_MAX_CONNECTIONS` | `5`                                              |
    /// | `BASE_PATH`          | `/opt/websites/novel_h5_webconfig/funNovel_edit` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into());

        let raw = std::env::var("DB_MAX_CONNECTIONS").unwrap_or_else(|_| "5".into());
        let max_connections: u32 = raw.parse().map_err(|_| ConfigError::Invalid {
            var: "DB_MAX_CONNECTIONS",
            expected: "a positive integer",
            value: raw.clone(),
        })?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS",
                expected: "a positive integer",
                value: raw,
            });
        }

        let base_path = std::env::var("BASE_PATH").unwrap_or_else(|_| DEFAULT_BASE_PATH.into());

        Ok(Self {
            database_url,
            max_connections,
            files: FileLayout::from_base(base_path),
        })
    }
}

/// Every on-disk location the workflows touch, derived from one base path.
#[derive(Debug, Clone)]
pub struct FileLayout {
    pub base_path: PathBuf,
    pub project_root: PathBuf,
    pub app_config_dir: PathBuf,
    pub prebuild_dir: PathBuf,
    pub static_dir: PathBuf,
    pub vite_config_file: PathBuf,
    pub package_file: PathBuf,
    pub base_configs_dir: PathBuf,
    pub common_configs_dir: PathBuf,
    pub pay_configs_dir: PathBuf,
    pub ui_configs_dir: PathBuf,
    pub local_configs_dir: PathBuf,
}

impl FileLayout {
    /// Derive the layout of the `funNovel` project under `base`.
    pub fn from_base(base: impl Into<PathBuf>) -> Self {
        let base_path = base.into();
        let project_root = base_path.join("funNovel");
        let app_config_dir = project_root.join("src").join("appConfig");

        Self {
            prebuild_dir: project_root.join("prebuild").join("build"),
            static_dir: project_root.join("src").join("static"),
            vite_config_file: project_root.join("vite.config.js"),
            package_file: project_root.join("package.json"),
            base_configs_dir: app_config_dir.join("baseConfigs"),
            common_configs_dir: app_config_dir.join("commonConfigs"),
            pay_configs_dir: app_config_dir.join("payConfigs"),
            ui_configs_dir: app_config_dir.join("uiConfigs"),
            local_configs_dir: app_config_dir.join("localConfigs"),
            app_config_dir,
            project_root,
            base_path,
        }
    }

    /// Directory holding the files of `kind`.
    pub fn config_dir(&self, kind: ConfigKind) -> &Path {
        match kind {
            ConfigKind::Base => &self.base_configs_dir,
            ConfigKind::Common => &self.common_configs_dir,
            ConfigKind::Pay => &self.pay_configs_dir,
            ConfigKind::Ui => &self.ui_configs_dir,
            ConfigKind::Novel => &self.local_configs_dir,
        }
    }

    /// Document holding the `brand` channels of `kind`.
    pub fn config_file(&self, kind: ConfigKind, brand: &str) -> PathBuf {
        match kind {
            ConfigKind::Novel => self.local_configs_dir.join(NOVEL_CONFIG_FILE),
            other => self.config_dir(other).join(format!("{brand}.js")),
        }
    }

    /// The per-brand documents (everything except the shared novel file).
    pub fn brand_config_files(&self, brand: &str) -> Vec<PathBuf> {
        ConfigKind::PER_BRAND
            .iter()
            .map(|kind| self.config_file(*kind, brand))
            .collect()
    }

    pub fn prebuild_brand_dir(&self, brand: &str) -> PathBuf {
        self.prebuild_dir.join(brand)
    }

    pub fn prebuild_host_dir(&self, brand: &str, host: &str) -> PathBuf {
        self.prebuild_brand_dir(brand).join(host)
    }

    pub fn manifest_file(&self, brand: &str) -> PathBuf {
        self.prebuild_brand_dir(brand).join("manifest.json")
    }

    pub fn pages_file(&self, brand: &str, host: &str) -> PathBuf {
        self.prebuild_brand_dir(brand)
            .join(format!("pages-{host}.json"))
    }

    pub fn static_template_dir(&self) -> PathBuf {
        self.static_dir.join(STATIC_TEMPLATE_DIR)
    }

    pub fn static_brand_dir(&self, brand: &str) -> PathBuf {
        self.static_dir.join(format!("img-{brand}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = FileLayout::from_base("/srv/edit");
        assert_eq!(
            layout.config_file(ConfigKind::Base, "acme"),
            PathBuf::from("/srv/edit/funNovel/src/appConfig/baseConfigs/acme.js")
        );
        assert_eq!(
            layout.config_file(ConfigKind::Novel, "acme"),
            PathBuf::from("/srv/edit/funNovel/src/appConfig/localConfigs/novelConfig.js")
        );
        assert_eq!(
            layout.pages_file("acme", "h5"),
            PathBuf::from("/srv/edit/funNovel/prebuild/build/acme/pages-h5.json")
        );
        assert_eq!(
            layout.static_brand_dir("acme"),
            PathBuf::from("/srv/edit/funNovel/src/static/img-acme")
        );
    }

    #[test]
    fn brand_files_exclude_novel() {
        let layout = FileLayout::from_base("/srv/edit");
        let files = layout.brand_config_files("acme");
        assert_eq!(files.len(), 4);
        assert!(files.iter().all(|f| f.ends_with("acme.js")));
    }
}
