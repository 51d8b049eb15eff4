//! Persisted user settings.
//!
//! Stored as TOML in `settings.toml` inside the configuration directory. Keys missing from
//! the file take their default value, so older files keep working as settings are added.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use log::{debug, warn};
use mdl_core::DownloadOptions;
use mdl_core::async_queue::{DEFAULT_CHAPTER_CONCURRENCY, DEFAULT_IMAGE_CONCURRENCY};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

/// Overrides the configuration directory when set.
pub const CONFIG_DIR_ENV: &str = "MDL_CONFIG_DIR";
pub const SETTINGS_FILE_NAME: &str = "settings.toml";
/// Sub-directory of the configuration directory holding catalog files.
pub const SOURCES_DIR_NAME: &str = "sources";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub download_dir: PathBuf,
    pub max_chapter_concurrency: usize,
    pub max_image_concurrency: usize,
    pub parallel: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("./downloads"),
            max_chapter_concurrency: DEFAULT_CHAPTER_CONCURRENCY,
            max_image_concurrency: DEFAULT_IMAGE_CONCURRENCY,
            parallel: true,
        }
    }
}

/// `$MDL_CONFIG_DIR`, or the platform config directory for this program.
pub fn config_dir() -> Result<PathBuf, CliError> {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    ProjectDirs::from("com", "mangadl", "manga-downloader")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(CliError::NoConfigDir)
}

impl Settings {
    pub fn settings_path(config_dir: &Path) -> PathBuf {
        config_dir.join(SETTINGS_FILE_NAME)
    }

    /// Reads settings from `path`.
    ///
    /// A missing file gives the defaults. So does a file that can't be read or parsed, after
    /// logging a warning.
    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) => {
                if path.exists() {
                    warn!("Failed to read {}: {}. Using defaults.", path.display(), error);
                } else {
                    debug!("No settings at {}, using defaults", path.display());
                }
                return Self::default();
            }
        };

        toml::from_str(&contents).unwrap_or_else(|error| {
            warn!("Invalid settings file {}: {}. Using defaults.", path.display(), error);
            Self::default()
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        debug!("Settings saved to {}", path.display());
        Ok(())
    }

    pub fn load() -> Result<Self, CliError> {
        Ok(Self::load_from(&Self::settings_path(&config_dir()?)))
    }

    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            download_dir: self.download_dir.clone(),
            parallel: self.parallel,
            max_chapter_concurrency: self.max_chapter_concurrency.max(1),
            max_image_concurrency: self.max_image_concurrency.max(1),
        }
    }
}
