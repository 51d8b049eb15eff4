use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use log::info;

use crate::error::CliError;
use crate::settings::{Settings, config_dir};

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print the current settings and where they are stored
    Show,
    /// Change the directory chapters are downloaded to
    ///
    /// The directory is created if it doesn't exist yet.
    SetDir {
        #[clap(value_name = "PATH")]
        path: PathBuf,
    },
}

impl SettingsAction {
    /// Applies the action to `settings`, saving them when changed.
    pub fn apply(&self, settings: &mut Settings) -> Result<(), CliError> {
        self.apply_in(&config_dir()?, settings)
    }

    /// Same as [`apply`](Self::apply), with settings stored under `config_dir`.
    pub fn apply_in(&self, config_dir: &Path, settings: &mut Settings) -> Result<(), CliError> {
        let settings_path = Settings::settings_path(config_dir);

        match self {
            Self::Show => {
                println!("# {}", settings_path.display());
                println!("{}", toml::to_string_pretty(&*settings)?);
            }
            Self::SetDir { path } => {
                ensure_download_dir(path)?;
                settings.download_dir = path.clone();
                settings.save_to(&settings_path)?;
                info!("Download directory set to {}", path.display());
            }
        }
        Ok(())
    }
}

fn ensure_download_dir(path: &Path) -> Result<(), CliError> {
    if path.exists() && !path.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} exists and is not a directory", path.display()),
        )
        .into());
    }
    fs::create_dir_all(path)?;
    Ok(())
}
