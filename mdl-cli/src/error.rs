use std::io;

use mdl_core::error::DownloaderError;
use mdl_sources::error::SourceError;
use thiserror::Error;

#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Content source failed: {source}")]
    SourceFail {
        #[from]
        source: SourceError,
    },

    #[error("Download could not run: {source}")]
    DownloaderFail {
        #[from]
        source: DownloaderError,
    },

    #[error("Failed to write input to console: {source}")]
    DialoguerIOFail {
        #[from]
        source: dialoguer::Error,
    },

    #[error("Failed to access file: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    #[error("Failed to write settings file: {source}")]
    SettingsSerializeFail {
        #[from]
        source: toml::ser::Error,
    },

    #[error("Could not determine a configuration directory. Set MDL_CONFIG_DIR")]
    NoConfigDir,

    #[error("No manga found for \"{term}\"")]
    NoResults { term: String },

    #[error("Result #{pick} requested, but only {found} found")]
    PickOutOfRange { pick: usize, found: usize },

    #[error("The selection matched no chapters")]
    NoChaptersSelected,
}
