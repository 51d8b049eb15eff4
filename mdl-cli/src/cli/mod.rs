use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mdl_core::DownloadOptions;
use mdl_sources::prelude::SourceRegistry;
use once_cell::sync::OnceCell;

use self::commands::{
    chapters::ChapterList, download::Download, search::SearchArgs, settings::SettingsAction,
};
use crate::settings::Settings;

pub mod commands;
pub(crate) mod extra;

pub use extra::get_sources;

pub static AVAILABLE_SOURCES: OnceCell<SourceRegistry> = OnceCell::new();

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Search every configured source for a manga
    Search(SearchArgs),
    /// List the chapters of a manga
    Chapters(ChapterList),
    /// Download chapters of a manga as cbz files
    Download(Download),
    /// Print all available sources and exit
    Sources,
    /// Show or change the persisted settings
    Settings {
        #[clap(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Parser, Debug)]
#[clap(name = "Manga Downloader", author, version, about, long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub mode: Commands,

    /// Where to save chapters, overriding the configured download directory
    ///
    /// Every manga gets its own directory in here. If the path doesn't exist, it will be created.
    #[clap(short = 'o', value_name = "PATH", help_heading = "SAVE", global = true)]
    pub output: Option<PathBuf>,

    /// Number of chapters downloaded at the same time
    ///
    /// [max: 20]
    #[clap(
        short = 'd',
        value_name = "NUMBER",
        value_parser(clap::value_parser!(u8).range(1..=20)),
        help_heading = "DOWNLOAD",
        global = true
    )]
    pub simultaneous_downloads: Option<u8>,

    /// Download one chapter at a time
    #[clap(
        long,
        action,
        default_value_t = false,
        help_heading = "DOWNLOAD",
        global = true
    )]
    pub sequential: bool,

    /// Don't ask for confirmation before downloading
    #[clap(
        short = 'y',
        value_parser,
        default_value_t = false,
        help_heading = "GENERAL",
        global = true
    )]
    pub yes: bool,
}

impl Cli {
    /// Persisted settings with this invocation's flags applied on top.
    pub fn download_options(&self, settings: &Settings) -> DownloadOptions {
        let mut options = settings.download_options();

        if let Some(output) = &self.output {
            options.download_dir = output.clone();
        }

        if let Some(simultaneous) = self.simultaneous_downloads {
            options.max_chapter_concurrency = usize::from(simultaneous);
        }

        if self.sequential {
            options.parallel = false;
        }

        options
    }
}
