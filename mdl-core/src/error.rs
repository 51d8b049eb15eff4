use std::io;

use mdl_common::error::CommonError;
use mdl_sources::error::SourceError;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::task::JoinError;

/// Longest URL prefix kept in error messages.
const URL_DISPLAY_LEN: usize = 60;

/// Shortens `url` for log lines and error messages.
pub fn truncate_url(url: &str) -> String {
    if url.chars().count() <= URL_DISPLAY_LEN {
        return url.to_string();
    }
    let head: String = url.chars().take(URL_DISPLAY_LEN).collect();
    format!("{}...", head)
}

/// Failure to retrieve a single page image. Fatal to the chapter it belongs to.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to connect to {url}: {source}")]
    ConnectionFail {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    RemoteStatus { url: String, status: StatusCode },

    #[error("Error while fetching chunk of {url}: {message}")]
    ChunkDownloadFail { url: String, message: String },

    #[error("Failed to write {url} to disk: {source}")]
    FileIOError {
        url: String,
        #[source]
        source: io::Error,
    },
}

impl FetchError {
    pub(crate) fn connection(url: &str, source: reqwest::Error) -> Self {
        Self::ConnectionFail {
            url: truncate_url(url),
            source,
        }
    }

    pub(crate) fn file_io(url: &str, source: io::Error) -> Self {
        Self::FileIOError {
            url: truncate_url(url),
            source,
        }
    }
}

/// Failure to assemble a chapter archive. Fatal to that chapter only.
#[derive(Error, Debug)]
pub enum PackError {
    #[error("Failed to access file: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    #[error("Error while adding file to cbz file: {source}")]
    ZipIOError {
        #[from]
        source: zip::result::ZipError,
    },

    #[error("Failed to start thread for writing the cbz file: {source}")]
    ZipThreadStartError {
        #[from]
        source: JoinError,
    },

    #[error("File {path} has a name that can't be stored in the archive")]
    InvalidEntryName { path: String },
}

/// Everything that can go wrong while processing one chapter.
///
/// These never leave the chapter's task boundary: they are logged and recorded in the run
/// summary, and the worker moves on.
#[derive(Error, Debug)]
pub enum ChapterError {
    #[error("Failed to resolve pages: {0}")]
    Source(#[from] SourceError),

    #[error("Failed to download page: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to build archive: {0}")]
    Pack(#[from] PackError),

    #[error("Failed to prepare chapter files: {0}")]
    IOError(#[from] io::Error),

    #[error("Chapter processing panicked: {message}")]
    Panicked { message: String },
}

/// Conditions that abort a whole run.
#[derive(Error, Debug)]
pub enum DownloaderError {
    #[error("Failed to create destination directory. error: {message}")]
    DirCreationError { message: String },

    #[error("Manga title can't be used as a directory name: {0}")]
    InvalidMangaName(#[from] CommonError),

    #[error("Failed to build the HTTP client: {0}")]
    ClientBuildError(#[from] reqwest::Error),

    #[error("A download worker stopped unexpectedly: {0}")]
    WorkerFailed(#[from] JoinError),

    #[error("The chapter queue lock was poisoned by a panicking worker")]
    QueuePoisoned,
}
