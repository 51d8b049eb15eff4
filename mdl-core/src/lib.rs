//! Download and packaging infrastructure for the manga downloader.
//!
//! The entry point is [`Downloader`](async_queue::Downloader): hand it a manga, the chapters
//! to fetch and the content source they came from, and it leaves one `.cbz` per chapter in
//! `<download dir>/<manga title>/`.

pub mod async_queue;
pub mod comic_info;
pub mod error;
pub mod progress;

pub use async_queue::{ChapterOutcome, DownloadOptions, Downloader, RunSummary};
