//! Provides the chapter worker pool and everything it drives.
//!
//! The [`Downloader`] takes an ordered list of chapters, fills a [`TaskQueue`] and runs a
//! fixed number of workers over it. Each worker resolves a chapter's pages through the
//! content source, fetches them into a temporary directory, writes the `ComicInfo.xml`
//! descriptor, packs everything into a cbz and removes the temporary directory.
//!
//! A chapter whose archive already exists is skipped without touching the network, which
//! makes re-running an interrupted download cheap. A failing chapter never affects the
//! others; its error is logged and recorded in the returned [`RunSummary`].

mod cbz;
mod chapter;
mod fetch;
mod task;

pub use cbz::{pack, part_path};
pub use fetch::fetch_image;
pub use task::{ChapterTask, TaskQueue};

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info};
use mdl_common::names::safe_file_name;
use mdl_common::{Chapter, Manga};
use mdl_sources::source::SharedSource;
use reqwest::Client;
use tokio::fs::create_dir_all;
use tokio::spawn;

use crate::error::{ChapterError, DownloaderError};
use crate::progress::{no_op_progress_listener, SharedProgressListener};

pub const DEFAULT_CHAPTER_CONCURRENCY: usize = 5;
pub const DEFAULT_IMAGE_CONCURRENCY: usize = 5;

const CLIENT_USER_AGENT: &str = concat!("Rust Manga Downloader/", env!("CARGO_PKG_VERSION"));

/// Options for configuring where and how fast chapters are downloaded.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Base directory. Each manga gets its own sub-directory in here.
    pub download_dir: PathBuf,
    /// If `false`, chapters are processed one at a time regardless of
    /// `max_chapter_concurrency`.
    pub parallel: bool,
    /// Number of chapters processed at the same time when `parallel` is set.
    pub max_chapter_concurrency: usize,
    /// Number of page requests in flight within one chapter.
    pub max_image_concurrency: usize,
}

impl DownloadOptions {
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            download_dir,
            parallel: true,
            max_chapter_concurrency: DEFAULT_CHAPTER_CONCURRENCY,
            max_image_concurrency: DEFAULT_IMAGE_CONCURRENCY,
        }
    }

    /// Number of workers a run will use.
    pub fn worker_count(&self) -> usize {
        if self.parallel {
            self.max_chapter_concurrency.max(1)
        } else {
            1
        }
    }
}

/// Final state of a single chapter.
#[derive(Debug)]
pub enum ChapterOutcome {
    /// Archive written with this many pages.
    Downloaded { pages: usize },
    /// Archive already existed; nothing was fetched.
    Skipped,
    /// The source listed no pages; no archive was written.
    Empty,
    Failed { error: ChapterError },
}

impl ChapterOutcome {
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug)]
pub struct ChapterReport {
    pub sequence_index: usize,
    pub chapter: Chapter,
    pub archive_path: PathBuf,
    pub outcome: ChapterOutcome,
}

/// Per-chapter results of a run, in selection order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub manga_dir: PathBuf,
    pub chapters: Vec<ChapterReport>,
}

impl RunSummary {
    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, ChapterOutcome::Downloaded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ChapterOutcome::Skipped))
    }

    pub fn empty(&self) -> usize {
        self.count(|o| matches!(o, ChapterOutcome::Empty))
    }

    pub fn failed(&self) -> impl Iterator<Item = &ChapterReport> {
        self.chapters.iter().filter(|r| r.outcome.is_failure())
    }

    /// `true` when no chapter failed.
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }

    fn count(&self, predicate: impl Fn(&ChapterOutcome) -> bool) -> usize {
        self.chapters.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

/// State shared read-only by every worker of a run.
#[derive(Debug)]
pub(crate) struct WorkerContext {
    client: Client,
    source: SharedSource,
    image_concurrency: usize,
    progress_listener: SharedProgressListener,
}

/// Manages the concurrent download of a manga's chapters.
pub struct Downloader {
    client: Client,
    options: DownloadOptions,
    progress_listener: SharedProgressListener,
}

impl Downloader {
    /// Set up the downloader.
    ///
    /// Without a custom client a default one is built with this crate's user agent.
    pub fn new(
        options: DownloadOptions,
        custom_client: Option<Client>,
        progress_listener: Option<SharedProgressListener>,
    ) -> Result<Self, DownloaderError> {
        let client = match custom_client {
            Some(cli) => cli,
            None => Client::builder().user_agent(CLIENT_USER_AGENT).build()?,
        };

        let listener = progress_listener.unwrap_or_else(no_op_progress_listener);
        Ok(Self {
            client,
            options,
            progress_listener: listener,
        })
    }

    /// `<download dir>/<safe manga title>`.
    pub fn manga_dir(&self, manga: &Manga) -> Result<PathBuf, DownloaderError> {
        Ok(self.options.download_dir.join(safe_file_name(&manga.title)?))
    }

    /// One task per chapter, in the given order.
    pub fn build_tasks(
        &self,
        manga: &Manga,
        chapters: Vec<Chapter>,
    ) -> Result<Vec<ChapterTask>, DownloaderError> {
        let safe_name = safe_file_name(&manga.title)?;
        let output_dir = self.options.download_dir.join(&safe_name);
        let total = chapters.len();

        Ok(chapters
            .into_iter()
            .enumerate()
            .map(|(index, chapter)| ChapterTask {
                chapter,
                output_dir: output_dir.clone(),
                safe_base_name: safe_name.clone(),
                sequence_index: index,
                total_count: total,
                parent_title: manga.title.clone(),
            })
            .collect())
    }

    /// Downloads `chapters` of `manga` from `source` and waits until every chapter is done.
    ///
    /// Only setup problems and broken workers make this fail; chapter failures are reported
    /// per chapter in the returned summary.
    pub async fn run(
        &self,
        manga: &Manga,
        chapters: Vec<Chapter>,
        source: SharedSource,
    ) -> Result<RunSummary, DownloaderError> {
        let manga_dir = self.manga_dir(manga)?;
        create_dir_all(&manga_dir)
            .await
            .map_err(|error| DownloaderError::DirCreationError {
                message: error.to_string(),
            })?;

        let tasks = self.build_tasks(manga, chapters)?;
        let total = tasks.len();
        let workers = self.options.worker_count().min(total.max(1));

        info!(
            "Downloading {} chapters of {} into {} with {} workers",
            total,
            manga.title,
            manga_dir.display(),
            workers
        );
        self.progress_listener.set_main_total(total as u64);

        let queue = Arc::new(TaskQueue::new());
        queue.enqueue(tasks)?;

        let context = Arc::new(WorkerContext {
            client: self.client.clone(),
            source,
            image_concurrency: self.options.max_image_concurrency.max(1),
            progress_listener: self.progress_listener.clone(),
        });

        let handles = (0..workers).map(|worker_id| {
            let queue = queue.clone();
            let context = context.clone();

            spawn(async move {
                debug!("Worker {} started", worker_id);
                let mut reports = Vec::new();

                while let Some(task) = queue.dequeue_one()? {
                    let outcome = context.process(&task).await;
                    context.progress_listener.main_tick();

                    reports.push(ChapterReport {
                        sequence_index: task.sequence_index,
                        archive_path: task.archive_path(),
                        chapter: task.chapter,
                        outcome,
                    });
                }

                debug!("Worker {} finished", worker_id);
                Ok::<_, DownloaderError>(reports)
            })
        });

        let mut reports = Vec::with_capacity(total);
        for joined in join_all(handles).await {
            reports.extend(joined??);
        }
        reports.sort_by_key(|r| r.sequence_index);

        self.progress_listener.main_done();

        let summary = RunSummary {
            manga_dir,
            chapters: reports,
        };
        info!(
            "Finished {}: {} downloaded, {} skipped, {} empty, {} failed",
            manga.title,
            summary.downloaded(),
            summary.skipped(),
            summary.empty(),
            summary.failed().count()
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_honours_parallel_flag() {
        let mut options = DownloadOptions::new(PathBuf::from("/tmp/x"));
        assert_eq!(options.worker_count(), DEFAULT_CHAPTER_CONCURRENCY);

        options.max_chapter_concurrency = 0;
        assert_eq!(options.worker_count(), 1);

        options.max_chapter_concurrency = 8;
        options.parallel = false;
        assert_eq!(options.worker_count(), 1);
    }

    #[test]
    fn tasks_share_the_sanitized_manga_dir() {
        let downloader = Downloader::new(
            DownloadOptions::new(PathBuf::from("/library")),
            Some(Client::new()),
            None,
        )
        .unwrap();
        let manga = Manga::new("Who: Are/You?", "https://s.test/m", "local");
        let chapters = vec![
            Chapter::new("One", "https://s.test/1", 1),
            Chapter::new("One and a half", "https://s.test/1.5", 1.5),
        ];

        let tasks = downloader.build_tasks(&manga, chapters).unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].archive_path(), PathBuf::from("/library/Who AreYou/Who AreYou-001.cbz"));
        assert_eq!(tasks[1].archive_path(), PathBuf::from("/library/Who AreYou/Who AreYou-1.5.cbz"));
        assert_eq!(tasks[1].sequence_index, 1);
        assert_eq!(tasks[1].total_count, 2);
        assert_eq!(tasks[1].parent_title, "Who: Are/You?");
    }

    #[test]
    fn unusable_title_is_rejected() {
        let downloader = Downloader::new(
            DownloadOptions::new(PathBuf::from("/library")),
            Some(Client::new()),
            None,
        )
        .unwrap();
        let manga = Manga::new("???", "https://s.test/m", "local");

        assert!(matches!(
            downloader.build_tasks(&manga, Vec::new()),
            Err(DownloaderError::InvalidMangaName(_))
        ));
    }
}
