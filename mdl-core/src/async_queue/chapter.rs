use std::any::Any;
use std::io::ErrorKind;
use std::panic::AssertUnwindSafe;
use std::path::Path;

use futures::{FutureExt, StreamExt, TryStreamExt, future, stream};
use log::{debug, info, warn};
use mdl_common::names::page_file_name;
use tokio::fs::{create_dir_all, remove_dir_all, try_exists};

use crate::comic_info::ArchiveDescriptor;
use crate::error::ChapterError;
use crate::progress::{ChapterProgressUpdater, ChapterStage, LogType};

use super::cbz::pack;
use super::fetch::fetch_image;
use super::task::ChapterTask;
use super::{ChapterOutcome, WorkerContext};

impl WorkerContext {
    /// Runs one chapter from archive check to cleanup.
    ///
    /// Never fails: every error is contained here and turned into [`ChapterOutcome::Failed`].
    pub(crate) async fn process(&self, task: &ChapterTask) -> ChapterOutcome {
        let archive_path = task.archive_path();

        // Anything at the final path is a committed archive.
        match try_exists(&archive_path).await {
            Ok(true) => {
                debug!("{} already exists", archive_path.display());
                self.progress_listener.log_event(
                    LogType::Skip,
                    &task.label(),
                    "archive already exists",
                );
                return ChapterOutcome::Skipped;
            }
            Ok(false) => {}
            Err(error) => {
                warn!("Can't check for {}: {}", archive_path.display(), error);
                let error = ChapterError::from(error);
                self.progress_listener
                    .log_event(LogType::Error, &task.label(), &error.to_string());
                return ChapterOutcome::Failed { error };
            }
        }

        let updater = self.progress_listener.add_chapter_task(task.archive_name());
        updater.set_stage(ChapterStage::Queued);

        let temp_dir = task.temp_dir();
        let result = AssertUnwindSafe(self.download_chapter(task, &temp_dir, updater.as_ref()))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(ChapterError::Panicked {
                    message: panic_message(payload.as_ref()),
                })
            });

        updater.set_stage(ChapterStage::Cleaning);
        Self::remove_temp_dir(&temp_dir).await;

        let outcome = match result {
            Ok(0) => {
                self.progress_listener
                    .log_event(LogType::Warning, &task.label(), "no pages found");
                updater.set_stage(ChapterStage::Done);
                ChapterOutcome::Empty
            }
            Ok(pages) => {
                info!("{} saved with {} pages", archive_path.display(), pages);
                self.progress_listener.log_event(
                    LogType::Success,
                    &task.label(),
                    &format!("saved with {} pages", pages),
                );
                updater.set_stage(ChapterStage::Done);
                ChapterOutcome::Downloaded { pages }
            }
            Err(error) => {
                warn!("{} ({}) failed: {}", task.label(), task.chapter.url, error);
                self.progress_listener
                    .log_event(LogType::Error, &task.label(), &error.to_string());
                updater.set_stage(ChapterStage::Failed);
                ChapterOutcome::Failed { error }
            }
        };
        updater.finish();

        outcome
    }

    /// Resolves, downloads, describes and packs one chapter, returning its page count.
    ///
    /// Zero pages means nothing was fetched and no archive was written.
    async fn download_chapter(
        &self,
        task: &ChapterTask,
        temp_dir: &Path,
        updater: &dyn ChapterProgressUpdater,
    ) -> Result<usize, ChapterError> {
        // Leftovers of an interrupted run must not end up in the archive.
        Self::remove_temp_dir(temp_dir).await;
        create_dir_all(temp_dir).await?;

        updater.set_stage(ChapterStage::FetchingLinks);
        let urls = self.source.get_chapter_images(&task.chapter.url).await?;

        if urls.is_empty() {
            return Ok(0);
        }

        updater.set_stage(ChapterStage::FetchingImages);
        updater.set_page_total(urls.len() as u64);
        debug!("{}: fetching {} pages", task.label(), urls.len());

        // Names come from list position, so completion order doesn't matter.
        stream::iter(urls.iter().cloned().enumerate())
            .map(|(position, url)| {
                let destination = temp_dir.join(page_file_name(position, &url));
                let headers = self.source.get_download_headers(&url);
                async move {
                    fetch_image(&self.client, &url, &destination, &headers).await?;
                    updater.page_done();
                    Ok::<(), ChapterError>(())
                }
            })
            .buffer_unordered(self.image_concurrency)
            .try_for_each(|()| future::ok(()))
            .await?;

        let descriptor = ArchiveDescriptor {
            series: task.parent_title.clone(),
            title: task.chapter.title.clone(),
            number: task.chapter.number,
            source_url: task.chapter.url.clone(),
            page_count: urls.len(),
            source_id: self.source.name().to_string(),
        };
        descriptor.write_to(temp_dir).await?;

        updater.set_stage(ChapterStage::Packaging);
        pack(temp_dir, &task.archive_path()).await?;

        Ok(urls.len())
    }

    async fn remove_temp_dir(temp_dir: &Path) {
        if let Err(error) = remove_dir_all(temp_dir).await {
            if error.kind() != ErrorKind::NotFound {
                warn!(
                    "Failed to remove temporary directory {}: {}",
                    temp_dir.display(),
                    error
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| (*msg).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
