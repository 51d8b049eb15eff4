use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use log::debug;
use mdl_common::Chapter;
use mdl_common::names::{archive_file_name, chapter_base_name};

use crate::error::DownloaderError;

/// One chapter waiting to be downloaded.
///
/// Built once per selected chapter when the queue is filled and owned by whichever worker
/// dequeues it.
#[derive(Debug, Clone)]
pub struct ChapterTask {
    pub chapter: Chapter,
    /// The manga directory: final archives and temporary chapter directories live here.
    pub output_dir: PathBuf,
    /// The sanitized manga title every file name starts with.
    pub safe_base_name: String,
    /// Zero-based position of this chapter in the selection.
    pub sequence_index: usize,
    pub total_count: usize,
    /// Title of the manga, as shown to the user.
    pub parent_title: String,
}

impl ChapterTask {
    /// `<safe name>-<padded number>`.
    pub fn base_name(&self) -> String {
        chapter_base_name(&self.safe_base_name, self.chapter.number)
    }

    pub fn archive_name(&self) -> String {
        archive_file_name(&self.base_name())
    }

    /// Where the finished archive ends up.
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir.join(self.archive_name())
    }

    /// Scratch directory holding pages and the descriptor until the archive is built.
    pub fn temp_dir(&self) -> PathBuf {
        self.output_dir.join(self.base_name())
    }

    /// `[3/12] Chapter title`, used to identify the chapter in messages.
    pub fn label(&self) -> String {
        format!(
            "[{}/{}] {}",
            self.sequence_index + 1,
            self.total_count,
            self.chapter.title
        )
    }
}

/// Chapters waiting for a worker.
///
/// Tasks are handed out in the order they were enqueued and each one exactly once, no
/// matter how many workers call [`dequeue_one`](TaskQueue::dequeue_one) at the same time.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<ChapterTask>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue<I>(&self, tasks: I) -> Result<(), DownloaderError>
    where
        I: IntoIterator<Item = ChapterTask>,
    {
        let mut queue = self
            .tasks
            .lock()
            .map_err(|_| DownloaderError::QueuePoisoned)?;
        queue.extend(tasks);
        debug!("{} chapters queued", queue.len());
        Ok(())
    }

    /// Takes the next task, or `None` once the queue is drained.
    pub fn dequeue_one(&self) -> Result<Option<ChapterTask>, DownloaderError> {
        let mut queue = self
            .tasks
            .lock()
            .map_err(|_| DownloaderError::QueuePoisoned)?;
        Ok(queue.pop_front())
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().map(|q| q.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
