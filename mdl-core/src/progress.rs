use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Type of log event, used for styling or filtering messages in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogType {
    /// Chapter was skipped because its archive already exists.
    Skip,
    /// Chapter archive written.
    Success,
    /// A non-critical issue or warning.
    Warning,
    /// A chapter failed.
    Error,
}

/// Where a chapter currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterStage {
    Queued,
    FetchingLinks,
    FetchingImages,
    Packaging,
    Cleaning,
    Done,
    Failed,
}

impl Display for ChapterStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "Queued"),
            Self::FetchingLinks => write!(f, "Fetching page links"),
            Self::FetchingImages => write!(f, "Downloading pages"),
            Self::Packaging => write!(f, "Building cbz"),
            Self::Cleaning => write!(f, "Cleaning up"),
            Self::Done => write!(f, "Done"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Trait for reporting overall progress of a run. All methods should be thread-safe.
///
/// Reporting is advisory: implementations must not block, and nothing the downloader does
/// depends on what they do.
pub trait ProgressListener: Send + Sync + Debug {
    /// Sets the total number of chapters in this run.
    fn set_main_total(&self, total: u64);
    /// Signals that one chapter reached a final state (written, skipped, empty or failed).
    fn main_tick(&self);
    /// Signals that every chapter has been processed.
    fn main_done(&self);

    /// Adds a new chapter for individual progress tracking.
    ///
    /// # Arguments
    /// * `name`: A descriptive name for the chapter (usually the archive file name).
    ///
    /// # Returns
    /// A `Box<dyn ChapterProgressUpdater>` the worker will call for stage and page updates.
    fn add_chapter_task(&self, name: String) -> Box<dyn ChapterProgressUpdater>;

    /// Logs a categorized event message to be displayed in the progress UI.
    ///
    /// # Arguments
    /// * `log_type`: The category of the log message.
    /// * `target`: A string identifying the subject of the log (e.g. the chapter).
    /// * `message`: The descriptive message content.
    fn log_event(&self, log_type: LogType, target: &str, message: &str);
}

/// Trait for updating the progress of a single chapter.
pub trait ChapterProgressUpdater: Send + Sync + Debug {
    fn set_stage(&self, stage: ChapterStage);
    /// Sets the number of pages this chapter has, once known.
    fn set_page_total(&self, total: u64);
    /// Signals that one more page is on disk.
    fn page_done(&self);
    /// Signals that this chapter is finished (successfully or not).
    fn finish(&self);
}

/// A no-operation implementation of `ProgressListener`.
/// Used as a default when no actual progress reporting is needed by the library consumer.
#[derive(Debug, Clone)]
pub struct NoOpProgressListener;

impl ProgressListener for NoOpProgressListener {
    fn set_main_total(&self, _total: u64) {}
    fn main_tick(&self) {}
    fn main_done(&self) {}
    fn add_chapter_task(&self, _name: String) -> Box<dyn ChapterProgressUpdater> {
        Box::new(NoOpChapterProgressUpdater)
    }
    fn log_event(&self, _log_type: LogType, _target: &str, _message: &str) {}
}

/// A no-operation implementation of `ChapterProgressUpdater`.
#[derive(Debug, Clone)]
pub struct NoOpChapterProgressUpdater;

impl ChapterProgressUpdater for NoOpChapterProgressUpdater {
    fn set_stage(&self, _stage: ChapterStage) {}
    fn set_page_total(&self, _total: u64) {}
    fn page_done(&self) {}
    fn finish(&self) {}
}

/// Convenience type alias for a shared, thread-safe progress listener.
pub type SharedProgressListener = Arc<dyn ProgressListener>;

/// Returns a shared instance of a `NoOpProgressListener`.
pub fn no_op_progress_listener() -> SharedProgressListener {
    Arc::new(NoOpProgressListener)
}
