use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mdl_common::{Chapter, Manga};
use mdl_core::async_queue::part_path;
use mdl_core::error::{ChapterError, FetchError};
use mdl_core::progress::{ChapterProgressUpdater, ChapterStage, LogType, ProgressListener};
use mdl_core::{ChapterOutcome, DownloadOptions, Downloader, RunSummary};
use mdl_sources::prelude::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::ZipArchive;

const MANGA_TITLE: &str = "Test: Manga";
const SAFE_TITLE: &str = "Test Manga";

/// Serves page lists from memory and records which chapters were asked for.
#[derive(Debug, Default)]
struct MockSource {
    pages: HashMap<String, Result<Vec<String>, String>>,
    panic_on: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl MockSource {
    fn with_pages(mut self, chapter_url: &str, pages: Vec<String>) -> Self {
        self.pages.insert(chapter_url.to_string(), Ok(pages));
        self
    }

    fn with_failure(mut self, chapter_url: &str, message: &str) -> Self {
        self.pages
            .insert(chapter_url.to_string(), Err(message.to_string()));
        self
    }

    fn with_panic(mut self, chapter_url: &str) -> Self {
        self.panic_on = Some(chapter_url.to_string());
        self
    }

    fn calls_for(&self, chapter_url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| *c == chapter_url)
            .count()
    }
}

#[async_trait]
impl ContentSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, _term: &str) -> Result<Vec<Manga>, SourceError> {
        Ok(Vec::new())
    }

    async fn get_chapters(&self, _manga_url: &str) -> Result<Vec<Chapter>, SourceError> {
        Ok(Vec::new())
    }

    async fn get_chapter_images(&self, chapter_url: &str) -> Result<Vec<String>, SourceError> {
        self.calls.lock().unwrap().push(chapter_url.to_string());
        if self.panic_on.as_deref() == Some(chapter_url) {
            panic!("parser bug");
        }
        match self.pages.get(chapter_url) {
            Some(Ok(pages)) => Ok(pages.clone()),
            Some(Err(message)) => Err(SourceError::InvalidResponse {
                message: message.clone(),
            }),
            None => Err(SourceError::UnknownChapter {
                url: chapter_url.to_string(),
            }),
        }
    }

    fn get_download_headers(&self, _url: &str) -> DownloadHeaders {
        let mut headers = DownloadHeaders::default();
        headers.insert("X-Reader".to_string(), "mock".to_string());
        headers
    }
}

/// Tracks how many chapters are between `add_chapter_task` and `finish` at once.
#[derive(Debug, Default)]
struct Recorder {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    ticks: AtomicU64,
    events: Mutex<Vec<(LogType, String)>>,
}

#[derive(Debug)]
struct RecordingUpdater {
    active: Arc<AtomicUsize>,
}

impl ChapterProgressUpdater for RecordingUpdater {
    fn set_stage(&self, _stage: ChapterStage) {}
    fn set_page_total(&self, _total: u64) {}
    fn page_done(&self) {}
    fn finish(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ProgressListener for Recorder {
    fn set_main_total(&self, _total: u64) {}
    fn main_tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
    fn main_done(&self) {}
    fn add_chapter_task(&self, _name: String) -> Box<dyn ChapterProgressUpdater> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Box::new(RecordingUpdater {
            active: self.active.clone(),
        })
    }
    fn log_event(&self, log_type: LogType, target: &str, _message: &str) {
        self.events
            .lock()
            .unwrap()
            .push((log_type, target.to_string()));
    }
}

fn chapter(number: i32) -> Chapter {
    Chapter::new(
        format!("Chapter {number}"),
        format!("https://source.test/c/{number}"),
        number,
    )
}

fn page_urls(server: &MockServer, chapter: i32, count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| format!("{}/c{}/{}.jpg", server.uri(), chapter, i))
        .collect()
}

async fn serve_pages(server: &MockServer, chapter: i32, count: usize) {
    for i in 1..=count {
        Mock::given(method("GET"))
            .and(path(format!("/c{chapter}/{i}.jpg")))
            .and(header("X-Reader", "mock"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(format!("c{chapter}p{i}").into_bytes()),
            )
            .mount(server)
            .await;
    }
}

fn downloader(dir: &Path, parallel: bool, chapters: usize, recorder: Arc<Recorder>) -> Downloader {
    let options = DownloadOptions {
        download_dir: dir.to_path_buf(),
        parallel,
        max_chapter_concurrency: chapters,
        max_image_concurrency: 3,
    };
    Downloader::new(options, None, Some(recorder)).unwrap()
}

async fn run(
    downloader: &Downloader,
    chapters: Vec<Chapter>,
    source: Arc<MockSource>,
) -> RunSummary {
    let manga = Manga::new(MANGA_TITLE, "https://source.test/m", "mock");
    downloader.run(&manga, chapters, source).await.unwrap()
}

fn archive_entries(path: &Path) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            (entry.name().to_string(), body)
        })
        .collect()
}

fn entry_names(path: &Path) -> Vec<String> {
    archive_entries(path).into_iter().map(|(name, _)| name).collect()
}

fn manga_dir(root: &Path) -> std::path::PathBuf {
    root.join(SAFE_TITLE)
}

#[tokio::test]
async fn sequential_run_writes_one_archive_per_chapter() {
    let server = MockServer::start().await;
    serve_pages(&server, 1, 2).await;
    serve_pages(&server, 2, 2).await;

    let source = Arc::new(
        MockSource::default()
            .with_pages("https://source.test/c/1", page_urls(&server, 1, 2))
            .with_pages("https://source.test/c/2", page_urls(&server, 2, 2)),
    );
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let dl = downloader(dir.path(), false, 5, recorder.clone());

    let summary = run(&dl, vec![chapter(1), chapter(2)], source).await;

    assert!(summary.is_success());
    assert_eq!(summary.downloaded(), 2);
    assert_eq!(recorder.ticks.load(Ordering::SeqCst), 2);
    assert_eq!(
        recorder
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == LogType::Success)
            .count(),
        2
    );

    let first = manga_dir(dir.path()).join("Test Manga-001.cbz");
    let second = manga_dir(dir.path()).join("Test Manga-002.cbz");
    assert_eq!(summary.chapters[0].archive_path, first);
    assert_eq!(entry_names(&first), ["001.jpg", "002.jpg", "ComicInfo.xml"]);
    assert_eq!(entry_names(&second), ["001.jpg", "002.jpg", "ComicInfo.xml"]);

    let entries = archive_entries(&second);
    assert_eq!(entries[0].1, "c2p1");
    assert_eq!(entries[1].1, "c2p2");
    assert!(entries[2].1.contains("<Series>Test: Manga</Series>"));
    assert!(entries[2].1.contains("<Number>2</Number>"));
    assert!(entries[2].1.contains("<PageCount>2</PageCount>"));
    assert!(entries[2].1.contains("<ScanInformation>mock</ScanInformation>"));

    // Temporary chapter directories are gone.
    assert!(!manga_dir(dir.path()).join("Test Manga-001").exists());
    assert!(!manga_dir(dir.path()).join("Test Manga-002").exists());
}

#[tokio::test]
async fn existing_archive_is_not_fetched_again() {
    let server = MockServer::start().await;
    serve_pages(&server, 2, 2).await;

    let source = Arc::new(
        MockSource::default()
            .with_pages("https://source.test/c/1", page_urls(&server, 1, 2))
            .with_pages("https://source.test/c/2", page_urls(&server, 2, 2)),
    );
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(manga_dir(dir.path())).unwrap();
    let existing = manga_dir(dir.path()).join("Test Manga-001.cbz");
    std::fs::write(&existing, b"already here").unwrap();

    let recorder = Arc::new(Recorder::default());
    let dl = downloader(dir.path(), true, 5, recorder.clone());
    let summary = run(&dl, vec![chapter(1), chapter(2)], source.clone()).await;

    assert!(matches!(summary.chapters[0].outcome, ChapterOutcome::Skipped));
    assert!(matches!(
        summary.chapters[1].outcome,
        ChapterOutcome::Downloaded { pages: 2 }
    ));
    assert_eq!(source.calls_for("https://source.test/c/1"), 0);
    assert_eq!(source.calls_for("https://source.test/c/2"), 1);
    assert_eq!(std::fs::read(&existing).unwrap(), b"already here");

    let skipped = recorder.events.lock().unwrap();
    assert!(skipped.iter().any(|(t, target)| *t == LogType::Skip && target.contains("Chapter 1")));
}

#[tokio::test]
async fn rerun_is_idempotent() {
    let server = MockServer::start().await;
    serve_pages(&server, 1, 2).await;

    let source = Arc::new(
        MockSource::default().with_pages("https://source.test/c/1", page_urls(&server, 1, 2)),
    );
    let dir = tempfile::tempdir().unwrap();
    let dl = downloader(dir.path(), true, 5, Arc::new(Recorder::default()));

    run(&dl, vec![chapter(1)], source.clone()).await;
    let archive = manga_dir(dir.path()).join("Test Manga-001.cbz");
    let before = std::fs::read(&archive).unwrap();
    let requests_before = server.received_requests().await.unwrap().len();

    let summary = run(&dl, vec![chapter(1)], source.clone()).await;

    assert!(matches!(summary.chapters[0].outcome, ChapterOutcome::Skipped));
    assert_eq!(source.calls_for("https://source.test/c/1"), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), requests_before);
    assert_eq!(std::fs::read(&archive).unwrap(), before);
}

#[tokio::test]
async fn chapter_without_pages_is_completed_without_archive() {
    let server = MockServer::start().await;
    serve_pages(&server, 4, 1).await;

    let source = Arc::new(
        MockSource::default()
            .with_pages("https://source.test/c/3", Vec::new())
            .with_pages("https://source.test/c/4", page_urls(&server, 4, 1)),
    );
    let dir = tempfile::tempdir().unwrap();
    let dl = downloader(dir.path(), true, 5, Arc::new(Recorder::default()));

    let summary = run(&dl, vec![chapter(3), chapter(4)], source).await;

    assert!(summary.is_success());
    assert!(matches!(summary.chapters[0].outcome, ChapterOutcome::Empty));
    assert_eq!(summary.empty(), 1);
    assert!(!manga_dir(dir.path()).join("Test Manga-003.cbz").exists());
    assert!(!manga_dir(dir.path()).join("Test Manga-003").exists());
    assert!(manga_dir(dir.path()).join("Test Manga-004.cbz").exists());
}

#[tokio::test]
async fn failed_page_discards_the_whole_chapter_only() {
    let server = MockServer::start().await;
    for c in [1, 2, 3, 5] {
        serve_pages(&server, c, 2).await;
    }
    // Pages 1 and 3 of chapter 4 exist, page 2 is gone.
    Mock::given(method("GET"))
        .and(path("/c4/1.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"c4p1".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c4/2.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c4/3.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"c4p3".to_vec()))
        .mount(&server)
        .await;

    let mut source = MockSource::default();
    for c in [1, 2, 3, 5] {
        source = source.with_pages(&format!("https://source.test/c/{c}"), page_urls(&server, c, 2));
    }
    let source = Arc::new(source.with_pages("https://source.test/c/4", page_urls(&server, 4, 3)));

    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let dl = downloader(dir.path(), true, 2, recorder.clone());

    let chapters = (1..=5).map(chapter).collect();
    let summary = run(&dl, chapters, source).await;

    assert!(!summary.is_success());
    assert_eq!(summary.downloaded(), 4);
    let failed: Vec<_> = summary.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].chapter.number.to_string(), "4");
    assert!(matches!(
        failed[0].outcome,
        ChapterOutcome::Failed {
            error: ChapterError::Fetch(FetchError::RemoteStatus { .. })
        }
    ));

    let dir4 = manga_dir(dir.path());
    assert!(!dir4.join("Test Manga-004.cbz").exists());
    assert!(!part_path(&dir4.join("Test Manga-004.cbz")).exists());
    assert!(!dir4.join("Test Manga-004").exists());
    for c in ["001", "002", "003", "005"] {
        assert!(dir4.join(format!("Test Manga-{c}.cbz")).exists());
    }

    // Every chapter reached a final state and the failure was reported.
    assert_eq!(recorder.ticks.load(Ordering::SeqCst), 5);
    assert!(
        recorder
            .events
            .lock()
            .unwrap()
            .iter()
            .any(|(t, target)| *t == LogType::Error && target.contains("Chapter 4"))
    );
}

#[tokio::test]
async fn source_failure_is_contained() {
    let server = MockServer::start().await;
    serve_pages(&server, 2, 1).await;

    let source = Arc::new(
        MockSource::default()
            .with_failure("https://source.test/c/1", "layout changed")
            .with_pages("https://source.test/c/2", page_urls(&server, 2, 1)),
    );
    let dir = tempfile::tempdir().unwrap();
    let dl = downloader(dir.path(), false, 1, Arc::new(Recorder::default()));

    let summary = run(&dl, vec![chapter(1), chapter(2)], source).await;

    assert!(matches!(
        summary.chapters[0].outcome,
        ChapterOutcome::Failed {
            error: ChapterError::Source(_)
        }
    ));
    assert!(!manga_dir(dir.path()).join("Test Manga-001").exists());
    assert!(manga_dir(dir.path()).join("Test Manga-002.cbz").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn page_names_follow_list_order_not_completion_order() {
    let server = MockServer::start().await;
    // Earlier pages answer later.
    for (i, delay) in [(1, 400), (2, 200), (3, 0)] {
        Mock::given(method("GET"))
            .and(path(format!("/c1/{i}.jpg")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(format!("page {i}").into_bytes())
                    .set_delay(Duration::from_millis(delay)),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/c1/4.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"page 4".to_vec()))
        .mount(&server)
        .await;

    let mut urls = page_urls(&server, 1, 3);
    urls.push(format!("{}/c1/4.png?size=large", server.uri()));
    let source = Arc::new(MockSource::default().with_pages("https://source.test/c/1", urls));

    let dir = tempfile::tempdir().unwrap();
    let dl = downloader(dir.path(), true, 5, Arc::new(Recorder::default()));
    run(&dl, vec![chapter(1)], source).await;

    let entries = archive_entries(&manga_dir(dir.path()).join("Test Manga-001.cbz"));
    let pages: Vec<(&str, &str)> = entries
        .iter()
        .map(|(name, body)| (name.as_str(), body.as_str()))
        .take(4)
        .collect();
    assert_eq!(
        pages,
        [
            ("001.jpg", "page 1"),
            ("002.jpg", "page 2"),
            ("003.jpg", "page 3"),
            ("004.png", "page 4"),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_more_chapters_in_flight_than_the_bound() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"img".to_vec())
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let mut source = MockSource::default();
    for c in 1..=8 {
        source = source.with_pages(&format!("https://source.test/c/{c}"), page_urls(&server, c, 1));
    }
    let source = Arc::new(source);
    let chapters: Vec<Chapter> = (1..=8).map(chapter).collect();

    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let dl = downloader(dir.path(), true, 3, recorder.clone());
    let summary = run(&dl, chapters.clone(), source.clone()).await;

    assert_eq!(summary.downloaded(), 8);
    let peak = recorder.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "{peak} chapters were in flight");
    assert!(peak >= 2, "chapters never overlapped");

    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let dl = downloader(dir.path(), false, 3, recorder.clone());
    run(&dl, chapters, source).await;

    assert_eq!(recorder.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn leftover_pages_from_an_interrupted_run_are_discarded() {
    let server = MockServer::start().await;
    serve_pages(&server, 1, 2).await;

    let source = Arc::new(
        MockSource::default().with_pages("https://source.test/c/1", page_urls(&server, 1, 2)),
    );
    let dir = tempfile::tempdir().unwrap();
    let stale = manga_dir(dir.path()).join("Test Manga-001");
    std::fs::create_dir_all(&stale).unwrap();
    std::fs::write(stale.join("001.png"), b"old").unwrap();
    std::fs::write(stale.join("003.jpg"), b"old").unwrap();

    let dl = downloader(dir.path(), true, 5, Arc::new(Recorder::default()));
    let summary = run(&dl, vec![chapter(1)], source).await;

    assert!(matches!(
        summary.chapters[0].outcome,
        ChapterOutcome::Downloaded { pages: 2 }
    ));
    let archive = manga_dir(dir.path()).join("Test Manga-001.cbz");
    assert_eq!(entry_names(&archive), ["001.jpg", "002.jpg", "ComicInfo.xml"]);
    assert!(archive_entries(&archive)[2].1.contains("<PageCount>2</PageCount>"));
    assert!(!stale.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_source_only_fails_its_chapter() {
    let server = MockServer::start().await;
    serve_pages(&server, 2, 1).await;

    let source = Arc::new(
        MockSource::default()
            .with_panic("https://source.test/c/1")
            .with_pages("https://source.test/c/2", page_urls(&server, 2, 1)),
    );
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Recorder::default());
    let dl = downloader(dir.path(), true, 2, recorder.clone());

    let summary = run(&dl, vec![chapter(1), chapter(2)], source).await;

    assert_eq!(summary.chapters.len(), 2);
    match &summary.chapters[0].outcome {
        ChapterOutcome::Failed {
            error: ChapterError::Panicked { message },
        } => assert_eq!(message, "parser bug"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(
        summary.chapters[1].outcome,
        ChapterOutcome::Downloaded { pages: 1 }
    ));
    assert!(!manga_dir(dir.path()).join("Test Manga-001").exists());
    assert!(manga_dir(dir.path()).join("Test Manga-002.cbz").exists());
    assert_eq!(recorder.ticks.load(Ordering::SeqCst), 2);
    assert_eq!(recorder.active.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn packaging_failure_commits_nothing() {
    let server = MockServer::start().await;
    serve_pages(&server, 1, 2).await;
    serve_pages(&server, 2, 2).await;

    let source = Arc::new(
        MockSource::default()
            .with_pages("https://source.test/c/1", page_urls(&server, 1, 2))
            .with_pages("https://source.test/c/2", page_urls(&server, 2, 2)),
    );
    let dir = tempfile::tempdir().unwrap();
    let archive = manga_dir(dir.path()).join("Test Manga-001.cbz");
    // A directory where the archive is assembled makes the packer fail.
    std::fs::create_dir_all(part_path(&archive)).unwrap();

    let dl = downloader(dir.path(), false, 1, Arc::new(Recorder::default()));
    let summary = run(&dl, vec![chapter(1), chapter(2)], source).await;

    assert!(matches!(
        summary.chapters[0].outcome,
        ChapterOutcome::Failed {
            error: ChapterError::Pack(_)
        }
    ));
    assert!(!archive.exists());
    assert!(!part_path(&archive).is_file());
    assert!(!manga_dir(dir.path()).join("Test Manga-001").exists());
    assert!(matches!(
        summary.chapters[1].outcome,
        ChapterOutcome::Downloaded { pages: 2 }
    ));
    assert!(manga_dir(dir.path()).join("Test Manga-002.cbz").exists());
}

#[tokio::test]
async fn unreadable_archive_path_fails_instead_of_refetching() {
    let server = MockServer::start().await;
    serve_pages(&server, 2, 1).await;

    // Its archive name is far beyond any file name limit, so the existence check errors.
    let huge = Chapter::new("Huge", "https://source.test/c/huge", 1e300);
    let source = Arc::new(
        MockSource::default()
            .with_pages("https://source.test/c/huge", page_urls(&server, 2, 1))
            .with_pages("https://source.test/c/2", page_urls(&server, 2, 1)),
    );
    let dir = tempfile::tempdir().unwrap();
    let dl = downloader(dir.path(), false, 1, Arc::new(Recorder::default()));

    let summary = run(&dl, vec![chapter(2), huge], source.clone()).await;

    assert!(matches!(
        summary.chapters[1].outcome,
        ChapterOutcome::Failed {
            error: ChapterError::IOError(_)
        }
    ));
    assert_eq!(source.calls_for("https://source.test/c/huge"), 0);
    assert!(matches!(
        summary.chapters[0].outcome,
        ChapterOutcome::Downloaded { pages: 1 }
    ));
}
