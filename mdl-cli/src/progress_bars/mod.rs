use std::fmt::Write;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use mdl_core::progress::{ChapterProgressUpdater, ChapterStage, LogType, ProgressListener};
use owo_colors::OwoColorize;

const PROGRESS_CHARS: &str = "━━";

struct BarTemplates {
    pub main: &'static str,
    pub chapter: &'static str,
}

impl Default for BarTemplates {
    fn default() -> Self {
        Self {
            main: "{spinner:.green.bold} {elapsed_precise:.bold} {wide_bar:.green/white.dim} {percent:.bold}  {pos:.green} chapters (eta. {eta:.blue})",
            chapter: "{spinner:.blue.bold} {bar:30.blue/white.dim} {pages:>9.bold} {prefix:<20.yellow} {msg}",
        }
    }
}

/// Handles CLI progress display using `indicatif`.
///
/// One main bar counts finished chapters; every chapter being worked on gets its own bar
/// below it, removed again once the chapter is done.
#[derive(Debug)]
pub struct IndicatifProgressHandler {
    main_bar: ProgressBar,
    multi_pb: MultiProgress,
}

impl IndicatifProgressHandler {
    pub fn new(initial_len: u64) -> Self {
        let template = BarTemplates::default();
        let bar = ProgressBar::new(initial_len).with_style(master_progress_style(&template));
        bar.set_draw_target(ProgressDrawTarget::stderr());
        bar.enable_steady_tick(Duration::from_millis(100));

        let multi = MultiProgress::new();
        let main = multi.add(bar);

        Self {
            main_bar: main,
            multi_pb: multi,
        }
    }
}

#[derive(Debug)]
struct IndicatifChapterProgressUpdater {
    bar: ProgressBar,
}

impl ChapterProgressUpdater for IndicatifChapterProgressUpdater {
    fn set_stage(&self, stage: ChapterStage) {
        self.bar.set_prefix(stage.to_string());
    }

    fn set_page_total(&self, total: u64) {
        self.bar.set_length(total);
    }

    fn page_done(&self) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressListener for IndicatifProgressHandler {
    fn set_main_total(&self, total: u64) {
        self.main_bar.set_length(total);
    }

    fn main_tick(&self) {
        self.main_bar.inc(1);
    }

    fn main_done(&self) {
        self.main_bar.finish_with_message("All chapters processed.");
    }

    fn add_chapter_task(&self, name: String) -> Box<dyn ChapterProgressUpdater> {
        let template = BarTemplates::default();

        let pb = ProgressBar::new(0)
            .with_style(chapter_progress_style(&template))
            .with_message(name);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.enable_steady_tick(Duration::from_millis(100));

        let managed_pb = self.multi_pb.add(pb);

        Box::new(IndicatifChapterProgressUpdater { bar: managed_pb })
    }

    fn log_event(&self, log_type: LogType, target: &str, message: &str) {
        let formatted_message = match log_type {
            LogType::Skip => format!(
                "{} {} {}",
                target.blue().italic(),
                message.green().bold(),
                "Skipping...".green().bold()
            ),
            LogType::Success => format!("{} {}", target.blue().italic(), message.green().bold()),
            LogType::Warning => format!(
                "{} {} {}",
                target.blue().italic(),
                message.yellow().bold(),
                "Warning.".yellow().bold()
            ),
            LogType::Error => format!(
                "{} {} {}",
                target.blue().italic(),
                message.red().bold(),
                "Error.".red().bold()
            ),
        };

        self.main_bar.println(formatted_message);
    }
}

fn master_progress_style(templates: &BarTemplates) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(templates.main)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key("pos", |state: &ProgressState, w: &mut dyn Write| {
            let _ = write!(w, "{}/{}", state.pos(), state.len().unwrap_or(0));
        })
        .with_key("percent", |state: &ProgressState, w: &mut dyn Write| {
            let _ = write!(w, "{:>3.0}%", state.fraction() * 100_f32);
        })
        .progress_chars(PROGRESS_CHARS)
}

fn chapter_progress_style(templates: &BarTemplates) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(templates.chapter)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key("pages", |state: &ProgressState, w: &mut dyn Write| {
            match state.len() {
                Some(len) if len > 0 => {
                    let _ = write!(w, "{}/{}", state.pos(), len);
                }
                _ => {
                    let _ = write!(w, "-");
                }
            }
        })
        .progress_chars(PROGRESS_CHARS)
}
