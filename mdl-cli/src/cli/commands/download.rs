use clap::Args;
use log::debug;
use mdl_common::Chapter;
use mdl_sources::prelude::{ChapterSelection, resolve_duplicates};

use super::chapters::ChapterList;
use crate::cli::extra::parse_selection;

#[derive(Debug, Args)]
pub struct Download {
    #[clap(flatten)]
    pub target: ChapterList,

    /// Chapters to download: `all`, `last`, a number or an inclusive range like `3-7`
    #[clap(
        short,
        long,
        value_parser = parse_selection,
        default_value = "all",
        help_heading = "DOWNLOAD"
    )]
    pub chapters: ChapterSelection,

    /// Scanlation group to prefer when a chapter was released more than once
    #[clap(short, long, value_name = "NAME", help_heading = "DOWNLOAD")]
    pub group: Option<String>,
}

impl Download {
    /// One release per chapter number, narrowed to the requested chapters.
    pub fn select(&self, chapters: Vec<Chapter>) -> Vec<Chapter> {
        let unique = resolve_duplicates(chapters, self.group.as_deref());
        let selected = self.chapters.apply(unique);
        debug!("{} chapters selected ({})", selected.len(), self.chapters);
        selected
    }
}
