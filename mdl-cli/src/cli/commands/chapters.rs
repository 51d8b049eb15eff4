use clap::Args;
use mdl_common::{Chapter, Manga};
use mdl_sources::prelude::{SharedSource, SourceRegistry, sort_chapters};

use super::search::SearchArgs;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ChapterList {
    #[clap(flatten)]
    pub query: SearchArgs,

    /// Which search result to use, counting from 1
    #[clap(
        short,
        long,
        value_parser(clap::value_parser!(u16).range(1..)),
        default_value_t = 1,
        help_heading = "GENERAL"
    )]
    pub pick: u16,
}

impl ChapterList {
    /// Picks one manga from the search results.
    pub async fn pick_manga(&self, registry: &SourceRegistry) -> Result<Manga, CliError> {
        let found = self.query.find(registry).await?;

        if found.is_empty() {
            return Err(CliError::NoResults {
                term: self.query.term(),
            });
        }

        let count = found.len();
        found
            .into_iter()
            .nth(usize::from(self.pick) - 1)
            .ok_or(CliError::PickOutOfRange {
                pick: usize::from(self.pick),
                found: count,
            })
    }

    /// The picked manga, the source it came from and its chapters in ascending order.
    pub async fn resolve(
        &self,
        registry: &SourceRegistry,
    ) -> Result<(Manga, SharedSource, Vec<Chapter>), CliError> {
        let manga = self.pick_manga(registry).await?;
        let source = registry.get(&manga.source_id)?;

        let mut chapters = source.get_chapters(&manga.url).await?;
        sort_chapters(&mut chapters);

        Ok((manga, source, chapters))
    }
}
