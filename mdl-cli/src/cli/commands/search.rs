use clap::Args;
use log::debug;
use mdl_common::Manga;
use mdl_sources::prelude::SourceRegistry;

use crate::cli::extra::validate_source;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Title (or part of it) to look for
    #[clap(value_parser, required = true)]
    pub term: Vec<String>,

    /// Only search this source
    #[clap(short, long, value_parser = validate_source, help_heading = "GENERAL")]
    pub source: Option<String>,
}

impl SearchArgs {
    pub fn term(&self) -> String {
        self.term.join(" ")
    }

    /// Runs the search on the selected source, or on every source when none was given.
    pub async fn find(&self, registry: &SourceRegistry) -> Result<Vec<Manga>, CliError> {
        let term = self.term();

        let found = match &self.source {
            Some(name) => registry.get(name)?.search(&term).await?,
            None => registry.search_all(&term).await,
        };

        debug!("{} results for \"{}\"", found.len(), term);
        Ok(found)
    }
}
