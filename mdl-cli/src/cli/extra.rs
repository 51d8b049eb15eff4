use std::str::FromStr;

use log::{debug, warn};
use mdl_common::ChapterNumber;
use mdl_sources::prelude::{CatalogSource, ChapterSelection, SourceRegistry};

use super::AVAILABLE_SOURCES;
use crate::settings::{SOURCES_DIR_NAME, config_dir};

/// The registry of every source found in the configuration directory, loaded once.
///
/// Problems while loading are logged; the registry is then simply missing those sources.
pub fn get_sources<'a>() -> &'a SourceRegistry {
    AVAILABLE_SOURCES.get_or_init(|| {
        let mut registry = SourceRegistry::new();

        match config_dir() {
            Ok(dir) => {
                let sources_dir = dir.join(SOURCES_DIR_NAME);
                match CatalogSource::load_dir(&sources_dir, &mut registry) {
                    Ok(count) => debug!("Loaded {} catalogs from {}", count, sources_dir.display()),
                    Err(error) => warn!("Failed to load sources from {}: {}", sources_dir.display(), error),
                }
            }
            Err(error) => warn!("{}", error),
        }

        registry
    })
}

pub fn validate_source(input: &str) -> Result<String, String> {
    let sources = get_sources();

    sources.get(input).map_or_else(
        |_| {
            Err(format!(
                "Invalid source: {}. Available sources are: {:?}",
                input,
                sources.names().collect::<Vec<_>>()
            ))
        },
        |_| Ok(input.to_string()),
    )
}

/// Parses `all`, `last`, a single chapter number or an inclusive `start-end` range.
pub fn parse_selection(input: &str) -> Result<ChapterSelection, String> {
    let input = input.trim();

    match input.to_ascii_lowercase().as_str() {
        "all" => return Ok(ChapterSelection::All),
        "last" | "latest" => return Ok(ChapterSelection::Last),
        _ => {}
    }

    let (start, end) = match input.split_once('-') {
        Some((start, end)) => (parse_number(start)?, parse_number(end)?),
        None => {
            let number = parse_number(input)?;
            (number, number)
        }
    };

    if start > end {
        return Err(format!("Range start {} is after its end {}", start, end));
    }

    Ok(ChapterSelection::Range { start, end })
}

fn parse_number(input: &str) -> Result<ChapterNumber, String> {
    ChapterNumber::from_str(input.trim()).map_err(|error| error.to_string())
}
