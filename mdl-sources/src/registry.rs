use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, warn};
use mdl_common::Manga;

use crate::error::SourceError;
use crate::source::{ContentSource, SharedSource};

/// All content sources available to this process, keyed by [`ContentSource::name`].
///
/// Iteration order is alphabetical by name, which also fixes the order of
/// [`search_all`](SourceRegistry::search_all) results.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    sources: BTreeMap<String, SharedSource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `source` to the registry. A source already registered under the same name is
    /// replaced.
    pub fn register<S: ContentSource + 'static>(&mut self, source: S) -> &mut Self {
        self.register_shared(Arc::new(source))
    }

    pub fn register_shared(&mut self, source: SharedSource) -> &mut Self {
        let name = source.name().to_string();
        debug!("Registering source {}", name);
        if self.sources.insert(name.clone(), source).is_some() {
            warn!("Source {} was registered twice, keeping the latest one", name);
        }
        self
    }

    pub fn get(&self, name: &str) -> Result<SharedSource, SourceError> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::UnknownSource {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedSource> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Searches every registered source concurrently and concatenates the results.
    ///
    /// A source that fails is logged and contributes nothing; this never fails as a whole.
    pub async fn search_all(&self, term: &str) -> Vec<Manga> {
        if self.sources.is_empty() {
            warn!("No sources registered, nothing to search");
            return Vec::new();
        }

        let searches = self.sources.values().map(|source| async move {
            match source.search(term).await {
                Ok(found) => {
                    debug!("{} returned {} results for {:?}", source.name(), found.len(), term);
                    found
                }
                Err(error) => {
                    warn!("Search on {} failed: {}", source.name(), error);
                    Vec::new()
                }
            }
        });

        join_all(searches).await.into_iter().flatten().collect()
    }
}
