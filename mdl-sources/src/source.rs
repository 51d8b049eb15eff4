//! The uniform contract every content source implements.
//!
//! ## Implementing a source
//! A source only has to answer four questions: which works match a search term, which
//! chapters a work has, which page images a chapter has, and which headers (if any) a page
//! request needs. Everything else (queueing, downloading, packaging) is handled by the
//! downloader, which never knows which concrete source it talks to.
//!
//! ```rust
//! use mdl_common::{Chapter, Manga};
//! use mdl_sources::prelude::*;
//!
//! #[derive(Debug)]
//! struct Static;
//!
//! #[async_trait::async_trait]
//! impl ContentSource for Static {
//!     fn name(&self) -> &str {
//!         "static"
//!     }
//!
//!     async fn search(&self, _term: &str) -> Result<Vec<Manga>, SourceError> {
//!         Ok(vec![Manga::new("Example", "https://example.test/m", "static")])
//!     }
//!
//!     async fn get_chapters(&self, manga_url: &str) -> Result<Vec<Chapter>, SourceError> {
//!         Ok(vec![Chapter::new("Chapter 1", format!("{manga_url}/1"), 1)])
//!     }
//!
//!     async fn get_chapter_images(&self, chapter_url: &str) -> Result<Vec<String>, SourceError> {
//!         Ok(vec![format!("{chapter_url}/01.png")])
//!     }
//! }
//! ```

use std::fmt::Debug;
use std::sync::Arc;

use ahash::HashMap;
use async_trait::async_trait;
use bitflags::bitflags;
use mdl_common::{Chapter, Manga};

use crate::error::SourceError;

/// Header name to value, sent along with every page request of a source.
pub type DownloadHeaders = HashMap<String, String>;

/// Convenience type alias for a source shared between the registry and running workers.
pub type SharedSource = Arc<dyn ContentSource>;

bitflags! {
    /// Capabilities a source advertises, used for listing sources to the user.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceFeatures: u8 {
        const SEARCH = 0b0000_0001;
        const CHAPTER_LIST = 0b0000_0010;
        const DOWNLOAD_HEADERS = 0b0000_0100;
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync + Debug {
    /// Unique identifier of this source. Also written into every archive descriptor.
    fn name(&self) -> &str;

    /// Capabilities of this source. Defaults to searching and listing chapters.
    fn features(&self) -> SourceFeatures {
        SourceFeatures::SEARCH | SourceFeatures::CHAPTER_LIST
    }

    /// Works matching `term`. An empty result is legitimate.
    async fn search(&self, term: &str) -> Result<Vec<Manga>, SourceError>;

    /// All chapters of the work at `manga_url`, ascending by number.
    async fn get_chapters(&self, manga_url: &str) -> Result<Vec<Chapter>, SourceError>;

    /// Absolute URLs of every page of the chapter at `chapter_url`, in reading order.
    ///
    /// An empty list means the chapter has no pages; it is not an error.
    async fn get_chapter_images(&self, chapter_url: &str) -> Result<Vec<String>, SourceError>;

    /// Extra headers needed to fetch the page at `url` (a referer, a session cookie...).
    ///
    /// Sources that need none keep the default empty map.
    fn get_download_headers(&self, _url: &str) -> DownloadHeaders {
        DownloadHeaders::default()
    }
}
