pub use crate::catalog::CatalogSource;
pub use crate::error::SourceError;
pub use crate::registry::SourceRegistry;
pub use crate::selection::{resolve_duplicates, sort_chapters, ChapterSelection};
pub use crate::source::{ContentSource, DownloadHeaders, SharedSource, SourceFeatures};
