//! Data structs shared by the manga downloader crates.
//!
//! Everything a content source hands to the downloader ([`Manga`](chapter::Manga),
//! [`Chapter`](chapter::Chapter)) lives here, together with the helpers that turn those
//! records into filesystem names.

// Public Exports
pub use log;
pub use reqwest;
pub use serde;

pub mod chapter;
pub mod error;
pub mod names;

pub use chapter::{Chapter, ChapterNumber, Manga};
