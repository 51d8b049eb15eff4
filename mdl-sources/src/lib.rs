//! Everything needed to find chapters and their pages on a remote content source.
//!
//! A content source is any type implementing [`ContentSource`](source::ContentSource). Sources
//! are collected into a [`SourceRegistry`](registry::SourceRegistry) at startup and looked up by
//! name; the downloader only ever sees the trait object.

extern crate mdl_common;

pub mod catalog;
pub mod error;
pub mod prelude;
pub mod registry;
pub mod selection;
pub mod source;
