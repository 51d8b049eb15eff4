//! The `ComicInfo.xml` descriptor embedded in every chapter archive.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use log::debug;
use mdl_common::ChapterNumber;
use tokio::fs::write;

pub const DESCRIPTOR_FILE_NAME: &str = "ComicInfo.xml";

/// Metadata written next to the pages of a chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveDescriptor {
    pub series: String,
    pub title: String,
    pub number: ChapterNumber,
    pub source_url: String,
    pub page_count: usize,
    pub source_id: String,
}

impl ArchiveDescriptor {
    pub fn to_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<ComicInfo xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <Series>{}</Series>
  <Title>{}</Title>
  <Number>{}</Number>
  <Web>{}</Web>
  <PageCount>{}</PageCount>
  <ScanInformation>{}</ScanInformation>
</ComicInfo>
"#,
            escape_xml(&self.series),
            escape_xml(&self.title),
            self.number,
            escape_xml(&self.source_url),
            self.page_count,
            escape_xml(&self.source_id),
        )
    }

    /// Writes the descriptor into `dir`, returning the written path.
    pub async fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(DESCRIPTOR_FILE_NAME);
        write(&path, self.to_xml()).await?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

/// Replaces the five XML-reserved characters with their entities.
pub fn escape_xml(input: &str) -> Cow<'_, str> {
    if !input.contains(['<', '>', '&', '\'', '"']) {
        return Cow::Borrowed(input);
    }

    let mut escaped = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
