//! A content source backed by a TOML catalog on disk.
//!
//! Catalogs describe works, their chapters and the page URLs of every chapter. They are the
//! one source the downloader ships with; site-specific scrapers plug in through the same
//! [`ContentSource`] trait.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use async_trait::async_trait;
use log::{debug, info, warn};
use mdl_common::reqwest::Url;
use mdl_common::{Chapter, ChapterNumber, Manga};
use serde::Deserialize;

use crate::error::SourceError;
use crate::registry::SourceRegistry;
use crate::selection::sort_chapters;
use crate::source::{ContentSource, DownloadHeaders, SourceFeatures};

pub const SAMPLE_CATALOG_TOML: &str = include_str!("sample.toml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    name: String,
    base_url: String,
    referer: Option<String>,
    #[serde(default)]
    manga: Vec<CatalogManga>,
}

#[derive(Debug, Deserialize)]
struct CatalogManga {
    title: String,
    url: String,
    #[serde(default)]
    chapters: Vec<CatalogChapter>,
}

#[derive(Debug, Deserialize)]
struct CatalogChapter {
    title: String,
    url: String,
    number: ChapterNumber,
    attribution: Option<String>,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Debug)]
pub struct CatalogSource {
    name: String,
    /// Relative image paths are resolved against this.
    base_url: Url,
    referer: Option<String>,
    manga: Vec<CatalogManga>,
}

impl CatalogSource {
    pub fn from_toml(contents: &str) -> Result<Self, SourceError> {
        let file: CatalogFile = toml::from_str(contents)?;
        let base_url =
            Url::parse(&file.base_url).map_err(|error| SourceError::InvalidBaseUrl {
                url: file.base_url.clone(),
                message: error.to_string(),
            })?;

        Ok(Self {
            name: file.name,
            base_url,
            referer: file.referer,
            manga: file.manga,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Loads every `*.toml` catalog in `dir` into `registry`, returning how many were loaded.
    ///
    /// A missing directory is created and seeded with the sample catalog. Catalogs that fail
    /// to parse are logged and skipped.
    pub fn load_dir(dir: &Path, registry: &mut SourceRegistry) -> Result<usize, SourceError> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            let mut sample = File::create(dir.join("sample.toml"))?;
            sample.write_all(SAMPLE_CATALOG_TOML.as_bytes())?;
            info!("Created sample catalog in {}", dir.display());
        }

        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            match Self::from_path(&path) {
                Ok(source) => {
                    debug!("Loaded catalog {} from {}", source.name, path.display());
                    registry.register(source);
                    loaded += 1;
                }
                Err(error) => warn!("Skipping catalog {}: {}", path.display(), error),
            }
        }

        Ok(loaded)
    }

    fn find_manga(&self, url: &str) -> Option<&CatalogManga> {
        self.manga.iter().find(|m| m.url == url)
    }

    fn find_chapter(&self, url: &str) -> Option<&CatalogChapter> {
        self.manga
            .iter()
            .flat_map(|m| m.chapters.iter())
            .find(|c| c.url == url)
    }
}

#[async_trait]
impl ContentSource for CatalogSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn features(&self) -> SourceFeatures {
        let mut features = SourceFeatures::SEARCH | SourceFeatures::CHAPTER_LIST;
        if self.referer.is_some() {
            features |= SourceFeatures::DOWNLOAD_HEADERS;
        }
        features
    }

    async fn search(&self, term: &str) -> Result<Vec<Manga>, SourceError> {
        let needle = term.trim().to_lowercase();

        Ok(self
            .manga
            .iter()
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .map(|m| {
                let mut found = Manga::new(&m.title, &m.url, &self.name);
                found.latest_chapter = m
                    .chapters
                    .iter()
                    .map(|c| c.number)
                    .max()
                    .map(|n| n.to_string());
                found
            })
            .collect())
    }

    async fn get_chapters(&self, manga_url: &str) -> Result<Vec<Chapter>, SourceError> {
        let manga = self
            .find_manga(manga_url)
            .ok_or_else(|| SourceError::UnknownManga {
                url: manga_url.to_string(),
            })?;

        let mut chapters: Vec<Chapter> = manga
            .chapters
            .iter()
            .map(|c| Chapter {
                title: c.title.clone(),
                url: c.url.clone(),
                number: c.number,
                attribution: c.attribution.clone(),
            })
            .collect();
        sort_chapters(&mut chapters);

        Ok(chapters)
    }

    async fn get_chapter_images(&self, chapter_url: &str) -> Result<Vec<String>, SourceError> {
        let chapter = self
            .find_chapter(chapter_url)
            .ok_or_else(|| SourceError::UnknownChapter {
                url: chapter_url.to_string(),
            })?;

        chapter
            .images
            .iter()
            .map(|image| {
                self.base_url
                    .join(image)
                    .map(String::from)
                    .map_err(|error| SourceError::InvalidResponse {
                        message: format!("bad image path {}: {}", image, error),
                    })
            })
            .collect()
    }

    fn get_download_headers(&self, _url: &str) -> DownloadHeaders {
        let mut headers = DownloadHeaders::default();
        if let Some(referer) = &self.referer {
            headers.insert("Referer".to_string(), referer.clone());
        }
        headers
    }
}
