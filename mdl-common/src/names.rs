//! Filesystem naming for chapters, archives and pages.

use log::debug;
use reqwest::Url;

use crate::error::CommonError;
use crate::ChapterNumber;

/// Characters that are illegal in a path segment on at least one supported platform.
const ILLEGAL_PATH_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Extension used for pages whose URL doesn't carry one.
pub const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Extension of every produced chapter archive.
pub const ARCHIVE_EXTENSION: &str = "cbz";

/// Strips path-illegal characters from `name` and trims the result.
///
/// ```
/// # use mdl_common::names::safe_file_name;
/// assert_eq!(safe_file_name(" Re:Zero / Arc 3? ").unwrap(), "ReZero  Arc 3");
/// assert!(safe_file_name("???").is_err());
/// ```
pub fn safe_file_name(name: &str) -> Result<String, CommonError> {
    let cleaned: String = name
        .chars()
        .filter(|c| !ILLEGAL_PATH_CHARS.contains(c))
        .collect();
    let trimmed = cleaned.trim();

    if trimmed.is_empty() {
        return Err(CommonError::EmptyFileName {
            name: name.to_string(),
        });
    }

    Ok(trimmed.to_string())
}

/// `<safe manga name>-<padded number>`, shared by the archive and its temporary directory.
#[inline]
pub fn chapter_base_name(safe_manga_name: &str, number: ChapterNumber) -> String {
    format!("{}-{}", safe_manga_name, number.padded())
}

#[inline]
pub fn archive_file_name(base_name: &str) -> String {
    format!("{}.{}", base_name, ARCHIVE_EXTENSION)
}

/// Extension of the last path segment of `url`, without the leading dot.
///
/// Query strings and fragments are ignored. Falls back to [`DEFAULT_IMAGE_EXTENSION`] when
/// the URL doesn't parse or its file name has no extension.
pub fn image_extension(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        debug!("Could not parse {} as an URL, assuming jpg", url);
        return DEFAULT_IMAGE_EXTENSION.to_string();
    };

    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|file| file.rsplit_once('.'))
        .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string())
}

/// File name of the page at zero-based `position`: 1-based, zero-padded to 3 digits.
#[inline]
pub fn page_file_name(position: usize, url: &str) -> String {
    format!("{:03}.{}", position + 1, image_extension(url))
}
