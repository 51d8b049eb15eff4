//! # Chapter Module
//!
//! Defines the records a content source produces: the owning [`Manga`] and its
//! [`Chapter`]s. Chapter numbers are decimals ([`ChapterNumber`]) so sub-releases like
//! `12.5` sort between `12` and `13`.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CommonError;

/// Decimal chapter number.
///
/// Ordering is total (`NaN` sorts after every number) so chapter lists can always be sorted.
/// Integral values display without a fractional part.
///
/// ```
/// # use mdl_common::ChapterNumber;
/// assert_eq!(ChapterNumber::new(12.0).to_string(), "12");
/// assert_eq!(ChapterNumber::new(12.5).to_string(), "12.5");
/// assert_eq!(ChapterNumber::new(1.0).padded(), "001");
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterNumber(f64);

impl ChapterNumber {
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub const fn value(&self) -> f64 {
        self.0
    }

    /// The display string left-padded with zeroes to at least 3 characters.
    ///
    /// This is the number part of every archive name, so `1` becomes `001` while
    /// `12.5` and `1234` are left untouched.
    pub fn padded(&self) -> String {
        format!("{:0>3}", self.to_string())
    }
}

impl PartialEq for ChapterNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ChapterNumber {}

impl PartialOrd for ChapterNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChapterNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for ChapterNumber {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<i32> for ChapterNumber {
    fn from(value: i32) -> Self {
        Self(f64::from(value))
    }
}

impl FromStr for ChapterNumber {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Self)
            .ok_or_else(|| CommonError::InvalidChapterNumber {
                value: s.to_string(),
            })
    }
}

impl Display for ChapterNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.fract() == 0.0 && self.0.is_finite() {
            write!(f, "{:.0}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A single release of a manga as listed by a content source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub url: String,
    pub number: ChapterNumber,
    /// Translation group or uploader, when the source distinguishes rival releases of the
    /// same number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

impl Chapter {
    pub fn new<T, U, N>(title: T, url: U, number: N) -> Self
    where
        T: Into<String>,
        U: Into<String>,
        N: Into<ChapterNumber>,
    {
        Self {
            title: title.into(),
            url: url.into(),
            number: number.into(),
            attribution: None,
        }
    }

    pub fn with_attribution<S: Into<String>>(mut self, group: S) -> Self {
        self.attribution = Some(group.into());
        self
    }
}

impl Display for Chapter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.attribution {
            Some(group) => write!(f, "#{} {} [{}]", self.number, self.title, group),
            None => write!(f, "#{} {}", self.number, self.title),
        }
    }
}

/// The work that owns a list of chapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manga {
    pub title: String,
    pub url: String,
    /// Name of the content source this manga was found on.
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_chapter: Option<String>,
}

impl Manga {
    pub fn new<T, U, S>(title: T, url: U, source_id: S) -> Self
    where
        T: Into<String>,
        U: Into<String>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            url: url.into(),
            source_id: source_id.into(),
            latest_chapter: None,
        }
    }
}
