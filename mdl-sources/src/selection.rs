//! Turning a source's chapter list into the ordered list handed to the downloader.
//!
//! Sources may list the same number several times (rival translation groups) and don't
//! always sort. The helpers here sort, narrow down and de-duplicate so the downloader only
//! ever receives a final, ascending list.

use std::fmt::{Display, Formatter};

use log::debug;
use mdl_common::{Chapter, ChapterNumber};

/// Which chapters of a work to download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChapterSelection {
    All,
    /// Only the highest-numbered chapter.
    Last,
    /// Every chapter whose number lies in `start..=end`.
    Range {
        start: ChapterNumber,
        end: ChapterNumber,
    },
}

impl ChapterSelection {
    /// Applies the selection to an already sorted list.
    pub fn apply(&self, sorted: Vec<Chapter>) -> Vec<Chapter> {
        match self {
            Self::All => sorted,
            Self::Last => sorted.into_iter().last().into_iter().collect(),
            Self::Range { start, end } => sorted
                .into_iter()
                .filter(|c| c.number >= *start && c.number <= *end)
                .collect(),
        }
    }
}

impl Display for ChapterSelection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all chapters"),
            Self::Last => write!(f, "last chapter"),
            Self::Range { start, end } => write!(f, "chapters {} to {}", start, end),
        }
    }
}

/// Stable ascending sort by chapter number.
pub fn sort_chapters(chapters: &mut [Chapter]) {
    chapters.sort_by(|a, b| a.number.cmp(&b.number));
}

/// Keeps a single chapter per number.
///
/// When several chapters share a number, the one attributed to `preferred_group`
/// (case-insensitive) wins; otherwise the first one listed is kept. The result is sorted.
pub fn resolve_duplicates(mut chapters: Vec<Chapter>, preferred_group: Option<&str>) -> Vec<Chapter> {
    sort_chapters(&mut chapters);

    let mut resolved: Vec<Chapter> = Vec::with_capacity(chapters.len());

    for chapter in chapters {
        match resolved.last_mut() {
            Some(kept) if kept.number == chapter.number => {
                if is_preferred(&chapter, preferred_group) && !is_preferred(kept, preferred_group) {
                    debug!("Preferring {} over {}", chapter, kept);
                    *kept = chapter;
                } else {
                    debug!("Dropping duplicate {}", chapter);
                }
            }
            _ => resolved.push(chapter),
        }
    }

    resolved
}

fn is_preferred(chapter: &Chapter, preferred_group: Option<&str>) -> bool {
    match (preferred_group, &chapter.attribution) {
        (Some(wanted), Some(group)) => group.eq_ignore_ascii_case(wanted),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapters(numbers: &[f64]) -> Vec<Chapter> {
        numbers
            .iter()
            .map(|n| Chapter::new(format!("Ch {n}"), format!("https://s.test/{n}"), *n))
            .collect()
    }

    fn numbers(list: &[Chapter]) -> Vec<f64> {
        list.iter().map(|c| c.number.value()).collect()
    }

    #[test]
    fn sorting_is_ascending_and_stable() {
        let mut list = chapters(&[3.0, 1.0, 2.5, 2.0]);
        list.push(Chapter::new("second 1", "https://s.test/1b", 1));
        sort_chapters(&mut list);

        assert_eq!(numbers(&list), [1.0, 1.0, 2.0, 2.5, 3.0]);
        assert_eq!(list[1].title, "second 1");
    }

    #[test]
    fn selections() {
        let mut list = chapters(&[5.0, 1.0, 2.0, 3.5, 4.0]);
        sort_chapters(&mut list);

        assert_eq!(numbers(&ChapterSelection::All.apply(list.clone())), [1.0, 2.0, 3.5, 4.0, 5.0]);
        assert_eq!(numbers(&ChapterSelection::Last.apply(list.clone())), [5.0]);
        assert_eq!(
            numbers(
                &ChapterSelection::Range {
                    start: 2.0.into(),
                    end: 4.0.into()
                }
                .apply(list.clone())
            ),
            [2.0, 3.5, 4.0]
        );
        assert!(
            ChapterSelection::Range {
                start: 9.0.into(),
                end: 10.0.into()
            }
            .apply(list)
            .is_empty()
        );
        assert!(ChapterSelection::Last.apply(Vec::new()).is_empty());
    }

    #[test]
    fn duplicates_prefer_the_requested_group() {
        let list = vec![
            Chapter::new("2 by A", "https://s.test/2a", 2).with_attribution("Alpha"),
            Chapter::new("1 by A", "https://s.test/1a", 1).with_attribution("Alpha"),
            Chapter::new("2 by B", "https://s.test/2b", 2).with_attribution("Beta"),
            Chapter::new("3 by B", "https://s.test/3b", 3).with_attribution("Beta"),
        ];

        let preferred = resolve_duplicates(list.clone(), Some("beta"));
        let urls: Vec<&str> = preferred.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, ["https://s.test/1a", "https://s.test/2b", "https://s.test/3b"]);

        let first_listed = resolve_duplicates(list, None);
        let urls: Vec<&str> = first_listed.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, ["https://s.test/1a", "https://s.test/2a", "https://s.test/3b"]);
    }
}
