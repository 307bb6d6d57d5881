use std::cmp::Ordering;

use icu_collator::{Collator, CollatorOptions};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::model::{CategoryFilter, Note};

pub mod stats;

pub use stats::{
    category_counts, note_stats, recent_notes, word_count, CategoryCounts, NoteStats,
    DEFAULT_RECENT_LIMIT,
};

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SortKey {
    /// Most recently modified first.
    #[default]
    Updated,
    /// Most recently created first.
    Created,
    Title,
    TitleDesc,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::Updated => "Last modified",
            SortKey::Created => "Date created",
            SortKey::Title => "Title A-Z",
            SortKey::TitleDesc => "Title Z-A",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortKey::Updated => SortKey::Created,
            SortKey::Created => SortKey::Title,
            SortKey::Title => SortKey::TitleDesc,
            SortKey::TitleDesc => SortKey::Updated,
        }
    }

    fn compare(self, a: &Note, b: &Note, titles: &TitleCollator) -> Ordering {
        match self {
            SortKey::Updated => b.updated_at.cmp(&a.updated_at),
            SortKey::Created => b.created_at.cmp(&a.created_at),
            SortKey::Title => titles.compare(&a.title, &b.title),
            SortKey::TitleDesc => titles.compare(&b.title, &a.title),
        }
    }
}

/// Inputs of the list view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub category: CategoryFilter,
    pub search: String,
    pub sort: SortKey,
}

impl ViewQuery {
    pub fn new(category: CategoryFilter, search: impl Into<String>, sort: SortKey) -> Self {
        Self {
            category,
            search: search.into(),
            sort,
        }
    }

    /// Lowercased search needle; `None` when the query is blank. Surrounding
    /// whitespace is part of the needle once searching is on.
    pub fn needle(&self) -> Option<String> {
        if self.search.trim().is_empty() {
            None
        } else {
            Some(self.search.to_lowercase())
        }
    }

    pub fn is_filtered(&self) -> bool {
        self.category != CategoryFilter::All || self.needle().is_some()
    }
}

/// Filters by category, then by case-insensitive substring on title or
/// content, then sorts what is left. The sort is stable, so equal keys keep
/// their collection order.
pub fn derive_view<'a>(notes: &'a [Note], query: &ViewQuery) -> Vec<&'a Note> {
    let needle = query.needle();
    let mut view: Vec<&Note> = notes
        .iter()
        .filter(|note| query.category.matches(note.category))
        .filter(|note| match needle.as_deref() {
            Some(needle) => matches_search(note, needle),
            None => true,
        })
        .collect();
    let titles = TitleCollator::new();
    view.sort_by(|a, b| query.sort.compare(a, b, &titles));
    view
}

/// `needle` must already be lowercase.
pub fn matches_search(note: &Note, needle: &str) -> bool {
    note.title.to_lowercase().contains(needle) || note.content.to_lowercase().contains(needle)
}

/// Orders titles with the Unicode root collation: accents and case only
/// matter once the base letters tie, and lowercase sorts before uppercase.
pub struct TitleCollator {
    collator: Option<Collator>,
}

impl TitleCollator {
    pub fn new() -> Self {
        match Collator::try_new(&Default::default(), CollatorOptions::new()) {
            Ok(collator) => Self {
                collator: Some(collator),
            },
            Err(err) => {
                tracing::warn!(?err, "collation data unavailable, sorting titles case-folded");
                Self { collator: None }
            }
        }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match &self.collator {
            Some(collator) => collator.compare(a, b),
            None => case_folded(a, b),
        }
    }
}

impl Default for TitleCollator {
    fn default() -> Self {
        Self::new()
    }
}

/// One-off title comparison. Sorting code should hold a [`TitleCollator`].
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    TitleCollator::new().compare(a, b)
}

fn case_folded(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| b.cmp(a))
}
