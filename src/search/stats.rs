//! Aggregates shown next to the note list: per-category counts, totals and
//! the most recently touched notes.

use indexmap::IndexMap;

use crate::model::{CategoryFilter, Note};

pub const DEFAULT_RECENT_LIMIT: usize = 3;

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Note counts keyed by filter, in sidebar order (`all` first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts(IndexMap<CategoryFilter, usize>);

impl CategoryCounts {
    pub fn get(&self, filter: CategoryFilter) -> usize {
        self.0.get(&filter).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryFilter, usize)> + '_ {
        self.0.iter().map(|(filter, count)| (*filter, *count))
    }
}

pub fn category_counts(notes: &[Note]) -> CategoryCounts {
    let mut counts: IndexMap<CategoryFilter, usize> =
        CategoryFilter::all_filters().map(|filter| (filter, 0)).collect();
    for note in notes {
        if let Some(total) = counts.get_mut(&CategoryFilter::All) {
            *total += 1;
        }
        if let Some(count) = counts.get_mut(&CategoryFilter::Only(note.category)) {
            *count += 1;
        }
    }
    CategoryCounts(counts)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteStats {
    pub total_notes: usize,
    pub total_words: usize,
}

pub fn note_stats(notes: &[Note]) -> NoteStats {
    let total_words = notes
        .iter()
        .filter(|note| !note.title.is_empty() || !note.content.is_empty())
        .map(|note| word_count(&note.title) + word_count(&note.content))
        .sum();
    NoteStats {
        total_notes: notes.len(),
        total_words,
    }
}

/// The `limit` most recently updated notes, newest first.
pub fn recent_notes(notes: &[Note], limit: usize) -> Vec<&Note> {
    let mut recent: Vec<&Note> = notes.iter().collect();
    recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    recent.truncate(limit);
    recent
}
