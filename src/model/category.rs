use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Coarse tag attached to every note.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    Work,
    #[default]
    Personal,
    Ideas,
}

impl Category {
    /// Parses user or persisted input, falling back to `Personal` for
    /// anything unrecognised.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.trim().parse().unwrap_or_default()
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Ideas => "Ideas",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Category::Work => Category::Personal,
            Category::Personal => Category::Ideas,
            Category::Ideas => Category::Work,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            Category::Work => Category::Ideas,
            Category::Personal => Category::Work,
            Category::Ideas => Category::Personal,
        }
    }
}

/// Category selection used by the list view. `All` is the sentinel that
/// disables category filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Sidebar order: `all` first, then every category.
    pub fn all_filters() -> impl Iterator<Item = CategoryFilter> {
        std::iter::once(CategoryFilter::All).chain(Category::iter().map(CategoryFilter::Only))
    }

    pub fn matches(self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(expected) => expected == category,
        }
    }

    pub fn page_title(self) -> &'static str {
        match self {
            CategoryFilter::All => "All Notes",
            CategoryFilter::Only(Category::Work) => "Work Notes",
            CategoryFilter::Only(Category::Personal) => "Personal Notes",
            CategoryFilter::Only(Category::Ideas) => "Ideas",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CategoryFilter::All => "All",
            CategoryFilter::Only(category) => category.label(),
        }
    }

    pub fn next(self) -> Self {
        let filters: Vec<_> = Self::all_filters().collect();
        let idx = filters.iter().position(|f| *f == self).unwrap_or(0);
        filters[(idx + 1) % filters.len()]
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(category) => write!(f, "{category}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown category filter '{0}' (expected all, work, personal or ideas)")]
pub struct ParseFilterError(String);

impl FromStr for CategoryFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        trimmed
            .parse::<Category>()
            .map(CategoryFilter::Only)
            .map_err(|_| ParseFilterError(trimmed.to_string()))
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        CategoryFilter::Only(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_parse_defaults_to_personal() {
        assert_eq!(Category::parse_lenient("work"), Category::Work);
        assert_eq!(Category::parse_lenient(" IDEAS "), Category::Ideas);
        assert_eq!(Category::parse_lenient("groceries"), Category::Personal);
        assert_eq!(Category::parse_lenient(""), Category::Personal);
    }

    #[test]
    fn filter_parses_sentinel_and_categories() {
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "Work".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Only(Category::Work)
        );
        assert!("misc".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn filter_display_round_trips() {
        for filter in CategoryFilter::all_filters() {
            assert_eq!(filter.to_string().parse::<CategoryFilter>().unwrap(), filter);
        }
    }

    #[test]
    fn filter_cycle_wraps_around() {
        let mut filter = CategoryFilter::All;
        for _ in 0..4 {
            filter = filter.next();
        }
        assert_eq!(filter, CategoryFilter::All);
    }
}
