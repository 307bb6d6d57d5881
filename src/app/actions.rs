use bitflags::bitflags;

use crate::config::ViewMode;
use crate::model::{Category, CategoryFilter, NoteId};
use crate::repo::{NoteRepository, RepoResult};
use crate::search::SortKey;

use super::state::AppState;

bitflags! {
    /// Derived caches a command invalidates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Refresh: u8 {
        const VIEW = 0b0001;
        const COUNTS = 0b0010;
        const STATS = 0b0100;
        const RECENT = 0b1000;
        const ALL = Self::VIEW.bits() | Self::COUNTS.bits() | Self::STATS.bits() | Self::RECENT.bits();
    }
}

/// A user intent the controller applies to the repository and view state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateNote {
        title: String,
        content: String,
        category: Category,
    },
    UpdateNote {
        id: NoteId,
        title: String,
        content: String,
        category: Category,
    },
    DeleteNote {
        id: NoteId,
    },
    SetCategory(CategoryFilter),
    SetSearch(String),
    SetSort(SortKey),
    SetViewMode(ViewMode),
}

impl Command {
    pub fn refresh(&self) -> Refresh {
        match self {
            Command::CreateNote { .. } | Command::UpdateNote { .. } | Command::DeleteNote { .. } => {
                Refresh::ALL
            }
            Command::SetCategory(_) | Command::SetSearch(_) | Command::SetSort(_) => Refresh::VIEW,
            Command::SetViewMode(_) => Refresh::empty(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    pub message: Option<String>,
    /// Note the view should select afterwards.
    pub focus: Option<NoteId>,
}

impl ActionOutcome {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            focus: None,
        }
    }
}

pub struct ActionDispatcher<'a> {
    repo: &'a mut NoteRepository,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(repo: &'a mut NoteRepository) -> Self {
        Self { repo }
    }

    /// Applies `command`. On error neither the repository nor `state` is
    /// changed.
    pub fn dispatch(&mut self, state: &mut AppState, command: Command) -> RepoResult<ActionOutcome> {
        let refresh = command.refresh();
        let reset_selection = matches!(command, Command::SetCategory(_) | Command::SetSearch(_));
        let outcome = match command {
            Command::CreateNote {
                title,
                content,
                category,
            } => {
                let note = self.repo.create(&title, &content, category)?;
                ActionOutcome {
                    message: Some("Note created successfully!".into()),
                    focus: Some(note.id),
                }
            }
            Command::UpdateNote {
                id,
                title,
                content,
                category,
            } => {
                let note = self.repo.update(&id, &title, &content, category)?;
                ActionOutcome {
                    message: Some("Note updated successfully!".into()),
                    focus: Some(note.id),
                }
            }
            Command::DeleteNote { id } => {
                let note = self.repo.delete(&id)?;
                ActionOutcome::message(format!("Deleted \"{}\"", note.display_title()))
            }
            Command::SetCategory(filter) => {
                state.view.category = filter;
                state.sync_sidebar();
                ActionOutcome::default()
            }
            Command::SetSearch(search) => {
                state.view.search = search;
                ActionOutcome::default()
            }
            Command::SetSort(sort) => {
                state.view.sort = sort;
                ActionOutcome::message(format!("Sorted by {}", sort.label().to_lowercase()))
            }
            Command::SetViewMode(mode) => {
                state.view_mode = mode;
                ActionOutcome::message(format!("{} view", capitalize(mode.label())))
            }
        };

        state.refresh(self.repo.all(), refresh);
        if reset_selection {
            state.select_first();
        }
        if let Some(id) = &outcome.focus {
            state.select_id(id);
        }
        Ok(outcome)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::model::ManualClock;
    use crate::repo::RepoError;
    use crate::storage::NoteStorage;
    use assert_matches::assert_matches;
    use std::sync::Arc;
    use time::macros::datetime;
    use time::Duration;

    fn setup() -> (NoteRepository, AppState, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(datetime!(2024-09-01 10:00 UTC)));
        let repo = NoteRepository::with_clock(NoteStorage::in_memory(), clock.clone());
        let state = AppState::new(&AppConfig::default(), repo.all());
        (repo, state, clock)
    }

    fn create(title: &str, category: Category) -> Command {
        Command::CreateNote {
            title: title.into(),
            content: format!("{title} body"),
            category,
        }
    }

    #[test]
    fn create_refreshes_every_cache_and_selects_the_note() -> RepoResult<()> {
        let (mut repo, mut state, clock) = setup();
        let mut dispatcher = ActionDispatcher::new(&mut repo);
        dispatcher.dispatch(&mut state, create("First", Category::Work))?;
        clock.advance(Duration::minutes(1));
        let outcome = dispatcher.dispatch(&mut state, create("Second", Category::Ideas))?;

        assert_eq!(outcome.message.as_deref(), Some("Note created successfully!"));
        assert_eq!(state.selected_id(), outcome.focus.as_ref());
        assert_eq!(state.visible_len(), 2);
        assert_eq!(state.counts().get(CategoryFilter::Only(Category::Ideas)), 1);
        assert_eq!(state.stats().total_words, 6);
        assert_eq!(state.recent_notes(repo.all())[0].title, "Second");
        Ok(())
    }

    #[test]
    fn validation_error_leaves_state_alone() {
        let (mut repo, mut state, _clock) = setup();
        let mut dispatcher = ActionDispatcher::new(&mut repo);
        assert_matches!(
            dispatcher.dispatch(&mut state, create("  ", Category::Work)),
            Err(RepoError::Validation(_))
        );
        assert_eq!(state.visible_len(), 0);
        assert_eq!(state.stats().total_notes, 0);
    }

    #[test]
    fn filter_and_search_commands_narrow_the_view() -> RepoResult<()> {
        let (mut repo, mut state, _clock) = setup();
        let mut dispatcher = ActionDispatcher::new(&mut repo);
        for (title, category) in [
            ("Budget", Category::Work),
            ("Garden", Category::Personal),
            ("Budget trip", Category::Personal),
        ] {
            dispatcher.dispatch(&mut state, create(title, category))?;
        }

        dispatcher.dispatch(&mut state, Command::SetCategory(Category::Personal.into()))?;
        assert_eq!(state.visible_len(), 2);
        assert_eq!(state.sidebar_filter(), CategoryFilter::Only(Category::Personal));

        dispatcher.dispatch(&mut state, Command::SetSearch("BUDGET".into()))?;
        assert_eq!(state.visible_len(), 1);
        assert!(state.is_filtered());
        assert_eq!(state.counts().get(CategoryFilter::All), 3);
        Ok(())
    }

    #[test]
    fn changing_filters_selects_the_first_row_of_the_new_view() -> RepoResult<()> {
        let (mut repo, mut state, clock) = setup();
        let mut dispatcher = ActionDispatcher::new(&mut repo);
        for (title, category) in [
            ("Alpha", Category::Work),
            ("Beta", Category::Personal),
            ("Gamma", Category::Personal),
            ("Delta", Category::Work),
        ] {
            dispatcher.dispatch(&mut state, create(title, category))?;
            clock.advance(Duration::minutes(1));
        }

        dispatcher.dispatch(&mut state, Command::SetCategory(Category::Personal.into()))?;
        state.select_last();
        dispatcher.dispatch(&mut state, Command::SetCategory(CategoryFilter::All))?;
        let selected = state.selected_id().cloned();
        let first = state.visible_notes(repo.all())[0].id.clone();
        assert_eq!(selected, Some(first));
        assert_eq!(state.visible_notes(repo.all())[0].title, "Delta");

        state.select_last();
        let mut dispatcher = ActionDispatcher::new(&mut repo);
        dispatcher.dispatch(&mut state, Command::SetSearch("a".into()))?;
        let selected = state.selected_id().cloned();
        assert_eq!(selected.as_ref(), state.visible_ids().first());
        Ok(())
    }

    #[test]
    fn update_and_delete_flow() -> RepoResult<()> {
        let (mut repo, mut state, _clock) = setup();
        let mut dispatcher = ActionDispatcher::new(&mut repo);
        let created = dispatcher.dispatch(&mut state, create("Draft", Category::Personal))?;
        let Some(id) = created.focus else {
            panic!("create should focus the new note");
        };

        let updated = dispatcher.dispatch(
            &mut state,
            Command::UpdateNote {
                id: id.clone(),
                title: "Final".into(),
                content: String::new(),
                category: Category::Work,
            },
        )?;
        assert_eq!(updated.message.as_deref(), Some("Note updated successfully!"));
        assert_eq!(state.counts().get(CategoryFilter::Only(Category::Work)), 1);

        let deleted = dispatcher.dispatch(&mut state, Command::DeleteNote { id: id.clone() })?;
        assert_eq!(deleted.message.as_deref(), Some("Deleted \"Final\""));
        assert_eq!(state.visible_len(), 0);
        assert!(state.selected_id().is_none());

        assert_matches!(
            dispatcher.dispatch(&mut state, Command::DeleteNote { id }),
            Err(RepoError::NotFound(_))
        );
        Ok(())
    }

    #[test]
    fn view_commands_only_touch_presentation() -> RepoResult<()> {
        let (mut repo, mut state, _clock) = setup();
        let mut dispatcher = ActionDispatcher::new(&mut repo);
        let outcome = dispatcher.dispatch(&mut state, Command::SetViewMode(ViewMode::List))?;
        assert_eq!(state.view_mode, ViewMode::List);
        assert_eq!(outcome.message.as_deref(), Some("List view"));

        dispatcher.dispatch(&mut state, Command::SetSort(SortKey::Title))?;
        assert_eq!(state.view.sort, SortKey::Title);
        assert_eq!(Command::SetViewMode(ViewMode::Grid).refresh(), Refresh::empty());
        Ok(())
    }
}
