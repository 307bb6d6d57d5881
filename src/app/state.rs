use std::collections::HashMap;

use time::OffsetDateTime;

use crate::config::{AppConfig, ViewMode};
use crate::model::{Category, CategoryFilter, Note, NoteId};
use crate::search::{
    category_counts, derive_view, note_stats, recent_notes, word_count, CategoryCounts,
    NoteStats, ViewQuery,
};

use super::actions::Refresh;
use super::editor::TextBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sidebar,
    Notes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Content,
    Category,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Title => FormField::Content,
            FormField::Content => FormField::Category,
            FormField::Category => FormField::Title,
        }
    }

    fn previous(self) -> Self {
        match self {
            FormField::Title => FormField::Category,
            FormField::Content => FormField::Title,
            FormField::Category => FormField::Content,
        }
    }
}

/// Create/edit form. `editing` is `None` for a brand new note.
#[derive(Debug, Clone)]
pub struct NoteForm {
    pub editing: Option<NoteId>,
    pub title: TextBuffer,
    pub content: TextBuffer,
    pub category: Category,
    pub field: FormField,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

impl NoteForm {
    pub fn blank(category: Category) -> Self {
        Self {
            editing: None,
            title: TextBuffer::single_line(""),
            content: TextBuffer::multi_line(""),
            category,
            field: FormField::Title,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn for_note(note: &Note) -> Self {
        Self {
            editing: Some(note.id.clone()),
            title: TextBuffer::single_line(note.title.clone()),
            content: TextBuffer::multi_line(note.content.clone()),
            category: note.category,
            field: FormField::Title,
            created_at: Some(note.created_at),
            updated_at: Some(note.updated_at),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn heading(&self) -> &'static str {
        if self.is_editing() {
            "Edit Note"
        } else {
            "New Note"
        }
    }

    pub fn word_count(&self) -> usize {
        word_count(self.content.text())
    }

    pub fn char_count(&self) -> usize {
        self.content.text().chars().count()
    }

    pub fn next_field(&mut self) {
        self.field = self.field.next();
    }

    pub fn previous_field(&mut self) {
        self.field = self.field.previous();
    }

    /// Buffer of the focused text field, `None` while the category picker
    /// has focus.
    pub fn active_buffer_mut(&mut self) -> Option<&mut TextBuffer> {
        match self.field {
            FormField::Title => Some(&mut self.title),
            FormField::Content => Some(&mut self.content),
            FormField::Category => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirm {
    pub id: NoteId,
    pub title: String,
}

#[derive(Debug, Clone)]
pub enum Overlay {
    Form(NoteForm),
    Delete(DeleteConfirm),
    Help,
}

/// Everything the controller knows besides the notes themselves. Derived
/// lists hold ids and are rebuilt through [`AppState::refresh`].
#[derive(Debug, Clone)]
pub struct AppState {
    pub view: ViewQuery,
    pub view_mode: ViewMode,
    pub focus: FocusPane,
    pub selected: usize,
    pub sidebar_selected: usize,
    pub recent_limit: usize,
    pub preview_lines: usize,
    visible: Vec<NoteId>,
    counts: CategoryCounts,
    stats: NoteStats,
    recent: Vec<NoteId>,
    search_active: bool,
    overlay: Option<Overlay>,
    status_message: Option<String>,
}

impl AppState {
    pub fn new(config: &AppConfig, notes: &[Note]) -> Self {
        let view = ViewQuery::new(config.default_category, "", config.default_sort);
        let sidebar_selected = CategoryFilter::all_filters()
            .position(|filter| filter == view.category)
            .unwrap_or(0);
        let mut state = Self {
            view,
            view_mode: config.view_mode,
            focus: FocusPane::Notes,
            selected: 0,
            sidebar_selected,
            recent_limit: config.recent_limit,
            preview_lines: usize::from(config.preview_lines.max(1)),
            visible: Vec::new(),
            counts: CategoryCounts::default(),
            stats: NoteStats::default(),
            recent: Vec::new(),
            search_active: false,
            overlay: None,
            status_message: None,
        };
        state.refresh(notes, Refresh::ALL);
        state
    }

    /// Recomputes the derived caches named in `what`, keeping the selected
    /// note selected when it is still visible.
    pub fn refresh(&mut self, notes: &[Note], what: Refresh) {
        if what.contains(Refresh::VIEW) {
            let previous = self.selected_id().cloned();
            self.visible = derive_view(notes, &self.view)
                .into_iter()
                .map(|note| note.id.clone())
                .collect();
            match previous {
                Some(id) => self.select_id(&id),
                None => self.normalize_selection(),
            }
        }
        if what.contains(Refresh::COUNTS) {
            self.counts = category_counts(notes);
        }
        if what.contains(Refresh::STATS) {
            self.stats = note_stats(notes);
        }
        if what.contains(Refresh::RECENT) {
            self.recent = recent_notes(notes, self.recent_limit)
                .into_iter()
                .map(|note| note.id.clone())
                .collect();
        }
    }

    pub fn visible_ids(&self) -> &[NoteId] {
        &self.visible
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn visible_notes<'a>(&self, notes: &'a [Note]) -> Vec<&'a Note> {
        resolve_ids(&self.visible, notes)
    }

    pub fn recent_notes<'a>(&self, notes: &'a [Note]) -> Vec<&'a Note> {
        resolve_ids(&self.recent, notes)
    }

    pub fn counts(&self) -> &CategoryCounts {
        &self.counts
    }

    pub fn stats(&self) -> NoteStats {
        self.stats
    }

    pub fn selected_id(&self) -> Option<&NoteId> {
        self.visible.get(self.selected)
    }

    pub fn select_id(&mut self, id: &NoteId) {
        match self.visible.iter().position(|visible| visible == id) {
            Some(idx) => self.selected = idx,
            None => self.normalize_selection(),
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.visible.len().saturating_sub(1);
    }

    fn normalize_selection(&mut self) {
        if self.selected >= self.visible.len() {
            self.selected = self.visible.len().saturating_sub(1);
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Sidebar => FocusPane::Notes,
            FocusPane::Notes => FocusPane::Sidebar,
        };
    }

    pub fn move_sidebar(&mut self, delta: isize) {
        let last = CategoryFilter::all_filters().count() as isize - 1;
        self.sidebar_selected = (self.sidebar_selected as isize + delta).clamp(0, last) as usize;
    }

    pub fn sidebar_filter(&self) -> CategoryFilter {
        CategoryFilter::all_filters()
            .nth(self.sidebar_selected)
            .unwrap_or_default()
    }

    pub(crate) fn sync_sidebar(&mut self) {
        if let Some(idx) = CategoryFilter::all_filters().position(|f| f == self.view.category) {
            self.sidebar_selected = idx;
        }
    }

    pub fn is_filtered(&self) -> bool {
        self.view.is_filtered()
    }

    pub fn search_query(&self) -> &str {
        &self.view.search
    }

    pub fn is_search_active(&self) -> bool {
        self.search_active
    }

    pub fn begin_search(&mut self) {
        self.search_active = true;
        self.focus = FocusPane::Notes;
    }

    pub fn finish_search(&mut self) {
        self.search_active = false;
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn open_overlay(&mut self, overlay: Overlay) {
        self.overlay = Some(overlay);
    }

    pub fn close_overlay(&mut self) -> Option<Overlay> {
        self.overlay.take()
    }

    pub fn form(&self) -> Option<&NoteForm> {
        match &self.overlay {
            Some(Overlay::Form(form)) => Some(form),
            _ => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut NoteForm> {
        match &mut self.overlay {
            Some(Overlay::Form(form)) => Some(form),
            _ => None,
        }
    }

    pub fn delete_confirm(&self) -> Option<&DeleteConfirm> {
        match &self.overlay {
            Some(Overlay::Delete(confirm)) => Some(confirm),
            _ => None,
        }
    }

    /// Category a new note starts with: the active filter's category, or
    /// the default one when all notes are shown.
    pub fn category_for_new_note(&self) -> Category {
        match self.view.category {
            CategoryFilter::Only(category) => category,
            CategoryFilter::All => Category::default(),
        }
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn clear_status_message(&mut self) {
        self.status_message = None;
    }
}

fn resolve_ids<'a>(ids: &[NoteId], notes: &'a [Note]) -> Vec<&'a Note> {
    let by_id: HashMap<&NoteId, &Note> = notes.iter().map(|note| (&note.id, note)).collect();
    ids.iter().filter_map(|id| by_id.get(id).copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SortKey;
    use time::macros::datetime;
    use time::Duration;

    fn note(id: &str, title: &str, category: Category, minutes: i64) -> Note {
        let at = datetime!(2024-02-01 09:00 UTC) + Duration::minutes(minutes);
        Note {
            id: NoteId::from(id),
            title: title.into(),
            content: String::new(),
            category,
            created_at: at,
            updated_at: at,
        }
    }

    fn notes() -> Vec<Note> {
        vec![
            note("a", "Alpha", Category::Work, 30),
            note("b", "Beta", Category::Personal, 20),
            note("c", "Gamma", Category::Work, 10),
        ]
    }

    #[test]
    fn new_state_applies_config_defaults() {
        let config = AppConfig {
            default_category: CategoryFilter::Only(Category::Work),
            default_sort: SortKey::Title,
            ..AppConfig::default()
        };
        let notes = notes();
        let state = AppState::new(&config, &notes);
        assert_eq!(state.visible_ids(), &[NoteId::from("a"), NoteId::from("c")]);
        assert_eq!(state.sidebar_filter(), CategoryFilter::Only(Category::Work));
        assert_eq!(state.counts().get(CategoryFilter::All), 3);
        assert_eq!(state.stats().total_notes, 3);
        assert_eq!(state.category_for_new_note(), Category::Work);
    }

    #[test]
    fn refresh_keeps_selected_note_when_it_moves() {
        let mut notes = notes();
        let mut state = AppState::new(&AppConfig::default(), &notes);
        state.select_id(&NoteId::from("c"));
        assert_eq!(state.selected, 2);

        notes[2].updated_at += Duration::hours(1);
        state.refresh(&notes, Refresh::VIEW);
        assert_eq!(state.selected, 0);
        assert_eq!(state.selected_id(), Some(&NoteId::from("c")));
    }

    #[test]
    fn selection_is_clamped_when_the_view_shrinks() {
        let notes = notes();
        let mut state = AppState::new(&AppConfig::default(), &notes);
        state.select_last();
        state.view.search = "beta".into();
        state.view.category = CategoryFilter::All;
        let remaining: Vec<Note> = notes.into_iter().filter(|n| n.id.as_str() == "b").collect();
        state.refresh(&remaining, Refresh::VIEW);
        assert_eq!(state.selected, 0);
        state.move_selection(5);
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn only_requested_caches_are_rebuilt() {
        let mut notes = notes();
        let mut state = AppState::new(&AppConfig::default(), &notes);
        notes.push(note("d", "Delta", Category::Ideas, 40));
        state.refresh(&notes, Refresh::COUNTS);
        assert_eq!(state.counts().get(CategoryFilter::All), 4);
        assert_eq!(state.stats().total_notes, 3);
        assert_eq!(state.visible_len(), 3);
    }

    #[test]
    fn recent_list_resolves_to_notes() {
        let notes = notes();
        let state = AppState::new(&AppConfig::default(), &notes);
        let titles: Vec<_> = state
            .recent_notes(&notes)
            .into_iter()
            .map(|n| n.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn form_cycles_fields_and_counts_content() {
        let mut form = NoteForm::blank(Category::Ideas);
        assert_eq!(form.heading(), "New Note");
        form.next_field();
        if let Some(buffer) = form.active_buffer_mut() {
            for ch in "two words".chars() {
                buffer.insert_char(ch);
            }
        }
        assert_eq!(form.word_count(), 2);
        assert_eq!(form.char_count(), 9);
        form.next_field();
        assert!(form.active_buffer_mut().is_none());
        form.previous_field();
        assert_eq!(form.field, FormField::Content);
    }

    #[test]
    fn sidebar_moves_are_clamped() {
        let mut state = AppState::new(&AppConfig::default(), &[]);
        state.move_sidebar(-1);
        assert_eq!(state.sidebar_filter(), CategoryFilter::All);
        state.move_sidebar(10);
        assert_eq!(state.sidebar_filter(), CategoryFilter::Only(Category::Ideas));
    }
}
