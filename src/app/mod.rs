use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;
use time::OffsetDateTime;

use crate::config::themes::{Palette, ThemeRegistry};
use crate::config::AppConfig;
use crate::model::{Category, CategoryFilter};
use crate::repo::{NoteRepository, RepoError};
use crate::ui::{self, ViewContext};

pub mod actions;
pub mod editor;
pub mod state;

pub use actions::{ActionDispatcher, ActionOutcome, Command, Refresh};
pub use editor::TextBuffer;
pub use state::{AppState, DeleteConfirm, FocusPane, FormField, NoteForm, Overlay};

const PAGE: isize = 5;

pub struct App {
    config: Arc<AppConfig>,
    repo: NoteRepository,
    state: AppState,
    palette: Palette,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, repo: NoteRepository) -> Self {
        let state = AppState::new(&config, repo.all());
        let palette = ThemeRegistry::default().palette(&config.theme);
        Self {
            config,
            repo,
            state,
            palette,
            list_state: ListState::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(250),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn repo(&self) -> &NoteRepository {
        &self.repo
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    self.list_state
                        .select(self.state.selected_id().map(|_| self.state.selected));
                    let ctx = ViewContext {
                        notes: self.repo.all(),
                        state: &self.state,
                        palette: &self.palette,
                        now: OffsetDateTime::now_utc(),
                    };
                    ui::draw_app(frame, &ctx, &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::ZERO);
            if event::poll(timeout).context("polling for terminal events")? {
                if let Event::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }
            if last_tick.elapsed() >= self.tick_rate {
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.state.overlay().is_some() {
            self.handle_overlay_key(key);
            return;
        }
        if self.state.is_search_active() {
            self.handle_search_key(key);
            return;
        }

        self.state.clear_status_message();
        let plain = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') if plain => self.should_quit = true,
            KeyCode::Tab => self.state.toggle_focus(),
            KeyCode::Char('?') => self.state.open_overlay(Overlay::Help),
            KeyCode::Char('/') if plain => self.state.begin_search(),
            KeyCode::Char('n') if plain => self.open_new_note(),
            KeyCode::Char('s') if plain => {
                let sort = self.state.view.sort.next();
                self.dispatch(Command::SetSort(sort));
            }
            KeyCode::Char('v') if plain => {
                let mode = self.state.view_mode.toggled();
                self.dispatch(Command::SetViewMode(mode));
            }
            KeyCode::Char('c') if plain => {
                let filter = self.state.view.category.next();
                self.dispatch(Command::SetCategory(filter));
            }
            KeyCode::Char(digit @ '1'..='4') if plain => {
                let index = digit as usize - '1' as usize;
                if let Some(filter) = CategoryFilter::all_filters().nth(index) {
                    self.dispatch(Command::SetCategory(filter));
                }
            }
            _ => match self.state.focus {
                FocusPane::Sidebar => self.handle_sidebar_key(key),
                FocusPane::Notes => self.handle_notes_key(key),
            },
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.move_sidebar(1),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_sidebar(-1),
            KeyCode::Enter | KeyCode::Char(' ') => {
                let filter = self.state.sidebar_filter();
                if self.dispatch(Command::SetCategory(filter)) {
                    self.state.focus = FocusPane::Notes;
                }
            }
            _ => {}
        }
    }

    fn handle_notes_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_selection(-1),
            KeyCode::PageDown => self.state.move_selection(PAGE),
            KeyCode::PageUp => self.state.move_selection(-PAGE),
            KeyCode::Char('g') | KeyCode::Home => self.state.select_first(),
            KeyCode::Char('G') | KeyCode::End => self.state.select_last(),
            KeyCode::Char('e') | KeyCode::Enter => self.open_edit_note(),
            KeyCode::Char('d') | KeyCode::Delete => self.open_delete_confirm(),
            KeyCode::Esc if !self.state.search_query().is_empty() => {
                self.dispatch(Command::SetSearch(String::new()));
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let mut query = self.state.search_query().to_string();
        match key.code {
            KeyCode::Esc => {
                self.state.finish_search();
                self.dispatch(Command::SetSearch(String::new()));
            }
            KeyCode::Enter | KeyCode::Down => self.state.finish_search(),
            KeyCode::Backspace => {
                if query.pop().is_some() {
                    self.dispatch(Command::SetSearch(query));
                }
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                query.push(ch);
                self.dispatch(Command::SetSearch(query));
            }
            _ => {}
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) {
        match self.state.overlay() {
            Some(Overlay::Form(_)) => self.handle_form_key(key),
            Some(Overlay::Delete(_)) => match key.code {
                KeyCode::Enter | KeyCode::Char('y') => self.confirm_delete(),
                KeyCode::Esc | KeyCode::Char('n') => {
                    self.state.close_overlay();
                    self.state.set_status_message(Some("Delete canceled"));
                }
                _ => {}
            },
            Some(Overlay::Help) => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                    self.state.close_overlay();
                }
            }
            None => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.state.close_overlay();
                self.state.set_status_message(Some("Changes discarded"));
                return;
            }
            KeyCode::Char('s') if ctrl => {
                self.submit_form();
                return;
            }
            _ => {}
        }

        let Some(form) = self.state.form_mut() else {
            return;
        };
        let mut submit = false;
        match key.code {
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.previous_field(),
            _ if form.field == FormField::Category => match key.code {
                KeyCode::Left | KeyCode::Char('h') => form.category = form.category.previous(),
                KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => {
                    form.category = form.category.next()
                }
                KeyCode::Char('w') => form.category = Category::Work,
                KeyCode::Char('p') => form.category = Category::Personal,
                KeyCode::Char('i') => form.category = Category::Ideas,
                KeyCode::Enter => submit = true,
                _ => {}
            },
            KeyCode::Enter if form.field == FormField::Title => form.next_field(),
            _ => {
                if let Some(buffer) = form.active_buffer_mut() {
                    edit_buffer(buffer, key);
                }
            }
        }
        if submit {
            self.submit_form();
        }
    }

    fn open_new_note(&mut self) {
        let category = self.state.category_for_new_note();
        self.state
            .open_overlay(Overlay::Form(NoteForm::blank(category)));
    }

    fn open_edit_note(&mut self) {
        let Some(id) = self.state.selected_id() else {
            return;
        };
        match self.repo.find_by_id(id) {
            Some(note) => {
                let form = NoteForm::for_note(note);
                self.state.open_overlay(Overlay::Form(form));
            }
            None => {
                tracing::warn!(note_id = %id, "selected note missing from repository");
            }
        }
    }

    fn open_delete_confirm(&mut self) {
        let Some(id) = self.state.selected_id() else {
            return;
        };
        if let Some(note) = self.repo.find_by_id(id) {
            let confirm = DeleteConfirm {
                id: note.id.clone(),
                title: note.title.clone(),
            };
            self.state.open_overlay(Overlay::Delete(confirm));
        }
    }

    fn confirm_delete(&mut self) {
        let Some(confirm) = self.state.delete_confirm().cloned() else {
            return;
        };
        self.state.close_overlay();
        self.dispatch(Command::DeleteNote { id: confirm.id });
    }

    fn submit_form(&mut self) {
        let Some(form) = self.state.form() else {
            return;
        };
        let title = form.title.text().to_string();
        let content = form.content.text().to_string();
        let category = form.category;
        let command = match form.editing.clone() {
            Some(id) => Command::UpdateNote {
                id,
                title,
                content,
                category,
            },
            None => Command::CreateNote {
                title,
                content,
                category,
            },
        };

        // The form stays open on failure so nothing typed is lost.
        if self.dispatch(command) {
            self.state.close_overlay();
            self.state.focus = FocusPane::Notes;
        } else if let Some(form) = self.state.form_mut() {
            form.field = FormField::Title;
        }
    }

    /// Runs `command` and reports the outcome on the status line. Returns
    /// whether it succeeded.
    fn dispatch(&mut self, command: Command) -> bool {
        let result = ActionDispatcher::new(&mut self.repo).dispatch(&mut self.state, command);
        match result {
            Ok(outcome) => {
                if outcome.message.is_some() {
                    self.state.set_status_message(outcome.message);
                }
                true
            }
            Err(RepoError::Validation(message)) => {
                self.state.set_status_message(Some(message));
                false
            }
            Err(RepoError::NotFound(id)) => {
                tracing::warn!(note_id = %id, "note vanished before the action completed");
                self.state
                    .set_status_message(Some("That note no longer exists"));
                false
            }
            Err(err @ RepoError::Storage(_)) => {
                tracing::error!(error = %err, "failed to persist notes");
                self.state
                    .set_status_message(Some(format!("Could not save notes: {err}")));
                false
            }
        }
    }
}

fn edit_buffer(buffer: &mut TextBuffer, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => {
            buffer.insert_newline();
        }
        KeyCode::Backspace => {
            buffer.backspace();
        }
        KeyCode::Delete => {
            buffer.delete();
        }
        KeyCode::Left if ctrl => {
            buffer.move_word_left();
        }
        KeyCode::Right if ctrl => {
            buffer.move_word_right();
        }
        KeyCode::Left => {
            buffer.move_left();
        }
        KeyCode::Right => {
            buffer.move_right();
        }
        KeyCode::Up => {
            buffer.move_up();
        }
        KeyCode::Down => {
            buffer.move_down();
        }
        KeyCode::Home => {
            buffer.move_home();
        }
        KeyCode::End => {
            buffer.move_end();
        }
        KeyCode::Char(ch) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
            buffer.insert_char(ch);
        }
        _ => {}
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen).context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("restoring screen state")?;
    Ok(())
}
