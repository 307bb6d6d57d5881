use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use regex::Regex;
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{AppState, DeleteConfirm, FocusPane, FormField, NoteForm, Overlay};
use crate::config::themes::Palette;
use crate::config::ViewMode;
use crate::format::{
    empty_state, format_datetime, note_count_label, recent_preview, relative_time,
};
use crate::highlight::{build_highlight_regex, split_matches};
use crate::model::Note;

const SIDEBAR_WIDTH: u16 = 32;

/// Borrowed view of everything a frame needs.
pub struct ViewContext<'a> {
    pub notes: &'a [Note],
    pub state: &'a AppState,
    pub palette: &'a Palette,
    pub now: OffsetDateTime,
}

pub fn draw_app(frame: &mut Frame, ctx: &ViewContext<'_>, list_state: &mut ListState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(frame.size());

    draw_sidebar(frame, ctx, columns[0]);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(columns[1]);

    draw_header(frame, ctx, main[0]);
    draw_notes(frame, ctx, list_state, main[1]);
    draw_status(frame, ctx, main[2]);
    render_overlay(frame, ctx);
}

fn draw_sidebar(frame: &mut Frame, ctx: &ViewContext<'_>, area: Rect) {
    let state = ctx.state;
    let palette = ctx.palette;
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Min(3),
            Constraint::Length(4),
        ])
        .split(area);

    let items: Vec<ListItem> = state
        .counts()
        .iter()
        .map(|(filter, count)| {
            let mut style = Style::default();
            if filter == state.view.category {
                style = style.fg(palette.accent).add_modifier(Modifier::BOLD);
            }
            let label = format!("{:<18}{:>6}", filter.label(), count);
            ListItem::new(Line::from(Span::styled(label, style)))
        })
        .collect();
    let focused = state.focus == FocusPane::Sidebar;
    let categories = List::new(items)
        .block(
            Block::default()
                .title("Categories")
                .borders(Borders::ALL)
                .border_style(focus_style(focused, palette)),
        )
        .highlight_style(selection_style(palette))
        .highlight_symbol("▸ ");
    let mut sidebar_state = ListState::default();
    if focused {
        sidebar_state.select(Some(state.sidebar_selected));
    }
    frame.render_stateful_widget(categories, sections[0], &mut sidebar_state);

    let muted = Style::default().fg(palette.muted);
    let recent = state.recent_notes(ctx.notes);
    let mut lines = Vec::new();
    if recent.is_empty() {
        lines.push(Line::from(Span::styled(empty_state(false), muted)));
    }
    for note in recent {
        lines.push(Line::from(Span::styled(
            note.display_title().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(recent_preview(&note.content), muted)));
        lines.push(Line::from(Span::styled(
            relative_time(note.updated_at, ctx.now),
            muted.add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::from(""));
    }
    let recent_panel = Paragraph::new(lines)
        .block(Block::default().title("Recent").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(recent_panel, sections[1]);

    let stats = state.stats();
    let stats_panel = Paragraph::new(vec![
        Line::from(format!("Total notes: {}", stats.total_notes)),
        Line::from(format!("Total words: {}", stats.total_words)),
    ])
    .block(Block::default().title("Stats").borders(Borders::ALL));
    frame.render_widget(stats_panel, sections[2]);
}

fn draw_header(frame: &mut Frame, ctx: &ViewContext<'_>, area: Rect) {
    let state = ctx.state;
    let palette = ctx.palette;
    let muted = Style::default().fg(palette.muted);

    let title = Line::from(vec![
        Span::styled(
            state.view.category.page_title(),
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(note_count_label(state.visible_len()), muted),
    ]);

    let mut detail = vec![
        Span::styled("Sort: ", muted),
        Span::raw(state.view.sort.label()),
        Span::styled(" • View: ", muted),
        Span::raw(state.view_mode.label()),
    ];
    if state.is_search_active() || !state.search_query().is_empty() {
        detail.push(Span::styled(" • Search: ", muted));
        let mut query = state.search_query().to_string();
        if state.is_search_active() {
            query.push('▌');
        }
        detail.push(Span::styled(query, Style::default().fg(palette.highlight)));
    }

    let header = Paragraph::new(vec![title, Line::from(detail)])
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, area);
}

fn draw_notes(frame: &mut Frame, ctx: &ViewContext<'_>, list_state: &mut ListState, area: Rect) {
    let state = ctx.state;
    let palette = ctx.palette;
    let focused = state.focus == FocusPane::Notes;
    let block = Block::default()
        .title("Notes")
        .borders(Borders::ALL)
        .border_style(focus_style(focused, palette));

    let visible = state.visible_notes(ctx.notes);
    if visible.is_empty() {
        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                empty_state(state.is_filtered()),
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];
        if !state.is_filtered() {
            lines.push(Line::from(Span::styled(
                "Press n to create your first note",
                Style::default().fg(palette.muted),
            )));
        }
        let empty = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let regex = build_highlight_regex(state.search_query());
    let inner_width = usize::from(area.width.saturating_sub(4));
    let items: Vec<ListItem> = visible
        .iter()
        .map(|note| match state.view_mode {
            ViewMode::Grid => note_card(note, ctx, regex.as_ref(), inner_width),
            ViewMode::List => note_row(note, ctx, regex.as_ref(), inner_width),
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(selection_style(palette))
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn note_card(
    note: &Note,
    ctx: &ViewContext<'_>,
    regex: Option<&Regex>,
    width: usize,
) -> ListItem<'static> {
    let palette = ctx.palette;
    let highlight = Style::default()
        .fg(palette.highlight)
        .add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(palette.muted);

    let mut title = highlight_line(
        &truncate_to_width(note.display_title(), width.saturating_sub(12)),
        regex,
        highlight,
        Style::default().add_modifier(Modifier::BOLD),
    );
    title.push(Span::raw("  "));
    title.push(Span::styled(
        format!("[{}]", note.category.label()),
        Style::default().fg(palette.category(note.category)),
    ));

    let mut lines = vec![Line::from(title)];
    if note.content.is_empty() {
        lines.push(Line::from(Span::styled(
            note.display_content().to_string(),
            muted.add_modifier(Modifier::ITALIC),
        )));
    } else {
        for line in note.content.lines().take(ctx.state.preview_lines) {
            lines.push(Line::from(highlight_line(
                &truncate_to_width(line, width),
                regex,
                highlight,
                Style::default(),
            )));
        }
    }
    lines.push(Line::from(Span::styled(
        relative_time(note.updated_at, ctx.now),
        muted,
    )));
    lines.push(Line::from(""));
    ListItem::new(lines)
}

fn note_row(
    note: &Note,
    ctx: &ViewContext<'_>,
    regex: Option<&Regex>,
    width: usize,
) -> ListItem<'static> {
    let palette = ctx.palette;
    let when = relative_time(note.updated_at, ctx.now);
    let category = note.category.label();
    let reserved = when.width() + category.width() + 6;
    let mut spans = highlight_line(
        &truncate_to_width(note.display_title(), width.saturating_sub(reserved)),
        regex,
        Style::default()
            .fg(palette.highlight)
            .add_modifier(Modifier::BOLD),
        Style::default(),
    );
    spans.push(Span::styled(" · ", Style::default().fg(palette.muted)));
    spans.push(Span::styled(
        category,
        Style::default().fg(palette.category(note.category)),
    ));
    spans.push(Span::styled(
        format!(" · {when}"),
        Style::default().fg(palette.muted),
    ));
    ListItem::new(Line::from(spans))
}

fn draw_status(frame: &mut Frame, ctx: &ViewContext<'_>, area: Rect) {
    let state = ctx.state;
    let palette = ctx.palette;
    let message = state
        .status_message()
        .map(|message| {
            Line::from(Span::styled(
                message.to_string(),
                Style::default().fg(palette.highlight),
            ))
        })
        .unwrap_or_default();
    let hints = if state.is_search_active() {
        "type to filter • Enter keep • Esc clear"
    } else {
        match state.focus {
            FocusPane::Sidebar => "j/k move • Enter select • Tab notes • ? help • q quit",
            FocusPane::Notes => {
                "n new • e edit • d delete • / search • s sort • v view • 1-4 category • ? help • q quit"
            }
        }
    };
    let status = Paragraph::new(vec![
        message,
        Line::from(Span::styled(hints, Style::default().fg(palette.muted))),
    ]);
    frame.render_widget(status, area);
}

fn render_overlay(frame: &mut Frame, ctx: &ViewContext<'_>) {
    match ctx.state.overlay() {
        Some(Overlay::Form(form)) => render_form(frame, form, ctx),
        Some(Overlay::Delete(confirm)) => render_delete_confirm(frame, confirm, ctx.palette),
        Some(Overlay::Help) => render_help(frame, ctx.palette),
        None => {}
    }
}

fn render_form(frame: &mut Frame, form: &NoteForm, ctx: &ViewContext<'_>) {
    let palette = ctx.palette;
    let muted = Style::default().fg(palette.muted);
    let area = centered_rect(70, 75, frame.size());
    frame.render_widget(Clear, area);
    let outer = Block::default()
        .title(form.heading())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent));
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let title_block = Block::default()
        .title("Title")
        .borders(Borders::ALL)
        .border_style(focus_style(form.field == FormField::Title, palette));
    let title_inner = title_block.inner(rows[0]);
    let title_width = usize::from(title_inner.width.max(1));
    let (_, title_col) = form.title.cursor_position();
    let title_scroll = title_col.saturating_sub(title_width - 1);
    let title = Paragraph::new(form.title.text().to_string())
        .block(title_block)
        .scroll((0, clamp_u16(title_scroll)));
    frame.render_widget(title, rows[0]);

    let content_block = Block::default()
        .title("Content")
        .borders(Borders::ALL)
        .border_style(focus_style(form.field == FormField::Content, palette));
    let content_inner = content_block.inner(rows[1]);
    let content_height = usize::from(content_inner.height.max(1));
    let (content_row, content_col) = form.content.cursor_position();
    let content_scroll = content_row.saturating_sub(content_height - 1);
    let content = Paragraph::new(form.content.text().to_string())
        .block(content_block)
        .scroll((clamp_u16(content_scroll), 0));
    frame.render_widget(content, rows[1]);

    let category_style = if form.field == FormField::Category {
        selection_style(palette)
    } else {
        Style::default().fg(palette.category(form.category))
    };
    let category = Line::from(vec![
        Span::styled("Category: ", muted),
        Span::styled(format!("◂ {} ▸", form.category.label()), category_style),
    ]);
    frame.render_widget(Paragraph::new(category), rows[2]);

    let counts = format!(
        "{} words • {} characters",
        form.word_count(),
        form.char_count()
    );
    frame.render_widget(Paragraph::new(Span::styled(counts, muted)), rows[3]);

    if let (Some(created), Some(updated)) = (form.created_at, form.updated_at) {
        let dates = format!(
            "Created {} • Modified {}",
            format_datetime(created),
            relative_time(updated, ctx.now)
        );
        frame.render_widget(Paragraph::new(Span::styled(dates, muted)), rows[4]);
    }

    let hints = "Tab next field • ←/→ category • Ctrl-s save • Esc cancel";
    frame.render_widget(Paragraph::new(Span::styled(hints, muted)), rows[5]);

    match form.field {
        FormField::Title => frame.set_cursor(
            title_inner.x + clamp_u16(title_col - title_scroll),
            title_inner.y,
        ),
        FormField::Content => frame.set_cursor(
            content_inner.x + clamp_u16(content_col).min(content_inner.width.saturating_sub(1)),
            content_inner.y + clamp_u16(content_row - content_scroll),
        ),
        FormField::Category => {}
    }
}

fn render_delete_confirm(frame: &mut Frame, confirm: &DeleteConfirm, palette: &Palette) {
    let area = centered_rect(50, 30, frame.size());
    frame.render_widget(Clear, area);
    let title = if confirm.title.is_empty() {
        "Untitled"
    } else {
        confirm.title.as_str()
    };
    let paragraph = Paragraph::new(vec![
        Line::from(Span::styled(
            "Delete this note?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("\"{title}\"")),
        Line::from(""),
        Line::from(Span::styled(
            "This cannot be undone.",
            Style::default().fg(palette.danger),
        )),
        Line::from(Span::styled(
            "Enter/y delete • Esc/n cancel",
            Style::default().fg(palette.muted),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .title("Delete Note")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.danger)),
    )
    .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame, palette: &Palette) {
    const BINDINGS: &[(&str, &str)] = &[
        ("j / k", "move selection"),
        ("g / G", "first / last note"),
        ("Tab", "switch sidebar / notes"),
        ("n", "new note"),
        ("e, Enter", "edit selected note"),
        ("d", "delete selected note"),
        ("/", "search titles and content"),
        ("s", "cycle sort order"),
        ("v", "toggle grid / list view"),
        ("1-4, c", "choose / cycle category"),
        ("q", "quit"),
    ];
    let area = centered_rect(50, 60, frame.size());
    frame.render_widget(Clear, area);
    let lines: Vec<Line> = BINDINGS
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(
                    format!("{key:<10}"),
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(*action),
            ])
        })
        .collect();
    let help = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .title("Keys (Esc to close)")
            .borders(Borders::ALL),
    );
    frame.render_widget(help, area);
}

fn focus_style(focused: bool, palette: &Palette) -> Style {
    if focused {
        Style::default().fg(palette.accent)
    } else {
        Style::default()
    }
}

fn selection_style(palette: &Palette) -> Style {
    Style::default()
        .bg(palette.selection_bg)
        .fg(palette.selection_fg)
        .add_modifier(Modifier::BOLD)
}

fn highlight_line(
    text: &str,
    regex: Option<&Regex>,
    highlight_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    split_matches(text, regex)
        .into_iter()
        .map(|(segment, hit)| {
            let style = if hit { highlight_style } else { base_style };
            Span::styled(segment.to_string(), style)
        })
        .collect()
}

/// Cuts `text` to at most `max` display columns, marking the cut with `…`.
fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for grapheme in text.graphemes(true) {
        let width = grapheme.width();
        if used + width + 1 > max {
            break;
        }
        out.push_str(grapheme);
        used += width;
    }
    out.push('…');
    out
}

fn clamp_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
