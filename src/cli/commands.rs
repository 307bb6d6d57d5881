use std::convert::Infallible;
use std::fmt::Write as _;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::Args;
use time::OffsetDateTime;

use crate::config::AppConfig;
use crate::format::{
    empty_state, format_datetime, note_count_label, preview, recent_preview, relative_time,
    single_line, RECENT_PREVIEW_CHARS,
};
use crate::model::{Category, CategoryFilter, Note, NoteId};
use crate::repo::NoteRepository;
use crate::search::{
    category_counts, derive_view, note_stats, recent_notes, word_count, SortKey, ViewQuery,
};

/// Shortest id prefix accepted on the command line.
const MIN_ID_PREFIX: usize = 4;

fn lenient_category(raw: &str) -> Result<Category, Infallible> {
    Ok(Category::parse_lenient(raw))
}

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Title for the note (prompted if omitted)
    #[arg()]
    pub title: Option<String>,
    /// Note content. If omitted, piped stdin is used.
    #[arg(long)]
    pub content: Option<String>,
    /// work, personal or ideas (anything else files the note as personal)
    #[arg(long, default_value_t = Category::Personal, value_parser = lenient_category)]
    pub category: Category,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Note id or a unique prefix of it
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub content: Option<String>,
    #[arg(long, value_parser = lenient_category)]
    pub category: Option<Category>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Note id or a unique prefix of it
    pub id: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// all, work, personal or ideas (defaults to the configured category)
    #[arg(long)]
    pub category: Option<CategoryFilter>,
    /// Case-insensitive text to look for in titles and content
    #[arg(long)]
    pub search: Option<String>,
    /// updated, created, title or title-desc
    #[arg(long)]
    pub sort: Option<SortKey>,
    /// Print at most this many notes
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Note id or a unique prefix of it
    pub id: String,
}

pub fn new_note(repo: &mut NoteRepository, args: NewArgs) -> Result<String> {
    let title = match args.title {
        Some(title) => title,
        None => prompt("Title")?,
    };
    let content = match args.content {
        Some(content) => content,
        None => read_stdin()?.unwrap_or_default(),
    };

    let note = repo
        .create(&title, &content, args.category)
        .context("creating note")?;
    Ok(format!(
        "Created note {} \"{}\" in {}\n",
        note.id.short(),
        note.title,
        note.category.label()
    ))
}

pub fn edit_note(repo: &mut NoteRepository, args: EditArgs) -> Result<String> {
    let id = resolve_note_id(repo, &args.id)?;
    let Some(current) = repo.find_by_id(&id) else {
        bail!("note {id} not found");
    };
    if args.title.is_none() && args.content.is_none() && args.category.is_none() {
        bail!("nothing to change: pass --title, --content or --category");
    }
    let title = args.title.unwrap_or_else(|| current.title.clone());
    let content = args.content.unwrap_or_else(|| current.content.clone());
    let category = args.category.unwrap_or(current.category);

    let note = repo
        .update(&id, &title, &content, category)
        .with_context(|| format!("updating note {}", id.short()))?;
    Ok(format!("Updated note {} \"{}\"\n", note.id.short(), note.title))
}

pub fn delete_note(repo: &mut NoteRepository, args: &DeleteArgs) -> Result<String> {
    let id = resolve_note_id(repo, &args.id)?;
    let note = repo
        .delete(&id)
        .with_context(|| format!("deleting note {}", id.short()))?;
    Ok(format!(
        "Deleted note {} \"{}\"\n",
        note.id.short(),
        note.display_title()
    ))
}

pub fn list_notes(
    repo: &NoteRepository,
    args: &ListArgs,
    config: &AppConfig,
    now: OffsetDateTime,
) -> Result<String> {
    let query = ViewQuery::new(
        args.category.unwrap_or(config.default_category),
        args.search.clone().unwrap_or_default(),
        args.sort.unwrap_or(config.default_sort),
    );
    let view = derive_view(repo.all(), &query);

    let mut out = String::new();
    writeln!(
        out,
        "{} ({})",
        query.category.page_title(),
        note_count_label(view.len())
    )?;
    if view.is_empty() {
        writeln!(out, "{}", empty_state(query.is_filtered()))?;
        return Ok(out);
    }
    let limit = args.limit.unwrap_or(usize::MAX);
    for note in view.iter().take(limit) {
        writeln!(
            out,
            "{}  {}  [{}]  {}",
            note.id.short(),
            note.display_title(),
            note.category.label(),
            relative_time(note.updated_at, now)
        )?;
        if !note.content.is_empty() {
            writeln!(
                out,
                "    {}",
                preview(&single_line(&note.content), RECENT_PREVIEW_CHARS)
            )?;
        }
    }
    if view.len() > limit {
        writeln!(out, "... and {} more", view.len() - limit)?;
    }
    Ok(out)
}

pub fn show_note(repo: &NoteRepository, args: &ShowArgs, now: OffsetDateTime) -> Result<String> {
    let id = resolve_note_id(repo, &args.id)?;
    let Some(note) = repo.find_by_id(&id) else {
        bail!("note {id} not found");
    };
    Ok(render_note(note, now))
}

fn render_note(note: &Note, now: OffsetDateTime) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", note.display_title());
    let _ = writeln!(out, "id        {}", note.id);
    let _ = writeln!(out, "category  {}", note.category.label());
    let _ = writeln!(out, "created   {}", format_datetime(note.created_at));
    let _ = writeln!(
        out,
        "modified  {} ({})",
        format_datetime(note.updated_at),
        relative_time(note.updated_at, now)
    );
    out.push('\n');
    let _ = writeln!(out, "{}", note.display_content());
    out.push('\n');
    let words = word_count(&note.content);
    let _ = writeln!(
        out,
        "{words} words • {} characters",
        note.content.chars().count()
    );
    out
}

pub fn stats(repo: &NoteRepository, config: &AppConfig, now: OffsetDateTime) -> String {
    let notes = repo.all();
    let mut out = String::new();
    let _ = writeln!(out, "Notes by category");
    for (filter, count) in category_counts(notes).iter() {
        let _ = writeln!(out, "  {:<10}{count:>5}", filter.label());
    }
    let totals = note_stats(notes);
    let _ = writeln!(out, "Total notes: {}", totals.total_notes);
    let _ = writeln!(out, "Total words: {}", totals.total_words);

    let recent = recent_notes(notes, config.recent_limit);
    if recent.is_empty() {
        return out;
    }
    let _ = writeln!(out, "\nRecent");
    for note in recent {
        let _ = writeln!(
            out,
            "  {}  {} ({})",
            note.id.short(),
            note.display_title(),
            relative_time(note.updated_at, now)
        );
        let _ = writeln!(out, "      {}", recent_preview(&note.content));
    }
    out
}

/// Accepts a full id or a unique prefix of at least [`MIN_ID_PREFIX`]
/// characters.
fn resolve_note_id(repo: &NoteRepository, raw: &str) -> Result<NoteId> {
    let raw = raw.trim();
    if let Some(note) = repo.find_by_id(&NoteId::from(raw)) {
        return Ok(note.id.clone());
    }
    if raw.chars().count() < MIN_ID_PREFIX {
        bail!("note id '{raw}' is too short; give at least {MIN_ID_PREFIX} characters");
    }
    repo.resolve_prefix(raw)
        .map(|note| note.id.clone())
        .with_context(|| format!("no single note matches id '{raw}'"))
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    let mut stdout = io::stdout();
    write!(stdout, "{}: ", label)?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end().to_owned())
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading note content from stdin")?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigPaths, StorageOptions};
    use crate::model::{Clock, ManualClock};
    use clap::Parser;
    use crate::storage;
    use std::sync::Arc;
    use tempfile::TempDir;
    use time::macros::datetime;
    use time::Duration;

    type TestResult<T = ()> = Result<T>;

    const START: OffsetDateTime = datetime!(2024-08-01 09:00 UTC);

    fn setup_repo() -> TestResult<(TempDir, NoteRepository, Arc<ManualClock>)> {
        let temp = TempDir::new().context("creating temp dir")?;
        let paths = ConfigPaths::under(temp.path());
        paths.ensure_directories()?;
        let storage = storage::init(&paths, &StorageOptions::default())?;
        let clock = Arc::new(ManualClock::new(START));
        let repo = NoteRepository::with_clock(storage, clock.clone());
        Ok((temp, repo, clock))
    }

    fn new_args(title: &str, content: &str, category: Category) -> NewArgs {
        NewArgs {
            title: Some(title.into()),
            content: Some(content.into()),
            category,
        }
    }

    #[test]
    fn new_then_list_shows_the_note() -> TestResult {
        let (_temp, mut repo, clock) = setup_repo()?;
        let created = new_note(&mut repo, new_args("Sprint plan", "ship search", Category::Work))?;
        assert!(created.contains("\"Sprint plan\" in Work"));

        clock.advance(Duration::minutes(5));
        let output = list_notes(&repo, &ListArgs::default(), &AppConfig::default(), clock.now())?;
        assert!(output.starts_with("All Notes (1 note)"));
        assert!(output.contains("Sprint plan  [Work]  5 minutes ago"));
        assert!(output.contains("    ship search"));
        Ok(())
    }

    #[derive(Parser, Debug)]
    struct NewCommand {
        #[command(flatten)]
        args: NewArgs,
    }

    #[derive(Parser, Debug)]
    struct EditCommand {
        #[command(flatten)]
        args: EditArgs,
    }

    #[test]
    fn unknown_category_flag_files_note_as_personal() -> TestResult {
        let parsed = NewCommand::try_parse_from(["new", "Soup", "--category", "recipes"])?;
        assert_eq!(parsed.args.category, Category::Personal);
        let parsed = NewCommand::try_parse_from(["new", "Pitch", "--category", " WORK "])?;
        assert_eq!(parsed.args.category, Category::Work);
        let parsed = NewCommand::try_parse_from(["new", "Plain"])?;
        assert_eq!(parsed.args.category, Category::Personal);

        let parsed = EditCommand::try_parse_from(["edit", "abcd", "--category", "misc"])?;
        assert_eq!(parsed.args.category, Some(Category::Personal));
        let parsed = EditCommand::try_parse_from(["edit", "abcd"])?;
        assert_eq!(parsed.args.category, None);
        Ok(())
    }

    #[test]
    fn new_rejects_blank_title() -> TestResult {
        let (_temp, mut repo, _clock) = setup_repo()?;
        let err = new_note(&mut repo, new_args("  ", "body", Category::Ideas)).unwrap_err();
        assert!(format!("{err:#}").contains("Please enter a title"));
        assert!(repo.is_empty());
        Ok(())
    }

    #[test]
    fn list_applies_filters_sort_and_limit() -> TestResult {
        let (_temp, mut repo, clock) = setup_repo()?;
        for (title, category) in [
            ("banana bread", Category::Personal),
            ("Apple pie", Category::Personal),
            ("Cherry roadmap", Category::Work),
        ] {
            new_note(&mut repo, new_args(title, "", category))?;
            clock.advance(Duration::minutes(1));
        }
        let config = AppConfig::default();

        let args = ListArgs {
            category: Some(CategoryFilter::Only(Category::Personal)),
            sort: Some(SortKey::Title),
            ..ListArgs::default()
        };
        let output = list_notes(&repo, &args, &config, clock.now())?;
        let apple = output.find("Apple pie").expect("apple listed");
        let banana = output.find("banana bread").expect("banana listed");
        assert!(apple < banana);
        assert!(!output.contains("Cherry"));
        assert!(output.starts_with("Personal Notes (2 notes)"));

        let limited = ListArgs {
            limit: Some(1),
            ..ListArgs::default()
        };
        let output = list_notes(&repo, &limited, &config, clock.now())?;
        assert!(output.contains("Cherry roadmap"));
        assert!(output.contains("... and 2 more"));

        let searching = ListArgs {
            search: Some("nothing here".into()),
            ..ListArgs::default()
        };
        let output = list_notes(&repo, &searching, &config, clock.now())?;
        assert!(output.contains("No notes found"));
        Ok(())
    }

    #[test]
    fn empty_list_says_no_notes_yet() -> TestResult {
        let (_temp, repo, clock) = setup_repo()?;
        let output = list_notes(&repo, &ListArgs::default(), &AppConfig::default(), clock.now())?;
        assert_eq!(output, "All Notes (0 notes)\nNo notes yet\n");
        Ok(())
    }

    #[test]
    fn edit_by_prefix_keeps_unspecified_fields() -> TestResult {
        let (_temp, mut repo, clock) = setup_repo()?;
        new_note(&mut repo, new_args("Original", "keep me", Category::Ideas))?;
        let id = repo.all()[0].id.clone();
        clock.advance(Duration::hours(1));

        let output = edit_note(
            &mut repo,
            EditArgs {
                id: id.short().to_string(),
                title: Some("Renamed".into()),
                content: None,
                category: None,
            },
        )?;
        assert!(output.contains("\"Renamed\""));
        let note = repo.find_by_id(&id).expect("note still present");
        assert_eq!(note.content, "keep me");
        assert_eq!(note.category, Category::Ideas);
        assert_eq!(note.updated_at, START + Duration::hours(1));
        Ok(())
    }

    #[test]
    fn short_or_unknown_ids_are_rejected() -> TestResult {
        let (_temp, mut repo, _clock) = setup_repo()?;
        new_note(&mut repo, new_args("Target", "", Category::Work))?;
        let short = DeleteArgs { id: "ab".into() };
        assert!(delete_note(&mut repo, &short).is_err());
        let unknown = DeleteArgs {
            id: "zzzz-zzzz".into(),
        };
        assert!(delete_note(&mut repo, &unknown).is_err());
        assert_eq!(repo.len(), 1);
        Ok(())
    }

    #[test]
    fn delete_removes_the_note_from_disk() -> TestResult {
        let (temp, mut repo, _clock) = setup_repo()?;
        new_note(&mut repo, new_args("Doomed", "", Category::Personal))?;
        let id = repo.all()[0].id.clone();
        let output = delete_note(
            &mut repo,
            &DeleteArgs {
                id: id.to_string(),
            },
        )?;
        assert!(output.starts_with("Deleted note"));

        let paths = ConfigPaths::under(temp.path());
        let reopened = NoteRepository::open(storage::init(&paths, &StorageOptions::default())?);
        assert!(reopened.is_empty());
        Ok(())
    }

    #[test]
    fn show_prints_dates_and_counts() -> TestResult {
        let (_temp, mut repo, clock) = setup_repo()?;
        new_note(&mut repo, new_args("Journal", "one two three", Category::Personal))?;
        let id = repo.all()[0].id.clone();
        clock.advance(Duration::days(2));

        let output = show_note(
            &repo,
            &ShowArgs {
                id: id.to_string(),
            },
            clock.now(),
        )?;
        assert!(output.starts_with("Journal\n"));
        assert!(output.contains("created   2024-08-01 09:00"));
        assert!(output.contains("(2 days ago)"));
        assert!(output.contains("3 words • 13 characters"));
        Ok(())
    }

    #[test]
    fn stats_report_counts_totals_and_recent() -> TestResult {
        let (_temp, mut repo, clock) = setup_repo()?;
        for (title, category) in [
            ("First", Category::Work),
            ("Second", Category::Work),
            ("Third", Category::Ideas),
            ("Fourth", Category::Personal),
        ] {
            new_note(&mut repo, new_args(title, "two words", category))?;
            clock.advance(Duration::minutes(10));
        }

        let output = stats(&repo, &AppConfig::default(), clock.now());
        assert!(output.contains("  All           4"));
        assert!(output.contains("  Work          2"));
        assert!(output.contains("Total notes: 4"));
        assert!(output.contains("Total words: 12"));
        assert!(output.contains("Fourth (10 minutes ago)"));
        assert!(output.contains("      two words..."));
        assert!(!output.contains("First ("));
        Ok(())
    }
}
