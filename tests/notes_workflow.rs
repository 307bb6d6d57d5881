use std::sync::Arc;

use anyhow::Result;
use notekeeper::app::{ActionDispatcher, App, AppState, Command};
use notekeeper::config::{ConfigLoader, ConfigPaths};
use notekeeper::search::{derive_view, note_stats, SortKey, ViewQuery};
use notekeeper::storage::{self, KeyValueStore, NoteStorage, SqliteStore};
use notekeeper::{Category, CategoryFilter, NoteRepository};
use tempfile::TempDir;

fn open_repo(temp: &TempDir) -> Result<(Arc<notekeeper::AppConfig>, NoteRepository)> {
    let loader = ConfigLoader::from_paths(ConfigPaths::under(temp.path()));
    let config = loader.load_or_init()?;
    let storage = storage::init(loader.paths(), &config.storage)?;
    Ok((Arc::new(config), NoteRepository::open(storage)))
}

#[test]
fn notes_survive_a_restart() -> Result<()> {
    let temp = TempDir::new()?;
    let (_config, mut repo) = open_repo(&temp)?;
    let work = repo.create("Quarterly review", "numbers and goals", Category::Work)?;
    let idea = repo.create("Garden robot", "waters plants", Category::Ideas)?;
    repo.update(&idea.id, "Garden robot v2", "waters plants daily", Category::Ideas)?;
    drop(repo);

    let (_config, reopened) = open_repo(&temp)?;
    assert_eq!(reopened.len(), 2);
    let restored = reopened.find_by_id(&work.id).expect("work note restored");
    assert_eq!(restored, &work);
    let updated = reopened.find_by_id(&idea.id).expect("idea restored");
    assert_eq!(updated.title, "Garden robot v2");
    assert_eq!(updated.created_at, idea.created_at);
    Ok(())
}

#[test]
fn controller_commands_drive_the_view() -> Result<()> {
    let temp = TempDir::new()?;
    let (config, mut repo) = open_repo(&temp)?;
    let mut state = AppState::new(&config, repo.all());
    let mut dispatcher = ActionDispatcher::new(&mut repo);

    for (title, category) in [
        ("Standup notes", Category::Work),
        ("Birthday list", Category::Personal),
        ("Startup idea", Category::Ideas),
    ] {
        dispatcher.dispatch(
            &mut state,
            Command::CreateNote {
                title: title.into(),
                content: String::new(),
                category,
            },
        )?;
    }
    dispatcher.dispatch(&mut state, Command::SetSearch("st".into()))?;
    dispatcher.dispatch(&mut state, Command::SetSort(SortKey::Title))?;

    let titles: Vec<_> = state
        .visible_notes(repo.all())
        .into_iter()
        .map(|note| note.title.clone())
        .collect();
    assert_eq!(titles, vec!["Birthday list", "Standup notes", "Startup idea"]);
    assert_eq!(state.counts().get(CategoryFilter::All), 3);
    assert_eq!(state.stats(), note_stats(repo.all()));
    Ok(())
}

#[test]
fn malformed_blob_is_kept_aside_and_app_starts_empty() -> Result<()> {
    let temp = TempDir::new()?;
    let loader = ConfigLoader::from_paths(ConfigPaths::under(temp.path()));
    let config = loader.load_or_init()?;
    let store = SqliteStore::open(&config.storage.database_path, &config.storage)?;
    store.set(&config.storage.storage_key, "[{\"id\": 1,")?;

    let repo = NoteRepository::open(NoteStorage::new(
        Arc::new(store.clone()),
        config.storage.storage_key.clone(),
    ));
    assert!(repo.is_empty());
    assert_eq!(
        store.get("notes.unreadable")?.as_deref(),
        Some("[{\"id\": 1,")
    );

    let app = App::new(Arc::new(config), repo);
    assert_eq!(app.state().visible_len(), 0);
    assert!(!app.state().is_filtered());
    Ok(())
}

#[test]
fn query_engine_over_persisted_notes() -> Result<()> {
    let temp = TempDir::new()?;
    let (_config, mut repo) = open_repo(&temp)?;
    repo.create("Cherry", "", Category::Personal)?;
    repo.create("apple", "", Category::Personal)?;
    repo.create("Banana", "", Category::Work)?;

    let all = ViewQuery::new(CategoryFilter::All, "", SortKey::Title);
    let titles: Vec<_> = derive_view(repo.all(), &all)
        .into_iter()
        .map(|note| note.title.as_str())
        .collect();
    assert_eq!(titles, vec!["apple", "Banana", "Cherry"]);

    let personal = ViewQuery::new(Category::Personal.into(), "", SortKey::TitleDesc);
    let titles: Vec<_> = derive_view(repo.all(), &personal)
        .into_iter()
        .map(|note| note.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Cherry", "apple"]);
    Ok(())
}
