use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{ConfigPaths, StorageOptions};
use crate::model::Note;

mod kv;
mod schema;

pub use kv::{KeyValueStore, MemoryStore, SqliteStore};

pub const DEFAULT_STORAGE_KEY: &str = "notes";
const UNREADABLE_SUFFIX: &str = "unreadable";

/// Persists the whole note collection as one JSON blob under a single key.
#[derive(Clone)]
pub struct NoteStorage {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl NoteStorage {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), DEFAULT_STORAGE_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Reads the stored collection. Missing, unreadable or malformed data all
    /// yield an empty collection; a malformed blob is copied aside first so
    /// the next save does not destroy it.
    pub fn load(&self) -> Vec<Note> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(?err, key = %self.key, "failed to read notes, starting empty");
                return Vec::new();
            }
        };
        if raw.trim().is_empty() || raw.trim() == "null" {
            return Vec::new();
        }
        match serde_json::from_str::<Vec<Note>>(&raw) {
            Ok(notes) => normalize(notes),
            Err(err) => {
                tracing::warn!(%err, key = %self.key, "stored notes are malformed, starting empty");
                let backup_key = format!("{}.{UNREADABLE_SUFFIX}", self.key);
                if let Err(err) = self.store.set(&backup_key, &raw) {
                    tracing::error!(?err, key = %backup_key, "failed to preserve malformed notes");
                }
                Vec::new()
            }
        }
    }

    pub fn save(&self, notes: &[Note]) -> Result<()> {
        let payload = serde_json::to_string(notes).context("serializing notes")?;
        self.store
            .set(&self.key, &payload)
            .with_context(|| format!("persisting {} notes", notes.len()))?;
        tracing::trace!(count = notes.len(), bytes = payload.len(), "notes persisted");
        Ok(())
    }
}

/// Drops duplicate ids (first one wins) and repairs `updatedAt < createdAt`.
fn normalize(notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::with_capacity(notes.len());
    let mut result = Vec::with_capacity(notes.len());
    for mut note in notes {
        if !seen.insert(note.id.clone()) {
            tracing::warn!(note_id = %note.id, "dropping duplicate note id from storage");
            continue;
        }
        if note.updated_at < note.created_at {
            tracing::warn!(note_id = %note.id, "note updated before it was created, repairing");
            note.updated_at = note.created_at;
        }
        result.push(note);
    }
    result
}

pub fn init(paths: &ConfigPaths, options: &StorageOptions) -> Result<NoteStorage> {
    let db_path = if options.database_path.as_os_str().is_empty() {
        paths.database_path.clone()
    } else {
        options.database_path.clone()
    };
    let store = SqliteStore::open(&db_path, options)?;
    tracing::debug!(path = %db_path.display(), key = %options.storage_key, "storage ready");
    Ok(NoteStorage::new(Arc::new(store), options.storage_key.clone()))
}
