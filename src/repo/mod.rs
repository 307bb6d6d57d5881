//! In-memory note collection with write-through persistence.
//!
//! Every successful mutation persists the full collection exactly once. The
//! prospective collection is written before it replaces the live one, so a
//! failed write leaves memory and storage in agreement.

use std::sync::Arc;

use thiserror::Error;

use crate::model::{Category, Clock, Note, NoteId, SystemClock};
use crate::storage::NoteStorage;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Validation(String),
    #[error("note {0} not found")]
    NotFound(NoteId),
    #[error("storage failure: {0:#}")]
    Storage(#[source] anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

pub struct NoteRepository {
    storage: NoteStorage,
    clock: Arc<dyn Clock>,
    notes: Vec<Note>,
}

impl NoteRepository {
    /// Loads the persisted collection. Never fails: unreadable data starts
    /// an empty collection.
    pub fn open(storage: NoteStorage) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: NoteStorage, clock: Arc<dyn Clock>) -> Self {
        let notes = storage.load();
        tracing::info!(count = notes.len(), key = storage.key(), "loaded notes");
        Self {
            storage,
            clock,
            notes,
        }
    }

    pub fn all(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn find_by_id(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| &note.id == id)
    }

    /// Resolves a full id or an unambiguous prefix.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&Note> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return None;
        }
        if let Some(exact) = self.notes.iter().find(|note| note.id.as_str() == prefix) {
            return Some(exact);
        }
        let mut matches = self
            .notes
            .iter()
            .filter(|note| note.id.as_str().starts_with(prefix));
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(first)
    }

    pub fn create(&mut self, title: &str, content: &str, category: Category) -> RepoResult<Note> {
        let title = validate_title(title)?;
        let now = self.clock.now();
        let note = Note {
            id: self.fresh_id(),
            title,
            content: content.trim().to_string(),
            category,
            created_at: now,
            updated_at: now,
        };

        let mut next = Vec::with_capacity(self.notes.len() + 1);
        next.push(note.clone());
        next.extend(self.notes.iter().cloned());
        self.commit(next)?;
        tracing::debug!(note_id = %note.id, category = %note.category, "note created");
        Ok(note)
    }

    pub fn update(
        &mut self,
        id: &NoteId,
        title: &str,
        content: &str,
        category: Category,
    ) -> RepoResult<Note> {
        let index = self.index_of(id)?;
        let title = validate_title(title)?;

        let mut next = self.notes.clone();
        let note = &mut next[index];
        note.title = title;
        note.content = content.trim().to_string();
        note.category = category;
        note.updated_at = self.clock.now().max(note.updated_at);
        let updated = note.clone();

        self.commit(next)?;
        tracing::debug!(note_id = %updated.id, "note updated");
        Ok(updated)
    }

    /// Removes a note. An unknown id is reported as [`RepoError::NotFound`]
    /// and leaves the collection untouched.
    pub fn delete(&mut self, id: &NoteId) -> RepoResult<Note> {
        let index = self.index_of(id)?;
        let mut next = self.notes.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        tracing::debug!(note_id = %removed.id, "note deleted");
        Ok(removed)
    }

    fn index_of(&self, id: &NoteId) -> RepoResult<usize> {
        self.notes
            .iter()
            .position(|note| &note.id == id)
            .ok_or_else(|| RepoError::NotFound(id.clone()))
    }

    fn fresh_id(&self) -> NoteId {
        loop {
            let id = NoteId::generate();
            if self.find_by_id(&id).is_none() {
                return id;
            }
        }
    }

    fn commit(&mut self, next: Vec<Note>) -> RepoResult<()> {
        self.storage.save(&next).map_err(RepoError::Storage)?;
        self.notes = next;
        Ok(())
    }
}

fn validate_title(title: &str) -> RepoResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(RepoError::Validation(
            "Please enter a title for your note.".into(),
        ));
    }
    Ok(trimmed.to_string())
}
