pub mod app;
pub mod cli;
pub mod config;
pub mod format;
pub mod highlight;
pub mod model;
pub mod repo;
pub mod search;
pub mod storage;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use model::{Category, CategoryFilter, Note, NoteId};
pub use repo::{NoteRepository, RepoError};
