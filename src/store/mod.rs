// src/store/mod.rs
// =============================================================================
// Persistence for links, categories and notes.
//
// The rest of the program only sees three traits. Two backends implement
// all of them:
// - memory: a HashMap-ish state behind one mutex (tests, `--memory`)
// - sqlite: rusqlite with a schema created on open (the default)
//
// Both keep the same rules:
// - adding a link under an unknown category creates the category
// - deleting the last link of a category deletes the category
// - deleting a category deletes its links
// - every mutating write refreshes updated_at
// =============================================================================

mod memory;
mod schema;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Category, Link, LinkId, LinkUpdate, NewLink, Note, NoteDraft, NoteId, SortDirection,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// How many links `recent_visits` returns when the caller doesn't care.
pub const RECENT_VISITS_LIMIT: usize = 10;

#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Every link, ordered by category then title.
    async fn find_all(&self) -> Result<Vec<Link>>;

    async fn find_by_id(&self, id: LinkId) -> Result<Option<Link>>;

    /// Links of one category, ordered by title.
    async fn find_by_category(&self, category: &str) -> Result<Vec<Link>>;

    /// Case-insensitive substring match on title, description and category.
    async fn search(&self, query: &str) -> Result<Vec<Link>>;

    /// Visited links, most recent first.
    async fn recent_visits(&self, limit: usize) -> Result<Vec<Link>>;

    async fn insert(&self, link: NewLink) -> Result<Link>;

    /// Returns false if the link doesn't exist.
    async fn update_fields(&self, id: LinkId, fields: LinkUpdate) -> Result<bool>;

    /// Bumps visit_count and sets last_visited to now.
    async fn record_visit(&self, id: LinkId) -> Result<bool>;

    async fn delete(&self, id: LinkId) -> Result<bool>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn list_categories(&self, direction: SortDirection) -> Result<Vec<Category>>;

    /// Fails with Conflict if the name is taken.
    async fn create_category(&self, name: &str) -> Result<Category>;

    /// Moves every link of `old` to `new`. Returns false if `old` doesn't exist.
    async fn rename_category(&self, old: &str, new: &str) -> Result<bool>;

    /// Deletes the category and its links; returns how many links went with it.
    async fn delete_category(&self, name: &str) -> Result<usize>;

    /// First name gets the highest sort order. Unknown names are ignored.
    async fn reorder_categories(&self, names: &[String]) -> Result<()>;
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Notes in display order (highest sort_order first).
    async fn list_notes(&self) -> Result<Vec<Note>>;

    async fn find_note(&self, id: NoteId) -> Result<Option<Note>>;

    async fn create_note(&self, draft: NoteDraft) -> Result<Note>;

    async fn update_note(&self, id: NoteId, draft: NoteDraft) -> Result<bool>;

    async fn delete_note(&self, id: NoteId) -> Result<bool>;

    /// First id gets the highest sort order. Unknown ids are ignored.
    async fn reorder_notes(&self, ids: &[NoteId]) -> Result<()>;
}

/// The three store views of one backend, cheap to clone.
#[derive(Clone)]
pub struct StoreHandles {
    pub links: Arc<dyn LinkStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub notes: Arc<dyn NoteStore>,
}

impl StoreHandles {
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: LinkStore + CategoryStore + NoteStore + 'static,
    {
        Self {
            links: backend.clone(),
            categories: backend.clone(),
            notes: backend,
        }
    }

    pub fn memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }
}
