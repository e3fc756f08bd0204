// src/store/memory.rs
// =============================================================================
// In-memory store.
//
// All state sits behind a single std Mutex. No method awaits while holding
// it, so every operation is atomic with respect to the others, the same
// guarantee the SQLite backend gets from transactions.
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{CategoryStore, LinkStore, NoteStore};
use crate::error::{AppError, Result};
use crate::models::{
    display_orders, Category, Link, LinkId, LinkUpdate, NewLink, Note, NoteDraft, NoteId,
    SortDirection,
};

#[derive(Default)]
struct State {
    links: BTreeMap<LinkId, Link>,
    categories: HashMap<String, Category>,
    notes: BTreeMap<NoteId, Note>,
    next_link_id: LinkId,
    next_note_id: NoteId,
}

impl State {
    fn ensure_category(&mut self, name: &str) {
        if self.categories.contains_key(name) {
            return;
        }
        let sort_order = self.max_category_order() + 1;
        self.categories.insert(
            name.to_string(),
            Category {
                name: name.to_string(),
                sort_order,
                created_at: Utc::now(),
            },
        );
    }

    fn max_category_order(&self) -> i64 {
        self.categories
            .values()
            .map(|c| c.sort_order)
            .max()
            .unwrap_or(0)
    }

    fn category_in_use(&self, name: &str) -> bool {
        self.links.values().any(|l| l.category == name)
    }

    fn drop_category_if_empty(&mut self, name: &str) {
        if !self.category_in_use(name) {
            self.categories.remove(name);
        }
    }
}

/// Store backed by process memory. Everything is lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::storage("memory store lock poisoned"))
    }
}

fn sorted(mut links: Vec<Link>) -> Vec<Link> {
    links.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.title.cmp(&b.title))
    });
    links
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn find_all(&self) -> Result<Vec<Link>> {
        let state = self.lock()?;
        Ok(sorted(state.links.values().cloned().collect()))
    }

    async fn find_by_id(&self, id: LinkId) -> Result<Option<Link>> {
        Ok(self.lock()?.links.get(&id).cloned())
    }

    async fn find_by_category(&self, category: &str) -> Result<Vec<Link>> {
        let state = self.lock()?;
        Ok(sorted(
            state
                .links
                .values()
                .filter(|l| l.category == category)
                .cloned()
                .collect(),
        ))
    }

    async fn search(&self, query: &str) -> Result<Vec<Link>> {
        let needle = query.to_lowercase();
        let state = self.lock()?;
        let hits = state
            .links
            .values()
            .filter(|l| {
                l.title.to_lowercase().contains(&needle)
                    || l.category.to_lowercase().contains(&needle)
                    || l
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        Ok(sorted(hits))
    }

    async fn recent_visits(&self, limit: usize) -> Result<Vec<Link>> {
        let state = self.lock()?;
        let mut visited: Vec<Link> = state
            .links
            .values()
            .filter(|l| l.last_visited.is_some())
            .cloned()
            .collect();
        visited.sort_by(|a, b| b.last_visited.cmp(&a.last_visited));
        visited.truncate(limit);
        Ok(visited)
    }

    async fn insert(&self, link: NewLink) -> Result<Link> {
        let mut state = self.lock()?;
        state.next_link_id += 1;
        let now = Utc::now();
        let stored = Link {
            id: state.next_link_id,
            category: link.category,
            title: link.title,
            url: link.url,
            description: link.description,
            favicon: link.favicon,
            last_visited: None,
            visit_count: 0,
            health: Default::default(),
            created_at: now,
            updated_at: now,
        };
        state.ensure_category(&stored.category);
        state.links.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_fields(&self, id: LinkId, fields: LinkUpdate) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(link) = state.links.get_mut(&id) else {
            return Ok(false);
        };

        let old_category = link.category.clone();
        if let Some(category) = fields.category {
            link.category = category;
        }
        if let Some(title) = fields.title {
            link.title = title;
        }
        if let Some(url) = fields.url {
            link.url = url;
        }
        if let Some(description) = fields.description {
            link.description = description;
        }
        if let Some(favicon) = fields.favicon {
            link.favicon = favicon;
        }
        if let Some(health) = fields.health {
            link.health = health;
        }
        link.updated_at = Utc::now();

        let new_category = link.category.clone();
        if new_category != old_category {
            state.ensure_category(&new_category);
            state.drop_category_if_empty(&old_category);
        }
        Ok(true)
    }

    async fn record_visit(&self, id: LinkId) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(link) = state.links.get_mut(&id) else {
            return Ok(false);
        };
        let now = Utc::now();
        link.last_visited = Some(now);
        link.visit_count += 1;
        link.updated_at = now;
        Ok(true)
    }

    async fn delete(&self, id: LinkId) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(link) = state.links.remove(&id) else {
            return Ok(false);
        };
        state.drop_category_if_empty(&link.category);
        Ok(true)
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list_categories(&self, direction: SortDirection) -> Result<Vec<Category>> {
        let state = self.lock()?;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by_key(|c| c.sort_order);
        if direction == SortDirection::Desc {
            categories.reverse();
        }
        Ok(categories)
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let mut state = self.lock()?;
        if state.categories.contains_key(name) {
            return Err(AppError::conflict(format!("category '{name}' already exists")));
        }
        state.ensure_category(name);
        state
            .categories
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::storage("category vanished after insert"))
    }

    async fn rename_category(&self, old: &str, new: &str) -> Result<bool> {
        let mut state = self.lock()?;
        if !state.categories.contains_key(old) {
            return Ok(false);
        }
        if old == new {
            return Ok(true);
        }
        if state.categories.contains_key(new) {
            return Err(AppError::conflict(format!("category '{new}' already exists")));
        }

        let now = Utc::now();
        for link in state.links.values_mut().filter(|l| l.category == old) {
            link.category = new.to_string();
            link.updated_at = now;
        }
        if let Some(mut category) = state.categories.remove(old) {
            category.name = new.to_string();
            state.categories.insert(new.to_string(), category);
        }
        Ok(true)
    }

    async fn delete_category(&self, name: &str) -> Result<usize> {
        let mut state = self.lock()?;
        let before = state.links.len();
        state.links.retain(|_, l| l.category != name);
        state.categories.remove(name);
        Ok(before - state.links.len())
    }

    async fn reorder_categories(&self, names: &[String]) -> Result<()> {
        let mut state = self.lock()?;
        for (name, order) in display_orders(names) {
            if let Some(category) = state.categories.get_mut(name) {
                category.sort_order = order;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn list_notes(&self) -> Result<Vec<Note>> {
        let state = self.lock()?;
        let mut notes: Vec<Note> = state.notes.values().cloned().collect();
        notes.sort_by(|a, b| b.sort_order.cmp(&a.sort_order).then(b.id.cmp(&a.id)));
        Ok(notes)
    }

    async fn find_note(&self, id: NoteId) -> Result<Option<Note>> {
        Ok(self.lock()?.notes.get(&id).cloned())
    }

    async fn create_note(&self, draft: NoteDraft) -> Result<Note> {
        let mut state = self.lock()?;
        state.next_note_id += 1;
        let sort_order = state.notes.values().map(|n| n.sort_order).max().unwrap_or(0) + 1;
        let now = Utc::now();
        let note = Note {
            id: state.next_note_id,
            title: draft.title,
            content: draft.content,
            tags: draft.tags,
            sort_order,
            created_at: now,
            updated_at: now,
        };
        state.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn update_note(&self, id: NoteId, draft: NoteDraft) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(note) = state.notes.get_mut(&id) else {
            return Ok(false);
        };
        note.title = draft.title;
        note.content = draft.content;
        note.tags = draft.tags;
        note.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_note(&self, id: NoteId) -> Result<bool> {
        Ok(self.lock()?.notes.remove(&id).is_some())
    }

    async fn reorder_notes(&self, ids: &[NoteId]) -> Result<()> {
        let mut state = self.lock()?;
        let now = Utc::now();
        for (id, order) in display_orders(ids) {
            if let Some(note) = state.notes.get_mut(id) {
                note.sort_order = order;
                note.updated_at = now;
            }
        }
        Ok(())
    }
}
