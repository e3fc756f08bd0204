// src/store/sqlite.rs
// =============================================================================
// SQLite store built on rusqlite.
//
// rusqlite is synchronous and a Connection can't be shared between threads,
// so it sits behind a Mutex. Queries here are small and local; we run them
// inline instead of shipping them to a blocking thread pool.
//
// Anything touching more than one row (cascades, renames, reorders, the
// implicit category on insert) runs inside a transaction.
// =============================================================================

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql, Transaction};

use super::schema;
use super::{CategoryStore, LinkStore, NoteStore};
use crate::error::{AppError, Result};
use crate::models::{
    display_orders, Category, Link, LinkHealth, LinkId, LinkUpdate, NewLink, Note, NoteDraft,
    NoteId, SortDirection,
};

const LINK_COLUMNS: &str = "id, category, title, url, description, favicon, \
                            last_visited, visit_count, health, created_at, updated_at";

const NOTE_COLUMNS: &str = "id, title, content, tags, sort_order, created_at, updated_at";

impl ToSql for LinkHealth {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for LinkHealth {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: AppError| FromSqlError::Other(Box::new(e)))
    }
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and bring the schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        log::debug!("Opened SQLite database at {}", path.as_ref().display());
        Self::with_connection(conn)
    }

    /// A private database that disappears with the store.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(mut conn: Connection) -> Result<Self> {
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| AppError::storage("database connection lock poisoned"))?;
        f(&mut conn)
    }

    fn query_links(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Link>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let links = stmt
                .query_map(params, row_to_link)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(links)
        })
    }
}

fn row_to_link(row: &Row) -> rusqlite::Result<Link> {
    Ok(Link {
        id: row.get(0)?,
        category: row.get(1)?,
        title: row.get(2)?,
        url: row.get(3)?,
        description: row.get(4)?,
        favicon: row.get(5)?,
        last_visited: row.get(6)?,
        visit_count: row.get(7)?,
        health: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn row_to_note(row: &Row) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        tags: row.get(3)?,
        sort_order: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn row_to_category(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        name: row.get(0)?,
        sort_order: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn ensure_category(tx: &Transaction, name: &str) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT OR IGNORE INTO categories (name, sort_order, created_at)
         SELECT ?1, COALESCE(MAX(sort_order), 0) + 1, ?2 FROM categories",
        params![name, Utc::now()],
    )?;
    Ok(())
}

fn drop_category_if_empty(tx: &Transaction, name: &str) -> rusqlite::Result<()> {
    tx.execute(
        "DELETE FROM categories
         WHERE name = ?1 AND NOT EXISTS (SELECT 1 FROM links WHERE category = ?1)",
        params![name],
    )?;
    Ok(())
}

fn category_exists(tx: &Transaction, name: &str) -> rusqlite::Result<bool> {
    tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?1)",
        params![name],
        |row| row.get(0),
    )
}

/// Escape LIKE wildcards so a search for "100%" means the literal text.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl LinkStore for SqliteStore {
    async fn find_all(&self) -> Result<Vec<Link>> {
        self.query_links(
            &format!("SELECT {LINK_COLUMNS} FROM links ORDER BY category, title"),
            [],
        )
    }

    async fn find_by_id(&self, id: LinkId) -> Result<Option<Link>> {
        self.with_conn(|conn| {
            let link = conn
                .query_row(
                    &format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?1"),
                    params![id],
                    row_to_link,
                )
                .optional()?;
            Ok(link)
        })
    }

    async fn find_by_category(&self, category: &str) -> Result<Vec<Link>> {
        self.query_links(
            &format!("SELECT {LINK_COLUMNS} FROM links WHERE category = ?1 ORDER BY title"),
            params![category],
        )
    }

    async fn search(&self, query: &str) -> Result<Vec<Link>> {
        self.query_links(
            &format!(
                "SELECT {LINK_COLUMNS} FROM links
                 WHERE title LIKE ?1 ESCAPE '\\'
                    OR description LIKE ?1 ESCAPE '\\'
                    OR category LIKE ?1 ESCAPE '\\'
                 ORDER BY category, title"
            ),
            params![like_pattern(query)],
        )
    }

    async fn recent_visits(&self, limit: usize) -> Result<Vec<Link>> {
        self.query_links(
            &format!(
                "SELECT {LINK_COLUMNS} FROM links
                 WHERE last_visited IS NOT NULL
                 ORDER BY last_visited DESC
                 LIMIT ?1"
            ),
            params![limit as i64],
        )
    }

    async fn insert(&self, link: NewLink) -> Result<Link> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();
            ensure_category(&tx, &link.category)?;
            tx.execute(
                "INSERT INTO links (category, title, url, description, favicon, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    link.category,
                    link.title,
                    link.url,
                    link.description,
                    link.favicon,
                    now
                ],
            )?;
            let id = tx.last_insert_rowid();
            let stored = tx.query_row(
                &format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?1"),
                params![id],
                row_to_link,
            )?;
            tx.commit()?;
            Ok(stored)
        })
    }

    async fn update_fields(&self, id: LinkId, fields: LinkUpdate) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let old_category: Option<String> = tx
                .query_row(
                    "SELECT category FROM links WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(old_category) = old_category else {
                return Ok(false);
            };

            let new_category = fields.category.clone();
            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn ToSql>> = Vec::new();

            if let Some(category) = fields.category {
                sets.push("category = ?");
                values.push(Box::new(category));
            }
            if let Some(title) = fields.title {
                sets.push("title = ?");
                values.push(Box::new(title));
            }
            if let Some(url) = fields.url {
                sets.push("url = ?");
                values.push(Box::new(url));
            }
            if let Some(description) = fields.description {
                sets.push("description = ?");
                values.push(Box::new(description));
            }
            if let Some(favicon) = fields.favicon {
                sets.push("favicon = ?");
                values.push(Box::new(favicon));
            }
            if let Some(health) = fields.health {
                sets.push("health = ?");
                values.push(Box::new(health));
            }
            sets.push("updated_at = ?");
            values.push(Box::new(Utc::now()));
            values.push(Box::new(id));

            let sql = format!("UPDATE links SET {} WHERE id = ?", sets.join(", "));
            tx.execute(&sql, params_from_iter(values.iter()))?;

            if let Some(new_category) = new_category.filter(|c| *c != old_category) {
                ensure_category(&tx, &new_category)?;
                drop_category_if_empty(&tx, &old_category)?;
            }
            tx.commit()?;
            Ok(true)
        })
    }

    async fn record_visit(&self, id: LinkId) -> Result<bool> {
        self.with_conn(|conn| {
            let now = Utc::now();
            let affected = conn.execute(
                "UPDATE links
                 SET last_visited = ?1, visit_count = visit_count + 1, updated_at = ?1
                 WHERE id = ?2",
                params![now, id],
            )?;
            Ok(affected > 0)
        })
    }

    async fn delete(&self, id: LinkId) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let category: Option<String> = tx
                .query_row(
                    "SELECT category FROM links WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(category) = category else {
                return Ok(false);
            };
            tx.execute("DELETE FROM links WHERE id = ?1", params![id])?;
            drop_category_if_empty(&tx, &category)?;
            tx.commit()?;
            Ok(true)
        })
    }
}

#[async_trait]
impl CategoryStore for SqliteStore {
    async fn list_categories(&self, direction: SortDirection) -> Result<Vec<Category>> {
        let order = match direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT name, sort_order, created_at FROM categories ORDER BY sort_order {order}"
            ))?;
            let categories = stmt
                .query_map([], row_to_category)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(categories)
        })
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if category_exists(&tx, name)? {
                return Err(AppError::conflict(format!("category '{name}' already exists")));
            }
            ensure_category(&tx, name)?;
            let category = tx.query_row(
                "SELECT name, sort_order, created_at FROM categories WHERE name = ?1",
                params![name],
                row_to_category,
            )?;
            tx.commit()?;
            Ok(category)
        })
    }

    async fn rename_category(&self, old: &str, new: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if !category_exists(&tx, old)? {
                return Ok(false);
            }
            if old == new {
                return Ok(true);
            }
            if category_exists(&tx, new)? {
                return Err(AppError::conflict(format!("category '{new}' already exists")));
            }
            let moved = tx.execute(
                "UPDATE links SET category = ?1, updated_at = ?2 WHERE category = ?3",
                params![new, Utc::now(), old],
            )?;
            tx.execute(
                "UPDATE categories SET name = ?1 WHERE name = ?2",
                params![new, old],
            )?;
            tx.commit()?;
            log::debug!("Renamed category '{}' to '{}' ({} links)", old, new, moved);
            Ok(true)
        })
    }

    async fn delete_category(&self, name: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute("DELETE FROM links WHERE category = ?1", params![name])?;
            tx.execute("DELETE FROM categories WHERE name = ?1", params![name])?;
            tx.commit()?;
            Ok(removed)
        })
    }

    async fn reorder_categories(&self, names: &[String]) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            for (name, order) in display_orders(names) {
                tx.execute(
                    "UPDATE categories SET sort_order = ?1 WHERE name = ?2",
                    params![order, name],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }
}

#[async_trait]
impl NoteStore for SqliteStore {
    async fn list_notes(&self) -> Result<Vec<Note>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTE_COLUMNS} FROM notes ORDER BY sort_order DESC, id DESC"
            ))?;
            let notes = stmt
                .query_map([], row_to_note)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(notes)
        })
    }

    async fn find_note(&self, id: NoteId) -> Result<Option<Note>> {
        self.with_conn(|conn| {
            let note = conn
                .query_row(
                    &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                    params![id],
                    row_to_note,
                )
                .optional()?;
            Ok(note)
        })
    }

    async fn create_note(&self, draft: NoteDraft) -> Result<Note> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();
            tx.execute(
                "INSERT INTO notes (title, content, tags, sort_order, created_at, updated_at)
                 SELECT ?1, ?2, ?3, COALESCE(MAX(sort_order), 0) + 1, ?4, ?4 FROM notes",
                params![draft.title, draft.content, draft.tags, now],
            )?;
            let id = tx.last_insert_rowid();
            let note = tx.query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                params![id],
                row_to_note,
            )?;
            tx.commit()?;
            Ok(note)
        })
    }

    async fn update_note(&self, id: NoteId, draft: NoteDraft) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE notes SET title = ?1, content = ?2, tags = ?3, updated_at = ?4 WHERE id = ?5",
                params![draft.title, draft.content, draft.tags, Utc::now(), id],
            )?;
            Ok(affected > 0)
        })
    }

    async fn delete_note(&self, id: NoteId) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM notes WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
    }

    async fn reorder_notes(&self, ids: &[NoteId]) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();
            for (id, order) in display_orders(ids) {
                tx.execute(
                    "UPDATE notes SET sort_order = ?1, updated_at = ?2 WHERE id = ?3",
                    params![order, now, id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }
}
