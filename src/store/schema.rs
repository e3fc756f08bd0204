// src/store/schema.rs
// =============================================================================
// SQLite schema. Every statement is idempotent, so this runs on every open.
// =============================================================================

use chrono::Utc;
use rusqlite::{params, Connection};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    name        TEXT PRIMARY KEY,
    sort_order  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS links (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    category     TEXT NOT NULL,
    title        TEXT NOT NULL,
    url          TEXT NOT NULL,
    description  TEXT,
    favicon      TEXT,
    last_visited TEXT,
    visit_count  INTEGER NOT NULL DEFAULT 0,
    health       TEXT NOT NULL DEFAULT 'unchecked',
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_links_category ON links(category);
CREATE INDEX IF NOT EXISTS idx_links_last_visited ON links(last_visited);

CREATE TABLE IF NOT EXISTS notes (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    tags        TEXT,
    sort_order  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
";

pub fn migrate(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;
    backfill_categories(conn)
}

/// Databases filled before categories had their own table only have the
/// category name on each link. Give each such name a row; the category
/// used first gets the highest order, so it is displayed first.
fn backfill_categories(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    let missing: Vec<String> = {
        let mut stmt = tx.prepare(
            "SELECT category FROM links
             WHERE category NOT IN (SELECT name FROM categories)
             GROUP BY category
             ORDER BY MIN(id)",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    if !missing.is_empty() {
        log::info!("Backfilling {} categories from existing links", missing.len());
        let base: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sort_order), 0) FROM categories",
            [],
            |row| row.get(0),
        )?;
        let now = Utc::now();
        for (i, name) in missing.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO categories (name, sort_order, created_at) VALUES (?1, ?2, ?3)",
                params![name, base + (missing.len() - i) as i64, now],
            )?;
        }
    }
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_twice_is_fine() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
    }

    #[test]
    fn test_backfill_orders_oldest_last() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        let now = Utc::now();
        for category in ["Old", "New", "Old"] {
            conn.execute(
                "INSERT INTO links (category, title, url, created_at, updated_at)
                 VALUES (?1, 't', 'https://example.com/', ?2, ?2)",
                params![category, now],
            )
            .unwrap();
        }

        migrate(&mut conn).unwrap();

        let names: Vec<String> = conn
            .prepare("SELECT name FROM categories ORDER BY sort_order DESC")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(names, vec!["Old", "New"]);
    }
}
