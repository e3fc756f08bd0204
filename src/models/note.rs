// src/models/note.rs
// =============================================================================
// Free-form notes. They live next to links but have nothing to do with them.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::link::{optional, required};
use crate::error::Result;

pub type NoteId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Comma-delimited, kept as the user typed it
    #[serde(default)]
    pub tags: Option<String>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated note contents, used both for creating and for replacing a note.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub tags: Option<String>,
}

impl NoteDraft {
    pub fn new(title: &str, content: &str, tags: Option<&str>) -> Result<Self> {
        Ok(Self {
            title: required("title", title)?,
            content: required("content", content)?,
            tags: optional(tags),
        })
    }
}
