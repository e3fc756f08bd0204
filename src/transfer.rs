// src/transfer.rs
// =============================================================================
// Bulk import of links, shared by POST /api/import and `link-shelf import`.
//
// Accepted shapes:
//   { "links": [ {category, title, url, description?}, ... ] }
//   [ {category, title, url, description?}, ... ]
//
// The second shape is what /api/export and `link-shelf export` write, so an
// export can be fed straight back in. Extra fields (id, favicon, health...)
// are ignored; imported links start fresh.
//
// Entries that fail validation are skipped and counted. They don't abort
// the import.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Link, NewLink};
use crate::store::LinkStore;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImportEntry {
    pub category: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ImportFile {
    Wrapped { links: Vec<ImportEntry> },
    Bare(Vec<ImportEntry>),
}

impl ImportFile {
    pub fn into_entries(self) -> Vec<ImportEntry> {
        match self {
            ImportFile::Wrapped { links } => links,
            ImportFile::Bare(links) => links,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    #[serde(skip)]
    pub links: Vec<Link>,
    pub imported: usize,
    pub skipped: usize,
}

pub async fn import_links(store: &dyn LinkStore, entries: Vec<ImportEntry>) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for (index, entry) in entries.into_iter().enumerate() {
        let new_link = match NewLink::new(
            &entry.category,
            &entry.title,
            &entry.url,
            entry.description.as_deref(),
        ) {
            Ok(link) => link,
            Err(e) => {
                log::warn!("Import: skipping entry {}: {}", index, e);
                summary.skipped += 1;
                continue;
            }
        };
        summary.links.push(store.insert(new_link).await?);
    }

    summary.imported = summary.links.len();
    log::info!(
        "Imported {} link(s), skipped {}",
        summary.imported,
        summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_both_shapes_parse() {
        let wrapped: ImportFile =
            serde_json::from_str(r#"{"links":[{"category":"a","title":"b","url":"c.com"}]}"#)
                .unwrap();
        assert_eq!(wrapped.into_entries().len(), 1);

        let bare: ImportFile = serde_json::from_str(
            r#"[{"id":7,"category":"a","title":"b","url":"c.com","health":"valid"}]"#,
        )
        .unwrap();
        assert_eq!(bare.into_entries()[0].title, "b");
    }

    #[tokio::test]
    async fn test_invalid_entries_are_skipped() {
        let store = MemoryStore::new();
        let entries = vec![
            ImportEntry {
                category: "Dev".into(),
                title: "Rust".into(),
                url: "rust-lang.org".into(),
                description: None,
            },
            ImportEntry {
                category: "Dev".into(),
                title: "".into(),
                url: "example.com".into(),
                description: None,
            },
            ImportEntry {
                category: "Dev".into(),
                title: "Broken".into(),
                url: "not a url".into(),
                description: None,
            },
        ];

        let summary = import_links(&store, entries).await.unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(store.find_all().await.unwrap().len(), 1);
    }
}
