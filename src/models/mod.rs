// src/models/mod.rs
// =============================================================================
// Plain data types shared by the stores, the checker and the API.
//
// Submodules:
// - link: Link, NewLink, LinkUpdate, LinkHealth and URL normalization
// - category: Category and sort-order helpers
// - note: Note and NoteDraft
// =============================================================================

mod category;
mod link;
mod note;

pub use category::{display_orders, Category, SortDirection};
pub use link::{normalize_url, Link, LinkHealth, LinkId, LinkUpdate, NewLink};
pub use note::{Note, NoteDraft, NoteId};
