// src/models/link.rs
// =============================================================================
// The Link record and the small value types around it.
//
// Invariants enforced here (not in the stores):
// - url always carries a scheme and parses as a URL with a host
// - category and title are non-empty after trimming
// - empty descriptions are stored as None
//
// Health is tri-state. A freshly created link is Unchecked until the first
// sweep touches it; after that it is Valid or Invalid. It's advisory: a
// link can be reachable again long before the next sweep notices.
// =============================================================================

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

pub type LinkId = i64;

/// Result of the most recent validity sweep for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkHealth {
    #[default]
    Unchecked,
    Valid,
    Invalid,
}

impl LinkHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkHealth::Unchecked => "unchecked",
            LinkHealth::Valid => "valid",
            LinkHealth::Invalid => "invalid",
        }
    }

    /// Boolean view for clients that only know "valid or not".
    /// None means no sweep has looked at the link yet.
    pub fn is_valid(&self) -> Option<bool> {
        match self {
            LinkHealth::Unchecked => None,
            LinkHealth::Valid => Some(true),
            LinkHealth::Invalid => Some(false),
        }
    }
}

impl fmt::Display for LinkHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkHealth {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unchecked" => Ok(LinkHealth::Unchecked),
            "valid" => Ok(LinkHealth::Valid),
            "invalid" => Ok(LinkHealth::Invalid),
            other => Err(AppError::validation(format!("unknown link health '{other}'"))),
        }
    }
}

/// A stored bookmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: LinkId,
    pub category: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub last_visited: Option<DateTime<Utc>>,
    #[serde(default)]
    pub visit_count: i64,
    #[serde(default)]
    pub health: LinkHealth,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Link {
    /// The stored favicon, or the caller's default icon if discovery
    /// hasn't found one (yet).
    pub fn favicon_or<'a>(&'a self, default_icon: &'a str) -> &'a str {
        self.favicon.as_deref().unwrap_or(default_icon)
    }
}

/// A validated link about to be inserted. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub category: String,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub favicon: Option<String>,
}

impl NewLink {
    pub fn new(
        category: &str,
        title: &str,
        url: &str,
        description: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            category: required("category", category)?,
            title: required("title", title)?,
            url: normalize_url(url)?.to_string(),
            description: optional(description),
            favicon: None,
        })
    }
}

/// Partial update. `None` leaves a field alone; for the nullable fields
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkUpdate {
    pub category: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<Option<String>>,
    pub favicon: Option<Option<String>>,
    pub health: Option<LinkHealth>,
}

impl LinkUpdate {
    pub fn health(health: LinkHealth) -> Self {
        Self {
            health: Some(health),
            ..Self::default()
        }
    }

    pub fn favicon(favicon: Option<String>) -> Self {
        Self {
            favicon: Some(favicon),
            ..Self::default()
        }
    }

    /// Edit of the user-facing fields, validated the same way as a new link.
    /// Leaves health alone; callers reset it when the URL actually changed.
    pub fn edit(
        title: &str,
        url: &str,
        description: Option<&str>,
        category: Option<&str>,
    ) -> Result<Self> {
        let category = match category {
            Some(c) => Some(required("category", c)?),
            None => None,
        };
        Ok(Self {
            category,
            title: Some(required("title", title)?),
            url: Some(normalize_url(url)?.to_string()),
            description: Some(optional(description)),
            ..Self::default()
        })
    }

}

/// Make sure a user-supplied URL carries a scheme and parses.
///
/// Anything not starting with http:// or https:// gets https:// prepended,
/// the way a browser address bar would. The result must have a host;
/// "https://" on its own or a string with spaces in the host is rejected.
pub fn normalize_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("url is required"));
    }

    let with_scheme = if has_web_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| AppError::validation(format!("invalid url '{trimmed}': {e}")))?;

    if url.host_str().map_or(true, str::is_empty) {
        return Err(AppError::validation(format!("invalid url '{trimmed}': no host")));
    }
    Ok(url)
}

// Schemes are case-insensitive: "HTTPS://" counts as already present.
fn has_web_scheme(url: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        url.get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

pub(crate) fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

pub(crate) fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
