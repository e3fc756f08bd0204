// src/checker/favicon.rs
// =============================================================================
// Finds the favicon for a page.
//
// How it works:
// 1. Normalize the page URL (add https:// if there's no scheme)
// 2. Fetch the page HTML
// 3. Look for <link rel="icon">, then "shortcut icon", then "apple-touch-icon"
// 4. No tag? Use scheme://host/favicon.ico
// 5. Make the candidate absolute
// 6. Check the candidate is reachable (HEAD, or GET for picky hosts)
//
// Contract: resolve() NEVER fails. Favicons are cosmetic; if anything goes
// wrong we log it at debug level and return None, and the link simply keeps
// the default icon.
// =============================================================================

use std::sync::Arc;

use serde::Serialize;
use url::Url;

use super::html::{absolutize_icon, default_icon_url, extract_metadata, find_icon_href};
use super::http::{probe, HttpFetcher, ProbePolicy};
use crate::models::normalize_url;

// What /api/preview returns for a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagePreview {
    pub url: String,
    pub title: String,
    pub description: String,
    pub favicon: Option<String>,
}

#[derive(Clone)]
pub struct FaviconResolver {
    fetcher: Arc<dyn HttpFetcher>,
    policy: ProbePolicy,
}

impl FaviconResolver {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, policy: ProbePolicy) -> Self {
        Self { fetcher, policy }
    }

    /// Best-effort favicon lookup. Returns the absolute icon URL, or None.
    pub async fn resolve(&self, page_url: &str) -> Option<String> {
        let page = match normalize_url(page_url) {
            Ok(url) => url,
            Err(e) => {
                log::debug!("Favicon: skipping {}: {}", page_url, e);
                return None;
            }
        };

        let html = match self.fetcher.get(&page).await {
            Ok(html) => html,
            Err(e) => {
                log::debug!("Favicon: could not fetch {}: {}", page, e);
                return None;
            }
        };

        self.resolve_from_html(&page, &html).await
    }

    async fn resolve_from_html(&self, page: &Url, html: &str) -> Option<String> {
        let candidate = match find_icon_href(html) {
            Some(href) => absolutize_icon(page, &href),
            None => default_icon_url(page),
        };

        let Some(candidate) = candidate else {
            log::debug!("Favicon: no usable icon candidate on {}", page);
            return None;
        };

        match probe(self.fetcher.as_ref(), &self.policy, &candidate).await {
            Ok(()) => {
                log::debug!("Favicon for {} is {}", page, candidate);
                Some(candidate.to_string())
            }
            Err(e) => {
                log::debug!("Favicon: {} unreachable: {}", candidate, e);
                None
            }
        }
    }

    /// Title, description and favicon of a page. Never fails either; a page
    /// we can't read comes back with empty strings.
    pub async fn preview(&self, url: &str) -> PagePreview {
        let mut preview = PagePreview {
            url: url.to_string(),
            title: String::new(),
            description: String::new(),
            favicon: None,
        };

        let Ok(page) = normalize_url(url) else {
            return preview;
        };

        match self.fetcher.get(&page).await {
            Ok(html) => {
                let metadata = extract_metadata(&html);
                preview.title = metadata.title;
                preview.description = metadata.description;
                preview.favicon = self.resolve_from_html(&page, &html).await;
            }
            Err(e) => log::debug!("Preview: could not fetch {}: {}", page, e),
        }
        preview
    }
}
