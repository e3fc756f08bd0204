// src/checker/html.rs
// =============================================================================
// This module reads the bits of an HTML page we care about.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// We also use the `url` crate to:
// - Resolve relative icon paths to absolute URLs
//
// What we extract:
// - the favicon candidate from <link rel="..."> tags
// - <title> and <meta name="description"> for link previews
// =============================================================================

use scraper::{Html, Selector};
use url::Url;

// The <link> tags we accept as favicons, in order of preference.
// The first selector that matches an element with an href wins.
const ICON_SELECTORS: [&str; 3] = [
    r#"link[rel="icon"][href]"#,
    r#"link[rel="shortcut icon"][href]"#,
    r#"link[rel="apple-touch-icon"][href]"#,
];

// Finds the raw href of the preferred icon <link> tag, if any.
//
// Returns the href exactly as written in the page (it may be relative).
//
// Example:
//   html = r#"<link rel="shortcut icon" href="/assets/icon.png">"#
//   result = Some("/assets/icon.png")
pub fn find_icon_href(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    ICON_SELECTORS.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        let href = document
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .map(str::trim)
            .find(|href| !href.is_empty())
            .map(str::to_string);
        href
    })
}

// Turns an icon href into an absolute http(s) URL.
//
// Parameters:
//   page: the URL of the page the href came from
//   href: the href value (might be relative, might be absolute)
//
// Relative hrefs are resolved against the page's ORIGIN, not the page path:
//   page = "https://example.com/blog/post"
//   href = "img/icon.png"  -> "https://example.com/img/icon.png"
//   href = "//cdn.example.com/i.ico" -> "https://cdn.example.com/i.ico"
//
// Returns None for things we can't probe (data:, javascript:, ...).
pub fn absolutize_icon(page: &Url, href: &str) -> Option<Url> {
    let resolved = match Url::parse(href) {
        Ok(url) => url,
        Err(_) => {
            let origin = page.join("/").ok()?;
            origin.join(href).ok()?
        }
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

// The conventional fallback when the page declares no icon.
pub fn default_icon_url(page: &Url) -> Option<Url> {
    page.join("/favicon.ico").ok()
}

// Title and description shown in link previews.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
}

pub fn extract_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    let mut metadata = PageMetadata::default();

    if let Ok(selector) = Selector::parse("title") {
        if let Some(element) = document.select(&selector).next() {
            metadata.title = element.text().collect::<String>().trim().to_string();
        }
    }

    if let Ok(selector) = Selector::parse(r#"meta[name="description"]"#) {
        if let Some(content) = document
            .select(&selector)
            .next()
            .and_then(|e| e.value().attr("content"))
        {
            metadata.description = content.trim().to_string();
        }
    }

    metadata
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does find_map do?
//    - It runs a closure on each item until one returns Some(...)
//    - Then it stops and returns that value
//    - Perfect for "try these options in order"
//
// 2. Where do relative icon paths point?
//    - Browsers resolve them against the page URL
//    - We resolve them at the site root (scheme://host/), so
//      "img/icon.png" on /blog/post becomes /img/icon.png
//
// 3. What is page.join("/")?
//    - Joining "/" to any URL gives back scheme://host[:port]/
//    - That's the origin as a Url we can join more paths onto
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_prefers_icon_over_shortcut_icon() {
        let html = r#"
            <head>
              <link rel="apple-touch-icon" href="/apple.png">
              <link rel="shortcut icon" href="/shortcut.ico">
              <link rel="icon" href="/icon.png">
            </head>
        "#;
        assert_eq!(find_icon_href(html), Some("/icon.png".to_string()));
    }

    #[test]
    fn test_falls_through_to_apple_touch_icon() {
        let html = r#"<link rel="apple-touch-icon" href="/apple.png">"#;
        assert_eq!(find_icon_href(html), Some("/apple.png".to_string()));
    }

    #[test]
    fn test_ignores_empty_href() {
        let html = r#"<link rel="icon" href=""><link rel="shortcut icon" href="/s.ico">"#;
        assert_eq!(find_icon_href(html), Some("/s.ico".to_string()));
    }

    #[test]
    fn test_no_icon_tags() {
        let html = r#"<link rel="stylesheet" href="/style.css">"#;
        assert_eq!(find_icon_href(html), None);
    }

    #[test]
    fn test_absolutize_relative_against_origin() {
        let page = url("https://example.com/blog/post");
        assert_eq!(
            absolutize_icon(&page, "img/icon.png").unwrap().as_str(),
            "https://example.com/img/icon.png"
        );
        assert_eq!(
            absolutize_icon(&page, "//cdn.example.com/i.ico").unwrap().as_str(),
            "https://cdn.example.com/i.ico"
        );
        assert_eq!(
            absolutize_icon(&page, "https://other.com/x.ico").unwrap().as_str(),
            "https://other.com/x.ico"
        );
    }

    #[test]
    fn test_absolutize_rejects_data_urls() {
        let page = url("https://example.com/");
        assert_eq!(absolutize_icon(&page, "data:image/png;base64,AAAA"), None);
    }

    #[test]
    fn test_default_icon_url() {
        let page = url("https://example.com:8443/some/page?x=1");
        assert_eq!(
            default_icon_url(&page).unwrap().as_str(),
            "https://example.com:8443/favicon.ico"
        );
    }

    #[test]
    fn test_extract_metadata() {
        let html = r#"
            <html><head>
              <title> Rust Programming Language </title>
              <meta name="description" content="A language empowering everyone">
            </head></html>
        "#;
        let meta = extract_metadata(html);
        assert_eq!(meta.title, "Rust Programming Language");
        assert_eq!(meta.description, "A language empowering everyone");

        assert_eq!(extract_metadata("<p>nothing</p>"), PageMetadata::default());
    }
}
