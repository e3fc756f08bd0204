// src/checker/mod.rs
// =============================================================================
// Everything that reaches out to other websites.
//
// Submodules:
// - http: the HttpFetcher trait, the reqwest client and probe()
// - html: reads icon tags, titles and descriptions out of a page
// - favicon: finds a link's favicon (best effort, never fails)
// - validator: the batched link-health sweep
//
// Nothing outside this module talks to reqwest or scraper directly.
// =============================================================================

mod favicon;
mod html;
mod http;
mod validator;

pub use favicon::{FaviconResolver, PagePreview};
pub use http::{FetchError, HttpFetcher, ProbePolicy, ReqwestFetcher};
pub use validator::{LinkValidator, ProbeResult, SweepGuard, SweepOutcome};

#[cfg(test)]
pub use http::testing;

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why are the submodules private?
//    - Callers write `checker::LinkValidator`, not `checker::validator::...`
//    - We can move code between files without touching the rest of the app
//
// 2. What is #[cfg(test)] pub use?
//    - The stub fetcher only exists in test builds
//    - Re-exporting it lets the API tests use it too
// -----------------------------------------------------------------------------
