// src/checker/http.rs
// =============================================================================
// This module talks to the outside world: it fetches pages and checks if
// URLs are alive.
//
// Key pieces:
// - HttpFetcher: the trait the favicon resolver and the validator use.
//   Tests swap in a stub so nothing touches the network.
// - ReqwestFetcher: the real implementation on top of reqwest
// - FetchError: WHY a request failed (timeout, DNS, refused, 404...)
// - ProbePolicy: which hosts need GET instead of HEAD
// - probe(): one reachability check, the same for favicons and links
//
// Rust concepts:
// - Traits: To put an interface between our logic and the HTTP client
// - async_trait: Because async fn in dyn traits needs a little help
// - Enums: To represent the different failure modes
// =============================================================================

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::config::HttpSettings;
use crate::error::Result;

// Why a request didn't produce a usable response.
//
// The callers treat every variant the same way ("unreachable"), but keeping
// them apart makes the logs and the `check` report much more useful.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Request timed out
    #[error("request timed out")]
    Timeout,
    /// Could not resolve hostname
    #[error("could not resolve hostname")]
    Dns,
    /// Connection refused, reset, unreachable host...
    #[error("connection failed")]
    Connect,
    /// SSL/TLS certificate error
    #[error("TLS error")]
    Tls,
    /// Too many redirects (redirect loop)
    #[error("too many redirects")]
    TooManyRedirects,
    /// Server answered, but not with 2xx
    #[error("HTTP {0}")]
    Status(u16),
    /// Anything else (body decoding, builder errors...)
    #[error("{0}")]
    Other(String),
}

// What the rest of the program needs from an HTTP client.
//
// Both methods treat non-2xx answers as errors, so callers only ever see
// "it worked" or "here's why it didn't".
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// GET a page and return its body as text.
    async fn get(&self, url: &Url) -> std::result::Result<String, FetchError>;

    /// HEAD a URL and return the (2xx) status code.
    async fn head(&self, url: &Url) -> std::result::Result<u16, FetchError>;
}

// The real fetcher.
//
// We build ONE reqwest Client and reuse it for every request. Client keeps
// a connection pool internally, so this is much faster than a new client
// per request.
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout())
            .connect_timeout(settings.timeout())
            .redirect(reqwest::redirect::Policy::limited(5)) // Follow up to 5 redirects
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &Url) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(categorize_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(categorize_error)
    }

    async fn head(&self, url: &Url) -> std::result::Result<u16, FetchError> {
        let response = self
            .client
            .head(url.as_str())
            .send()
            .await
            .map_err(categorize_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(FetchError::Status(status.as_u16()))
        }
    }
}

// Categorizes different error types from reqwest
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
// - etc.
fn categorize_error(error: reqwest::Error) -> FetchError {
    // Convert error to string once; reqwest hides the DNS/TLS details
    // inside the source chain, so we have to look at the text
    let error_string = format!("{:?}", error).to_lowercase();

    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_redirect() {
        FetchError::TooManyRedirects
    } else if error_string.contains("dns") || error_string.contains("failed to lookup") {
        FetchError::Dns
    } else if error_string.contains("certificate") || error_string.contains("tls") {
        FetchError::Tls
    } else if error.is_connect() {
        FetchError::Connect
    } else if let Some(status) = error.status() {
        FetchError::Status(status.as_u16())
    } else {
        FetchError::Other(error.to_string())
    }
}

/// How to check that a URL is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    Head,
    Get,
}

// Some servers answer HEAD with 403/405 even though GET works fine.
// Rather than hard-coding those hosts, the list comes from config
// ([http] get_only_hosts). A listed host also covers its subdomains:
// "github.com" matches "gist.github.com".
#[derive(Debug, Clone, Default)]
pub struct ProbePolicy {
    get_only_hosts: HashSet<String>,
}

impl ProbePolicy {
    pub fn new<I, S>(get_only_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            get_only_hosts: get_only_hosts
                .into_iter()
                .map(|h| h.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn from_settings(settings: &HttpSettings) -> Self {
        Self::new(&settings.get_only_hosts)
    }

    pub fn method_for(&self, url: &Url) -> ProbeMethod {
        let Some(host) = url.host_str() else {
            return ProbeMethod::Head;
        };
        let host = host.to_lowercase();

        let listed = self.get_only_hosts.iter().any(|listed| {
            host == *listed
                || host
                    .strip_suffix(listed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        });

        if listed {
            ProbeMethod::Get
        } else {
            ProbeMethod::Head
        }
    }
}

// One reachability check.
//
// Ok(()) means the server answered 2xx. The error says why it didn't;
// callers treat every error as "unreachable".
pub async fn probe(
    fetcher: &dyn HttpFetcher,
    policy: &ProbePolicy,
    url: &Url,
) -> std::result::Result<(), FetchError> {
    match policy.method_for(url) {
        ProbeMethod::Head => fetcher.head(url).await.map(|_| ()),
        ProbeMethod::Get => fetcher.get(url).await.map(|_| ()),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StubFetcher;
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_policy_defaults_to_head() {
        let policy = ProbePolicy::default();
        assert_eq!(policy.method_for(&url("https://example.com/")), ProbeMethod::Head);
    }

    #[test]
    fn test_policy_matches_host_and_subdomains() {
        let policy = ProbePolicy::new(["GitHub.com", " .bilibili.com "]);
        assert_eq!(policy.method_for(&url("https://github.com/x")), ProbeMethod::Get);
        assert_eq!(policy.method_for(&url("https://gist.github.com/")), ProbeMethod::Get);
        assert_eq!(policy.method_for(&url("https://www.bilibili.com/")), ProbeMethod::Get);
        // suffix match must stop at a label boundary
        assert_eq!(policy.method_for(&url("https://notgithub.com/")), ProbeMethod::Head);
    }

    #[tokio::test]
    async fn test_probe_uses_policy_method() {
        let fetcher = StubFetcher::new()
            .page("https://github.com/", "<html></html>")
            .head_ok("https://example.com/");
        let policy = ProbePolicy::new(["github.com"]);

        assert!(probe(&fetcher, &policy, &url("https://github.com/")).await.is_ok());
        assert!(probe(&fetcher, &policy, &url("https://example.com/")).await.is_ok());

        let calls = fetcher.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                (ProbeMethod::Get, "https://github.com/".to_string()),
                (ProbeMethod::Head, "https://example.com/".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_probe_reports_status_errors() {
        let fetcher = StubFetcher::new().head_error("https://example.com/", FetchError::Status(404));
        let result = probe(&fetcher, &ProbePolicy::default(), &url("https://example.com/")).await;
        assert_eq!(result, Err(FetchError::Status(404)));
        assert_eq!(FetchError::Status(404).to_string(), "HTTP 404");
    }

    #[test]
    fn test_reqwest_fetcher_builds() {
        assert!(ReqwestFetcher::new(&HttpSettings::default()).is_ok());
    }
}
