// src/checker/validator.rs
// =============================================================================
// The link-health sweep: probe every stored link and record the verdict.
//
// How it works:
// 1. Load every link from the store
// 2. Split them into batches (5 by default)
// 3. Probe all links in a batch at the same time
// 4. Write each link's health as soon as its batch is done
// 5. Wait a moment (1s by default) before starting the next batch
//
// Why batches AND a pause?
// - Batches cap how many connections we have open at once
// - The pause keeps our request rate low for the hosts we probe
//
// Only one sweep may run at a time. The daily schedule and the on-demand
// endpoint share a SweepGuard; whoever comes second gets Skipped back and
// nothing else happens. It does NOT queue.
//
// Errors:
// - a link that can't be reached is NOT an error, it's recorded as invalid
// - a store error IS an error: the sweep stops and the caller hears about it
// =============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;

use super::http::{probe, HttpFetcher, ProbePolicy};
use crate::config::SweepSettings;
use crate::error::Result;
use crate::models::{normalize_url, Link, LinkHealth, LinkId, LinkUpdate};
use crate::store::LinkStore;

// The "is a sweep running?" flag.
//
// Cloning shares the flag, so hand the same guard to everything that may
// start a sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepGuard {
    running: Arc<AtomicBool>,
}

impl SweepGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Force the flag off, for tests that abandon a sweep midway.
    #[cfg(test)]
    pub fn reset(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Take the flag, or None if a sweep already holds it.
    pub fn try_acquire(&self) -> Option<SweepPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SweepPermit {
                running: self.running.clone(),
            })
    }
}

/// Held for the duration of one sweep. Dropping it clears the flag, however
/// the sweep ended.
#[derive(Debug)]
pub struct SweepPermit {
    running: Arc<AtomicBool>,
}

impl Drop for SweepPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Outcome of probing a single link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub id: LinkId,
    pub url: String,
    pub health: LinkHealth,
    /// Why it's invalid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Size of each batch, in the order they ran
    pub batches: Vec<usize>,
    pub results: Vec<ProbeResult>,
}

impl SweepReport {
    pub fn checked(&self) -> usize {
        self.results.len()
    }

    pub fn valid(&self) -> usize {
        self.count(LinkHealth::Valid)
    }

    pub fn invalid(&self) -> usize {
        self.count(LinkHealth::Invalid)
    }

    fn count(&self, health: LinkHealth) -> usize {
        self.results.iter().filter(|r| r.health == health).count()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SweepOutcome {
    Completed(SweepReport),
    /// Another sweep was already running; this one did nothing.
    Skipped,
}

pub struct LinkValidator {
    store: Arc<dyn LinkStore>,
    fetcher: Arc<dyn HttpFetcher>,
    policy: ProbePolicy,
    batch_size: usize,
    pause: Duration,
    guard: SweepGuard,
}

impl LinkValidator {
    pub fn new(
        store: Arc<dyn LinkStore>,
        fetcher: Arc<dyn HttpFetcher>,
        policy: ProbePolicy,
        settings: &SweepSettings,
        guard: SweepGuard,
    ) -> Self {
        Self {
            store,
            fetcher,
            policy,
            batch_size: settings.batch_size.max(1),
            pause: settings.pause(),
            guard,
        }
    }

    pub fn guard(&self) -> &SweepGuard {
        &self.guard
    }

    /// Run one full sweep, unless one is already running.
    pub async fn validate_all(&self) -> Result<SweepOutcome> {
        let Some(permit) = self.guard.try_acquire() else {
            log::info!("Link sweep already running, skipping this one");
            return Ok(SweepOutcome::Skipped);
        };
        self.run(permit).await.map(SweepOutcome::Completed)
    }

    /// Run a sweep under a permit the caller already took from this
    /// validator's guard. The flag clears when the sweep ends.
    pub async fn run(&self, _permit: SweepPermit) -> Result<SweepReport> {
        let started_at = Utc::now();
        let links = self.store.find_all().await?;
        log::info!(
            "Checking {} link(s) in batches of {}",
            links.len(),
            self.batch_size
        );

        let mut batches = Vec::new();
        let mut results = Vec::with_capacity(links.len());

        for (index, batch) in links.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            // Run every probe of this batch at once
            let batch_results: Vec<ProbeResult> =
                join_all(batch.iter().map(|link| self.probe_link(link))).await;

            for result in &batch_results {
                let found = self
                    .store
                    .update_fields(result.id, LinkUpdate::health(result.health))
                    .await?;
                if !found {
                    log::warn!("Link {} disappeared during the sweep", result.id);
                }
            }

            log::debug!(
                "Batch {}: {} link(s), {} invalid",
                index + 1,
                batch.len(),
                batch_results
                    .iter()
                    .filter(|r| r.health == LinkHealth::Invalid)
                    .count()
            );
            batches.push(batch.len());
            results.extend(batch_results);
        }

        let report = SweepReport {
            started_at,
            finished_at: Utc::now(),
            batches,
            results,
        };
        log::info!(
            "Link sweep done: {} checked, {} valid, {} invalid",
            report.checked(),
            report.valid(),
            report.invalid()
        );
        Ok(report)
    }

    // Probe one link. Never fails: every problem becomes an Invalid result.
    async fn probe_link(&self, link: &Link) -> ProbeResult {
        let (health, message) = match normalize_url(&link.url) {
            // Malformed URLs are rejected before any network call
            Err(e) => (LinkHealth::Invalid, Some(e.to_string())),
            Ok(url) => match probe(self.fetcher.as_ref(), &self.policy, &url).await {
                Ok(()) => (LinkHealth::Valid, None),
                Err(e) => (LinkHealth::Invalid, Some(e.to_string())),
            },
        };

        ProbeResult {
            id: link.id,
            url: link.url.clone(),
            health,
            message,
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is compare_exchange?
//    - "If the flag is false, set it to true, and tell me if that worked"
//    - Done as ONE atomic step, so two sweeps can never both win
//
// 2. Why a Drop impl on SweepPermit?
//    - The `?` operator can return early from validate_all
//    - Drop runs no matter how we leave, so the flag is always cleared
//
// 3. What does chunks(n) do?
//    - Splits a slice into pieces of n items (the last may be shorter)
//    - 12 links with n = 5 -> [5, 5, 2]
//
// 4. Why join_all over the batch?
//    - It starts every probe in the batch at the same time
//    - The batch itself is what limits concurrency
//    - All the futures are built before the first .await, so the sweep
//      future stays Send and can go to tokio::spawn
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tokio::sync::{Notify, Semaphore};
    use url::Url;

    use super::*;
    use crate::checker::http::testing::StubFetcher;
    use crate::checker::http::FetchError;
    use crate::error::AppError;
    use crate::models::NewLink;
    use crate::store::MemoryStore;

    // A LinkStore that counts calls and can be told to fail.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        find_all_calls: AtomicUsize,
        update_calls: AtomicUsize,
        fail_find_all: bool,
        fail_updates: bool,
        // updates to this link act as if it was deleted mid-sweep
        vanished: Option<LinkId>,
    }

    impl CountingStore {
        fn failing() -> Self {
            Self {
                fail_find_all: true,
                ..Self::default()
            }
        }

        async fn add(&self, url: &str) -> LinkId {
            // bypass NewLink::new so tests can store malformed URLs
            let link = NewLink {
                category: "Test".into(),
                title: url.into(),
                url: url.into(),
                description: None,
                favicon: None,
            };
            self.inner.insert(link).await.unwrap().id
        }

        fn find_all_calls(&self) -> usize {
            self.find_all_calls.load(Ordering::SeqCst)
        }

        fn update_calls(&self) -> usize {
            self.update_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LinkStore for CountingStore {
        async fn find_all(&self) -> Result<Vec<Link>> {
            self.find_all_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_find_all {
                return Err(AppError::storage("database is down"));
            }
            self.inner.find_all().await
        }

        async fn find_by_id(&self, id: LinkId) -> Result<Option<Link>> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_category(&self, category: &str) -> Result<Vec<Link>> {
            self.inner.find_by_category(category).await
        }

        async fn search(&self, query: &str) -> Result<Vec<Link>> {
            self.inner.search(query).await
        }

        async fn recent_visits(&self, limit: usize) -> Result<Vec<Link>> {
            self.inner.recent_visits(limit).await
        }

        async fn insert(&self, link: NewLink) -> Result<Link> {
            self.inner.insert(link).await
        }

        async fn update_fields(&self, id: LinkId, fields: LinkUpdate) -> Result<bool> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_updates {
                return Err(AppError::storage("disk full"));
            }
            if self.vanished == Some(id) {
                return Ok(false);
            }
            self.inner.update_fields(id, fields).await
        }

        async fn record_visit(&self, id: LinkId) -> Result<bool> {
            self.inner.record_visit(id).await
        }

        async fn delete(&self, id: LinkId) -> Result<bool> {
            self.inner.delete(id).await
        }
    }

    // A fetcher whose HEAD requests block until the test opens the gate.
    struct GatedFetcher {
        started: Notify,
        gate: Semaphore,
    }

    impl GatedFetcher {
        fn new() -> Self {
            Self {
                started: Notify::new(),
                gate: Semaphore::new(0),
            }
        }
    }

    #[async_trait]
    impl HttpFetcher for GatedFetcher {
        async fn get(&self, _url: &Url) -> std::result::Result<String, FetchError> {
            Err(FetchError::Connect)
        }

        async fn head(&self, _url: &Url) -> std::result::Result<u16, FetchError> {
            self.started.notify_one();
            let _permit = self.gate.acquire().await.map_err(|_| FetchError::Connect)?;
            Ok(200)
        }
    }

    fn test_link(i: usize) -> NewLink {
        let url = format!("https://site{i}.example/");
        NewLink {
            category: "Test".into(),
            title: url.clone(),
            url,
            description: None,
            favicon: None,
        }
    }

    fn settings(batch_size: usize, pause: Duration) -> SweepSettings {
        SweepSettings {
            batch_size,
            pause_ms: pause.as_millis() as u64,
            ..SweepSettings::default()
        }
    }

    fn validator(
        store: Arc<CountingStore>,
        fetcher: Arc<dyn HttpFetcher>,
        batch_size: usize,
        pause: Duration,
    ) -> LinkValidator {
        LinkValidator::new(
            store,
            fetcher,
            ProbePolicy::default(),
            &settings(batch_size, pause),
            SweepGuard::new(),
        )
    }

    fn completed(outcome: SweepOutcome) -> SweepReport {
        match outcome {
            SweepOutcome::Completed(report) => report,
            SweepOutcome::Skipped => panic!("sweep was skipped"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_twelve_links_run_in_three_batches() {
        let store = Arc::new(CountingStore::default());
        let mut fetcher = StubFetcher::new();
        for i in 0..12 {
            let url = format!("https://site{i}.example/");
            store.add(&url).await;
            // every third link is dead
            fetcher = if i % 3 == 0 {
                fetcher.head_error(&url, FetchError::Status(404))
            } else {
                fetcher.head_ok(&url)
            };
        }
        let validator = validator(store.clone(), Arc::new(fetcher), 5, Duration::from_secs(1));

        let start = tokio::time::Instant::now();
        let report = completed(validator.validate_all().await.unwrap());
        let elapsed = start.elapsed();

        assert_eq!(report.batches, vec![5, 5, 2]);
        assert_eq!(report.checked(), 12);
        assert_eq!(report.invalid(), 4);
        assert_eq!(report.valid(), 8);
        // a pause between batches, none after the last
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));

        assert_eq!(store.update_calls(), 12);
        let links = store.inner.find_all().await.unwrap();
        assert!(links.iter().all(|l| l.health != LinkHealth::Unchecked));
        assert_eq!(
            links
                .iter()
                .filter(|l| l.health == LinkHealth::Invalid)
                .count(),
            4
        );
    }

    #[tokio::test]
    async fn test_malformed_url_is_invalid_without_network() {
        let store = Arc::new(CountingStore::default());
        let id = store.add("not a url").await;
        let fetcher = Arc::new(StubFetcher::new());
        let validator = validator(store.clone(), fetcher.clone(), 5, Duration::ZERO);

        let report = completed(validator.validate_all().await.unwrap());

        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(report.results[0].health, LinkHealth::Invalid);
        let link = store.inner.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(link.health, LinkHealth::Invalid);
    }

    #[tokio::test]
    async fn test_missing_scheme_is_probed_over_https() {
        let store = Arc::new(CountingStore::default());
        let id = store.add("example.com").await;
        let fetcher = Arc::new(StubFetcher::new().head_ok("https://example.com/"));
        let validator = validator(store.clone(), fetcher.clone(), 5, Duration::ZERO);

        validator.validate_all().await.unwrap();

        assert_eq!(fetcher.called_urls(), vec!["https://example.com/"]);
        let link = store.inner.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(link.health, LinkHealth::Valid);
    }

    #[tokio::test]
    async fn test_transport_errors_are_invalid_not_fatal() {
        let store = Arc::new(CountingStore::default());
        store.add("https://slow.example/").await;
        store.add("https://nxdomain.example/").await;
        store.add("https://ok.example/").await;
        let fetcher = StubFetcher::new()
            .head_error("https://slow.example/", FetchError::Timeout)
            .head_error("https://nxdomain.example/", FetchError::Dns)
            .head_ok("https://ok.example/");
        let validator = validator(store.clone(), Arc::new(fetcher), 5, Duration::ZERO);

        let report = completed(validator.validate_all().await.unwrap());

        assert_eq!(report.invalid(), 2);
        assert_eq!(report.valid(), 1);
        let timeout = report
            .results
            .iter()
            .find(|r| r.url == "https://slow.example/")
            .unwrap();
        assert_eq!(timeout.message.as_deref(), Some("request timed out"));
    }

    #[tokio::test]
    async fn test_find_all_failure_aborts_without_probes() {
        let store = Arc::new(CountingStore::failing());
        let fetcher = Arc::new(StubFetcher::new());
        let validator = validator(store.clone(), fetcher.clone(), 5, Duration::ZERO);

        let result = validator.validate_all().await;

        assert!(matches!(result, Err(AppError::Storage(_))));
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(store.update_calls(), 0);
        // the guard is released so the next run can go ahead
        assert!(!validator.guard().is_running());
    }

    #[tokio::test]
    async fn test_second_sweep_while_running_is_skipped() {
        let store = Arc::new(CountingStore::default());
        for i in 0..3 {
            store.add(&format!("https://site{i}.example/")).await;
        }
        let fetcher = Arc::new(GatedFetcher::new());
        let validator = Arc::new(validator(store.clone(), fetcher.clone(), 5, Duration::ZERO));

        let first = tokio::spawn({
            let validator = validator.clone();
            async move { validator.validate_all().await }
        });

        // wait until the first sweep is stuck inside a probe
        fetcher.started.notified().await;
        assert!(validator.guard().is_running());

        let second = validator.validate_all().await.unwrap();
        assert!(matches!(second, SweepOutcome::Skipped));
        assert_eq!(store.find_all_calls(), 1);
        assert_eq!(store.update_calls(), 0);

        fetcher.gate.add_permits(3);
        let report = completed(first.await.unwrap().unwrap());
        assert_eq!(report.checked(), 3);
        assert_eq!(store.update_calls(), 3);
        assert!(!validator.guard().is_running());
    }

    #[tokio::test]
    async fn test_injected_guard_is_shared() {
        let store = Arc::new(CountingStore::default());
        let guard = SweepGuard::new();
        let validator = LinkValidator::new(
            store.clone(),
            Arc::new(StubFetcher::new()),
            ProbePolicy::default(),
            &settings(5, Duration::ZERO),
            guard.clone(),
        );

        // someone else holding the same guard blocks this validator
        let held = guard.try_acquire().unwrap();
        assert!(guard.try_acquire().is_none());
        assert!(matches!(
            validator.validate_all().await.unwrap(),
            SweepOutcome::Skipped
        ));
        assert_eq!(store.find_all_calls(), 0);

        // an abandoned permit can be cleared by hand
        std::mem::forget(held);
        assert!(guard.is_running());
        guard.reset();
        assert!(matches!(
            validator.validate_all().await.unwrap(),
            SweepOutcome::Completed(_)
        ));
        assert!(!guard.is_running());
    }

    #[tokio::test]
    async fn test_empty_store_completes() {
        let store = Arc::new(CountingStore::default());
        let validator = validator(store, Arc::new(StubFetcher::new()), 5, Duration::ZERO);
        let report = completed(validator.validate_all().await.unwrap());
        assert!(report.batches.is_empty());
        assert_eq!(report.checked(), 0);
    }

    #[tokio::test]
    async fn test_update_failure_aborts_and_releases_guard() {
        let store = Arc::new(CountingStore {
            fail_updates: true,
            ..CountingStore::default()
        });
        for i in 0..7 {
            store.inner.insert(test_link(i)).await.unwrap();
        }
        let fetcher = Arc::new(StubFetcher::new());
        let validator = validator(store.clone(), fetcher.clone(), 5, Duration::ZERO);

        let result = validator.validate_all().await;

        assert!(matches!(result, Err(AppError::Storage(_))));
        // the first write failed, so the second batch never ran
        assert_eq!(store.update_calls(), 1);
        assert_eq!(fetcher.call_count(), 5);
        assert!(!validator.guard().is_running());
    }

    #[tokio::test]
    async fn test_link_deleted_mid_sweep_is_skipped() {
        let inner = MemoryStore::default();
        let gone = inner.insert(test_link(0)).await.unwrap().id;
        let kept = inner.insert(test_link(1)).await.unwrap().id;
        let store = Arc::new(CountingStore {
            inner,
            vanished: Some(gone),
            ..CountingStore::default()
        });
        let fetcher = StubFetcher::new()
            .head_ok("https://site0.example/")
            .head_ok("https://site1.example/");
        let validator = validator(store.clone(), Arc::new(fetcher), 5, Duration::ZERO);

        let report = completed(validator.validate_all().await.unwrap());

        assert_eq!(report.checked(), 2);
        assert_eq!(store.update_calls(), 2);
        let link = store.inner.find_by_id(kept).await.unwrap().unwrap();
        assert_eq!(link.health, LinkHealth::Valid);
        assert!(!validator.guard().is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sweep_runs_on_a_spawned_task() {
        let store = Arc::new(CountingStore::default());
        store.add("https://site0.example/").await;
        let fetcher = StubFetcher::new().head_ok("https://site0.example/");
        let validator = Arc::new(validator(store, Arc::new(fetcher), 5, Duration::ZERO));

        let handle = tokio::spawn({
            let validator = validator.clone();
            async move { validator.validate_all().await }
        });
        let report = completed(handle.await.unwrap().unwrap());
        assert_eq!(report.valid(), 1);
    }

    #[tokio::test]
    async fn test_run_with_permit_taken_up_front() {
        let store = Arc::new(CountingStore::default());
        store.add("https://site0.example/").await;
        let fetcher = StubFetcher::new().head_ok("https://site0.example/");
        let validator = validator(store, Arc::new(fetcher), 5, Duration::ZERO);

        let permit = validator.guard().try_acquire().unwrap();
        // anyone else now sees a sweep in progress
        assert!(matches!(
            validator.validate_all().await.unwrap(),
            SweepOutcome::Skipped
        ));

        let report = validator.run(permit).await.unwrap();
        assert_eq!(report.checked(), 1);
        assert!(!validator.guard().is_running());
    }
}
