//! Bulk content ingestion: profile + popular casts per subject, through the
//! content cache, under an admission gate.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use creatorlens_fetcher::ContentSource;
use creatorlens_shared::{ContentSnapshot, Result, Subject};
use creatorlens_storage::ContentCache;

use crate::gate::AdmissionGate;
use crate::pipeline::ProgressReporter;

/// Per-subject ingestion outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestStatus {
    Fetched,
    Cached,
    UserNotFound,
    ContentFetchFailed,
}

impl IngestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetched => "fetched",
            Self::Cached => "cached",
            Self::UserNotFound => "user_not_found",
            Self::ContentFetchFailed => "content_fetch_failed",
        }
    }
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tally of ingestion outcomes. Independent of completion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub fetched: usize,
    pub cached: usize,
    pub user_not_found: usize,
    pub content_fetch_failed: usize,
    /// Cache write failures and crashed tasks.
    pub errors: usize,
}

impl IngestSummary {
    fn record(&mut self, status: IngestStatus) {
        match status {
            IngestStatus::Fetched => self.fetched += 1,
            IngestStatus::Cached => self.cached += 1,
            IngestStatus::UserNotFound => self.user_not_found += 1,
            IngestStatus::ContentFetchFailed => self.content_fetch_failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.fetched + self.cached + self.user_not_found + self.content_fetch_failed + self.errors
    }

    /// Subjects that ended without content.
    pub fn failures(&self) -> usize {
        self.user_not_found + self.content_fetch_failed + self.errors
    }
}

/// Result of one ingestion pass.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub summary: IngestSummary,
    /// Outcome per username; absent for subjects whose task errored.
    pub statuses: HashMap<String, IngestStatus>,
}

/// Drives the content source and cache across many subjects.
#[derive(Clone)]
pub struct Ingester {
    source: Arc<dyn ContentSource>,
    cache: ContentCache,
    gate: AdmissionGate,
    cast_limit: usize,
}

impl Ingester {
    pub fn new(
        source: Arc<dyn ContentSource>,
        cache: ContentCache,
        gate: AdmissionGate,
        cast_limit: usize,
    ) -> Self {
        Self {
            source,
            cache,
            gate,
            cast_limit,
        }
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Ingest one subject. A present cache entry short-circuits all network
    /// calls, and so does a username that can never be cached.
    #[instrument(skip(self))]
    pub async fn ingest_one(&self, username: &str) -> Result<IngestStatus> {
        self.cache.path_for(username)?;
        if self.cache.has(username) {
            return Ok(IngestStatus::Cached);
        }

        let Some(user) = self.source.user_by_username(username).await else {
            return Ok(IngestStatus::UserNotFound);
        };

        let Some(casts) = self.source.popular_casts(user.fid, self.cast_limit).await else {
            return Ok(IngestStatus::ContentFetchFailed);
        };

        let snapshot = ContentSnapshot::new(user, casts, Utc::now());
        self.cache.write(username, &snapshot)?;
        Ok(IngestStatus::Fetched)
    }

    /// Ingest every subject, at most `gate` width at a time. One subject's
    /// failure never affects another.
    #[instrument(skip_all, fields(subjects = subjects.len()))]
    pub async fn ingest_all(
        &self,
        subjects: &[Subject],
        progress: &dyn ProgressReporter,
    ) -> IngestReport {
        let total = subjects.len();
        progress.stage_started("Fetching casts", total);

        let mut tasks = JoinSet::new();
        for subject in subjects {
            let ingester = self.clone();
            let username = subject.username.clone();
            tasks.spawn(async move {
                let _slot = ingester.gate.admit().await;
                let result = ingester.ingest_one(&username).await;
                (username, result)
            });
        }

        let mut report = IngestReport::default();
        let mut done = 0;
        while let Some(joined) = tasks.join_next().await {
            done += 1;
            match joined {
                Ok((username, Ok(status))) => {
                    debug!(%username, %status, "ingested");
                    progress.subject_done(&username, done, total);
                    report.summary.record(status);
                    report.statuses.insert(username, status);
                }
                Ok((username, Err(e))) => {
                    warn!(%username, error = %e, "ingestion failed");
                    progress.subject_done(&username, done, total);
                    report.summary.errors += 1;
                }
                Err(e) => {
                    warn!(error = %e, "ingestion task crashed");
                    report.summary.errors += 1;
                }
            }
        }

        let summary = &report.summary;
        info!(
            fetched = summary.fetched,
            cached = summary.cached,
            user_not_found = summary.user_not_found,
            content_fetch_failed = summary.content_fetch_failed,
            errors = summary.errors,
            peak_in_flight = self.gate.peak(),
            "ingestion complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use creatorlens_shared::CreatorLensError;

    use crate::pipeline::SilentProgress;
    use crate::testing::{FakeSource, subject, temp_dir};

    fn ingester(source: Arc<FakeSource>, cache: ContentCache, width: usize) -> Ingester {
        Ingester::new(source, cache, AdmissionGate::new(width), 10)
    }

    #[tokio::test]
    async fn second_run_is_served_from_cache() {
        let tmp = temp_dir("ingest");
        let cache = ContentCache::open(&tmp).unwrap();
        let source = Arc::new(FakeSource::new().with_user(1, "alice", &["gm", "ship", "repeat"]));
        let subjects = vec![subject("alice", None)];

        let first = ingester(source.clone(), cache.clone(), 4)
            .ingest_all(&subjects, &SilentProgress)
            .await;
        assert_eq!(first.summary.fetched, 1);
        assert_eq!(source.calls(), 2);
        let stored = cache.read("alice").unwrap();

        let second = ingester(source.clone(), cache.clone(), 4)
            .ingest_all(&subjects, &SilentProgress)
            .await;
        assert_eq!(second.summary.cached, 1);
        assert_eq!(second.statuses["alice"], IngestStatus::Cached);
        assert_eq!(source.calls(), 2, "cached subject must not touch the network");
        assert_eq!(cache.read("alice").unwrap(), stored);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn tags_each_failure_mode() {
        let tmp = temp_dir("ingest");
        let cache = ContentCache::open(&tmp).unwrap();
        let source = Arc::new(
            FakeSource::new()
                .with_user(1, "alice", &["gm"])
                .with_broken_feed(2, "bob"),
        );
        let subjects = vec![
            subject("alice", None),
            subject("bob", None),
            subject("ghost", None),
        ];

        let report = ingester(source, cache.clone(), 4)
            .ingest_all(&subjects, &SilentProgress)
            .await;

        assert_eq!(report.statuses["alice"], IngestStatus::Fetched);
        assert_eq!(report.statuses["bob"], IngestStatus::ContentFetchFailed);
        assert_eq!(report.statuses["ghost"], IngestStatus::UserNotFound);
        assert_eq!(report.summary.total(), 3);
        assert_eq!(report.summary.failures(), 2);
        assert!(!cache.has("ghost"));
        assert!(!cache.has("bob"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn respects_concurrency_bound() {
        let tmp = temp_dir("ingest");
        let cache = ContentCache::open(&tmp).unwrap();
        let mut source = FakeSource::new().with_delay(Duration::from_millis(10));
        let mut subjects = Vec::new();
        for i in 0..25u64 {
            let name = format!("user{i}");
            source = source.with_user(i + 1, &name, &["gm"]);
            subjects.push(subject(&name, None));
        }
        let source = Arc::new(source);

        let ingester = ingester(source.clone(), cache, 4);
        let report = ingester.ingest_all(&subjects, &SilentProgress).await;

        assert_eq!(report.summary.fetched, 25);
        // Enough delayed subjects to fill every slot.
        assert_eq!(ingester.gate().peak(), 4);
        assert!(source.gate.peak() > 1);
        assert!(source.gate.peak() <= 4);
        assert_eq!(ingester.gate().in_flight(), 0);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn unusable_username_makes_no_source_calls() {
        let tmp = temp_dir("ingest");
        let cache = ContentCache::open(&tmp).unwrap();
        let source = Arc::new(FakeSource::new().with_user(2, "../evil", &["x"]));

        let err = ingester(source.clone(), cache, 1)
            .ingest_one("../evil")
            .await
            .unwrap_err();
        assert!(matches!(err, CreatorLensError::Validation { .. }));
        assert_eq!(source.calls(), 0);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[tokio::test]
    async fn tallies_do_not_depend_on_order() {
        let build = || {
            Arc::new(
                FakeSource::new()
                    .with_user(1, "a", &["x"])
                    .with_user(2, "b", &["y"])
                    .with_broken_feed(3, "c"),
            )
        };
        let forward = vec![subject("a", None), subject("b", None), subject("c", None), subject("d", None)];
        let mut reversed = forward.clone();
        reversed.reverse();

        let mut summaries = Vec::new();
        for subjects in [forward, reversed] {
            let tmp = temp_dir("ingest");
            let cache = ContentCache::open(&tmp).unwrap();
            let report = ingester(build(), cache, 2)
                .ingest_all(&subjects, &SilentProgress)
                .await;
            summaries.push(report.summary);
            let _ = std::fs::remove_dir_all(&tmp);
        }

        assert_eq!(summaries[0], summaries[1]);
        assert_eq!(summaries[0].fetched, 2);
    }

    #[tokio::test]
    async fn unusable_username_is_an_isolated_error() {
        let tmp = temp_dir("ingest");
        let cache = ContentCache::open(&tmp).unwrap();
        let source = Arc::new(
            FakeSource::new()
                .with_user(1, "alice", &["gm"])
                .with_user(2, "../evil", &["x"]),
        );
        let subjects = vec![subject("../evil", None), subject("alice", None)];

        let report = ingester(source.clone(), cache, 2)
            .ingest_all(&subjects, &SilentProgress)
            .await;
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.fetched, 1);
        assert!(!report.statuses.contains_key("../evil"));
        // Profile and casts for alice only.
        assert_eq!(source.calls(), 2);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
