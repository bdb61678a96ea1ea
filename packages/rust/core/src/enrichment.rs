//! Classification stage: cached content in, enriched records out.
//!
//! Reads each subject's cache entry, classifies the ones that have casts
//! under an admission gate, and merges every outcome with the subject's
//! financials. Records come back in subject order regardless of which
//! classification finished first.

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use creatorlens_classifier::Classifier;
use creatorlens_shared::{
    ClassificationOutcome, ContentSnapshot, EnrichedRecord, FailedCreator, Subject,
};
use creatorlens_storage::ContentCache;

use crate::gate::AdmissionGate;
use crate::pipeline::ProgressReporter;

/// Output of the classification stage.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    /// One record per classified subject, in subject order.
    pub records: Vec<EnrichedRecord>,
    /// Subjects with no cache entry.
    pub skipped_uncached: usize,
    /// Subjects whose cache entry has no cast texts.
    pub skipped_empty: usize,
    /// Cache entries that could not be read or decoded.
    pub unreadable: usize,
}

impl EnrichmentReport {
    pub fn successes(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn errors(&self) -> usize {
        self.records.len() - self.successes()
    }
}

/// Classifies cached subjects and merges in their financials.
#[derive(Clone)]
pub struct EnrichmentStage {
    classifier: Classifier,
    cache: ContentCache,
    gate: AdmissionGate,
}

impl EnrichmentStage {
    pub fn new(classifier: Classifier, cache: ContentCache, gate: AdmissionGate) -> Self {
        Self {
            classifier,
            cache,
            gate,
        }
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    #[instrument(skip_all, fields(subjects = subjects.len()))]
    pub async fn run(&self, subjects: &[Subject], progress: &dyn ProgressReporter) -> EnrichmentReport {
        let mut report = EnrichmentReport::default();
        let eligible = self.load_eligible(subjects, &mut report);

        let total = eligible.len();
        progress.stage_started("Classifying", total);

        let mut tasks = JoinSet::new();
        for (slot, (subject, snapshot)) in eligible.iter().enumerate() {
            let stage = self.clone();
            let username = subject.username.clone();
            let snapshot = snapshot.clone();
            tasks.spawn(async move {
                let _admitted = stage.gate.admit().await;
                (slot, stage.classifier.classify(&username, &snapshot).await)
            });
        }

        let mut outcomes: Vec<Option<ClassificationOutcome>> = vec![None; total];
        let mut done = 0;
        while let Some(joined) = tasks.join_next().await {
            done += 1;
            match joined {
                Ok((slot, outcome)) => {
                    debug!(
                        username = outcome.username(),
                        success = outcome.is_success(),
                        "classified"
                    );
                    progress.subject_done(outcome.username(), done, total);
                    outcomes[slot] = Some(outcome);
                }
                Err(e) => warn!(error = %e, "classification task crashed"),
            }
        }

        report.records = eligible
            .iter()
            .zip(outcomes)
            .map(|((subject, snapshot), outcome)| {
                let outcome = outcome.unwrap_or_else(|| {
                    ClassificationOutcome::Failed(FailedCreator {
                        username: subject.username.clone(),
                        display_name: snapshot.user.display_name.clone(),
                        error: "classification task crashed".into(),
                        analyzed_at: Utc::now(),
                    })
                });
                EnrichedRecord::merge(outcome, subject)
            })
            .collect();

        info!(
            classified = report.successes(),
            errors = report.errors(),
            skipped_uncached = report.skipped_uncached,
            skipped_empty = report.skipped_empty,
            unreadable = report.unreadable,
            peak_in_flight = self.gate.peak(),
            "classification complete"
        );
        report
    }

    /// Subjects with a readable cache entry that has at least one cast.
    fn load_eligible<'a>(
        &self,
        subjects: &'a [Subject],
        report: &mut EnrichmentReport,
    ) -> Vec<(&'a Subject, ContentSnapshot)> {
        let mut eligible = Vec::new();
        for subject in subjects {
            if !self.cache.has(&subject.username) {
                report.skipped_uncached += 1;
                continue;
            }
            match self.cache.read(&subject.username) {
                Ok(snapshot) if snapshot.cast_texts.is_empty() => report.skipped_empty += 1,
                Ok(snapshot) => eligible.push((subject, snapshot)),
                Err(e) => {
                    warn!(username = %subject.username, error = %e, "skipping unreadable cache entry");
                    report.unreadable += 1;
                }
            }
        }
        eligible
    }
}
