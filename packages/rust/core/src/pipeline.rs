//! End-to-end run: dataset -> ingestion -> classification -> ResultSet.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument};
use uuid::Uuid;

use creatorlens_classifier::Classifier;
use creatorlens_fetcher::ContentSource;
use creatorlens_shared::{CreatorLensError, Result};
use creatorlens_storage::{ContentCache, write_result_set};

use crate::dataset::{linked_subjects, load_creators};
use crate::enrichment::EnrichmentStage;
use crate::gate::AdmissionGate;
use crate::ingest::{IngestSummary, Ingester};
use crate::report::RunReport;

/// Whether the run talks to the content platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Ingest missing content, then classify.
    Full,
    /// Classify from the existing cache only.
    Reclassify,
}

/// Configuration for [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Creator financial dataset (JSON array).
    pub creators_file: PathBuf,
    /// ResultSet destination, replaced on success.
    pub output_file: PathBuf,
    /// Content cache directory.
    pub casts_dir: PathBuf,
    /// Width of each admission gate.
    pub concurrency: usize,
    /// Popular casts fetched per creator.
    pub cast_limit: usize,
    /// Rows in the top-earners list.
    pub top_earners: usize,
    pub mode: RunMode,
}

/// External collaborators, constructed once by the caller and shared by all
/// tasks.
#[derive(Clone)]
pub struct Services {
    /// Required in [`RunMode::Full`].
    pub source: Option<Arc<dyn ContentSource>>,
    pub classifier: Classifier,
}

/// Result of [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Linked, de-duplicated subjects taken from the dataset.
    pub subjects: usize,
    /// Absent in [`RunMode::Reclassify`].
    pub ingest: Option<IngestSummary>,
    pub skipped_uncached: usize,
    pub skipped_empty: usize,
    pub unreadable: usize,
    pub report: RunReport,
    pub output_file: PathBuf,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a per-subject stage starts with `total` subjects.
    fn stage_started(&self, name: &str, total: usize);
    /// Called as each subject of the current stage finishes.
    fn subject_done(&self, username: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn stage_started(&self, _name: &str, _total: usize) {}
    fn subject_done(&self, _username: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run the pipeline.
///
/// 1. Load the dataset and select linked subjects (fatal on bad input)
/// 2. Ingest content into the cache (full mode only)
/// 3. Classify cached subjects and merge financials
/// 4. Replace the ResultSet file
/// 5. Tally the report
#[instrument(skip_all, fields(mode = ?config.mode, creators = %config.creators_file.display()))]
pub async fn run_pipeline(
    config: &PipelineConfig,
    services: &Services,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    let run_id = Uuid::now_v7();

    let source = match (config.mode, &services.source) {
        (RunMode::Full, Some(source)) => Some(source.clone()),
        (RunMode::Full, None) => {
            return Err(CreatorLensError::config(
                "a content source is required unless reclassifying",
            ));
        }
        (RunMode::Reclassify, _) => None,
    };

    info!(%run_id, "starting pipeline");

    // --- Phase 1: Dataset ---
    progress.phase("Loading creator dataset");
    let records = load_creators(&config.creators_file)?;
    let subjects = linked_subjects(&records);
    info!(
        records = records.len(),
        subjects = subjects.len(),
        "selected creators with a Farcaster profile"
    );

    let cache = ContentCache::open(&config.casts_dir)?;

    // --- Phase 2: Ingestion ---
    let ingest = match source {
        Some(source) => {
            progress.phase("Fetching casts");
            let ingester = Ingester::new(
                source,
                cache.clone(),
                AdmissionGate::new(config.concurrency),
                config.cast_limit,
            );
            Some(ingester.ingest_all(&subjects, progress).await.summary)
        }
        None => None,
    };

    // --- Phase 3: Classification ---
    progress.phase("Classifying creators");
    let stage = EnrichmentStage::new(
        services.classifier.clone(),
        cache,
        AdmissionGate::new(config.concurrency),
    );
    let enrichment = stage.run(&subjects, progress).await;

    // --- Phase 4: Persist ---
    progress.phase("Saving results");
    write_result_set(&config.output_file, &enrichment.records)?;

    let summary = RunSummary {
        run_id,
        subjects: subjects.len(),
        ingest,
        skipped_uncached: enrichment.skipped_uncached,
        skipped_empty: enrichment.skipped_empty,
        unreadable: enrichment.unreadable,
        report: RunReport::build(&enrichment.records, config.top_earners),
        output_file: config.output_file.clone(),
        elapsed: start.elapsed(),
    };

    progress.done(&summary);

    info!(
        %run_id,
        classified = summary.report.classified,
        errors = summary.report.errors,
        elapsed_ms = summary.elapsed.as_millis(),
        "pipeline complete"
    );

    Ok(summary)
}
