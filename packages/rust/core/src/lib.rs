//! Pipeline orchestration and domain logic for CreatorLens.
//!
//! This crate ties together the content source, the on-disk cache and the
//! classifier into the end-to-end enrichment run (`run_pipeline`).

pub mod dataset;
pub mod enrichment;
pub mod gate;
pub mod ingest;
pub mod pipeline;
pub mod report;

#[cfg(test)]
mod testing;
