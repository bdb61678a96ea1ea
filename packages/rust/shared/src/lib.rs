//! Shared types, error model, and configuration for CreatorLens.
//!
//! This crate is the foundation depended on by all other CreatorLens crates.
//! It provides:
//! - [`CreatorLensError`], the unified error type
//! - Domain types ([`Subject`], [`ContentSnapshot`], [`Classification`], [`EnrichedRecord`])
//! - Configuration ([`AppConfig`], [`RetryPolicy`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, GeminiConfig, NeynarConfig, RetryConfig, RetryPolicy, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{CreatorLensError, Result};
pub use types::{
    Category, Classification, ClassificationOutcome, ClassifiedCreator, Confidence,
    ContentSnapshot, EnrichedRecord, FailedCreator, Financials, NO_BIO, Subject, UserSnapshot,
};
