//! Creator classification with a generative-text model.
//!
//! This crate provides:
//! - [`build_prompt`]: the deterministic classification prompt
//! - [`extract_json_object`]: pulls the first JSON object out of free-form model output
//! - [`TextGenerator`] / [`GeminiClient`]: the generative-text service seam and its Gemini implementation
//! - [`Classifier`]: prompt, call, parse and retry, yielding exactly one outcome per creator

pub mod gemini;
pub mod invoker;
pub mod json_extract;
pub mod prompt;

pub use gemini::{GeminiClient, GenerationParams, TextGenerator};
pub use invoker::{Classifier, parse_classification};
pub use json_extract::extract_json_object;
pub use prompt::build_prompt;
