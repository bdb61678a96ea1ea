//! HTTP access to the content platform.
//!
//! This crate provides:
//! - [`RetryingFetcher`]: a JSON GET with bounded exponential backoff
//! - [`ContentSource`]: the profile/content lookups the ingester needs
//! - [`NeynarClient`]: the production [`ContentSource`] backed by the Neynar API

pub mod neynar;
pub mod retry;

pub use neynar::{ContentSource, NeynarClient};
pub use retry::RetryingFetcher;
