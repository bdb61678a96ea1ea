//! Neynar (Farcaster) profile and popular-cast lookups.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use creatorlens_shared::{CreatorLensError, Result, RetryPolicy, UserSnapshot};

use crate::retry::RetryingFetcher;

/// The two content-platform lookups the ingester performs per creator.
///
/// Both return `None` for "no data" (not found, or retries exhausted).
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Resolve a profile by username.
    async fn user_by_username(&self, username: &str) -> Option<UserSnapshot>;

    /// Fetch up to `limit` popular casts for a numeric user id.
    async fn popular_casts(&self, fid: u64, limit: usize) -> Option<Vec<Value>>;
}

/// [`ContentSource`] backed by the Neynar v2 HTTP API.
pub struct NeynarClient {
    fetcher: RetryingFetcher,
    base_url: Url,
    headers: HeaderMap,
}

impl NeynarClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CreatorLensError::config(format!("invalid Neynar base URL: {e}")))?;

        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| CreatorLensError::config("Neynar API key is not a valid header value"))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", key);

        Ok(Self {
            fetcher: RetryingFetcher::new(timeout, policy)?,
            base_url,
            headers,
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Option<Url> {
        let mut url = self.base_url.join(path).ok()?;
        url.query_pairs_mut().extend_pairs(query);
        Some(url)
    }
}

#[async_trait]
impl ContentSource for NeynarClient {
    #[instrument(skip(self))]
    async fn user_by_username(&self, username: &str) -> Option<UserSnapshot> {
        let url = self.endpoint("v2/farcaster/user/by_username", &[("username", username)])?;
        let body = self.fetcher.get_json(&url, &self.headers).await?;

        match body.get("user") {
            Some(user) if !user.is_null() => match serde_json::from_value(user.clone()) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    debug!(error = %e, "profile payload did not match expected shape");
                    None
                }
            },
            _ => None,
        }
    }

    #[instrument(skip(self))]
    async fn popular_casts(&self, fid: u64, limit: usize) -> Option<Vec<Value>> {
        let fid = fid.to_string();
        let limit = limit.to_string();
        let url = self.endpoint(
            "v2/farcaster/feed/user/popular",
            &[("fid", fid.as_str()), ("limit", limit.as_str())],
        )?;
        let body = self.fetcher.get_json(&url, &self.headers).await?;

        Some(match body.get("casts") {
            Some(Value::Array(casts)) => casts.clone(),
            _ => Vec::new(),
        })
    }
}
