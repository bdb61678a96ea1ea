//! JSON GET with bounded exponential-backoff retry.
//!
//! Every call returns `Some(body)` or `None`; failures are a value the caller
//! branches on, never an error. 429, 5xx, transport errors and timeouts share
//! one attempt budget; any other non-200 status ends the call immediately.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use creatorlens_shared::{CreatorLensError, Result, RetryPolicy};

/// User-Agent string for platform requests.
const USER_AGENT: &str = concat!("CreatorLens/", env!("CARGO_PKG_VERSION"));

/// HTTP JSON fetcher with a per-request timeout and retry policy.
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                CreatorLensError::Network(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// Returns `None` once the attempt budget is spent, or straight away on a
    /// non-retryable status (e.g. 404).
    pub async fn get_json(&self, url: &Url, headers: &HeaderMap) -> Option<Value> {
        self.get_json_recording_backoff(url, headers, &mut Vec::new()).await
    }

    /// [`get_json`](Self::get_json), pushing each backoff delay onto `slept`
    /// before sleeping it.
    async fn get_json_recording_backoff(
        &self,
        url: &Url,
        headers: &HeaderMap,
        slept: &mut Vec<Duration>,
    ) -> Option<Value> {
        for attempt in 0..self.policy.max_attempts {
            match self
                .client
                .get(url.clone())
                .headers(headers.clone())
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::OK {
                        match response.json::<Value>().await {
                            Ok(body) => return Some(body),
                            Err(e) => {
                                warn!(path = url.path(), attempt, error = %e, "undecodable JSON body");
                            }
                        }
                    } else if status == StatusCode::TOO_MANY_REQUESTS {
                        warn!(path = url.path(), attempt, "rate limited");
                    } else if status.is_server_error() {
                        warn!(path = url.path(), attempt, %status, "server error");
                    } else {
                        debug!(path = url.path(), %status, "non-retryable status");
                        return None;
                    }
                }
                Err(e) => {
                    warn!(path = url.path(), attempt, timeout = e.is_timeout(), error = %e, "request failed");
                }
            }

            if self.policy.has_next(attempt) {
                let delay = self.policy.delay_for(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
                slept.push(delay);
                tokio::time::sleep(delay).await;
            }
        }

        warn!(
            path = url.path(),
            attempts = self.policy.max_attempts,
            "giving up after retries"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Instant;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(base_delay_ms: u64) -> RetryingFetcher {
        RetryingFetcher::new(
            Duration::from_secs(5),
            RetryPolicy::new(3, Duration::from_millis(base_delay_ms)),
        )
        .unwrap()
    }

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{p}", server.uri())).unwrap()
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.unwrap().len()
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .and(header("x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "secret".parse().unwrap());

        let body = fetcher(1).get_json(&url(&server, "/data"), &headers).await;
        assert_eq!(body, Some(json!({"ok": true})));
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn retries_rate_limit_with_growing_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"casts": []})))
            .mount(&server)
            .await;

        let fetcher = fetcher(40);
        let policy = *fetcher.policy();

        let start = Instant::now();
        let mut slept = Vec::new();
        let body = fetcher
            .get_json_recording_backoff(&url(&server, "/data"), &HeaderMap::new(), &mut slept)
            .await;

        assert_eq!(body, Some(json!({"casts": []})));
        assert_eq!(request_count(&server).await, 3);
        // One sleep per 429, 40ms then 80ms.
        assert_eq!(slept, vec![policy.delay_for(0), policy.delay_for(1)]);
        assert!(slept.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(start.elapsed() >= slept.iter().sum::<Duration>());
    }

    #[tokio::test]
    async fn rate_limit_shares_attempt_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let mut slept = Vec::new();
        let body = fetcher(1)
            .get_json_recording_backoff(&url(&server, "/data"), &HeaderMap::new(), &mut slept)
            .await;
        assert!(body.is_none());
        assert_eq!(request_count(&server).await, 3);
        // No sleep after the final attempt.
        assert_eq!(slept.len(), 2);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let body = fetcher(1)
            .get_json(&url(&server, "/missing"), &HeaderMap::new())
            .await;
        assert!(body.is_none());
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
            .mount(&server)
            .await;

        let body = fetcher(1)
            .get_json(&url(&server, "/data"), &HeaderMap::new())
            .await;
        assert_eq!(body, Some(json!([1, 2])));
        assert_eq!(request_count(&server).await, 2);
    }

    #[tokio::test]
    async fn timeout_counts_as_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": null})))
            .mount(&server)
            .await;

        let fetcher = RetryingFetcher::new(
            Duration::from_millis(200),
            RetryPolicy::new(3, Duration::from_millis(1)),
        )
        .unwrap();

        let body = fetcher
            .get_json(&url(&server, "/slow"), &HeaderMap::new())
            .await;
        assert_eq!(body, Some(json!({"user": null})));
    }

    #[tokio::test]
    async fn invalid_json_body_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let body = fetcher(1)
            .get_json(&url(&server, "/data"), &HeaderMap::new())
            .await;
        assert!(body.is_none());
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn connection_refused_yields_none() {
        let url = Url::parse("http://127.0.0.1:9/unreachable").unwrap();
        let body = fetcher(1).get_json(&url, &HeaderMap::new()).await;
        assert!(body.is_none());
    }
}
