//! In-memory collaborators for pipeline tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use uuid::Uuid;

use creatorlens_classifier::{GenerationParams, TextGenerator};
use creatorlens_fetcher::ContentSource;
use creatorlens_shared::{CreatorLensError, Financials, Result, Subject, UserSnapshot};

use crate::gate::AdmissionGate;

pub fn temp_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("cl-{label}-test-{}", Uuid::now_v7()))
}

pub fn subject(username: &str, earnings: Option<f64>) -> Subject {
    Subject {
        username: username.to_string(),
        financials: Financials {
            earnings_usd: earnings,
            ..Financials::default()
        },
    }
}

pub fn user(fid: u64, username: &str) -> UserSnapshot {
    UserSnapshot {
        fid,
        username: Some(username.to_string()),
        display_name: Some(username.to_uppercase()),
        pfp_url: None,
        follower_count: Some(100 * fid),
        following_count: Some(10),
    }
}

/// Content source backed by maps, counting calls and tracking concurrency
/// through its own gate.
pub struct FakeSource {
    users: HashMap<String, UserSnapshot>,
    casts: HashMap<u64, Vec<Value>>,
    delay: Duration,
    pub calls: AtomicUsize,
    pub gate: AdmissionGate,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            casts: HashMap::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            gate: AdmissionGate::new(1024),
        }
    }

    /// Register a user whose popular casts are `texts`.
    pub fn with_user(mut self, fid: u64, username: &str, texts: &[&str]) -> Self {
        self.users.insert(username.to_string(), user(fid, username));
        let casts = texts.iter().map(|t| json!({ "text": t })).collect();
        self.casts.insert(fid, casts);
        self
    }

    /// Register a user whose cast lookup fails.
    pub fn with_broken_feed(mut self, fid: u64, username: &str) -> Self {
        self.users.insert(username.to_string(), user(fid, username));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _slot = self.gate.admit().await;
        tokio::time::sleep(self.delay).await;
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn user_by_username(&self, username: &str) -> Option<UserSnapshot> {
        self.call().await;
        self.users.get(username).cloned()
    }

    async fn popular_casts(&self, fid: u64, limit: usize) -> Option<Vec<Value>> {
        self.call().await;
        self.casts
            .get(&fid)
            .map(|casts| casts.iter().take(limit).cloned().collect())
    }
}

/// Generator that answers from a per-username script, found by scanning the
/// prompt for `- Username: {name}`.
pub struct FakeGenerator {
    replies: HashMap<String, String>,
    delay: Duration,
    pub prompts: Mutex<Vec<String>>,
    pub gate: AdmissionGate,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
            gate: AdmissionGate::new(1024),
        }
    }

    pub fn reply(mut self, username: &str, category: &str) -> Self {
        let body = json!({
            "primary_classification": category,
            "confidence": "High",
            "reasoning": format!("{username} posts like a {category}."),
            "secondary_traits": []
        });
        self.replies.insert(username.to_string(), body.to_string());
        self
    }

    pub fn raw_reply(mut self, username: &str, text: &str) -> Self {
        self.replies.insert(username.to_string(), text.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let _slot = self.gate.admit().await;
        tokio::time::sleep(self.delay).await;

        self.replies
            .iter()
            .find(|(name, _)| prompt.contains(&format!("- Username: {name}\n")))
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| CreatorLensError::Generation("service unavailable".into()))
    }
}
