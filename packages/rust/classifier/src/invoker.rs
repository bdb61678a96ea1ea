//! One creator in, one classification outcome out.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use creatorlens_shared::{
    Classification, ClassificationOutcome, ClassifiedCreator, ContentSnapshot, CreatorLensError,
    FailedCreator, Result, RetryPolicy,
};

use crate::gemini::{GenerationParams, TextGenerator};
use crate::json_extract::extract_json_object;
use crate::prompt::build_prompt;

/// Reasoning longer than this is cut at a char boundary.
const MAX_REASONING_CHARS: usize = 1000;

/// Prompts the generator and parses its answer, retrying the whole call on
/// transport errors and on malformed or out-of-enumeration output.
#[derive(Clone)]
pub struct Classifier {
    generator: Arc<dyn TextGenerator>,
    params: GenerationParams,
    retry: RetryPolicy,
}

impl Classifier {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        params: GenerationParams,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            generator,
            params,
            retry,
        }
    }

    /// Classify one creator. Never fails: unrecoverable errors become a
    /// [`ClassificationOutcome::Failed`] record.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn classify(&self, username: &str, snapshot: &ContentSnapshot) -> ClassificationOutcome {
        let prompt = build_prompt(username, snapshot);
        let display_name = snapshot.user.display_name.clone();

        match self.classify_with_retry(&prompt).await {
            Ok(classification) => {
                debug!(category = %classification.primary_classification, "classified");
                ClassificationOutcome::Classified(ClassifiedCreator {
                    username: username.to_string(),
                    display_name,
                    bio: snapshot.bio().to_string(),
                    follower_count: snapshot.user.follower_count,
                    casts_analyzed: snapshot.cast_texts.len(),
                    classification,
                    analyzed_at: Utc::now(),
                })
            }
            Err(e) => {
                warn!(error = %e, "classification failed");
                ClassificationOutcome::Failed(FailedCreator {
                    username: username.to_string(),
                    display_name,
                    error: e.to_string(),
                    analyzed_at: Utc::now(),
                })
            }
        }
    }

    async fn classify_with_retry(&self, prompt: &str) -> Result<Classification> {
        let mut attempt = 0;
        loop {
            let result = match self.generator.generate(prompt, &self.params).await {
                Ok(text) => parse_classification(&text),
                Err(e) => Err(e),
            };

            match result {
                Ok(classification) => return Ok(classification),
                Err(e) if self.retry.has_next(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "classification attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Decode a [`Classification`] from raw model output.
pub fn parse_classification(text: &str) -> Result<Classification> {
    let json = extract_json_object(text)
        .ok_or_else(|| CreatorLensError::Generation("no JSON object found in response".into()))?;

    let mut classification: Classification = serde_json::from_str(json)
        .map_err(|e| CreatorLensError::Generation(format!("invalid classification: {e}")))?;

    if let Some((cut, _)) = classification.reasoning.char_indices().nth(MAX_REASONING_CHARS) {
        classification.reasoning.truncate(cut);
    }

    Ok(classification)
}
