//! Core domain types: subjects, cached content, classifications, and the
//! enriched records that make up a ResultSet.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bio substituted when the cached content carries no author bio.
pub const NO_BIO: &str = "No bio available";

// ---------------------------------------------------------------------------
// Category / Confidence
// ---------------------------------------------------------------------------

/// Primary creator category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Category {
    Builder,
    Creative,
    Influencer,
    Lifestyle,
}

impl Category {
    /// Every category, in prompt order.
    pub const ALL: [Category; 4] = [
        Category::Builder,
        Category::Creative,
        Category::Influencer,
        Category::Lifestyle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builder => "Builder",
            Self::Creative => "Creative",
            Self::Influencer => "Influencer",
            Self::Lifestyle => "Lifestyle",
        }
    }

    /// Defining description shown to the model.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Builder => {
                "Ships tools, apps, protocols, infrastructure or open source code; \
                 content is about things they are building and launching"
            }
            Self::Creative => {
                "Makes art, design, music, video, memes, photography or digital \
                 collectibles; content showcases their creative output"
            }
            Self::Influencer => {
                "Prominent industry voice (usually well above 50k followers) whose \
                 content is mostly commentary, analysis and opinion. Often has a \
                 technical past, but current posts are thought leadership rather \
                 than hands-on product work"
            }
            Self::Lifestyle => {
                "Shares personal life: daily updates, travel, food, fitness, \
                 wellness, personal brand and general social chatter"
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown category '{wanted}'"))
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Model-reported confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown confidence '{other}'")),
        }
    }
}

impl TryFrom<String> for Confidence {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// The structured object the model is asked to return.
///
/// Deserialization rejects categories and confidence levels outside the
/// fixed enumerations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub primary_classification: Category,
    pub confidence: Confidence,
    pub reasoning: String,
    #[serde(default)]
    pub secondary_traits: Vec<String>,
}

// ---------------------------------------------------------------------------
// Subject
// ---------------------------------------------------------------------------

/// Financial attributes carried from the creator dataset into each record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    pub earnings_usd: Option<f64>,
    pub coin_address: Option<String>,
    pub market_cap: Option<f64>,
    pub zora_handle: Option<String>,
}

/// One creator under analysis, keyed by content-platform username.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub username: String,
    pub financials: Financials,
}

// ---------------------------------------------------------------------------
// ContentSnapshot (cache record)
// ---------------------------------------------------------------------------

/// Profile fields captured at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub fid: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub pfp_url: Option<String>,
    #[serde(default)]
    pub follower_count: Option<u64>,
    #[serde(default)]
    pub following_count: Option<u64>,
}

/// Per-creator cached fetch result, stored as `{username}-casts.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub cast_texts: Vec<String>,
    pub user: UserSnapshot,
    /// Raw cast objects as returned by the platform.
    #[serde(default)]
    pub casts: Vec<Value>,
    #[serde(deserialize_with = "lenient::timestamp")]
    pub fetched_at: DateTime<Utc>,
}

impl ContentSnapshot {
    /// Build a snapshot from raw casts, extracting their texts in order.
    pub fn new(user: UserSnapshot, casts: Vec<Value>, fetched_at: DateTime<Utc>) -> Self {
        let cast_texts = casts
            .iter()
            .map(|cast| {
                cast.get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect();

        Self {
            cast_texts,
            user,
            casts,
            fetched_at,
        }
    }

    /// Author bio from the first raw cast, or [`NO_BIO`].
    pub fn bio(&self) -> &str {
        self.casts
            .first()
            .and_then(|cast| cast.pointer("/author/profile/bio/text"))
            .and_then(Value::as_str)
            .unwrap_or(NO_BIO)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Successful classification of one creator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedCreator {
    pub username: String,
    pub display_name: Option<String>,
    pub bio: String,
    pub follower_count: Option<u64>,
    pub casts_analyzed: usize,
    #[serde(flatten)]
    pub classification: Classification,
    pub analyzed_at: DateTime<Utc>,
}

/// Classification that failed after exhausting retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedCreator {
    pub username: String,
    pub display_name: Option<String>,
    pub error: String,
    pub analyzed_at: DateTime<Utc>,
}

/// Exactly one of the two record shapes; never a mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassificationOutcome {
    Classified(ClassifiedCreator),
    Failed(FailedCreator),
}

impl ClassificationOutcome {
    pub fn username(&self) -> &str {
        match self {
            Self::Classified(c) => &c.username,
            Self::Failed(f) => &f.username,
        }
    }

    pub fn category(&self) -> Option<Category> {
        match self {
            Self::Classified(c) => Some(c.classification.primary_classification),
            Self::Failed(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Classified(_))
    }
}

/// A classification outcome merged with its subject's financials.
/// The unit written to the ResultSet file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub outcome: ClassificationOutcome,
    #[serde(flatten)]
    pub financials: Financials,
}

impl EnrichedRecord {
    pub fn merge(outcome: ClassificationOutcome, subject: &Subject) -> Self {
        debug_assert_eq!(outcome.username(), subject.username);
        Self {
            outcome,
            financials: subject.financials.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------

/// Deserializers that tolerate the looser shapes found in upstream files.
pub mod lenient {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// RFC 3339, or a naive ISO-8601 timestamp taken as UTC.
    pub fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }

    /// A currency amount given as a JSON number or a numeric string.
    /// Anything else, including `NaN` and infinities, becomes `None`.
    pub fn amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        Ok(value.filter(|v: &f64| v.is_finite()))
    }

    /// A string field that upstream sometimes writes as a number.
    /// Numbers are rendered as text; any other shape becomes `None`.
    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }
}
