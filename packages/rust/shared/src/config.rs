//! Application configuration for CreatorLens.
//!
//! User config lives at `~/.creatorlens/creatorlens.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CreatorLensError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "creatorlens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".creatorlens";

// ---------------------------------------------------------------------------
// Config structs (matching creatorlens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input/output locations and batch sizing.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Content platform (Neynar) settings.
    #[serde(default)]
    pub neynar: NeynarConfig,

    /// Generative-text service (Gemini) settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Retry/backoff settings shared by the fetcher and the classifier.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Creator financial dataset (JSON array).
    #[serde(default = "default_creators_file")]
    pub creators_file: String,

    /// ResultSet output file.
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Directory holding per-creator content cache files.
    #[serde(default = "default_casts_dir")]
    pub casts_dir: String,

    /// Width of each admission gate (ingestion and classification).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Number of popular casts fetched per creator.
    #[serde(default = "default_cast_limit")]
    pub cast_limit: usize,

    /// How many top earners the run report lists.
    #[serde(default = "default_top_earners")]
    pub top_earners: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            creators_file: default_creators_file(),
            output_file: default_output_file(),
            casts_dir: default_casts_dir(),
            concurrency: default_concurrency(),
            cast_limit: default_cast_limit(),
            top_earners: default_top_earners(),
        }
    }
}

fn default_creators_file() -> String {
    "creator-fees-api-results.json".into()
}
fn default_output_file() -> String {
    "creator-classifications-with-earnings.json".into()
}
fn default_casts_dir() -> String {
    "./casts".into()
}
fn default_concurrency() -> usize {
    20
}
fn default_cast_limit() -> usize {
    10
}
fn default_top_earners() -> usize {
    5
}

/// `[neynar]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeynarConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_neynar_key_env")]
    pub api_key_env: String,

    /// API origin.
    #[serde(default = "default_neynar_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_neynar_timeout")]
    pub timeout_secs: u64,
}

impl Default for NeynarConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_neynar_key_env(),
            base_url: default_neynar_base_url(),
            timeout_secs: default_neynar_timeout(),
        }
    }
}

fn default_neynar_key_env() -> String {
    "NEYNAR_API_KEY".into()
}
fn default_neynar_base_url() -> String {
    "https://api.neynar.com".into()
}
fn default_neynar_timeout() -> u64 {
    30
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: String,

    /// API origin.
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model used for classification.
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Hard ceiling on generated tokens.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_gemini_key_env(),
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_gemini_model() -> String {
    "gemini-flash-lite-latest".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_output_tokens() -> u32 {
    500
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, first try included.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Base backoff delay in ms; attempt `n` waits `base * 2^n`.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    2000
}

// ---------------------------------------------------------------------------
// Retry policy (runtime)
// ---------------------------------------------------------------------------

/// Bounded exponential backoff: `max_attempts` tries, waiting
/// `base_delay * 2^attempt` after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after the zero-based `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(20))
    }

    /// Whether another attempt remains after the zero-based `attempt`.
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.attempts, Duration::from_millis(config.base_delay_ms))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.creatorlens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CreatorLensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.creatorlens/creatorlens.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CreatorLensError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CreatorLensError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CreatorLensError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CreatorLensError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CreatorLensError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a credential from the environment variable named `var_name`.
pub fn resolve_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(CreatorLensError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}
