//! Application configuration for LinkLens.
//!
//! User config lives at `~/.linklens/linklens.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LinkLensError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "linklens.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".linklens";

/// Mobile messaging-app identity; some platforms only serve full markup to it.
const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148 MicroMessenger/8.0.0";

// ---------------------------------------------------------------------------
// Config structs (matching linklens.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote generative service settings.
    #[serde(default)]
    pub generative: GenerativeSection,

    /// Metadata extraction settings.
    #[serde(default)]
    pub extractor: ExtractorSection,

    /// Local content store settings.
    #[serde(default)]
    pub storage: StorageSection,
}

/// `[generative]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeSection {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Timeout for classification calls.
    #[serde(default = "default_classify_timeout")]
    pub classify_timeout_secs: u64,

    /// Timeout for deep-insight calls.
    #[serde(default = "default_long_timeout")]
    pub insight_timeout_secs: u64,

    /// Timeout for comment-assist calls.
    #[serde(default = "default_long_timeout")]
    pub comment_timeout_secs: u64,
}

impl Default for GenerativeSection {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            classify_timeout_secs: default_classify_timeout(),
            insight_timeout_secs: default_long_timeout(),
            comment_timeout_secs: default_long_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "LINKLENS_API_KEY".into()
}
fn default_base_url() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".into()
}
fn default_model() -> String {
    "qwen-turbo".into()
}
fn default_classify_timeout() -> u64 {
    30
}
fn default_long_timeout() -> u64 {
    60
}

/// `[extractor]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorSection {
    /// Whole-request timeout for the markup fetch.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with the fetch.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum redirects followed.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Permit loopback/private targets (local testing only).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for ExtractorSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
            allow_private_hosts: false,
        }
    }
}

fn default_fetch_timeout() -> u64 {
    10
}
fn default_user_agent() -> String {
    MOBILE_USER_AGENT.into()
}
fn default_max_redirects() -> usize {
    5
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSection {
    /// Database path; defaults to `~/.linklens/linklens.db` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

impl StorageSection {
    /// Resolve the database path, falling back to the config directory.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Ok(config_dir()?.join("linklens.db")),
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config file + environment)
// ---------------------------------------------------------------------------

/// Runtime configuration for the generative client.
#[derive(Clone)]
pub struct GenerativeConfig {
    /// Resolved API key; `None` means the service is unconfigured.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub classify_timeout: Duration,
    pub insight_timeout: Duration,
    pub comment_timeout: Duration,
}

impl std::fmt::Debug for GenerativeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("classify_timeout", &self.classify_timeout)
            .field("insight_timeout", &self.insight_timeout)
            .field("comment_timeout", &self.comment_timeout)
            .finish()
    }
}

impl From<&AppConfig> for GenerativeConfig {
    fn from(config: &AppConfig) -> Self {
        let section = &config.generative;
        Self {
            api_key: resolve_api_key(config),
            base_url: section.base_url.clone(),
            model: section.model.clone(),
            classify_timeout: Duration::from_secs(section.classify_timeout_secs),
            insight_timeout: Duration::from_secs(section.insight_timeout_secs),
            comment_timeout: Duration::from_secs(section.comment_timeout_secs),
        }
    }
}

/// Runtime configuration for the metadata extractor.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
    pub allow_private_hosts: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ExtractorConfig {
    fn from(config: &AppConfig) -> Self {
        let section = &config.extractor;
        Self {
            timeout: Duration::from_secs(section.timeout_secs),
            user_agent: section.user_agent.clone(),
            max_redirects: section.max_redirects,
            allow_private_hosts: section.allow_private_hosts,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.linklens/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LinkLensError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.linklens/linklens.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| LinkLensError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LinkLensError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LinkLensError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LinkLensError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LinkLensError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key from the configured env var. Empty values count as unset.
pub fn resolve_api_key(config: &AppConfig) -> Option<String> {
    match std::env::var(&config.generative.api_key_env) {
        Ok(val) if !val.trim().is_empty() => Some(val),
        _ => None,
    }
}
