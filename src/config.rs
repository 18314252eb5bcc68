use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::attachments::AttachmentPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub attachments: AttachmentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Upper bound on any single backend call. Generation can take minutes.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            history_window: default_history_window(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./.devdocs/preferences.json")
}
fn default_history_window() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct AttachmentConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_max_bytes() -> u64 {
    10 * 1024 * 1024
}
fn default_allowed_extensions() -> Vec<String> {
    [
        "txt", "md", "json", "js", "ts", "tsx", "jsx", "py", "css", "html", "xml", "yaml", "yml",
        "csv", "pdf",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl AttachmentConfig {
    pub fn policy(&self) -> AttachmentPolicy {
        AttachmentPolicy::new(self.max_bytes, &self.allowed_extensions)
    }
}

/// Loads configuration from `path`.
///
/// When `allow_missing` is set and the file does not exist, built-in
/// defaults are returned instead of an error. The CLI sets it only for the
/// default config location.
pub fn load_config(path: &Path, allow_missing: bool) -> Result<Config> {
    if allow_missing && !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate backend
    let url = config.backend.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!(
            "backend.url must start with http:// or https:// (got '{}')",
            config.backend.url
        );
    }
    if config.backend.timeout_secs == 0 {
        anyhow::bail!("backend.timeout_secs must be > 0");
    }

    // Validate session
    if config.session.history_window == 0 {
        anyhow::bail!("session.history_window must be > 0");
    }

    // Validate attachments
    if config.attachments.max_bytes == 0 {
        anyhow::bail!("attachments.max_bytes must be > 0");
    }
    if config.attachments.allowed_extensions.is_empty() {
        anyhow::bail!("attachments.allowed_extensions must not be empty");
    }

    Ok(())
}

impl Config {
    /// Replaces the backend URL, re-running URL validation.
    pub fn with_backend_url(mut self, url: &str) -> Result<Self> {
        self.backend.url = url.trim_end_matches('/').to_string();
        validate(&self)?;
        Ok(self)
    }
}
