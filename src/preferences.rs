//! Persisted session preferences.
//!
//! Only the user's selections survive a restart: the framework set, the
//! mode, and the context-inclusion flag. Message history, loading state and
//! errors are never written.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::models::{Framework, Mode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_frameworks")]
    pub frameworks: Vec<Framework>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_include_docs_context")]
    pub include_docs_context: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            frameworks: default_frameworks(),
            mode: Mode::default(),
            include_docs_context: default_include_docs_context(),
        }
    }
}

fn default_frameworks() -> Vec<Framework> {
    Framework::ALL.to_vec()
}
fn default_include_docs_context() -> bool {
    true
}

impl Preferences {
    /// Reads preferences from `path`, returning defaults when the file does
    /// not exist. A file with an empty framework list gets the default
    /// selection back.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read preferences: {}", path.display()))?;
        let mut prefs: Preferences = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse preferences: {}", path.display()))?;

        if prefs.frameworks.is_empty() {
            prefs.frameworks = default_frameworks();
        }
        prefs.frameworks.sort();
        prefs.frameworks.dedup();

        Ok(prefs)
    }

    /// Like [`load`](Self::load), but falls back to defaults on a corrupt
    /// file instead of failing.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable preferences");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write preferences: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "preferences saved");
        Ok(())
    }
}
