//! Session wiring: configuration → backend → store → orchestrators.
//!
//! A [`Session`] owns one [`SharedStore`] and the two orchestrators (chat
//! and generate) that drive it, plus the attachment policy and the
//! preferences file location. Both the one-shot CLI commands and the
//! interactive loop go through it.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::attachments::{load_all, Attachment, AttachmentError, AttachmentPolicy};
use crate::client::{Backend, HttpBackend};
use crate::config::Config;
use crate::models::Mode;
use crate::orchestrator::{Orchestrator, SubmitOutcome};
use crate::preferences::Preferences;
use crate::store::{ConversationStore, SharedStore};

pub struct Session {
    store: SharedStore,
    backend: Arc<dyn Backend>,
    chat: Arc<Orchestrator>,
    generate: Arc<Orchestrator>,
    policy: AttachmentPolicy,
    state_path: PathBuf,
}

impl Session {
    /// Builds a session against the HTTP backend described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config.backend)?);
        Ok(Self::with_backend(config, backend))
    }

    /// Builds a session around any [`Backend`], restoring persisted
    /// preferences from `session.state_path`.
    pub fn with_backend(config: &Config, backend: Arc<dyn Backend>) -> Self {
        let state_path = config.session.state_path.clone();
        let prefs = Preferences::load_or_default(&state_path);
        let store = SharedStore::new(ConversationStore::from_preferences(&prefs));
        let window = config.session.history_window;

        Self {
            chat: Arc::new(
                Orchestrator::chat(backend.clone(), store.clone()).with_history_window(window),
            ),
            generate: Arc::new(
                Orchestrator::generate(backend.clone(), store.clone())
                    .with_history_window(window),
            ),
            store,
            backend,
            policy: config.attachments.policy(),
            state_path,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn policy(&self) -> &AttachmentPolicy {
        &self.policy
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// The orchestrator for `mode`.
    pub fn orchestrator(&self, mode: Mode) -> Arc<Orchestrator> {
        match mode {
            Mode::Chat => self.chat.clone(),
            Mode::Generate => self.generate.clone(),
        }
    }

    /// The orchestrator for the store's current mode.
    pub fn current(&self) -> Arc<Orchestrator> {
        let mode = self.store.lock().mode();
        self.orchestrator(mode)
    }

    /// Reads and validates attachment paths.
    pub fn load_attachments(&self, paths: &[PathBuf]) -> Result<Vec<Attachment>, AttachmentError> {
        load_all(paths, &self.policy)
    }

    /// Writes the persisted subset of the store.
    pub fn persist(&self) -> Result<()> {
        let prefs = self.store.lock().preferences();
        prefs.save(&self.state_path)
    }

    /// Submits through `mode`'s orchestrator. Ctrl-C while waiting stops the
    /// request instead of killing the process.
    pub async fn submit_interruptible(
        &self,
        mode: Mode,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<SubmitOutcome> {
        let orchestrator = self.orchestrator(mode);
        let text = text.to_string();
        let mut task = tokio::spawn(async move { orchestrator.submit(&text, attachments).await });

        let outcome = tokio::select! {
            joined = &mut task => joined?,
            _ = tokio::signal::ctrl_c() => {
                self.store.stop_generation();
                task.await?
            }
        };
        Ok(outcome)
    }
}
