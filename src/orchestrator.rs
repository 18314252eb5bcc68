//! Request orchestration: turns user input into a backend call and
//! reconciles the conversation with the result.
//!
//! One [`Orchestrator`] exists per [`Mode`]; both share a [`SharedStore`].
//! A submission is a two-phase write:
//!
//! ```text
//! submit(input)
//!   ├─ phase 1 (locked): reject? → install token → append user msg
//!   │                     → append Generating placeholder → snapshot history
//!   ├─ await backend call (unlocked, cancellable)
//!   └─ phase 2 (locked): patch placeholder → Complete | Stopped | Failed
//!                        → release loading flag and token
//! ```
//!
//! Cancellation is never reported as an error: a stopped request leaves a
//! short notice in the placeholder and an empty error slot. Nothing is
//! retried; every outcome is terminal until the user submits again.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::attachments::{attachment_note, Attachment};
use crate::client::{Backend, ChatRequest, FeedbackAck, FeedbackRequest, GenerateRequest};
use crate::error::TransportError;
use crate::models::{
    FeedbackValue, Framework, HistoryEntry, Message, MessagePatch, MessageStatus, Mode, NewMessage,
};
use crate::store::SharedStore;

/// Placeholder text after the user stops a request.
pub const STOPPED_NOTICE: &str = "Generation stopped.";

/// Placeholder text after any non-cancellation failure. The detail goes to
/// the store's error slot.
pub const FAILURE_NOTICE: &str =
    "Sorry, something went wrong while contacting the documentation service. Please try again.";

/// Default number of prior messages sent as history.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// How a call to [`Orchestrator::submit`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Empty input or a request already in flight. Nothing changed.
    Rejected,
    /// The placeholder holds the backend's answer.
    Completed { message_id: Uuid },
    /// The request was cancelled before it finished.
    Stopped { message_id: Uuid },
    /// The request failed; `error` is the detail stored in the error slot.
    Failed { message_id: Uuid, error: String },
}

pub struct Orchestrator {
    mode: Mode,
    backend: Arc<dyn Backend>,
    store: SharedStore,
    history_window: usize,
}

impl Orchestrator {
    pub fn new(mode: Mode, backend: Arc<dyn Backend>, store: SharedStore) -> Self {
        Self {
            mode,
            backend,
            store,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    /// Orchestrator for documentation Q&A.
    pub fn chat(backend: Arc<dyn Backend>, store: SharedStore) -> Self {
        Self::new(Mode::Chat, backend, store)
    }

    /// Orchestrator for code generation.
    pub fn generate(backend: Arc<dyn Backend>, store: SharedStore) -> Self {
        Self::new(Mode::Generate, backend, store)
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window.max(1);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Submits `input` (plus optional attachments) and waits for the
    /// conversation to reach a terminal state.
    ///
    /// Attachments must already be validated (see
    /// [`crate::attachments::Attachment::from_path`]); rejected files never
    /// reach this point.
    pub async fn submit(&self, input: &str, attachments: Vec<Attachment>) -> SubmitOutcome {
        let token = CancellationToken::new();

        // Phase 1: optimistic insert.
        let (request_id, placeholder_id, envelope) = {
            let mut store = self.store.lock();

            if input.trim().is_empty() && attachments.is_empty() {
                tracing::debug!(mode = self.mode.as_str(), "ignoring empty submission");
                return SubmitOutcome::Rejected;
            }
            if store.is_loading() {
                tracing::debug!(mode = self.mode.as_str(), "request already in flight");
                return SubmitOutcome::Rejected;
            }

            let request_id = store.begin_request(token.clone());
            store.set_error(None);

            let history = build_history(store.messages(), self.history_window);
            let frameworks: Vec<Framework> = store.frameworks().iter().copied().collect();
            let include_docs_context = store.include_docs_context();

            store.append_message(NewMessage::user(compose_user_content(input, &attachments)));
            let placeholder_id = store.append_message(NewMessage::placeholder());

            let envelope = Envelope {
                text: input.trim().to_string(),
                frameworks,
                history,
                include_docs_context,
                attachments,
            };
            (request_id, placeholder_id, envelope)
        };

        tracing::info!(
            mode = self.mode.as_str(),
            %request_id,
            history_len = envelope.history.len(),
            "submitting request"
        );

        let result = self.dispatch(envelope, &token).await;

        // Phase 2: terminal update.
        let mut store = self.store.lock();
        let cancelled = token.is_cancelled()
            || matches!(result, Err(ref e) if e.is_cancelled());

        let outcome = if cancelled {
            store.update_message(
                placeholder_id,
                MessagePatch {
                    content: Some(STOPPED_NOTICE.to_string()),
                    status: Some(MessageStatus::Stopped),
                    ..Default::default()
                },
            );
            tracing::info!(%request_id, "request stopped");
            SubmitOutcome::Stopped {
                message_id: placeholder_id,
            }
        } else {
            match result {
                Ok(patch) => {
                    store.update_message(placeholder_id, patch);
                    tracing::info!(%request_id, "request completed");
                    SubmitOutcome::Completed {
                        message_id: placeholder_id,
                    }
                }
                Err(err) => {
                    let detail = err.to_string();
                    store.update_message(
                        placeholder_id,
                        MessagePatch {
                            content: Some(FAILURE_NOTICE.to_string()),
                            status: Some(MessageStatus::Failed),
                            ..Default::default()
                        },
                    );
                    store.set_error(Some(detail.clone()));
                    tracing::warn!(%request_id, kind = err.kind(), error = %detail, "request failed");
                    SubmitOutcome::Failed {
                        message_id: placeholder_id,
                        error: detail,
                    }
                }
            }
        };

        store.finish_request(request_id);
        outcome
    }

    /// Calls the backend for this orchestrator's mode and turns a success
    /// into the patch applied to the placeholder.
    async fn dispatch(
        &self,
        envelope: Envelope,
        token: &CancellationToken,
    ) -> Result<MessagePatch, TransportError> {
        match self.mode {
            Mode::Chat => {
                let request = ChatRequest {
                    message: envelope.text,
                    frameworks: envelope.frameworks,
                    history: envelope.history,
                    attachments: envelope.attachments,
                };
                let response = self.backend.chat(&request, Some(token)).await?;
                Ok(MessagePatch {
                    content: Some(response.response),
                    sources: Some(response.sources),
                    trace_id: response.trace_id,
                    status: Some(MessageStatus::Complete),
                })
            }
            Mode::Generate => {
                let request = GenerateRequest {
                    prompt: envelope.text,
                    frameworks: envelope.frameworks,
                    history: envelope.history,
                    include_docs_context: envelope.include_docs_context,
                    attachments: envelope.attachments,
                };
                let response = self.backend.generate(&request, Some(token)).await?;
                Ok(MessagePatch {
                    content: Some(response.code),
                    trace_id: response.trace_id,
                    status: Some(MessageStatus::Complete),
                    ..Default::default()
                })
            }
        }
    }

    /// Sends thumbs-up/down feedback for the answer identified by `trace_id`.
    pub async fn send_feedback(
        &self,
        trace_id: &str,
        value: FeedbackValue,
        comment: Option<String>,
    ) -> Result<FeedbackAck, TransportError> {
        let request = FeedbackRequest {
            trace_id: trace_id.to_string(),
            value,
            comment: comment.filter(|c| !c.trim().is_empty()),
        };
        self.backend.feedback(&request, None).await
    }
}

/// Everything the backend call needs, captured while the store is locked.
struct Envelope {
    text: String,
    frameworks: Vec<Framework>,
    history: Vec<HistoryEntry>,
    include_docs_context: bool,
    attachments: Vec<Attachment>,
}

/// The last `window` messages, projected to `{role, content}`.
pub fn build_history(messages: &[Message], window: usize) -> Vec<HistoryEntry> {
    let start = messages.len().saturating_sub(window);
    messages[start..].iter().map(Message::to_history).collect()
}

/// Typed text followed by a note naming any attached files.
fn compose_user_content(input: &str, attachments: &[Attachment]) -> String {
    let text = input.trim();
    match attachment_note(attachments) {
        Some(note) if text.is_empty() => note,
        Some(note) => format!("{}\n\n{}", text, note),
        None => text.to_string(),
    }
}
