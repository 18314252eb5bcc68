//! Conversation store: the single source of truth for conversation state.
//!
//! The store owns the message history, the user's selections (mode,
//! frameworks, context-inclusion flag), the transient UI flags (loading,
//! error), and the cancellation handle of the request in flight. It knows
//! nothing about the network; the orchestrator drives it.
//!
//! Every mutation bumps a revision counter published through a
//! [`tokio::sync::watch`] channel, so presentation code can
//! [`subscribe`](ConversationStore::subscribe) and re-render on change.
//!
//! The store is shared between the orchestrators and the presentation layer
//! through [`SharedStore`]. Locks are held only for short synchronous
//! sections, never across an `.await`.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{Framework, Message, MessagePatch, Mode, NewMessage};
use crate::preferences::Preferences;

/// Identifies one submitted request, so its completion only releases its
/// own cancellation handle.
pub type RequestId = Uuid;

struct InFlight {
    request_id: RequestId,
    token: CancellationToken,
}

pub struct ConversationStore {
    messages: Vec<Message>,
    mode: Mode,
    frameworks: BTreeSet<Framework>,
    include_docs_context: bool,
    loading: bool,
    error: Option<String>,
    in_flight: Option<InFlight>,
    last_timestamp: Option<DateTime<Utc>>,
    revision: watch::Sender<u64>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::from_preferences(&Preferences::default())
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store seeded with persisted selections. History and
    /// transient flags always start empty.
    pub fn from_preferences(prefs: &Preferences) -> Self {
        let mut frameworks: BTreeSet<Framework> = prefs.frameworks.iter().copied().collect();
        if frameworks.is_empty() {
            frameworks = Preferences::default().frameworks.into_iter().collect();
        }
        let (revision, _) = watch::channel(0);

        Self {
            messages: Vec::new(),
            mode: prefs.mode,
            frameworks,
            include_docs_context: prefs.include_docs_context,
            loading: false,
            error: None,
            in_flight: None,
            last_timestamp: None,
            revision,
        }
    }

    /// The persisted subset of this store.
    pub fn preferences(&self) -> Preferences {
        Preferences {
            frameworks: self.frameworks.iter().copied().collect(),
            mode: self.mode,
            include_docs_context: self.include_docs_context,
        }
    }

    /// Receives the revision counter, bumped on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn notify(&self) {
        self.revision.send_modify(|r| *r = r.wrapping_add(1));
    }

    // ============ Reads ============

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn message(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn frameworks(&self) -> &BTreeSet<Framework> {
        &self.frameworks
    }

    pub fn include_docs_context(&self) -> bool {
        self.include_docs_context
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    // ============ Messages ============

    /// Appends a message with a fresh id and timestamp. Always succeeds.
    ///
    /// Timestamps never go backwards relative to earlier appends, even if
    /// the wall clock does.
    pub fn append_message(&mut self, message: NewMessage) -> Uuid {
        let now = Utc::now();
        let timestamp = match self.last_timestamp {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);

        let id = Uuid::new_v4();
        self.messages.push(Message {
            id,
            role: message.role,
            content: message.content,
            timestamp,
            sources: None,
            trace_id: None,
            status: message.status,
        });
        self.notify();
        id
    }

    /// Merges `patch` into the last message. Returns `false` when empty.
    pub fn update_last_message(&mut self, patch: MessagePatch) -> bool {
        match self.messages.last_mut() {
            Some(last) => {
                last.apply(patch);
                self.notify();
                true
            }
            None => false,
        }
    }

    /// Merges `patch` into the message with `id`. Returns `false` if it is
    /// no longer present (e.g. the history was cleared mid-request).
    pub fn update_message(&mut self, id: Uuid, patch: MessagePatch) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(msg) => {
                msg.apply(patch);
                self.notify();
                true
            }
            None => false,
        }
    }

    /// Empties the history. Callers should stop any in-flight request first.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.notify();
    }

    // ============ Selections ============

    /// Adds `framework` if absent, removes it if present.
    ///
    /// Removing the only selected framework is rejected: returns `false` and
    /// leaves the selection unchanged.
    pub fn toggle_framework(&mut self, framework: Framework) -> bool {
        if self.frameworks.contains(&framework) {
            if self.frameworks.len() == 1 {
                return false;
            }
            self.frameworks.remove(&framework);
        } else {
            self.frameworks.insert(framework);
        }
        self.notify();
        true
    }

    /// Replaces the selection. An empty set is rejected.
    pub fn set_frameworks(&mut self, frameworks: impl IntoIterator<Item = Framework>) -> bool {
        let next: BTreeSet<Framework> = frameworks.into_iter().collect();
        if next.is_empty() {
            return false;
        }
        self.frameworks = next;
        self.notify();
        true
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.notify();
    }

    pub fn set_include_docs_context(&mut self, include: bool) {
        self.include_docs_context = include;
        self.notify();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        self.notify();
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
        self.notify();
    }

    // ============ Cancellation ============

    /// Installs `token` as the in-flight handle and marks the store loading.
    ///
    /// A stale handle left by an earlier request is cancelled first so at
    /// most one handle is ever live.
    pub fn begin_request(&mut self, token: CancellationToken) -> RequestId {
        if let Some(stale) = self.in_flight.take() {
            tracing::debug!(request_id = %stale.request_id, "superseding stale request handle");
            stale.token.cancel();
        }
        let request_id = Uuid::new_v4();
        self.in_flight = Some(InFlight { request_id, token });
        self.loading = true;
        self.notify();
        request_id
    }

    /// Releases the in-flight handle and the loading flag for `request_id`.
    ///
    /// If a newer request has since installed its own handle, that request
    /// stays untouched: a late completion never clears another request's
    /// handle or loading flag.
    pub fn finish_request(&mut self, request_id: RequestId) {
        let owns = self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.request_id == request_id);
        if owns {
            self.in_flight = None;
        }
        if owns || self.in_flight.is_none() {
            self.loading = false;
        }
        self.notify();
    }

    /// Trace id of the most recent answer, for feedback.
    pub fn latest_trace_id(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find_map(|m| m.trace_id.as_deref())
    }

    /// Signals the in-flight request to stop, then clears the handle and the
    /// loading flag. No-op when nothing is in flight.
    pub fn stop_generation(&mut self) -> bool {
        match self.in_flight.take() {
            Some(in_flight) => {
                tracing::info!(request_id = %in_flight.request_id, "stopping generation");
                in_flight.token.cancel();
                self.loading = false;
                self.notify();
                true
            }
            None => false,
        }
    }
}

/// Cloneable handle to a store shared by orchestrators and the UI.
#[derive(Clone, Default)]
pub struct SharedStore(Arc<Mutex<ConversationStore>>);

impl SharedStore {
    pub fn new(store: ConversationStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    /// Locks the store. A poisoned lock is recovered: every mutation leaves
    /// the store consistent, so a panic elsewhere cannot corrupt it.
    pub fn lock(&self) -> MutexGuard<'_, ConversationStore> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.lock().subscribe()
    }

    pub fn stop_generation(&self) -> bool {
        self.lock().stop_generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageStatus, Role};
    use std::collections::HashSet;

    fn store_with(frameworks: &[Framework]) -> ConversationStore {
        let mut store = ConversationStore::new();
        assert!(store.set_frameworks(frameworks.iter().copied()));
        store
    }

    #[test]
    fn toggle_cannot_empty_selection() {
        let mut store = store_with(&[Framework::React]);
        assert!(!store.toggle_framework(Framework::React));
        assert_eq!(store.frameworks().len(), 1);
        assert!(store.frameworks().contains(&Framework::React));

        assert!(store.toggle_framework(Framework::Django));
        assert!(store.toggle_framework(Framework::React));
        assert_eq!(
            store.frameworks().iter().copied().collect::<Vec<_>>(),
            vec![Framework::Django]
        );
    }

    #[test]
    fn set_frameworks_rejects_empty() {
        let mut store = store_with(&[Framework::Tailwind]);
        assert!(!store.set_frameworks(Vec::new()));
        assert!(store.frameworks().contains(&Framework::Tailwind));
    }

    #[test]
    fn append_assigns_unique_ids_and_ordered_timestamps() {
        let mut store = ConversationStore::new();
        let mut ids = HashSet::new();
        for i in 0..50 {
            ids.insert(store.append_message(NewMessage::user(format!("m{}", i))));
        }
        assert_eq!(ids.len(), 50);
        for pair in store.messages().windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[test]
    fn clear_empties_history() {
        let mut store = ConversationStore::new();
        for _ in 0..7 {
            store.append_message(NewMessage::user("x"));
        }
        store.clear();
        assert!(store.messages().is_empty());
        store.clear();
        assert!(store.messages().is_empty());
    }

    #[test]
    fn update_last_is_noop_when_empty() {
        let mut store = ConversationStore::new();
        let changed = store.update_last_message(MessagePatch {
            content: Some("nope".to_string()),
            ..Default::default()
        });
        assert!(!changed);
        assert!(store.messages().is_empty());
    }

    #[test]
    fn update_last_touches_only_final_element() {
        let mut store = ConversationStore::new();
        store.append_message(NewMessage::user("question"));
        store.append_message(NewMessage::placeholder());
        let before_first = store.messages()[0].clone();

        assert!(store.update_last_message(MessagePatch {
            content: Some("answer".to_string()),
            status: Some(MessageStatus::Complete),
            ..Default::default()
        }));

        assert_eq!(store.messages()[0], before_first);
        let last = store.last_message().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "answer");
        assert!(!last.is_generating());
    }

    #[test]
    fn begin_request_supersedes_stale_handle() {
        let mut store = ConversationStore::new();
        let first = CancellationToken::new();
        let second = CancellationToken::new();

        let first_id = store.begin_request(first.clone());
        let second_id = store.begin_request(second.clone());
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        // Late completion of the first request must not release the second's handle.
        store.finish_request(first_id);
        assert!(store.has_in_flight());
        assert!(store.is_loading());
        store.finish_request(second_id);
        assert!(!store.has_in_flight());
        assert!(!store.is_loading());
    }

    #[test]
    fn stop_generation_signals_and_clears() {
        let mut store = ConversationStore::new();
        assert!(!store.stop_generation());

        let token = CancellationToken::new();
        store.begin_request(token.clone());
        assert!(store.is_loading());

        assert!(store.stop_generation());
        assert!(token.is_cancelled());
        assert!(!store.has_in_flight());
        assert!(!store.is_loading());
    }

    #[test]
    fn mutations_bump_revision() {
        let mut store = ConversationStore::new();
        let rx = store.subscribe();
        let start = *rx.borrow();
        store.set_mode(Mode::Generate);
        store.set_error(Some("boom".to_string()));
        assert_eq!(*rx.borrow(), start + 2);
    }

    #[test]
    fn preferences_exclude_history() {
        let mut store = store_with(&[Framework::Fastapi, Framework::Postgresql]);
        store.set_mode(Mode::Generate);
        store.set_include_docs_context(false);
        store.append_message(NewMessage::user("remember me?"));

        let restored = ConversationStore::from_preferences(&store.preferences());
        assert_eq!(restored.frameworks(), store.frameworks());
        assert_eq!(restored.mode(), Mode::Generate);
        assert!(!restored.include_docs_context());
        assert!(restored.messages().is_empty());
    }
}
