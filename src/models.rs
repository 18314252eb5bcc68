//! Core data models used throughout devdocs-chat.
//!
//! These types represent the messages, citations, and selections that flow
//! between the conversation store, the orchestrator, and the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A documentation domain that retrieval can be scoped to.
///
/// The set is closed and must match the namespaces indexed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    React,
    Nextjs,
    Tailwind,
    Fastapi,
    Django,
    Postgresql,
    Typescript,
}

impl Framework {
    pub const ALL: [Framework; 7] = [
        Framework::React,
        Framework::Nextjs,
        Framework::Tailwind,
        Framework::Fastapi,
        Framework::Django,
        Framework::Postgresql,
        Framework::Typescript,
    ];

    /// Wire identifier, as sent in `frameworks[]`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::React => "react",
            Framework::Nextjs => "nextjs",
            Framework::Tailwind => "tailwind",
            Framework::Fastapi => "fastapi",
            Framework::Django => "django",
            Framework::Postgresql => "postgresql",
            Framework::Typescript => "typescript",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Framework::React => "React",
            Framework::Nextjs => "Next.js",
            Framework::Tailwind => "Tailwind CSS",
            Framework::Fastapi => "FastAPI",
            Framework::Django => "Django",
            Framework::Postgresql => "PostgreSQL",
            Framework::Typescript => "TypeScript",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Framework::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == needle || f.display_name().to_lowercase() == needle)
            .ok_or_else(|| {
                format!(
                    "unknown framework '{}'. Expected one of: {}",
                    s,
                    Framework::ALL
                        .iter()
                        .map(|f| f.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Which backend workflow a conversation drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Documentation Q&A with citations.
    #[default]
    Chat,
    /// Code generation, optionally grounded in retrieved docs.
    Generate,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Chat => "chat",
            Mode::Generate => "generate",
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" | "qa" | "ask" => Ok(Mode::Chat),
            "generate" | "gen" | "code" => Ok(Mode::Generate),
            other => Err(format!("unknown mode '{}'. Use chat or generate.", other)),
        }
    }
}

/// Lifecycle of a message's content.
///
/// User messages are always `Complete`. Assistant placeholders start as
/// `Generating` and resolve to exactly one of the other three states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Generating,
    #[default]
    Complete,
    Stopped,
    Failed,
}

/// A retrieval result attached to an assistant answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub text: String,
    pub score: f64,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub url: Option<String>,
    /// Namespace the chunk came from. Free-form: the backend may tag
    /// sources with namespaces outside [`Framework::ALL`].
    #[serde(default)]
    pub framework: Option<String>,
}

/// A single entry in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub sources: Option<Vec<Source>>,
    pub trace_id: Option<String>,
    pub status: MessageStatus,
}

impl Message {
    pub fn is_generating(&self) -> bool {
        self.status == MessageStatus::Generating
    }

    pub fn to_history(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.role,
            content: self.content.clone(),
        }
    }

    pub(crate) fn apply(&mut self, patch: MessagePatch) {
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(sources) = patch.sources {
            self.sources = Some(sources);
        }
        if let Some(trace_id) = patch.trace_id {
            self.trace_id = Some(trace_id);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

/// A message before the store has assigned it an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    pub status: MessageStatus,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            status: MessageStatus::Complete,
        }
    }

    /// Empty assistant entry marked as generating.
    pub fn placeholder() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            status: MessageStatus::Generating,
        }
    }
}

/// Partial update merged into an existing [`Message`]. `None` fields are
/// left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub sources: Option<Vec<Source>>,
    pub trace_id: Option<String>,
    pub status: Option<MessageStatus>,
}

/// The `{role, content}` projection sent to the backend as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// Sentiment attached to a feedback submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackValue {
    Positive,
    Negative,
}

impl FromStr for FeedbackValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" | "up" | "+" => Ok(FeedbackValue::Positive),
            "negative" | "down" | "-" => Ok(FeedbackValue::Negative),
            other => Err(format!(
                "unknown feedback value '{}'. Use positive or negative.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_wire_names_roundtrip() {
        for f in Framework::ALL {
            let json = serde_json::to_string(&f).unwrap();
            assert_eq!(json, format!("\"{}\"", f.as_str()));
            assert_eq!(f.as_str().parse::<Framework>().unwrap(), f);
        }
    }

    #[test]
    fn framework_parses_display_names_case_insensitively() {
        assert_eq!("Next.js".parse::<Framework>().unwrap(), Framework::Nextjs);
        assert_eq!(" REACT ".parse::<Framework>().unwrap(), Framework::React);
        assert!("svelte".parse::<Framework>().is_err());
    }

    #[test]
    fn source_tolerates_missing_optional_fields() {
        let src: Source =
            serde_json::from_str(r#"{"id":"s1","text":"snippet","score":0.42}"#).unwrap();
        assert!(src.metadata.is_empty());
        assert!(src.url.is_none());
        assert!(src.framework.is_none());
    }

    #[test]
    fn patch_only_touches_provided_fields() {
        let mut msg = Message {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: String::new(),
            timestamp: Utc::now(),
            sources: None,
            trace_id: Some("t-1".to_string()),
            status: MessageStatus::Generating,
        };
        msg.apply(MessagePatch {
            content: Some("done".to_string()),
            status: Some(MessageStatus::Complete),
            ..Default::default()
        });
        assert_eq!(msg.content, "done");
        assert_eq!(msg.trace_id.as_deref(), Some("t-1"));
        assert!(!msg.is_generating());
    }

    #[test]
    fn feedback_aliases() {
        assert_eq!("up".parse::<FeedbackValue>().unwrap(), FeedbackValue::Positive);
        assert_eq!("Negative".parse::<FeedbackValue>().unwrap(), FeedbackValue::Negative);
        assert!("meh".parse::<FeedbackValue>().is_err());
    }
}
