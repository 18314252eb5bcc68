//! Typed failures raised by the transport client.
//!
//! Every backend call resolves to either a decoded response or one
//! [`TransportError`]. The orchestrator only needs to tell
//! [`TransportError::Cancelled`] apart from everything else; the remaining
//! variants exist so the stored error detail says what went wrong.
//!
//! | Variant | Trigger |
//! |---------|---------|
//! | `Validation` | HTTP 422 |
//! | `Server` | HTTP 500 |
//! | `Routing` | HTTP 404 |
//! | `Connectivity` | no response, connect failure, or timeout |
//! | `Cancelled` | the caller's token was signalled |
//! | `UnexpectedStatus` | any other non-2xx status |
//! | `InvalidResponse` | 2xx with a body that does not decode |
//! | `Encoding` | the request could not be built locally; nothing was sent |

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Endpoint not found: {0}")]
    Routing(String),

    #[error("Network error: unable to reach the backend ({0})")]
    Connectivity(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Unexpected response status {status}: {detail}")]
    UnexpectedStatus { status: u16, detail: String },

    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    #[error("Could not encode request: {0}")]
    Encoding(String),
}

impl TransportError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }

    /// Short machine-readable label, used in logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Validation(_) => "validation",
            TransportError::Server(_) => "server",
            TransportError::Routing(_) => "routing",
            TransportError::Connectivity(_) => "connectivity",
            TransportError::Cancelled => "cancelled",
            TransportError::UnexpectedStatus { .. } => "unexpected_status",
            TransportError::InvalidResponse(_) => "invalid_response",
            TransportError::Encoding(_) => "encoding",
        }
    }
}

/// Maps a non-success response to its error category.
///
/// `path` is the request path, reported for routing failures. `body` is the
/// raw response text; FastAPI-style `{"detail": ...}` bodies are unwrapped.
pub fn classify_status(status: StatusCode, path: &str, body: &str) -> TransportError {
    let detail = extract_detail(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("no detail provided")
            .to_string()
    });

    match status {
        StatusCode::UNPROCESSABLE_ENTITY => TransportError::Validation(detail),
        StatusCode::INTERNAL_SERVER_ERROR => TransportError::Server(detail),
        StatusCode::NOT_FOUND => TransportError::Routing(path.to_string()),
        other => TransportError::UnexpectedStatus {
            status: other.as_u16(),
            detail,
        },
    }
}

/// Maps a failed send (no usable response) to its error category.
pub fn classify_send_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Connectivity(format!("request timed out: {}", err))
    } else if err.is_decode() {
        TransportError::InvalidResponse(err.to_string())
    } else {
        TransportError::Connectivity(err.to_string())
    }
}

/// Pulls a readable message out of an error body.
///
/// Handles `{"detail": "..."}`, FastAPI validation lists
/// (`{"detail": [{"loc": [...], "msg": "..."}]}`), and plain text.
fn extract_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let json: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => return Some(trimmed.to_string()),
    };

    match json.get("detail") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Array(items)) => {
            let msgs: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let msg = item.get("msg")?.as_str()?;
                    let loc = item
                        .get("loc")
                        .and_then(|l| l.as_array())
                        .map(|parts| {
                            parts
                                .iter()
                                .map(|p| match p {
                                    serde_json::Value::String(s) => s.clone(),
                                    other => other.to_string(),
                                })
                                .collect::<Vec<_>>()
                                .join(".")
                        });
                    Some(match loc {
                        Some(loc) if !loc.is_empty() => format!("{}: {}", loc, msg),
                        _ => msg.to_string(),
                    })
                })
                .collect();
            if msgs.is_empty() {
                Some(json["detail"].to_string())
            } else {
                Some(msgs.join("; "))
            }
        }
        Some(other) => Some(other.to_string()),
        None => Some(trimmed.to_string()),
    }
}
