//! Transport client for the documentation backend.
//!
//! Defines the [`Backend`] trait consumed by the orchestrator and the
//! [`HttpBackend`] implementation that talks to the service over HTTP.
//!
//! # Endpoints
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | `GET`  | `/` | [`Backend::info`] |
//! | `GET`  | `/health` | [`Backend::health`] |
//! | `POST` | `/api/chat` | [`Backend::chat`] (JSON) |
//! | `POST` | `/api/chat/upload` | [`Backend::chat`] (multipart, with attachments) |
//! | `POST` | `/api/generate` | [`Backend::generate`] (JSON) |
//! | `POST` | `/api/generate/upload` | [`Backend::generate`] (multipart, with attachments) |
//! | `POST` | `/api/chat/feedback` | [`Backend::feedback`] |
//!
//! # Cancellation
//!
//! Every operation takes an optional [`CancellationToken`]. The HTTP
//! implementation races the request against the token and drops the
//! in-flight request as soon as it is signalled, returning
//! [`TransportError::Cancelled`]. No operation is retried.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::attachments::Attachment;
use crate::config::BackendConfig;
use crate::error::{classify_send_error, classify_status, TransportError};
use crate::models::{FeedbackValue, Framework, HistoryEntry, Source};

// ═══════════════════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════════════════

/// Documentation question. Sent as JSON, or as multipart when
/// `attachments` is non-empty.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub frameworks: Vec<Framework>,
    pub history: Vec<HistoryEntry>,
    #[serde(skip)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub trace_id: Option<String>,
}

/// Code generation request. Sent as JSON, or as multipart when
/// `attachments` is non-empty.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub frameworks: Vec<Framework>,
    pub history: Vec<HistoryEntry>,
    pub include_docs_context: bool,
    #[serde(skip)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerateResponse {
    pub code: String,
    #[serde(default)]
    pub trace_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest {
    pub trace_id: String,
    pub value: FeedbackValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAck {
    pub status: String,
    pub trace_id: String,
}

/// Liveness report from `GET /health`.
///
/// Only `status` is guaranteed; the remaining fields are filled in when the
/// backend reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "healthy")
    }
}

/// Service description from `GET /`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub docs: Option<String>,
    #[serde(default)]
    pub supported_frameworks: Vec<String>,
    #[serde(default)]
    pub version: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// Backend trait
// ═══════════════════════════════════════════════════════════════════════

/// Outbound calls the orchestrator and CLI make against the backend.
///
/// Implemented by [`HttpBackend`] for real use and by scripted fakes in
/// tests.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn info(&self, cancel: Option<&CancellationToken>) -> Result<ServiceInfo, TransportError>;

    async fn health(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<HealthStatus, TransportError>;

    async fn chat(
        &self,
        request: &ChatRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<ChatResponse, TransportError>;

    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<GenerateResponse, TransportError>;

    async fn feedback(
        &self,
        request: &FeedbackRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<FeedbackAck, TransportError>;
}

// ═══════════════════════════════════════════════════════════════════════
// HTTP implementation
// ═══════════════════════════════════════════════════════════════════════

/// [`Backend`] over HTTP with a fixed per-request timeout.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a request, racing it against `cancel`, and decodes the JSON body.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: &'static str,
        path: &'static str,
        request: reqwest::RequestBuilder,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, TransportError> {
        let started = Instant::now();
        tracing::debug!(method, path, "backend request");

        let call = async {
            let response = request.send().await.map_err(|e| classify_send_error(&e))?;
            let status = response.status();

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_status(status, path, &body));
            }

            let bytes = response.bytes().await.map_err(|e| classify_send_error(&e))?;
            serde_json::from_slice::<T>(&bytes)
                .map_err(|e| TransportError::InvalidResponse(e.to_string()))
        };

        let result = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(TransportError::Cancelled),
                    r = call => r,
                }
            }
            None => call.await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::debug!(method, path, elapsed_ms, "backend response"),
            Err(TransportError::Cancelled) => {
                tracing::info!(method, path, elapsed_ms, "backend request cancelled")
            }
            Err(e) => tracing::warn!(
                method,
                path,
                elapsed_ms,
                kind = e.kind(),
                error = %e,
                "backend request failed"
            ),
        }

        result
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn info(&self, cancel: Option<&CancellationToken>) -> Result<ServiceInfo, TransportError> {
        let request = self.client.get(self.url("/"));
        self.execute("GET", "/", request, cancel).await
    }

    async fn health(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<HealthStatus, TransportError> {
        let request = self.client.get(self.url("/health"));
        self.execute("GET", "/health", request, cancel).await
    }

    async fn chat(
        &self,
        request: &ChatRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<ChatResponse, TransportError> {
        tracing::info!(
            frameworks = ?request.frameworks,
            history_len = request.history.len(),
            attachments = request.attachments.len(),
            "documentation query"
        );

        if request.attachments.is_empty() {
            let builder = self.client.post(self.url("/api/chat")).json(request);
            return self.execute("POST", "/api/chat", builder, cancel).await;
        }

        let form = Form::new()
            .text("message", request.message.clone())
            .text("frameworks", encode_json(&request.frameworks)?)
            .text("history", encode_json(&request.history)?);
        let form = attach_files(form, &request.attachments)?;

        let builder = self.client.post(self.url("/api/chat/upload")).multipart(form);
        self.execute("POST", "/api/chat/upload", builder, cancel).await
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<GenerateResponse, TransportError> {
        tracing::info!(
            frameworks = ?request.frameworks,
            history_len = request.history.len(),
            include_docs_context = request.include_docs_context,
            attachments = request.attachments.len(),
            "code generation"
        );

        if request.attachments.is_empty() {
            let builder = self.client.post(self.url("/api/generate")).json(request);
            return self.execute("POST", "/api/generate", builder, cancel).await;
        }

        let form = Form::new()
            .text("prompt", request.prompt.clone())
            .text("frameworks", encode_json(&request.frameworks)?)
            .text("history", encode_json(&request.history)?)
            .text(
                "include_docs_context",
                if request.include_docs_context {
                    "true"
                } else {
                    "false"
                },
            );
        let form = attach_files(form, &request.attachments)?;

        let builder = self
            .client
            .post(self.url("/api/generate/upload"))
            .multipart(form);
        self.execute("POST", "/api/generate/upload", builder, cancel)
            .await
    }

    async fn feedback(
        &self,
        request: &FeedbackRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<FeedbackAck, TransportError> {
        tracing::info!(trace_id = %request.trace_id, value = ?request.value, "feedback");
        let builder = self
            .client
            .post(self.url("/api/chat/feedback"))
            .json(request);
        self.execute("POST", "/api/chat/feedback", builder, cancel)
            .await
    }
}

/// Multipart form fields carry structured values as JSON strings.
fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String, TransportError> {
    serde_json::to_string(value).map_err(|e| TransportError::Encoding(e.to_string()))
}

fn attach_files(mut form: Form, attachments: &[Attachment]) -> Result<Form, TransportError> {
    for attachment in attachments {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.mime_type)
            .map_err(|e| {
                TransportError::Encoding(format!(
                    "invalid attachment {}: {}",
                    attachment.file_name, e
                ))
            })?;
        form = form.part("files", part);
    }
    Ok(form)
}
