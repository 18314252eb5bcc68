//! In-process stand-in for the documentation service.
//!
//! Routes mirror the real backend. A few magic inputs trigger failure
//! paths: `invalid` → 422, `boom` → 500, `slow` → a 30 s stall.

#![allow(dead_code)]

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// One request as the mock saw it. Multipart forms are flattened into a
/// JSON object with the uploaded file names under `files`.
#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct MockState {
    pub hits: Arc<Mutex<Vec<Hit>>>,
    /// Signalled when a `slow` request arrives.
    pub stalled: Arc<Notify>,
}

impl MockState {
    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    fn record(&self, path: &str, body: Value) {
        self.hits.lock().unwrap().push(Hit {
            path: path.to_string(),
            body,
        });
    }
}

pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: MockState,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

pub async fn spawn() -> MockBackend {
    let state = MockState::default();
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/chat/upload", post(chat_upload))
        .route("/api/generate", post(generate))
        .route("/api/generate/upload", post(generate_upload))
        .route("/api/chat/feedback", post(feedback))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { addr, state }
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "DevDocs AI Assistant API",
        "docs": "/docs",
        "supported_frameworks": ["react", "nextjs", "tailwind", "fastapi", "django", "postgresql", "typescript"],
        "version": "1.0.0"
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": "1.0.0",
        "service": "devdocs-backend",
        "timestamp": "2026-10-16T12:00:00Z"
    }))
}

async fn misbehave(state: &MockState, text: &str) -> Result<(), (StatusCode, Json<Value>)> {
    match text {
        "invalid" => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"loc": ["body", "frameworks"], "msg": "field required"}]})),
        )),
        "boom" => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "model exploded"})),
        )),
        "slow" => {
            state.stalled.notify_one();
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
        _ => Ok(()),
    }
}

fn answer(body: &Value) -> Value {
    let question = body["message"].as_str().unwrap_or_default();
    json!({
        "response": format!("Answer to: {}", question),
        "sources": [
            {
                "id": "react-hooks-0",
                "text": "Hooks let you use state and other React features without writing a class.",
                "score": 0.92,
                "metadata": {"section": "hooks"},
                "url": "https://react.dev/reference/react/hooks",
                "framework": "react"
            },
            {
                "id": "react-state-3",
                "text": "useState is a React Hook that lets you add a state variable.",
                "score": 0.81,
                "framework": "react"
            }
        ],
        "trace_id": "trace-chat-1"
    })
}

fn code(body: &Value) -> Value {
    let prompt = body["prompt"].as_str().unwrap_or_default();
    json!({
        "code": format!("// {}\nexport function LoginForm() {{ return null; }}", prompt),
        "trace_id": "trace-gen-1"
    })
}

async fn chat(State(state): State<MockState>, Json(body): Json<Value>) -> Reply {
    state.record("/api/chat", body.clone());
    misbehave(&state, body["message"].as_str().unwrap_or_default()).await?;
    Ok(Json(answer(&body)))
}

async fn generate(State(state): State<MockState>, Json(body): Json<Value>) -> Reply {
    state.record("/api/generate", body.clone());
    misbehave(&state, body["prompt"].as_str().unwrap_or_default()).await?;
    Ok(Json(code(&body)))
}

async fn read_form(mut multipart: Multipart) -> Value {
    let mut fields = serde_json::Map::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "files" {
            files.push(Value::String(field.file_name().unwrap_or_default().to_string()));
            let _ = field.bytes().await.unwrap();
        } else {
            fields.insert(name, Value::String(field.text().await.unwrap()));
        }
    }
    fields.insert("files".to_string(), Value::Array(files));
    Value::Object(fields)
}

async fn chat_upload(State(state): State<MockState>, multipart: Multipart) -> Reply {
    let body = read_form(multipart).await;
    state.record("/api/chat/upload", body.clone());
    Ok(Json(answer(&body)))
}

async fn generate_upload(State(state): State<MockState>, multipart: Multipart) -> Reply {
    let body = read_form(multipart).await;
    state.record("/api/generate/upload", body.clone());
    Ok(Json(code(&body)))
}

async fn feedback(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.record("/api/chat/feedback", body.clone());
    Json(json!({
        "status": "recorded",
        "trace_id": body["trace_id"].clone()
    }))
}
