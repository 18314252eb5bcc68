//! # DevDocs Chat
//!
//! A terminal client for a retrieval-augmented documentation assistant.
//!
//! The backend answers questions about a fixed set of web frameworks
//! (React, Next.js, Tailwind CSS, FastAPI, Django, PostgreSQL, TypeScript)
//! and generates code grounded in their docs. This crate holds the client
//! side: a typed transport, a conversation store, and the orchestration
//! that keeps the two consistent across cancellation and failure.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ CLI/REPL │──▶│ Orchestrator │──▶│   Backend    │──▶│  HTTP    │
//! │ (devdocs)│   │ chat|generate│   │ (HttpBackend)│   │ FastAPI  │
//! └────┬─────┘   └──────┬───────┘   └──────────────┘   └──────────┘
//!      │                │ two-phase write
//!      ▼                ▼
//! ┌──────────┐   ┌──────────────┐
//! │  render  │◀──│ SharedStore  │──▶ preferences.json
//! └──────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! devdocs health
//! devdocs ask "How do I use React hooks?" --framework react
//! devdocs generate "Create a login form" --framework react --framework tailwind
//! devdocs chat
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Messages, sources, frameworks, modes |
//! | [`error`] | Transport error taxonomy |
//! | [`client`] | Backend trait and HTTP implementation |
//! | [`attachments`] | File attachment loading and limits |
//! | [`store`] | Conversation state and stop handle |
//! | [`preferences`] | Persisted user selections |
//! | [`orchestrator`] | Submit / stop / reconcile |
//! | [`session`] | Wiring from config to orchestrators |
//! | [`repl`] | Interactive chat loop |
//! | [`render`] | Terminal and JSON output |
//! | [`config`] | TOML configuration |
//! | [`logging`] | tracing subscriber setup |

pub mod attachments;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod preferences;
pub mod render;
pub mod repl;
pub mod session;
pub mod store;
