//! Terminal output for messages, citations, and service status.
//!
//! Two output modes: human-readable text, or one JSON object per line for
//! scripting. The default is human when stdout is a TTY, JSON otherwise.

use serde::Serialize;

use crate::client::{FeedbackAck, HealthStatus, ServiceInfo};
use crate::models::{Framework, Message, MessageStatus, Mode, Role, Source};
use crate::store::ConversationStore;

/// Maximum characters of a citation snippet shown in human mode.
const SNIPPET_CHARS: usize = 160;

/// Output mode for the CLI: human text or JSON lines.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    /// Default: human output when stdout is a TTY, otherwise JSON.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stdout) {
            OutputMode::Human
        } else {
            OutputMode::Json
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "human" | "text" => Some(OutputMode::Human),
            "json" => Some(OutputMode::Json),
            _ => None,
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => eprintln!("Error: could not encode output: {}", e),
    }
}

/// Prints a single conversation message.
pub fn print_message(message: &Message, mode: OutputMode) {
    if mode == OutputMode::Json {
        print_json(message);
        return;
    }

    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let tag = match message.status {
        MessageStatus::Generating => " (generating…)",
        MessageStatus::Stopped => " (stopped)",
        MessageStatus::Failed => " (failed)",
        MessageStatus::Complete => "",
    };

    println!("{}{}>", who, tag);
    if !message.content.is_empty() {
        println!("{}", message.content);
    }

    if let Some(sources) = message.sources.as_deref() {
        if !sources.is_empty() {
            println!();
            println!("Sources:");
            for (i, source) in sources.iter().enumerate() {
                print_source(i + 1, source);
            }
        }
    }
    if let Some(trace_id) = &message.trace_id {
        println!("trace: {}", trace_id);
    }
    println!();
}

fn print_source(index: usize, source: &Source) {
    let framework = source.framework.as_deref().unwrap_or("-");
    match &source.url {
        Some(url) => println!("  [{}] {} · {:.2} · {}", index, framework, source.score, url),
        None => println!("  [{}] {} · {:.2} · {}", index, framework, source.score, source.id),
    }
    let snippet = snippet(&source.text);
    if !snippet.is_empty() {
        println!("      {}", snippet);
    }
}

/// First line of `text`, cut to [`SNIPPET_CHARS`] characters.
fn snippet(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if line.chars().count() > SNIPPET_CHARS {
        let cut: String = line.chars().take(SNIPPET_CHARS).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}

/// Prints the store's error slot, if set, to stderr.
pub fn print_error_slot(store: &ConversationStore) {
    if let Some(err) = store.error() {
        eprintln!("error: {}", err);
    }
}

pub fn print_health(health: &HealthStatus, mode: OutputMode) {
    if mode == OutputMode::Json {
        print_json(health);
        return;
    }
    println!("status:    {}", health.status);
    if let Some(v) = &health.version {
        println!("version:   {}", v);
    }
    if let Some(s) = &health.service {
        println!("service:   {}", s);
    }
    if let Some(t) = &health.timestamp {
        println!("timestamp: {}", t);
    }
}

pub fn print_info(info: &ServiceInfo, mode: OutputMode) {
    if mode == OutputMode::Json {
        print_json(info);
        return;
    }
    println!("{}", info.message);
    if let Some(v) = &info.version {
        println!("version:    {}", v);
    }
    if let Some(d) = &info.docs {
        println!("docs:       {}", d);
    }
    if !info.supported_frameworks.is_empty() {
        println!("frameworks: {}", info.supported_frameworks.join(", "));
    }
}

pub fn print_feedback_ack(ack: &FeedbackAck, mode: OutputMode) {
    if mode == OutputMode::Json {
        print_json(ack);
        return;
    }
    println!("Feedback recorded for trace {} ({}).", ack.trace_id, ack.status);
}

#[derive(Serialize)]
struct SelectionView<'a> {
    mode: Mode,
    include_docs_context: bool,
    frameworks: Vec<FrameworkView<'a>>,
}

#[derive(Serialize)]
struct FrameworkView<'a> {
    id: &'a str,
    name: &'a str,
    selected: bool,
}

/// Prints the closed framework set, marking the current selection.
pub fn print_selection(store: &ConversationStore, mode: OutputMode) {
    let frameworks: Vec<FrameworkView> = Framework::ALL
        .iter()
        .map(|f| FrameworkView {
            id: f.as_str(),
            name: f.display_name(),
            selected: store.frameworks().contains(f),
        })
        .collect();

    if mode == OutputMode::Json {
        print_json(&SelectionView {
            mode: store.mode(),
            include_docs_context: store.include_docs_context(),
            frameworks,
        });
        return;
    }

    println!("{:<4} {:<12} NAME", "SEL", "ID");
    for f in &frameworks {
        let mark = if f.selected { "[x]" } else { "[ ]" };
        println!("{:<4} {:<12} {}", mark, f.id, f.name);
    }
    println!();
    println!("mode: {}", store.mode().as_str());
    println!(
        "docs context (generate mode): {}",
        if store.include_docs_context() { "on" } else { "off" }
    );
}
