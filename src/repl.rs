//! Interactive chat loop.
//!
//! Lines starting with `/` are commands; anything else is submitted through
//! the orchestrator for the current mode. Ctrl-C while an answer is pending
//! stops it; Ctrl-C at the prompt, Ctrl-D, or `/quit` leaves the loop.
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/mode chat\|generate` | Switch orchestrator |
//! | `/toggle <framework>` | Add or remove a framework (the last one cannot be removed) |
//! | `/frameworks` | Show the selection |
//! | `/context on\|off` | Include retrieved docs in code generation |
//! | `/attach <path>` | Queue a file for the next submission |
//! | `/clear` | Stop any request and clear the history |
//! | `/feedback up\|down [comment]` | Rate the latest answer |
//! | `/help`, `/quit` | |

use anyhow::Result;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::attachments::Attachment;
use crate::models::{FeedbackValue, Framework, Mode};
use crate::render::{self, OutputMode};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Submit(String),
    Mode(Mode),
    Toggle(Framework),
    Frameworks,
    Context(bool),
    Attach(PathBuf),
    Clear,
    Feedback {
        value: FeedbackValue,
        comment: Option<String>,
    },
    Help,
    Quit,
    /// A malformed command, with the message to show.
    Invalid(String),
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<ReplCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(ReplCommand::Submit(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((n, a)) => (n, a.trim()),
        None => (rest, ""),
    };

    let cmd = match name {
        "mode" => match arg.parse::<Mode>() {
            Ok(m) => ReplCommand::Mode(m),
            Err(e) => ReplCommand::Invalid(e),
        },
        "toggle" => match arg.parse::<Framework>() {
            Ok(f) => ReplCommand::Toggle(f),
            Err(e) => ReplCommand::Invalid(e),
        },
        "frameworks" => ReplCommand::Frameworks,
        "context" => match arg {
            "on" | "true" | "yes" => ReplCommand::Context(true),
            "off" | "false" | "no" => ReplCommand::Context(false),
            _ => ReplCommand::Invalid("usage: /context on|off".to_string()),
        },
        "attach" if !arg.is_empty() => ReplCommand::Attach(PathBuf::from(arg)),
        "attach" => ReplCommand::Invalid("usage: /attach <path>".to_string()),
        "clear" => ReplCommand::Clear,
        "feedback" => {
            let (value, comment) = match arg.split_once(char::is_whitespace) {
                Some((v, c)) => (v, Some(c.trim().to_string())),
                None => (arg, None),
            };
            match value.parse::<FeedbackValue>() {
                Ok(value) => ReplCommand::Feedback { value, comment },
                Err(e) => ReplCommand::Invalid(e),
            }
        }
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => ReplCommand::Invalid(format!("unknown command /{}. Try /help.", other)),
    };
    Some(cmd)
}

const HELP: &str = "\
Type a question (chat mode) or a request (generate mode) and press Enter.
  /mode chat|generate        switch mode
  /toggle <framework>        add or remove a framework
  /frameworks                show the current selection
  /context on|off            include docs context when generating code
  /attach <path>             attach a file to the next message
  /clear                     clear the conversation
  /feedback up|down [text]   rate the latest answer
  /quit                      exit
Ctrl-C stops a pending answer; at the prompt it ends the session.";

/// Runs the interactive loop on stdin until `/quit`, end of input, or
/// Ctrl-C at the prompt.
pub async fn run(session: &Session, output: OutputMode) -> Result<()> {
    run_with(
        session,
        output,
        BufReader::new(tokio::io::stdin()),
        tokio::signal::ctrl_c,
    )
    .await
}

/// The loop behind [`run`], reading from `input`. `interrupt` is awaited
/// alongside each prompt; when it fires the session ends.
pub async fn run_with<R, I, F>(
    session: &Session,
    output: OutputMode,
    input: R,
    mut interrupt: I,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    I: FnMut() -> F,
    F: Future<Output = std::io::Result<()>>,
{
    let mut lines = input.lines();
    let mut pending: Vec<Attachment> = Vec::new();

    if output == OutputMode::Human {
        println!("devdocs chat. /help for commands.");
    }

    loop {
        if output == OutputMode::Human {
            print_prompt(session, pending.len());
        }

        let next = tokio::select! {
            line = lines.next_line() => line?,
            _ = interrupt() => {
                tracing::debug!("interrupt at prompt, leaving session");
                if output == OutputMode::Human {
                    println!();
                }
                break;
            }
        };
        let Some(line) = next else {
            break;
        };
        let Some(cmd) = parse_line(&line) else {
            continue;
        };

        match cmd {
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Invalid(msg) => eprintln!("{}", msg),
            ReplCommand::Mode(mode) => {
                session.store().lock().set_mode(mode);
                session.persist()?;
                println!("mode: {}", mode.as_str());
            }
            ReplCommand::Toggle(f) => {
                let accepted = session.store().lock().toggle_framework(f);
                if accepted {
                    session.persist()?;
                } else {
                    eprintln!("At least one framework must stay selected.");
                }
            }
            ReplCommand::Frameworks => render::print_selection(&session.store().lock(), output),
            ReplCommand::Context(on) => {
                session.store().lock().set_include_docs_context(on);
                session.persist()?;
                println!("docs context: {}", if on { "on" } else { "off" });
            }
            ReplCommand::Attach(path) => match Attachment::from_path(&path, session.policy()) {
                Ok(file) => {
                    println!("attached {} ({} bytes)", file.file_name, file.bytes.len());
                    pending.push(file);
                }
                Err(e) => eprintln!("{}", e),
            },
            ReplCommand::Clear => {
                let mut store = session.store().lock();
                store.stop_generation();
                store.clear();
                pending.clear();
            }
            ReplCommand::Feedback { value, comment } => {
                let trace_id = session.store().lock().latest_trace_id().map(str::to_string);
                match trace_id {
                    Some(trace_id) => {
                        match session
                            .current()
                            .send_feedback(&trace_id, value, comment)
                            .await
                        {
                            Ok(ack) => render::print_feedback_ack(&ack, output),
                            Err(e) => eprintln!("error: {}", e),
                        }
                    }
                    None => eprintln!("No answer to rate yet."),
                }
            }
            ReplCommand::Submit(text) => {
                let mode = session.store().lock().mode();
                let files = std::mem::take(&mut pending);
                session.submit_interruptible(mode, &text, files).await?;

                let store = session.store().lock();
                if let Some(last) = store.last_message() {
                    render::print_message(last, output);
                }
                render::print_error_slot(&store);
            }
        }
    }

    session.persist()?;
    Ok(())
}

fn print_prompt(session: &Session, pending: usize) {
    let store = session.store().lock();
    let frameworks: Vec<&str> = store.frameworks().iter().map(|f| f.as_str()).collect();
    let attach = if pending > 0 {
        format!(" +{} file(s)", pending)
    } else {
        String::new()
    };
    print!("[{} {}{}]> ", store.mode().as_str(), frameworks.join(","), attach);
    let _ = std::io::stdout().flush();
}
