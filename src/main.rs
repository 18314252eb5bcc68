//! # DevDocs CLI (`devdocs`)
//!
//! Command-line front end for the documentation assistant.
//!
//! ## Usage
//!
//! ```bash
//! devdocs --config ./config/devdocs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `devdocs info` | Show service banner and supported frameworks |
//! | `devdocs health` | Check backend liveness |
//! | `devdocs ask "<question>"` | Ask a documentation question |
//! | `devdocs generate "<prompt>"` | Generate code from a description |
//! | `devdocs feedback <trace> up\|down` | Rate an answer |
//! | `devdocs chat` | Interactive session |
//! | `devdocs frameworks` | Show or change the framework selection |
//! | `devdocs completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! # Ask with a narrowed framework set
//! devdocs ask "How do I use React hooks?" --framework react
//!
//! # Generate code and write it to a file
//! devdocs generate "Create a login form" -f react -f tailwind --out LoginForm.tsx
//!
//! # Attach a file to a question
//! devdocs ask "Why does this fail?" --attach ./app/main.py
//!
//! # Machine-readable output
//! devdocs ask "What is a server component?" --output json
//! ```

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

use devdocs_chat::config::{self, Config};
use devdocs_chat::logging::{self, LogFormat};
use devdocs_chat::models::{FeedbackValue, Framework, Mode};
use devdocs_chat::orchestrator::SubmitOutcome;
use devdocs_chat::render::{self, OutputMode};
use devdocs_chat::repl;
use devdocs_chat::session::Session;

const DEFAULT_CONFIG: &str = "./config/devdocs.toml";

/// DevDocs — ask framework documentation questions and generate code from
/// the terminal.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/devdocs.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "devdocs",
    about = "DevDocs — documentation Q&A and code generation for modern web frameworks",
    version,
    long_about = "DevDocs talks to a retrieval-augmented documentation service. Questions are \
    answered from indexed framework docs with citations; code generation can optionally be \
    grounded in the same docs."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/devdocs.toml`. Built-in defaults apply when the
    /// default file does not exist; an explicit path must exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding `[backend] url`.
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Enable debug logging for this crate (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log line format on stderr.
    #[arg(long, global = true, default_value = "pretty", value_parser = ["pretty", "json"])]
    log_format: String,

    /// Output format on stdout. Defaults to `human` on a terminal and
    /// `json` otherwise.
    #[arg(long, global = true, value_parser = ["human", "json"])]
    output: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Show the service banner, version, and supported frameworks.
    Info,

    /// Check that the backend is up.
    ///
    /// Exits non-zero when the service is unreachable or reports a status
    /// other than `ok`/`healthy`.
    Health,

    /// Ask a documentation question.
    ///
    /// The answer is printed with its cited sources and a trace id that can
    /// be passed to `devdocs feedback`.
    Ask {
        /// The question.
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Framework to search (repeatable). Defaults to the saved selection.
        #[arg(short, long = "framework")]
        frameworks: Vec<Framework>,

        /// File to attach (repeatable).
        #[arg(short, long = "attach")]
        attachments: Vec<PathBuf>,
    },

    /// Generate code from a natural-language description.
    Generate {
        /// What to build.
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,

        /// Target framework (repeatable). Defaults to the saved selection.
        #[arg(short, long = "framework")]
        frameworks: Vec<Framework>,

        /// File to attach (repeatable).
        #[arg(short, long = "attach")]
        attachments: Vec<PathBuf>,

        /// Do not ground generation in retrieved documentation.
        #[arg(long)]
        no_docs_context: bool,

        /// Write the generated code to this file as well as stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Rate an answer by its trace id.
    Feedback {
        /// Trace id printed with the answer.
        trace_id: String,

        /// `up` or `down`.
        value: FeedbackValue,

        /// Optional free-text comment.
        #[arg(long)]
        comment: Option<String>,
    },

    /// Start an interactive session.
    ///
    /// Type `/help` inside the session for commands. Ctrl-C stops a pending
    /// answer; Ctrl-C at the prompt or Ctrl-D exits.
    Chat {
        /// Start in this mode (`chat` or `generate`).
        #[arg(long)]
        mode: Option<Mode>,
    },

    /// Show the framework selection, or replace it with `--select`.
    Frameworks {
        /// Framework to select (repeatable). Replaces and saves the selection.
        #[arg(long = "select")]
        select: Vec<Framework>,
    },

    /// Print shell completions to stdout.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format = LogFormat::parse(&cli.log_format).unwrap_or(LogFormat::Pretty);
    logging::init(cli.verbose, log_format);

    let output = cli
        .output
        .as_deref()
        .and_then(OutputMode::parse)
        .unwrap_or_else(OutputMode::default_for_tty);

    // Commands that don't need configuration
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "devdocs", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = load(&cli)?;
    let session = Session::from_config(&cfg)?;
    tracing::debug!(backend = %cfg.backend.url, "session ready");

    match cli.command {
        Commands::Info => {
            let info = session.backend().info(None).await?;
            render::print_info(&info, output);
        }
        Commands::Health => {
            let health = session.backend().health(None).await?;
            render::print_health(&health, output);
            if !health.is_healthy() {
                bail!("backend reported status '{}'", health.status);
            }
        }
        Commands::Ask {
            question,
            frameworks,
            attachments,
        } => {
            apply_overrides(&session, &frameworks, None);
            run_once(
                &session,
                Mode::Chat,
                &question.join(" "),
                &attachments,
                None,
                output,
            )
            .await?;
        }
        Commands::Generate {
            prompt,
            frameworks,
            attachments,
            no_docs_context,
            out,
        } => {
            let include = if no_docs_context { Some(false) } else { None };
            apply_overrides(&session, &frameworks, include);
            run_once(
                &session,
                Mode::Generate,
                &prompt.join(" "),
                &attachments,
                out.as_deref(),
                output,
            )
            .await?;
        }
        Commands::Feedback {
            trace_id,
            value,
            comment,
        } => {
            let ack = session
                .current()
                .send_feedback(&trace_id, value, comment)
                .await?;
            render::print_feedback_ack(&ack, output);
        }
        Commands::Chat { mode } => {
            if let Some(mode) = mode {
                session.store().lock().set_mode(mode);
            }
            repl::run(&session, output).await?;
        }
        Commands::Frameworks { select } => {
            if !select.is_empty() {
                if !session.store().lock().set_frameworks(select) {
                    bail!("at least one framework must be selected");
                }
                session.persist()?;
            }
            render::print_selection(&session.store().lock(), output);
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

fn load(cli: &Cli) -> Result<Config> {
    let (path, allow_missing) = match &cli.config {
        Some(p) => (p.clone(), false),
        None => (PathBuf::from(DEFAULT_CONFIG), true),
    };
    let cfg = config::load_config(&path, allow_missing)?;
    match &cli.backend_url {
        Some(url) => cfg.with_backend_url(url),
        None => Ok(cfg),
    }
}

/// One-shot overrides for `ask`/`generate`. These are not persisted.
fn apply_overrides(session: &Session, frameworks: &[Framework], include_docs: Option<bool>) {
    let mut store = session.store().lock();
    if !frameworks.is_empty() {
        store.set_frameworks(frameworks.iter().copied());
    }
    if let Some(include) = include_docs {
        store.set_include_docs_context(include);
    }
}

async fn run_once(
    session: &Session,
    mode: Mode,
    text: &str,
    attachment_paths: &[PathBuf],
    out: Option<&Path>,
    output: OutputMode,
) -> Result<()> {
    // A rejected file stops here: nothing is appended and nothing is sent.
    let files = session.load_attachments(attachment_paths)?;

    let outcome = session.submit_interruptible(mode, text, files).await?;

    let store = session.store().lock();
    let last = store.last_message();
    match &outcome {
        SubmitOutcome::Rejected => bail!("nothing to send: the {} is empty", noun(mode)),
        SubmitOutcome::Completed { .. } => {
            if let Some(message) = last {
                render::print_message(message, output);
                if let Some(path) = out {
                    std::fs::write(path, &message.content)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Wrote {} bytes to {}", message.content.len(), path.display());
                }
            }
        }
        SubmitOutcome::Stopped { .. } => {
            if let Some(message) = last {
                render::print_message(message, output);
            }
        }
        SubmitOutcome::Failed { error, .. } => {
            if let Some(message) = last {
                render::print_message(message, output);
            }
            bail!("{}", error);
        }
    }
    Ok(())
}

fn noun(mode: Mode) -> &'static str {
    match mode {
        Mode::Chat => "question",
        Mode::Generate => "prompt",
    }
}
