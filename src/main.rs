//! # NotionAtlas CLI (`atlas`)
//!
//! The `atlas` binary is the primary interface for NotionAtlas. It provides
//! commands for one-shot questions, interactive chat sessions, and starting
//! the browser chat server.
//!
//! ## Usage
//!
//! ```bash
//! atlas --config ./config/atlas.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `atlas ask "<question>"` | Run one retrieval-augmented turn and print the answer |
//! | `atlas chat` | Interactive chat loop (one session per process) |
//! | `atlas serve` | Start the HTTP server with the browser chat page |
//!
//! Secrets are read from the environment: `LLAMA_API_KEY` (required),
//! `QDRANT_API_KEY` (optional), `OPENAI_API_KEY` (only for the `openai`
//! embedding provider).

mod assemble;
mod chat;
mod completion;
mod config;
mod embedding;
mod index;
mod models;
mod server;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::chat::ChatEngine;

/// NotionAtlas CLI — a retrieval-augmented chat assistant for Notion
/// workspace knowledge bases.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/atlas.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "atlas",
    about = "NotionAtlas — AI semantic search & RAG assistant for Notion workspaces",
    version,
    long_about = "NotionAtlas answers natural-language questions against a personal knowledge \
    base extracted from a Notion workspace. Each turn embeds the query, retrieves the most \
    similar stored chunks from a vector index, and forwards the assembled prompt to a hosted \
    chat-completion endpoint."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/atlas.toml`. Completion endpoint, embedding
    /// provider, vector index, and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/atlas.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer.
    ///
    /// Runs one full turn (embed, retrieve, complete) against a fresh
    /// session and exits.
    Ask {
        /// The question to ask.
        question: String,
    },

    /// Start an interactive chat session.
    ///
    /// Reads questions from stdin until EOF. Conversation history
    /// accumulates for the lifetime of the process and is carried into
    /// every prompt.
    Chat,

    /// Start the HTTP server with the browser chat page.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// single-page chat UI plus the JSON chat API.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ask { question } => {
            let engine = ChatEngine::from_config(&cfg)?;
            let mut session = engine.new_session();
            let turn = engine.run_turn(&mut session, &question).await?;
            if turn.is_error {
                eprintln!("{}", turn.content);
                std::process::exit(1);
            }
            println!("{}", turn.content);
        }
        Commands::Chat => {
            run_chat_loop(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

/// Interactive REPL: one session for the process lifetime, one turn at a
/// time. The prompt is only printed when stdin is a terminal so piped
/// input stays clean.
async fn run_chat_loop(cfg: &config::Config) -> Result<()> {
    let engine = ChatEngine::from_config(cfg)?;
    let mut session = engine.new_session();
    let interactive = atty::is(atty::Stream::Stdin);

    if interactive {
        println!("NotionAtlas — ask anything about your Notion workspace (Ctrl-D to quit).");
    }

    let stdin = std::io::stdin();
    loop {
        if interactive {
            print!("you> ");
            std::io::stdout().flush()?;
        }

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let question = line.trim_end_matches(['\n', '\r']);
        if question.trim().is_empty() {
            continue;
        }

        if interactive {
            println!("… thinking");
        }
        let turn = engine.run_turn(&mut session, question).await?;
        if turn.is_error {
            eprintln!("atlas> {}", turn.content);
        } else {
            println!("atlas> {}", turn.content);
        }
    }

    Ok(())
}
