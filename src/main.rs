//! # docchat CLI
//!
//! Terminal interface for chatting with a document. Three commands:
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat ask <file> <question>` | One-shot: index the file, ask, print the answer |
//! | `docchat chat [file]` | Interactive loop with history |
//! | `docchat serve` | Start the JSON HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! export GEMINI_API_KEY=...
//!
//! docchat ask handbook.pdf "When are hostel fees due?"
//!
//! # Interactive; /load swaps the document mid-conversation
//! docchat chat handbook.pdf
//!
//! docchat serve --config ./config/docchat.toml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docchat::config::{self, Config};
use docchat::generate::{GeminiClient, Generator};
use docchat::server;
use docchat::session::{AskOptions, Session};

/// docchat — chat with a single text or PDF document, grounded by TF-IDF
/// retrieval and answered by Gemini.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; a missing file falls back to the built-in defaults. The Gemini
/// API key is read from the environment (default `GEMINI_API_KEY`).
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "Chat with a single document — TF-IDF retrieval, answered by Gemini",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a file and answer one question.
    Ask {
        /// Path to a `.txt` or `.pdf` file.
        file: PathBuf,
        /// The question to ask about it.
        question: String,
        /// Also print the retrieved chunks with their similarity scores.
        #[arg(long)]
        show_context: bool,
    },

    /// Interactive chat loop.
    ///
    /// Reads questions from stdin. `/load <path>` replaces the document,
    /// `/history` prints the transcript most-recent-first, `/quit` exits.
    Chat {
        /// Document to load on startup.
        file: Option<PathBuf>,
    },

    /// Start the JSON HTTP API.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ask {
            file,
            question,
            show_context,
        } => run_ask(&config, &file, &question, show_context).await,
        Commands::Chat { file } => run_chat(&config, file.as_deref()).await,
        Commands::Serve => {
            let generator: Arc<dyn Generator> = Arc::new(GeminiClient::new(&config.generation)?);
            server::run_server(&config, generator).await
        }
    }
}

fn ask_options(config: &Config) -> AskOptions {
    AskOptions {
        top_k: config.retrieval.top_k,
        history_turns: config.retrieval.history_turns,
    }
}

fn load_file(session: &mut Session, config: &Config, path: &Path) -> Result<()> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.txt");
    let doc = session.load_document(name, &bytes, config.chunking.chunk_size)?;
    println!(
        "Indexed {} ({} chunks, sha256 {})",
        doc.name(),
        doc.chunk_count(),
        &doc.fingerprint()[..12]
    );
    Ok(())
}

async fn run_ask(config: &Config, file: &Path, question: &str, show_context: bool) -> Result<()> {
    let generator = GeminiClient::new(&config.generation)?;
    let mut session = Session::new();
    load_file(&mut session, config, file)?;

    let answer = session
        .ask(&generator, question, ask_options(config))
        .await?;

    if show_context {
        for chunk in &answer.context {
            println!("[{:.3}] chunk {}: {}", chunk.score, chunk.index, chunk.text);
        }
        println!();
    }
    println!("{}", answer.text);
    Ok(())
}

async fn run_chat(config: &Config, file: Option<&Path>) -> Result<()> {
    let generator = GeminiClient::new(&config.generation)?;
    let mut session = Session::new();

    if let Some(path) = file {
        load_file(&mut session, config, path)?;
    } else {
        println!("No document loaded. Use /load <path> to index one.");
    }
    println!("Ask a question, or /load <path>, /history, /quit.");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break, // EOF
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input == "/quit" {
            break;
        } else if input == "/history" {
            if session.history().is_empty() {
                println!("(no turns yet)");
            }
            for turn in session.transcript() {
                println!("You: {}", turn.question);
                println!("Bot: {}", turn.answer);
                println!("---");
            }
        } else if let Some(path) = input.strip_prefix("/load ") {
            if let Err(e) = load_file(&mut session, config, Path::new(path.trim())) {
                eprintln!("Error: {:#}", e);
            }
        } else {
            match session.ask(&generator, input, ask_options(config)).await {
                Ok(answer) => println!("bot> {}", answer.text),
                Err(e) => eprintln!("Error: {}", e),
            }
        }
    }

    Ok(())
}
