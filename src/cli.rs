use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::session::Strategy;

#[derive(Debug, Parser)]
#[command(
    name = "docqa",
    about = "Ask questions against your documents from the command line"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest documents and build the persisted semantic index
    Index(IndexArgs),
    /// Answer a single question
    Ask(AskArgs),
    /// Interactive question loop over a document batch
    Chat(ChatArgs),
    /// Show data directory, indexes, and settings
    Status(StatusArgs),
    /// Delete persisted semantic indexes
    Reset(ResetArgs),
    /// Manage the fallback answer points
    Fallback {
        #[command(subcommand)]
        action: FallbackAction,
    },
    /// Manage the generative model setting
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Manage the default retrieval strategy
    Strategy {
        #[command(subcommand)]
        action: StrategyAction,
    },
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Index --

#[derive(Debug, Parser)]
pub struct IndexArgs {
    /// Documents to ingest (pdf, txt, pptx)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Name of the persisted index
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Chunk size in characters
    #[arg(long, default_value = "1000")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[arg(long, default_value = "100")]
    pub overlap: usize,

    /// Keep text after stop-section markers (index, glossary, references)
    #[arg(long)]
    pub keep_after_stop: bool,
}

// -- Ask --

#[derive(Debug, Parser)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,

    /// Retrieval strategy (default: the configured setting, or lexical)
    #[arg(short, long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Documents to read (lexical and heading strategies)
    #[arg(short, long)]
    pub file: Vec<PathBuf>,

    /// Name of the persisted index (semantic strategy)
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Number of chunks to retrieve from the semantic index
    #[arg(short = 'k', long, default_value = "5")]
    pub top_k: usize,

    /// Lexical window size in lines
    #[arg(long, default_value = "40")]
    pub window: usize,

    /// Maximum number of lexical windows
    #[arg(long, default_value = "5")]
    pub max_chunks: usize,

    /// Hand retrieved context to the generative model
    #[arg(short, long)]
    pub generative: bool,

    /// Generative model name (overrides the configured setting)
    #[arg(long)]
    pub model: Option<String>,

    /// Keep text after stop-section markers
    #[arg(long)]
    pub keep_after_stop: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Chat --

#[derive(Debug, Parser)]
pub struct ChatArgs {
    /// Documents to load into the session
    #[arg(short, long)]
    pub file: Vec<PathBuf>,

    /// Name of the persisted index
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Retrieval strategy for the session (default: the configured setting)
    #[arg(short, long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Hand retrieved context to the generative model
    #[arg(short, long)]
    pub generative: bool,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Reset --

#[derive(Debug, Parser)]
pub struct ResetArgs {
    /// Delete only this index; without it, all indexes are deleted
    #[arg(long)]
    pub name: Option<String>,
}

// -- Fallback --

#[derive(Debug, Subcommand)]
pub enum FallbackAction {
    /// Print the active fallback points
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the fallback points (one argument per point)
    Set {
        #[arg(required = true)]
        points: Vec<String>,
    },
    /// Clear the configured points (revert to built-in defaults)
    Clear,
}

// -- Model --

#[derive(Debug, Subcommand)]
pub enum ModelAction {
    /// Show the active generative model
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Persist a generative model name
    Set {
        /// Model name (e.g. gemini-2.5-flash)
        model: String,
    },
    /// Clear the stored model (revert to the built-in default)
    Clear,
}

// -- Strategy --

#[derive(Debug, Subcommand)]
pub enum StrategyAction {
    /// Show the active default strategy
    Show,
    /// Persist a default retrieval strategy
    Set {
        #[arg(value_enum)]
        strategy: Strategy,
    },
    /// Clear the stored default (revert to lexical)
    Clear,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "docqa",
            &mut std::io::stdout(),
        );
    }
}
