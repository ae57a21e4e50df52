//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Local, privacy-preserving codebase intelligence
#[derive(Parser, Debug)]
#[command(name = "paranoid")]
#[command(about = "Incremental codebase summaries, code graph, and hybrid ask")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Output formats for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Machine-readable JSON (structured errors included)
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a project (creates .paranoid-coder/)
    Init(InitArgs),

    /// Generate or refresh summaries for files and directories
    #[command(visible_alias = "s")]
    Summarize(SummarizeArgs),

    /// Extract the code graph (entities and relationships)
    #[command(visible_alias = "a")]
    Analyze(AnalyzeArgs),

    /// Embed summaries and entities into the vector index
    Index(IndexArgs),

    /// Ask a natural-language question about the codebase
    Ask(AskArgs),

    /// Show summary statistics for the project
    Stats(StatsArgs),

    /// Remove summaries for deleted or newly ignored paths
    Clean(CleanArgs),
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project root to initialize
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,
}

/// Arguments for the summarize command
#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// File or directory to summarize
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Model to use (defaults to config default_model)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Context level: 0 isolated, 1 with graph context, 2 reserved
    #[arg(long, value_name = "LEVEL")]
    pub context_level: Option<u8>,

    /// Re-summarize everything, ignoring stored hashes
    #[arg(long)]
    pub force: bool,

    /// Report what would be summarized without calling the model
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// File or directory to analyze
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Re-extract everything, ignoring stored analysis hashes
    #[arg(long)]
    pub force: bool,

    /// List the files that would be analyzed without parsing
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the index command
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Scope to a path under the project
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Re-embed everything regardless of staleness
    #[arg(long)]
    pub full: bool,

    /// Only index summaries
    #[arg(long, conflicts_with = "entities_only")]
    pub summaries_only: bool,

    /// Only index entities
    #[arg(long)]
    pub entities_only: bool,

    /// Embedding model (defaults to config default_embedding_model)
    #[arg(long, value_name = "MODEL")]
    pub embedding_model: Option<String>,
}

/// Arguments for the ask command
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to answer
    #[arg(value_name = "QUESTION")]
    pub question: String,

    /// Project path (defaults to the current directory)
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Skip graph routing and force the retrieval path
    #[arg(long)]
    pub force_rag: bool,

    /// Number of sources to retrieve
    #[arg(long, value_name = "K", default_value = "5")]
    pub top_k: usize,

    /// Answer model (defaults to config default_model)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Embedding model for retrieval
    #[arg(long, value_name = "MODEL")]
    pub embedding_model: Option<String>,

    /// Show retrieved sources after the answer
    #[arg(long)]
    pub sources: bool,
}

/// Arguments for the stats command
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Scope to a path under the project
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,
}

/// Arguments for the clean command
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Project path
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Report what would be removed without deleting
    #[arg(long)]
    pub dry_run: bool,
}
