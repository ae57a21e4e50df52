//! Paranoid Engine: local, privacy-preserving codebase intelligence
//!
//! Maintains a per-project database of model-generated file and
//! directory summaries, a static code graph (entities and
//! relationships), and a vector index, and answers natural-language
//! questions about the codebase by routing them to the graph or to
//! retrieval + synthesis.
//!
//! The pipeline, leaves first:
//!
//! - [`hashing`]: content hashes for files, tree hashes for
//!   directories; drives idempotent incremental summarization.
//! - [`ignore`]: gitignore-semantics path filtering.
//! - [`store`]: the single-file SQLite store (with vector tables)
//!   under `.paranoid-coder/`.
//! - [`analysis`]: tree-sitter graph extraction per language.
//! - [`summarize`]: the bottom-up incremental summarizer.
//! - [`indexer`]: embedding of summaries and entities.
//! - [`ask`]: the hybrid query router.
//! - [`graph`]: typed queries over the extracted graph.
//!
//! All model access goes through [`llm::ModelHost`]; the production
//! implementation talks to a local Ollama endpoint.

pub mod analysis;
pub mod ask;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod graph;
pub mod hashing;
pub mod ignore;
pub mod indexer;
pub mod jobs;
pub mod lang;
pub mod llm;
pub mod store;
pub mod summarize;

// Re-export commonly used types
pub use ask::{run_ask, AskOptions, AskResponse, AskRoute, AskSource};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::{find_project_root, load_config, require_project_root, Config};
pub use error::{ParanoidError, Result};
pub use graph::{CallerInfo, CalleeInfo, GraphQueries, InheritanceNode};
pub use hashing::{content_hash, needs_summarization, tree_hash};
pub use ignore::IgnoreMatcher;
pub use indexer::{run_index, IndexOptions, IndexStats};
pub use jobs::{CancelToken, JobStatus};
pub use lang::Lang;
pub use llm::ollama::OllamaHost;
pub use llm::{GenerateOptions, Generation, ModelHost};
pub use store::{Entity, EntityKind, RelationKind, Relationship, Store, Summary, SummaryKind};
pub use summarize::{run_summarize, SummarizeOptions, SummarizeStats};
