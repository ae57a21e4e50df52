//! Model host integration
//!
//! The engine consumes the local model host through the [`ModelHost`]
//! trait; [`ollama::OllamaHost`] is the production implementation and
//! tests substitute recording mocks.

pub mod classifier;
pub mod context;
pub mod graph_context;
pub mod ollama;
pub mod prompts;

use crate::error::Result;

/// Options for a generate call
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    /// Cap on predicted tokens
    pub num_predict: Option<u32>,
    /// Context window size; computed from prompt length when None
    pub num_ctx: Option<u32>,
}

/// Result of a generate call with host-reported metadata
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub model_version: Option<String>,
    pub tokens_used: Option<i64>,
    pub elapsed_ms: Option<i64>,
}

/// The three operations the engine needs from the local model host.
///
/// Failure modes surface as `ModelHostUnreachable`, `ModelNotFound`,
/// or `ModelError`.
pub trait ModelHost {
    /// Full generation with metadata; used for summaries and answers
    fn generate(&self, model: &str, prompt: &str, options: &GenerateOptions) -> Result<Generation>;

    /// Short, deterministic generation for classification: temperature
    /// 0, small predict cap, minimal context
    fn generate_simple(&self, model: &str, prompt: &str) -> Result<String>;

    /// Embeddings for a batch of inputs; one fixed-dimension vector per
    /// input, in order
    fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>>;
}
