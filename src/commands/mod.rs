//! Command implementations for the paranoid CLI
//!
//! Each command module wraps one engine operation: resolve the project
//! root, load config, open the store, run, and render the result. All
//! handlers take their `Args` struct from `cli.rs` plus a shared
//! [`CommandContext`] for output format and verbosity.

pub mod analyze;
pub mod ask;
pub mod clean;
pub mod init;
pub mod index;
pub mod stats;
pub mod summarize;

pub use analyze::run_analyze;
pub use ask::run_ask_command;
pub use clean::run_clean;
pub use index::run_index_command;
pub use init::run_init;
pub use stats::run_stats;
pub use summarize::run_summarize_command;

use crate::cli::OutputFormat;
use crate::error::ParanoidError;

/// Shared context passed to all command handlers
#[derive(Debug, Clone, Copy)]
pub struct CommandContext {
    pub format: OutputFormat,
    pub verbose: bool,
}

impl Default for CommandContext {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            verbose: false,
        }
    }
}

/// A command's rendered result. `failed_items` counts per-item
/// failures that did not abort the run; any non-zero count makes the
/// process exit non-zero after the output is printed.
#[derive(Debug, Default)]
pub struct CommandOutcome {
    pub output: String,
    pub failed_items: usize,
}

impl CommandOutcome {
    pub fn ok(output: String) -> Self {
        Self {
            output,
            failed_items: 0,
        }
    }
}

/// Structured error payload for machine-readable output
pub fn render_structured_error(error: &ParanoidError) -> String {
    let next_steps: Vec<&str> = error.remedy().into_iter().collect();
    serde_json::json!({
        "error": {
            "kind": error.kind(),
            "message": error.to_string(),
            "remedy": error.remedy(),
            "next_steps": next_steps,
        }
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_error_shape() {
        let rendered = render_structured_error(&ParanoidError::IndexEmpty);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["error"]["kind"], "index_empty");
        assert_eq!(value["error"]["remedy"], "paranoid index");
        assert!(value["error"]["message"].as_str().unwrap().contains("index"));
    }
}
