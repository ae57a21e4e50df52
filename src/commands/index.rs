//! Index command: embed summaries and entities for retrieval

use crate::cli::{IndexArgs, OutputFormat};
use crate::commands::{CommandContext, CommandOutcome};
use crate::config::{load_config, normalize_path, require_project_root};
use crate::error::Result;
use crate::indexer::{run_index, IndexOptions};
use crate::jobs::CancelToken;
use crate::llm::ollama::OllamaHost;
use crate::store::Store;

pub fn run_index_command(ctx: &CommandContext, args: &IndexArgs) -> Result<CommandOutcome> {
    let target = args.path.canonicalize().unwrap_or_else(|_| args.path.clone());
    let project_root = require_project_root(&target)?;
    let config = load_config(Some(&project_root))?;

    let store = Store::open(&project_root)?;
    for message in store.migration_messages() {
        eprintln!("Note: {}", message);
    }
    let host = OllamaHost::new(&config.ollama_host, config.request_timeout_secs)?;

    let scope = if target == project_root {
        None
    } else {
        Some(normalize_path(&target))
    };

    let options = IndexOptions {
        full: args.full,
        index_summaries: !args.entities_only,
        index_entities: !args.summaries_only,
        embedding_model: args.embedding_model.clone(),
    };

    let stats = run_index(
        &store,
        scope.as_deref(),
        &config,
        &host,
        &options,
        &CancelToken::new(),
    )?;

    let output = match ctx.format {
        OutputFormat::Json => serde_json::to_string_pretty(&stats).unwrap_or_default(),
        OutputFormat::Text => {
            let mut parts = Vec::new();
            if options.index_summaries {
                parts.push(format!("{} summaries embedded", stats.summaries_embedded));
            }
            if options.index_entities {
                parts.push(format!("{} entities embedded", stats.entities_embedded));
            }
            let removed = stats.summaries_removed + stats.entities_removed;
            if removed > 0 {
                parts.push(format!("{} stale rows removed", removed));
            }
            format!("Indexed: {}.", parts.join(", "))
        }
    };

    Ok(CommandOutcome::ok(output))
}
