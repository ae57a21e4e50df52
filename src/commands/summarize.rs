//! Summarize command: incremental bottom-up summarization

use crate::cli::{OutputFormat, SummarizeArgs};
use crate::commands::{CommandContext, CommandOutcome};
use crate::config::{load_config, require_project_root};
use crate::error::Result;
use crate::ignore::IgnoreMatcher;
use crate::jobs::CancelToken;
use crate::llm::ollama::OllamaHost;
use crate::llm::prompts::PromptLibrary;
use crate::store::Store;
use crate::summarize::{run_summarize, SummarizeOptions};

pub fn run_summarize_command(ctx: &CommandContext, args: &SummarizeArgs) -> Result<CommandOutcome> {
    let target = args.path.canonicalize().unwrap_or_else(|_| args.path.clone());
    let project_root = require_project_root(&target)?;
    let config = load_config(Some(&project_root))?;

    let store = Store::open(&project_root)?;
    for message in store.migration_messages() {
        eprintln!("Note: {}", message);
    }

    let matcher = IgnoreMatcher::build(&project_root, &config)?;
    matcher.sync_to_store(&store)?;
    let prompts = PromptLibrary::load(&project_root)?;
    let host = OllamaHost::new(&config.ollama_host, config.request_timeout_secs)?;

    let options = SummarizeOptions {
        force: args.force,
        dry_run: args.dry_run,
        context_level: args.context_level,
        model: args.model.clone(),
    };

    let stats = run_summarize(
        &store,
        &target,
        &project_root,
        &matcher,
        &config,
        &host,
        &prompts,
        &options,
        &CancelToken::new(),
    )?;

    let output = match ctx.format {
        OutputFormat::Json => serde_json::to_string_pretty(&stats).unwrap_or_default(),
        OutputFormat::Text => {
            if args.dry_run {
                format!(
                    "Dry run: would summarize {}, would skip {} (unchanged).",
                    stats.summarized, stats.skipped
                )
            } else {
                let mut line = format!(
                    "Done: {} summarized, {} skipped (unchanged).",
                    stats.summarized, stats.skipped
                );
                if stats.failed > 0 {
                    line.push_str(&format!(" {} failed.", stats.failed));
                }
                if stats.cancelled {
                    line.push_str(" (cancelled)");
                }
                line
            }
        }
    };

    Ok(CommandOutcome {
        output,
        failed_items: stats.failed,
    })
}
