//! Ask command: hybrid graph/RAG question answering

use crate::ask::{run_ask, AskOptions};
use crate::cli::{AskArgs, OutputFormat};
use crate::commands::{CommandContext, CommandOutcome};
use crate::config::{load_config, require_project_root};
use crate::error::Result;
use crate::llm::ollama::OllamaHost;
use crate::store::Store;

pub fn run_ask_command(ctx: &CommandContext, args: &AskArgs) -> Result<CommandOutcome> {
    let target = args.path.canonicalize().unwrap_or_else(|_| args.path.clone());
    let project_root = require_project_root(&target)?;
    let config = load_config(Some(&project_root))?;

    let store = Store::open(&project_root)?;
    for message in store.migration_messages() {
        eprintln!("Note: {}", message);
    }
    let host = OllamaHost::new(&config.ollama_host, config.request_timeout_secs)?;

    let options = AskOptions {
        force_rag: args.force_rag,
        top_k: args.top_k,
        model: args.model.clone(),
        embedding_model: args.embedding_model.clone(),
        ..Default::default()
    };

    let response = run_ask(
        &store,
        &project_root,
        &config,
        &host,
        &args.question,
        &options,
    )?;

    let output = match ctx.format {
        OutputFormat::Json => serde_json::to_string_pretty(&response).unwrap_or_default(),
        OutputFormat::Text => {
            let mut text = response.answer.clone();
            if args.sources && !response.sources.is_empty() {
                text.push_str("\n\n--- Sources ---\n");
                for (index, source) in response.sources.iter().enumerate() {
                    text.push_str(&format!("{}. {}\n", index + 1, source.path));
                    if let Some(name) = source.qualified_name.as_deref() {
                        text.push_str(&format!("   {}\n", name));
                    }
                    if let Some(relevance) = source.relevance {
                        text.push_str(&format!("   Relevance: {:.2}\n", relevance));
                    }
                    if !source.preview.is_empty() {
                        text.push_str(&format!("   {}\n", source.preview));
                    }
                }
            }
            text
        }
    };

    Ok(CommandOutcome::ok(output))
}
