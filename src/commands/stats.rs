//! Stats command: aggregate summary statistics

use crate::cli::{OutputFormat, StatsArgs};
use crate::commands::{CommandContext, CommandOutcome};
use crate::config::{normalize_path, require_project_root};
use crate::error::Result;
use crate::store::Store;

pub fn run_stats(ctx: &CommandContext, args: &StatsArgs) -> Result<CommandOutcome> {
    let target = args.path.canonicalize().unwrap_or_else(|_| args.path.clone());
    let project_root = require_project_root(&target)?;

    let store = Store::open(&project_root)?;
    let scope = if target == project_root {
        None
    } else {
        Some(normalize_path(&target))
    };
    let stats = store.stats(scope.as_deref())?;
    let vector_count = store.summary_vector_count()?;
    let has_graph = store.has_graph_data()?;

    let output = match ctx.format {
        OutputFormat::Json => serde_json::json!({
            "count_by_kind": stats.count_by_kind,
            "count_by_language": stats.count_by_language,
            "model_breakdown": stats.model_breakdown,
            "last_updated_at": stats.last_updated_at,
            "vector_count": vector_count,
            "has_graph": has_graph,
        })
        .to_string(),
        OutputFormat::Text => {
            let mut lines = Vec::new();
            lines.push(format!("Project: {}", project_root.display()));
            for (kind, count) in &stats.count_by_kind {
                lines.push(format!("  {} summaries: {}", kind, count));
            }
            if !stats.count_by_language.is_empty() {
                let breakdown: Vec<String> = stats
                    .count_by_language
                    .iter()
                    .map(|(language, count)| format!("{} {}", count, language))
                    .collect();
                lines.push(format!("  languages: {}", breakdown.join(", ")));
            }
            for (model, count) in &stats.model_breakdown {
                lines.push(format!("  model {}: {}", model, count));
            }
            if let Some(last) = &stats.last_updated_at {
                lines.push(format!("  last updated: {}", last));
            }
            lines.push(format!("  indexed vectors: {}", vector_count));
            lines.push(format!(
                "  code graph: {}",
                if has_graph { "present" } else { "absent" }
            ));
            lines.join("\n")
        }
    };

    Ok(CommandOutcome::ok(output))
}
