//! Analyze command: extract the code graph

use crate::analysis::{collect_files, run_analysis};
use crate::cli::{AnalyzeArgs, OutputFormat};
use crate::commands::{CommandContext, CommandOutcome};
use crate::config::{load_config, require_project_root};
use crate::error::Result;
use crate::ignore::IgnoreMatcher;
use crate::jobs::CancelToken;
use crate::store::Store;

pub fn run_analyze(ctx: &CommandContext, args: &AnalyzeArgs) -> Result<CommandOutcome> {
    let target = args.path.canonicalize().unwrap_or_else(|_| args.path.clone());
    let project_root = require_project_root(&target)?;
    let config = load_config(Some(&project_root))?;

    let store = Store::open(&project_root)?;
    for message in store.migration_messages() {
        eprintln!("Note: {}", message);
    }
    let matcher = IgnoreMatcher::build(&project_root, &config)?;

    if args.dry_run {
        let files = collect_files(&target, &matcher);
        let output = match ctx.format {
            OutputFormat::Json => serde_json::json!({
                "would_analyze": files
                    .iter()
                    .map(|f| f.display().to_string())
                    .collect::<Vec<_>>()
            })
            .to_string(),
            OutputFormat::Text => {
                let mut lines = vec![format!("Would analyze {} file(s).", files.len())];
                if ctx.verbose {
                    lines.extend(files.iter().map(|f| format!("  {}", f.display())));
                }
                lines.join("\n")
            }
        };
        return Ok(CommandOutcome::ok(output));
    }

    let stats = run_analysis(&store, &target, &matcher, args.force, &CancelToken::new())?;

    let output = match ctx.format {
        OutputFormat::Json => serde_json::to_string_pretty(&stats).unwrap_or_default(),
        OutputFormat::Text => {
            let mut line = format!(
                "Analyzed {} file(s), skipped {} unchanged: {} entities, {} relationships.",
                stats.analyzed,
                stats.skipped,
                stats.entities_stored,
                stats.relationships_stored
            );
            if stats.errors > 0 {
                line.push_str(&format!(" ({} file(s) had errors)", stats.errors));
            }
            if stats.cancelled {
                line.push_str(" (cancelled)");
            }
            line
        }
    };

    Ok(CommandOutcome {
        output,
        failed_items: stats.errors,
    })
}
