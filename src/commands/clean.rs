//! Clean command: drop summaries whose paths are gone or now ignored
//!
//! Deleting a summary cascades to its entities, relationships, context
//! snapshot, analysis hash, and vectors; directory tree hashes catch up
//! on the next summarize run.

use std::path::Path;

use crate::cli::{CleanArgs, OutputFormat};
use crate::commands::{CommandContext, CommandOutcome};
use crate::config::{load_config, require_project_root};
use crate::error::Result;
use crate::ignore::IgnoreMatcher;
use crate::store::{Store, SummaryKind};

pub fn run_clean(ctx: &CommandContext, args: &CleanArgs) -> Result<CommandOutcome> {
    let target = args.path.canonicalize().unwrap_or_else(|_| args.path.clone());
    let project_root = require_project_root(&target)?;
    let config = load_config(Some(&project_root))?;

    let store = Store::open(&project_root)?;
    let matcher = IgnoreMatcher::build(&project_root, &config)?;

    let mut removed: Vec<String> = Vec::new();
    for summary in store.all_summaries(None)? {
        let path = Path::new(&summary.path);
        let is_dir = summary.kind == SummaryKind::Directory;
        let gone = !path.exists();
        let ignored = matcher.is_ignored(path, is_dir);
        if gone || ignored {
            if !args.dry_run {
                store.delete_summary(&summary.path)?;
            }
            removed.push(summary.path);
        }
    }

    let output = match ctx.format {
        OutputFormat::Json => serde_json::json!({
            "removed": removed,
            "dry_run": args.dry_run,
        })
        .to_string(),
        OutputFormat::Text => {
            let verb = if args.dry_run { "Would remove" } else { "Removed" };
            if removed.is_empty() {
                "Nothing to clean.".to_string()
            } else if ctx.verbose {
                let mut lines = vec![format!("{} {} summaries:", verb, removed.len())];
                lines.extend(removed.iter().map(|p| format!("  {}", p)));
                lines.join("\n")
            } else {
                format!("{} {} stale summaries.", verb, removed.len())
            }
        }
    };

    Ok(CommandOutcome::ok(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::normalize_path;
    use crate::store::Summary;
    use std::fs;
    use tempfile::TempDir;

    fn summary_for(path: &str, kind: SummaryKind) -> Summary {
        Summary {
            path: path.to_string(),
            kind,
            hash: "h".into(),
            description: "d".into(),
            file_extension: None,
            language: None,
            error: None,
            needs_update: false,
            model: "m".into(),
            model_version: None,
            prompt_version: "v1".into(),
            context_level: 0,
            generated_at: "t".into(),
            updated_at: "t".into(),
            tokens_used: None,
            generation_time_ms: None,
        }
    }

    #[test]
    fn test_clean_removes_deleted_paths() {
        let dir = TempDir::new().unwrap();
        let store = Store::create(dir.path()).unwrap();

        fs::write(dir.path().join("kept.py"), "x = 1\n").unwrap();
        let kept = normalize_path(&dir.path().join("kept.py"));
        let gone = normalize_path(&dir.path().join("gone.py"));
        store.upsert_summary(&summary_for(&kept, SummaryKind::File)).unwrap();
        store.upsert_summary(&summary_for(&gone, SummaryKind::File)).unwrap();
        drop(store);

        let ctx = CommandContext::default();
        let args = CleanArgs {
            path: dir.path().to_path_buf(),
            dry_run: false,
        };
        let outcome = run_clean(&ctx, &args).unwrap();
        assert!(outcome.output.contains("Removed 1"));

        let store = Store::open(dir.path()).unwrap();
        assert!(store.get_summary(&kept).unwrap().is_some());
        assert!(store.get_summary(&gone).unwrap().is_none());
    }

    #[test]
    fn test_dry_run_keeps_rows() {
        let dir = TempDir::new().unwrap();
        let store = Store::create(dir.path()).unwrap();
        let gone = normalize_path(&dir.path().join("gone.py"));
        store.upsert_summary(&summary_for(&gone, SummaryKind::File)).unwrap();
        drop(store);

        let ctx = CommandContext::default();
        let args = CleanArgs {
            path: dir.path().to_path_buf(),
            dry_run: true,
        };
        let outcome = run_clean(&ctx, &args).unwrap();
        assert!(outcome.output.contains("Would remove 1"));

        let store = Store::open(dir.path()).unwrap();
        assert!(store.get_summary(&gone).unwrap().is_some());
    }
}
