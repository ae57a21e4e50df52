//! Init command: create the project data directory and database

use crate::cli::{InitArgs, OutputFormat};
use crate::commands::{CommandContext, CommandOutcome};
use crate::config::PARANOID_DIR;
use crate::error::Result;
use crate::store::Store;

/// Initialize a project. Re-initializing an existing root is
/// idempotent and succeeds with a notice.
pub fn run_init(ctx: &CommandContext, args: &InitArgs) -> Result<CommandOutcome> {
    let root = args.path.canonicalize().unwrap_or_else(|_| args.path.clone());
    let already = root.join(PARANOID_DIR).is_dir();

    let store = Store::create(&root)?;
    for message in store.migration_messages() {
        tracing::info!("{}", message);
    }

    let output = match ctx.format {
        OutputFormat::Json => serde_json::json!({
            "project_root": root.display().to_string(),
            "already_initialized": already,
        })
        .to_string(),
        OutputFormat::Text => {
            if already {
                format!("Project already initialized at {}", root.display())
            } else {
                format!("Initialized paranoid project at {}", root.display())
            }
        }
    };
    Ok(CommandOutcome::ok(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let ctx = CommandContext::default();
        let args = InitArgs {
            path: dir.path().to_path_buf(),
        };

        let outcome = run_init(&ctx, &args).unwrap();
        assert!(outcome.output.starts_with("Initialized"));
        assert!(dir.path().join(PARANOID_DIR).is_dir());
        assert!(dir.path().join(PARANOID_DIR).join("summaries.db").is_file());
    }

    #[test]
    fn test_reinit_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let ctx = CommandContext::default();
        let args = InitArgs {
            path: dir.path().to_path_buf(),
        };

        run_init(&ctx, &args).unwrap();
        let outcome = run_init(&ctx, &args).unwrap();
        assert!(outcome.output.contains("already initialized"));
        assert_eq!(outcome.failed_items, 0);
    }
}
