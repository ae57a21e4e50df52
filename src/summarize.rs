//! Bottom-up incremental summarization
//!
//! Walks a target subtree with files first and directories deepest
//! first, so every directory's tree hash is computed after its
//! descendants have settled. Unchanged items are skipped via
//! [`needs_summarization`]; per-item failures are recorded on the
//! summary row and do not abort the walk.

use std::path::{Path, PathBuf};

use crate::config::{normalize_path, Config};
use crate::error::{ParanoidError, Result};
use crate::hashing::{content_hash, needs_summarization, tree_hash};
use crate::ignore::IgnoreMatcher;
use crate::jobs::CancelToken;
use crate::lang::Lang;
use crate::llm::graph_context::{build_graph_context, compute_file_context_snapshot};
use crate::llm::prompts::{PromptLibrary, PROMPT_VERSION};
use crate::llm::{GenerateOptions, ModelHost};
use crate::store::{now_rfc3339, Store, Summary, SummaryKind};

/// Options for one summarize run
#[derive(Debug, Clone, Default)]
pub struct SummarizeOptions {
    pub force: bool,
    pub dry_run: bool,
    /// Override for the configured context level
    pub context_level: Option<u8>,
    /// Override for the configured model
    pub model: Option<String>,
}

/// Outcome counters for one summarize run
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct SummarizeStats {
    pub total: usize,
    pub summarized: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// One walk item in processing order
#[derive(Debug)]
struct WalkItem {
    path: PathBuf,
    kind: SummaryKind,
}

/// Collect walk items bottom-up: files in directory order, then
/// directories deepest first, ending with the target itself. Ignored
/// paths and symlinks are excluded.
fn walk_bottom_up(target: &Path, project_root: &Path, matcher: &IgnoreMatcher) -> Vec<WalkItem> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();

    if target.is_file() {
        if !matcher.is_ignored(target, false) {
            files.push(WalkItem {
                path: target.to_path_buf(),
                kind: SummaryKind::File,
            });
        }
        return files;
    }
    if !target.is_dir() {
        return files;
    }

    fn recurse(
        current: &Path,
        matcher: &IgnoreMatcher,
        files: &mut Vec<WalkItem>,
        dirs: &mut Vec<WalkItem>,
    ) {
        let Ok(entries) = std::fs::read_dir(current) else {
            return;
        };
        let mut sorted: Vec<_> = entries.flatten().collect();
        sorted.sort_by_key(|entry| entry.file_name());
        for entry in sorted {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_symlink() {
                tracing::warn!("skipping symlink: {}", path.display());
                continue;
            }
            if file_type.is_file() {
                if !matcher.is_ignored(&path, false) {
                    files.push(WalkItem {
                        path,
                        kind: SummaryKind::File,
                    });
                }
            } else if file_type.is_dir() && !matcher.is_ignored(&path, true) {
                recurse(&path, matcher, files, dirs);
                dirs.push(WalkItem {
                    path,
                    kind: SummaryKind::Directory,
                });
            }
        }
    }

    recurse(target, matcher, &mut files, &mut dirs);
    if !matcher.is_ignored(target, true) {
        dirs.push(WalkItem {
            path: target.to_path_buf(),
            kind: SummaryKind::Directory,
        });
    }

    // Deepest directories first; ancestors wait on descendants
    let depth = |item: &WalkItem| {
        item.path
            .strip_prefix(project_root)
            .map(|p| p.components().count())
            .unwrap_or(0)
    };
    dirs.sort_by_key(|item| std::cmp::Reverse(depth(item)));

    files.extend(dirs);
    files
}

/// Run summarization over a subtree
#[allow(clippy::too_many_arguments)]
pub fn run_summarize(
    store: &Store,
    target: &Path,
    project_root: &Path,
    matcher: &IgnoreMatcher,
    config: &Config,
    host: &dyn ModelHost,
    prompts: &PromptLibrary,
    options: &SummarizeOptions,
    cancel: &CancelToken,
) -> Result<SummarizeStats> {
    let model = options
        .model
        .clone()
        .unwrap_or_else(|| config.default_model.clone());
    let context_level = options
        .context_level
        .unwrap_or(config.default_context_level)
        .min(2);

    let items = walk_bottom_up(target, project_root, matcher);
    let mut stats = SummarizeStats {
        total: items.len(),
        ..Default::default()
    };

    for (index, item) in items.iter().enumerate() {
        if cancel.is_cancelled() {
            stats.cancelled = true;
            break;
        }
        let path_key = normalize_path(&item.path);
        tracing::debug!("[{}/{}] {}", index + 1, stats.total, path_key);

        let outcome = match item.kind {
            SummaryKind::File => summarize_file(
                store,
                &item.path,
                &path_key,
                config,
                host,
                prompts,
                &model,
                context_level,
                options,
            ),
            SummaryKind::Directory => summarize_directory(
                store,
                &item.path,
                &path_key,
                project_root,
                config,
                host,
                prompts,
                &model,
                options,
            ),
        };

        match outcome {
            Ok(ItemOutcome::Summarized) => stats.summarized += 1,
            Ok(ItemOutcome::Skipped) => stats.skipped += 1,
            Err(e) => {
                tracing::warn!("failed to summarize {}: {}", path_key, e);
                record_item_error(store, &path_key, &e)?;
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

enum ItemOutcome {
    Summarized,
    Skipped,
}

#[allow(clippy::too_many_arguments)]
fn summarize_file(
    store: &Store,
    path: &Path,
    path_key: &str,
    config: &Config,
    host: &dyn ModelHost,
    prompts: &PromptLibrary,
    model: &str,
    context_level: u8,
    options: &SummarizeOptions,
) -> Result<ItemOutcome> {
    let current_hash = content_hash(path)?;
    if !options.force && !needs_summarization(path_key, &current_hash, store, config)? {
        return Ok(ItemOutcome::Skipped);
    }
    if options.dry_run {
        return Ok(ItemOutcome::Summarized);
    }

    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);

    let existing = store.get_summary(path_key)?;
    let existing_description = existing.as_ref().map(|s| s.description.clone());
    let language = Lang::label_for_path(path);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e));

    // Context level 2 is reserved and behaves as level 1
    let graph_context = if context_level >= 1 {
        build_graph_context(store, path_key)?
    } else {
        None
    };
    let effective_level: u8 = if graph_context.is_some() { 1 } else { 0 };

    let prompt = prompts.file_prompt(
        Some(&language),
        path_key,
        extension.as_deref().unwrap_or(""),
        &content,
        existing_description.as_deref(),
        graph_context.as_deref(),
    );

    let now = now_rfc3339();
    let generated_at = existing
        .as_ref()
        .map(|s| s.generated_at.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| now.clone());

    let (description, model_version, tokens_used, generation_time_ms, error) =
        match host.generate(model, &prompt, &GenerateOptions::default()) {
            Ok(generation) => (
                generation.text,
                generation.model_version,
                generation.tokens_used,
                generation.elapsed_ms,
                None,
            ),
            Err(e @ ParanoidError::ContextOverflow { .. }) => (
                format!("Summary not available: {}", e),
                None,
                None,
                None,
                Some(e.to_string()),
            ),
            Err(e) => return Err(e),
        };

    let failed = error.is_some();
    store.upsert_summary(&Summary {
        path: path_key.to_string(),
        kind: SummaryKind::File,
        hash: current_hash,
        description,
        file_extension: extension,
        language: Some(language),
        error,
        needs_update: false,
        model: model.to_string(),
        model_version,
        prompt_version: PROMPT_VERSION.to_string(),
        context_level: effective_level,
        generated_at,
        updated_at: now,
        tokens_used,
        generation_time_ms,
    })?;

    if effective_level >= 1 {
        if let Some(snapshot) = compute_file_context_snapshot(store, path_key)? {
            store.set_summary_context(&snapshot)?;
        }
    }

    if failed {
        Err(ParanoidError::ContextOverflow {
            message: format!("prompt for {} exceeded the context window", path_key),
        })
    } else {
        Ok(ItemOutcome::Summarized)
    }
}

#[allow(clippy::too_many_arguments)]
fn summarize_directory(
    store: &Store,
    path: &Path,
    path_key: &str,
    project_root: &Path,
    config: &Config,
    host: &dyn ModelHost,
    prompts: &PromptLibrary,
    model: &str,
    options: &SummarizeOptions,
) -> Result<ItemOutcome> {
    let current_hash = tree_hash(path_key, store)?;
    if !options.force && !needs_summarization(path_key, &current_hash, store, config)? {
        return Ok(ItemOutcome::Skipped);
    }
    if options.dry_run {
        return Ok(ItemOutcome::Summarized);
    }

    let children = store.list_children(path_key)?;
    let children_text = children
        .iter()
        .map(|child| {
            let name = child.path.rsplit('/').next().unwrap_or(&child.path);
            let first_line = child.description.lines().next().unwrap_or("");
            format!("  - {} ({}): {}", name, child.kind.as_str(), first_line)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let existing = store.get_summary(path_key)?;
    let existing_description = existing.as_ref().map(|s| s.description.clone());
    let is_root = normalize_path(path) == normalize_path(project_root);
    let language = dominant_language(&children);

    let prompt = prompts.directory_prompt(
        language.as_deref(),
        path_key,
        &children_text,
        existing_description.as_deref(),
        is_root,
    );

    let now = now_rfc3339();
    let generated_at = existing
        .as_ref()
        .map(|s| s.generated_at.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| now.clone());

    let generation = host.generate(model, &prompt, &GenerateOptions::default())?;

    store.upsert_summary(&Summary {
        path: path_key.to_string(),
        kind: SummaryKind::Directory,
        hash: current_hash,
        description: generation.text,
        file_extension: None,
        language,
        error: None,
        needs_update: false,
        model: model.to_string(),
        model_version: generation.model_version,
        prompt_version: PROMPT_VERSION.to_string(),
        context_level: 0,
        generated_at,
        updated_at: now,
        tokens_used: generation.tokens_used,
        generation_time_ms: generation.elapsed_ms,
    })?;

    Ok(ItemOutcome::Summarized)
}

/// Most common language among direct file children
fn dominant_language(children: &[Summary]) -> Option<String> {
    let mut counts: std::collections::HashMap<&str, usize> = Default::default();
    for child in children {
        if child.kind == SummaryKind::File {
            if let Some(language) = child.language.as_deref() {
                if language != "unknown" {
                    *counts.entry(language).or_default() += 1;
                }
            }
        }
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(language, _)| language.to_string())
}

/// Per-item failures land on the summary row so the next run retries
fn record_item_error(store: &Store, path: &str, error: &ParanoidError) -> Result<()> {
    if let Some(mut summary) = store.get_summary(path)? {
        summary.error = Some(error.to_string());
        summary.updated_at = now_rfc3339();
        store.upsert_summary(&summary)?;
    }
    Ok(())
}
