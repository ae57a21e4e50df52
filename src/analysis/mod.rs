//! Static code-graph extraction
//!
//! Walks a target subtree, parses every supported file, and replaces
//! its entities and relationships in the store as a unit. Files whose
//! content hash matches the last recorded analysis hash are skipped
//! unless forced. Parsing fans out over a rayon pool; store writes stay
//! on the calling thread so entity inserts commit before the
//! relationship writes that reference them.

pub mod extractor;
pub mod grammar;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::normalize_path;
use crate::error::{ParanoidError, Result};
use crate::hashing::content_hash;
use crate::ignore::IgnoreMatcher;
use crate::jobs::CancelToken;
use crate::lang::Lang;
use crate::store::{now_rfc3339, DocQuality, EntityKind, Store};

pub use extractor::{extract_file, Extraction};

/// Bump when extraction logic or supported languages change
pub const ANALYSIS_PARSER_VERSION: &str = "1.0";

/// Outcome counters for one analyze run
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct AnalyzeStats {
    pub files_total: usize,
    pub analyzed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub entities_stored: usize,
    pub relationships_stored: usize,
    pub cancelled: bool,
}

/// Collect analyzable files under `target`: supported language, not
/// ignored. Directory symlinks are not followed. Results are sorted by
/// path for deterministic processing order.
pub fn collect_files(target: &Path, matcher: &IgnoreMatcher) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if target.is_file() {
        if !matcher.is_ignored(target, false) && Lang::from_path(target).is_ok() {
            files.push(target.to_path_buf());
        }
        return files;
    }

    let mut warned_symlink = false;
    let mut stack = vec![target.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                if matcher.is_ignored(&path, true) {
                    continue;
                }
                stack.push(path);
            } else if file_type.is_symlink() {
                // Symlinked directories can cycle; skip links entirely
                if !warned_symlink {
                    tracing::warn!("skipping symlink: {}", path.display());
                    warned_symlink = true;
                }
            } else if file_type.is_file() {
                if matcher.is_ignored(&path, false) {
                    continue;
                }
                if Lang::from_path(&path).is_ok() {
                    files.push(path);
                }
            }
        }
    }

    files.sort();
    files
}

/// Run graph extraction over a subtree
pub fn run_analysis(
    store: &Store,
    target: &Path,
    matcher: &IgnoreMatcher,
    force: bool,
    cancel: &CancelToken,
) -> Result<AnalyzeStats> {
    let files = collect_files(target, matcher);
    let mut stats = AnalyzeStats {
        files_total: files.len(),
        ..Default::default()
    };
    if files.is_empty() {
        return Ok(stats);
    }

    // Phase 1: hash and decide which files changed (serial, store reads)
    let mut pending: Vec<(PathBuf, String, String)> = Vec::new();
    for path in files {
        let key = normalize_path(&path);
        let hash = match content_hash(&path) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!("cannot hash {}: {}", key, e);
                stats.errors += 1;
                continue;
            }
        };
        if !force && store.get_analysis_hash(&key)?.as_deref() == Some(hash.as_str()) {
            stats.skipped += 1;
            continue;
        }
        pending.push((path, key, hash));
    }

    // Phase 2: parse in parallel
    let parsed: Vec<(String, String, Result<Extraction>)> = pending
        .par_iter()
        .map(|(path, key, hash)| {
            let result = std::fs::read_to_string(path)
                .map_err(ParanoidError::from)
                .and_then(|source| {
                    let lang = Lang::from_path(path)?;
                    extract_file(key, &source, lang)
                });
            (key.clone(), hash.clone(), result)
        })
        .collect();

    // Phase 3: replace per-file graph data (serial writes)
    for (key, hash, result) in parsed {
        if cancel.is_cancelled() {
            stats.cancelled = true;
            break;
        }
        match result {
            Ok(extraction) => {
                let (entities, relationships) = store_extraction(store, &key, extraction)?;
                store.set_analysis_hash(&key, &hash)?;
                stats.analyzed += 1;
                stats.entities_stored += entities;
                stats.relationships_stored += relationships;
            }
            Err(e) => {
                tracing::warn!("extraction failed for {}: {}", key, e);
                record_file_error(store, &key, &e)?;
                stats.errors += 1;
            }
        }
    }

    // Edges extracted before their target's file was analyzed get a
    // second resolution chance now that every entity is in place
    resolve_pending_relationships(store)?;

    store.set_metadata("analysis_timestamp", &now_rfc3339())?;
    store.set_metadata("analysis_parser_version", ANALYSIS_PARSER_VERSION)?;
    Ok(stats)
}

/// Re-resolve dangling call/inheritance targets across the whole graph
fn resolve_pending_relationships(store: &Store) -> Result<()> {
    for (relationship_id, target, from_file) in store.unresolved_relationships()? {
        if let Some(entity_id) = resolve_target(store, &target, &from_file)? {
            store.set_relationship_target(relationship_id, entity_id)?;
        }
    }
    Ok(())
}

/// Replace one file's entities and relationships. Entities commit
/// first; relationship resolution then looks ids up in the fresh set.
fn store_extraction(
    store: &Store,
    file_path: &str,
    extraction: Extraction,
) -> Result<(usize, usize)> {
    store.delete_entities_for_file(file_path)?;

    let mut id_by_qualified_name: HashMap<String, i64> = HashMap::new();
    let mut entities_stored = 0usize;

    for mut entity in extraction.entities {
        if entity.kind == EntityKind::Method {
            entity.parent_entity_id = entity
                .parent_name
                .as_deref()
                .and_then(|parent| id_by_qualified_name.get(parent))
                .copied();
        }
        let id = store.insert_entity(&mut entity)?;
        id_by_qualified_name.insert(entity.qualified_name.clone(), id);

        let (has_docstring, has_examples, has_type_hints, priority_score) =
            extractor::doc_quality_heuristics(&entity);
        store.upsert_doc_quality(&DocQuality {
            entity_id: id,
            has_docstring,
            has_examples,
            has_type_hints,
            priority_score,
            last_reviewed: None,
        })?;
        entities_stored += 1;
    }

    let mut relationships_stored = 0usize;
    for mut rel in extraction.relationships {
        if let Some(from_name) = rel.from_entity_qualified_name.as_deref() {
            rel.from_entity_id = id_by_qualified_name.get(from_name).copied();
        }
        if matches!(
            rel.kind,
            crate::store::RelationKind::Calls | crate::store::RelationKind::Inherits
        ) {
            if let Some(target) = rel.to_file.as_deref() {
                rel.to_entity_id = resolve_target(store, target, file_path)?;
            }
        }
        store.insert_relationship(&rel)?;
        relationships_stored += 1;
    }

    Ok((entities_stored, relationships_stored))
}

/// Best-effort target resolution: qualified name first, then simple
/// name. Ambiguous matches outside the current file stay unresolved.
fn resolve_target(store: &Store, target: &str, current_file: &str) -> Result<Option<i64>> {
    let candidates = store.entities_matching_name(target)?;
    if candidates.is_empty() {
        return Ok(None);
    }
    if candidates.len() == 1 {
        return Ok(candidates[0].id);
    }
    let local: Vec<_> = candidates
        .iter()
        .filter(|e| e.file_path == current_file)
        .collect();
    if local.len() == 1 {
        return Ok(local[0].id);
    }
    Ok(None)
}

fn record_file_error(store: &Store, path: &str, error: &ParanoidError) -> Result<()> {
    if let Some(mut summary) = store.get_summary(path)? {
        summary.error = Some(error.to_string());
        store.upsert_summary(&summary)?;
    }
    Ok(())
}
