//! Graph context for summarization prompts
//!
//! Builds the compact context block (imports, exports, callers,
//! callees) injected into file prompts at context level 1, and the
//! snapshot persisted with the summary for smart invalidation.

use crate::error::Result;
use crate::hashing::string_hash;
use crate::store::{Store, SummaryContext};

/// Opaque version of the context-construction logic; stored with every
/// snapshot so a logic change can invalidate old snapshots
pub const SUMMARY_CONTEXT_VERSION: &str = "1";

/// Limit on listed callers/callees per entity in the prompt block
const MAX_NEIGHBORS: usize = 5;

/// Current graph snapshot for a file: imports hash plus caller/callee
/// counts across its entities. None when the file has no graph data.
pub fn compute_file_context_snapshot(
    store: &Store,
    file_path: &str,
) -> Result<Option<SummaryContext>> {
    let imports = store.imports_of_file(file_path)?;
    let entities = store.entities_for_file(file_path)?;
    if imports.is_empty() && entities.is_empty() {
        return Ok(None);
    }

    let mut callers_count = 0i64;
    let mut callees_count = 0i64;
    for entity in &entities {
        if let Some(id) = entity.id {
            callers_count += store.callers_of(id)?.len() as i64;
            callees_count += store.callees_of(id)?.len() as i64;
        }
    }

    Ok(Some(SummaryContext {
        path: file_path.to_string(),
        imports_hash: imports_hash(&imports),
        callers_count,
        callees_count,
        context_version: SUMMARY_CONTEXT_VERSION.to_string(),
    }))
}

/// Hash of the sorted, deduplicated imported module names
pub fn imports_hash(imports: &[String]) -> String {
    let mut sorted: Vec<&str> = imports.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    string_hash(&sorted.join(","))
}

/// Formatted graph context block for a file prompt, or None when no
/// graph data exists (analyze has not run over this file).
pub fn build_graph_context(store: &Store, file_path: &str) -> Result<Option<String>> {
    let imports = store.imports_of_file(file_path)?;
    let entities = store.entities_for_file(file_path)?;
    if imports.is_empty() && entities.is_empty() {
        return Ok(None);
    }

    let mut lines = vec!["Code graph context:".to_string()];

    if !imports.is_empty() {
        let mut sorted: Vec<&str> = imports.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted.dedup();
        lines.push(format!("  Imports: {}", sorted.join(", ")));
    }

    if !entities.is_empty() {
        let exports: Vec<&str> = entities.iter().map(|e| e.qualified_name.as_str()).collect();
        lines.push(format!("  Exports: {}", exports.join(", ")));

        for entity in &entities {
            let Some(id) = entity.id else { continue };
            let callers = store.callers_of(id)?;
            let callees = store.callees_of(id)?;
            if callers.is_empty() && callees.is_empty() {
                continue;
            }
            let mut parts = Vec::new();
            if !callers.is_empty() {
                parts.push(format!(
                    "callers=[{}]",
                    neighbor_list(callers.iter().map(|(name, _, _)| name.as_str()))
                ));
            }
            if !callees.is_empty() {
                parts.push(format!(
                    "callees=[{}]",
                    neighbor_list(callees.iter().map(|(name, _, _)| name.as_str()))
                ));
            }
            lines.push(format!("  {}: {}", entity.qualified_name, parts.join(", ")));
        }
    }

    if lines.len() <= 1 {
        return Ok(None);
    }
    Ok(Some(lines.join("\n")))
}

fn neighbor_list<'a>(names: impl ExactSizeIterator<Item = &'a str>) -> String {
    let total = names.len();
    let mut listed: Vec<String> = names.take(MAX_NEIGHBORS).map(str::to_string).collect();
    if total > MAX_NEIGHBORS {
        listed.push(format!("...+{} more", total - MAX_NEIGHBORS));
    }
    listed.join(", ")
}
