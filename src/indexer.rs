//! Vector indexing of summaries and entities
//!
//! Incremental mode embeds only stale objects: missing vector row,
//! embedding model changed, or the source updated since the row was
//! written. Full mode treats everything as stale. Rows for deleted
//! sources are removed first, and embed calls run in batches.

use crate::config::Config;
use crate::error::Result;
use crate::jobs::CancelToken;
use crate::llm::ModelHost;
use crate::store::{Entity, Store, Summary};

/// Batch size for embed requests
const EMBED_BATCH_SIZE: usize = 32;

/// Options for one index run
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Re-embed everything regardless of staleness
    pub full: bool,
    pub index_summaries: bool,
    pub index_entities: bool,
    /// Override for the configured embedding model
    pub embedding_model: Option<String>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            full: false,
            index_summaries: true,
            index_entities: true,
            embedding_model: None,
        }
    }
}

/// Outcome counters for one index run
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct IndexStats {
    pub summaries_embedded: usize,
    pub summaries_removed: usize,
    pub entities_embedded: usize,
    pub entities_removed: usize,
    pub cancelled: bool,
}

/// Text embedded for a summary: path plus description for better retrieval
fn summary_embedding_text(summary: &Summary) -> String {
    format!("{}\n{}", summary.path, summary.description)
}

/// Text embedded for an entity: qualified name, signature, docstring
fn entity_embedding_text(entity: &Entity) -> String {
    let mut parts = vec![entity.qualified_name.clone()];
    if let Some(signature) = entity.signature.as_deref() {
        parts.push(signature.to_string());
    }
    if let Some(docstring) = entity.docstring.as_deref() {
        parts.push(docstring.to_string());
    }
    parts.join("\n")
}

/// Run the indexer over a project scope
pub fn run_index(
    store: &Store,
    scope: Option<&str>,
    config: &Config,
    host: &dyn ModelHost,
    options: &IndexOptions,
    cancel: &CancelToken,
) -> Result<IndexStats> {
    let model = options
        .embedding_model
        .clone()
        .unwrap_or_else(|| config.default_embedding_model.clone());
    let mut stats = IndexStats::default();

    if options.index_summaries {
        index_summaries(store, scope, host, &model, options.full, cancel, &mut stats)?;
    }
    if stats.cancelled {
        return Ok(stats);
    }
    if options.index_entities {
        index_entities(store, scope, host, &model, options.full, cancel, &mut stats)?;
    }
    Ok(stats)
}

fn index_summaries(
    store: &Store,
    scope: Option<&str>,
    host: &dyn ModelHost,
    model: &str,
    full: bool,
    cancel: &CancelToken,
    stats: &mut IndexStats,
) -> Result<()> {
    let summaries = store.all_summaries(scope)?;
    let indexed = store.indexed_summary_vectors()?;

    // Drop rows whose source summary is gone
    let current_paths: std::collections::HashSet<&str> =
        summaries.iter().map(|s| s.path.as_str()).collect();
    for path in indexed.keys() {
        if !current_paths.contains(path.as_str()) {
            store.delete_summary_vector(path)?;
            stats.summaries_removed += 1;
        }
    }

    let stale: Vec<&Summary> = summaries
        .iter()
        .filter(|summary| {
            if full {
                return true;
            }
            match indexed.get(&summary.path) {
                None => true,
                Some((updated_at, row_model)) => {
                    row_model != model || summary.updated_at.as_str() > updated_at.as_str()
                }
            }
        })
        .collect();

    for batch in stale.chunks(EMBED_BATCH_SIZE) {
        if cancel.is_cancelled() {
            stats.cancelled = true;
            return Ok(());
        }
        let texts: Vec<String> = batch
            .iter()
            .map(|summary| summary_embedding_text(summary))
            .collect();
        let embeddings = host.embed(model, &texts)?;
        for (summary, embedding) in batch.iter().zip(embeddings) {
            store.put_summary_vector(
                &summary.path,
                summary.kind.as_str(),
                model,
                &summary.updated_at,
                &summary.description,
                &embedding,
            )?;
            stats.summaries_embedded += 1;
        }
    }
    Ok(())
}

fn index_entities(
    store: &Store,
    scope: Option<&str>,
    host: &dyn ModelHost,
    model: &str,
    full: bool,
    cancel: &CancelToken,
    stats: &mut IndexStats,
) -> Result<()> {
    let entities = store.entities_for_indexing(scope)?;
    let indexed = store.indexed_entity_vectors()?;

    let current_ids: std::collections::HashSet<i64> =
        entities.iter().filter_map(|(e, _)| e.id).collect();
    for entity_id in indexed.keys() {
        if !current_ids.contains(entity_id) {
            store.delete_entity_vector(*entity_id)?;
            stats.entities_removed += 1;
        }
    }

    let stale: Vec<&(Entity, String)> = entities
        .iter()
        .filter(|(entity, updated_at)| {
            let Some(id) = entity.id else { return false };
            if full {
                return true;
            }
            match indexed.get(&id) {
                None => true,
                Some((row_updated_at, row_model)) => {
                    row_model != model || updated_at.as_str() > row_updated_at.as_str()
                }
            }
        })
        .collect();

    for batch in stale.chunks(EMBED_BATCH_SIZE) {
        if cancel.is_cancelled() {
            stats.cancelled = true;
            return Ok(());
        }
        let texts: Vec<String> = batch
            .iter()
            .map(|(entity, _)| entity_embedding_text(entity))
            .collect();
        let embeddings = host.embed(model, &texts)?;
        for ((entity, updated_at), embedding) in batch.iter().zip(embeddings) {
            store.put_entity_vector(
                entity.id.expect("filtered above"),
                &entity.file_path,
                &entity.qualified_name,
                entity.start_line,
                model,
                updated_at,
                &entity_embedding_text(entity),
                &embedding,
            )?;
            stats.entities_embedded += 1;
        }
    }
    Ok(())
}
