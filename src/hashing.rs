//! Content and tree hashing for change detection
//!
//! Files hash their raw bytes (SHA-256, binary-safe). Directories hash
//! the sorted concatenation of their direct children's stored hashes,
//! so any change to any descendant propagates to every ancestor.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::{ParanoidError, Result};
use crate::llm::graph_context::compute_file_context_snapshot;
use crate::store::Store;

/// SHA-256 hex digest of a file's bytes
pub fn content_hash(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(ParanoidError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("not a regular file: {}", path.display()),
        )));
    }
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex_digest(hasher))
}

/// SHA-256 hex digest of a string
pub fn string_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex_digest(hasher)
}

fn hex_digest(hasher: Sha256) -> String {
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Hash of a directory from its direct children's hashes in the store.
///
/// Only children that exist in the store participate. An empty
/// directory hashes the empty concatenation.
pub fn tree_hash(dir_path: &str, store: &Store) -> Result<String> {
    let children = store.list_children(dir_path)?;
    let mut hashes: Vec<String> = children.into_iter().map(|c| c.hash).collect();
    hashes.sort();
    Ok(string_hash(&hashes.concat()))
}

/// Decide whether a path needs (re-)summarization.
///
/// True when: no summary exists, the stored hash differs from
/// `current_hash`, the summary is flagged `needs_update`, or smart
/// invalidation reports a context drift for a graph-context summary.
pub fn needs_summarization(
    path: &str,
    current_hash: &str,
    store: &Store,
    config: &Config,
) -> Result<bool> {
    let existing = match store.get_summary(path)? {
        None => return Ok(true),
        Some(summary) => summary,
    };
    if existing.hash != current_hash || existing.needs_update {
        return Ok(true);
    }
    if existing.context_level >= 1 {
        return context_drifted(path, store, config);
    }
    Ok(false)
}

/// Smart invalidation: compare the stored context snapshot with the
/// current graph state. No snapshot or no graph data means no basis to
/// invalidate.
fn context_drifted(path: &str, store: &Store, config: &Config) -> Result<bool> {
    let stored = match store.get_summary_context(path)? {
        None => return Ok(false),
        Some(context) => context,
    };
    let current = match compute_file_context_snapshot(store, path)? {
        None => return Ok(false),
        Some(snapshot) => snapshot,
    };

    let thresholds = &config.smart_invalidation;
    if thresholds.re_summarize_on_imports_change && current.imports_hash != stored.imports_hash {
        return Ok(true);
    }
    if (current.callers_count - stored.callers_count).abs() > thresholds.callers_threshold {
        return Ok(true);
    }
    if (current.callees_count - stored.callees_count).abs() > thresholds.callees_threshold {
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Summary, SummaryKind};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_store() -> Store {
        Store::open_in_memory(&PathBuf::from("/p")).unwrap()
    }

    fn stored_summary(path: &str, kind: SummaryKind, hash: &str) -> Summary {
        Summary {
            path: path.to_string(),
            kind,
            hash: hash.to_string(),
            description: "d".to_string(),
            file_extension: None,
            language: None,
            error: None,
            needs_update: false,
            model: "m".to_string(),
            model_version: None,
            prompt_version: "v1".to_string(),
            context_level: 0,
            generated_at: "t".to_string(),
            updated_at: "t".to_string(),
            tokens_used: None,
            generation_time_ms: None,
        }
    }

    #[test]
    fn test_content_hash_binary_safe() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob.bin");
        fs::write(&path, [0u8, 159, 146, 150, 255]).unwrap();

        let hash = content_hash(&path).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));

        // Deterministic
        assert_eq!(hash, content_hash(&path).unwrap());
    }

    #[test]
    fn test_content_hash_changes_with_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "x = 1\n").unwrap();
        let first = content_hash(&path).unwrap();
        fs::write(&path, "x = 2\n").unwrap();
        let second = content_hash(&path).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_content_hash_rejects_directories() {
        let dir = TempDir::new().unwrap();
        assert!(content_hash(dir.path()).is_err());
    }

    #[test]
    fn test_tree_hash_of_empty_directory() {
        let store = test_store();
        let hash = tree_hash("/p/empty", &store).unwrap();
        assert_eq!(hash, string_hash(""));
    }

    #[test]
    fn test_tree_hash_sorted_and_propagating() {
        let store = test_store();
        store
            .upsert_summary(&stored_summary("/p/src/a.py", SummaryKind::File, "hash_a"))
            .unwrap();
        store
            .upsert_summary(&stored_summary("/p/src/b.py", SummaryKind::File, "hash_b"))
            .unwrap();

        let expected = string_hash(&format!("{}{}", "hash_a", "hash_b"));
        assert_eq!(tree_hash("/p/src", &store).unwrap(), expected);

        // Changing a child's hash changes the tree hash
        store
            .upsert_summary(&stored_summary("/p/src/a.py", SummaryKind::File, "hash_a2"))
            .unwrap();
        assert_ne!(tree_hash("/p/src", &store).unwrap(), expected);
    }

    #[test]
    fn test_tree_hash_order_independent_of_insertion() {
        let store = test_store();
        store
            .upsert_summary(&stored_summary("/p/src/b.py", SummaryKind::File, "zz"))
            .unwrap();
        store
            .upsert_summary(&stored_summary("/p/src/a.py", SummaryKind::File, "aa"))
            .unwrap();
        // Sorted concatenation: "aa" then "zz"
        assert_eq!(tree_hash("/p/src", &store).unwrap(), string_hash("aazz"));
    }

    #[test]
    fn test_needs_summarization_missing_and_changed() {
        let store = test_store();
        let config = Config::default();

        assert!(needs_summarization("/p/a.py", "h1", &store, &config).unwrap());

        store
            .upsert_summary(&stored_summary("/p/a.py", SummaryKind::File, "h1"))
            .unwrap();
        assert!(!needs_summarization("/p/a.py", "h1", &store, &config).unwrap());
        assert!(needs_summarization("/p/a.py", "h2", &store, &config).unwrap());
    }

    #[test]
    fn test_needs_summarization_honors_needs_update_flag() {
        let store = test_store();
        let config = Config::default();
        store
            .upsert_summary(&stored_summary("/p/a.py", SummaryKind::File, "h1"))
            .unwrap();
        store.mark_needs_update("/p/a.py").unwrap();
        assert!(needs_summarization("/p/a.py", "h1", &store, &config).unwrap());
    }
}
