//! Ignore pattern matching
//!
//! Gitignore-style semantics via the `ignore` crate: `*`, `**`, `?`,
//! character classes, `!` negation, trailing `/` for directory-only
//! patterns, `#` comments and blank lines. Built-in patterns (the VCS
//! directory and the project data directory) always apply, then
//! `.paranoidignore`, then `.gitignore` when enabled, then configured
//! additional patterns. Matching is relative to the project root.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::config::{Config, IgnoreConfig};
use crate::error::{ParanoidError, Result};
use crate::store::Store;

/// File name for engine-specific ignore patterns at the project root
pub const PARANOIDIGNORE: &str = ".paranoidignore";
/// Standard VCS ignore file
pub const GITIGNORE: &str = ".gitignore";

/// Compiled ignore matcher for one project
pub struct IgnoreMatcher {
    project_root: PathBuf,
    matcher: Gitignore,
    /// (pattern, source) pairs the matcher was built from, for the
    /// store's audit table. Source is one of "builtin", "file",
    /// "gitignore", "additional".
    patterns: Vec<(String, String)>,
}

/// Read a gitignore-style file and return its non-empty pattern lines
fn parse_ignore_file(path: &Path) -> Vec<String> {
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

impl IgnoreMatcher {
    /// Build the matcher from config and the project's ignore files
    pub fn build(project_root: &Path, config: &Config) -> Result<Self> {
        Self::build_with(project_root, &config.ignore)
    }

    pub fn build_with(project_root: &Path, ignore_config: &IgnoreConfig) -> Result<Self> {
        let mut patterns: Vec<(String, String)> = Vec::new();

        for pattern in &ignore_config.builtin_patterns {
            patterns.push((pattern.clone(), "builtin".to_string()));
        }
        for pattern in parse_ignore_file(&project_root.join(PARANOIDIGNORE)) {
            patterns.push((pattern, "file".to_string()));
        }
        if ignore_config.use_gitignore {
            for pattern in parse_ignore_file(&project_root.join(GITIGNORE)) {
                patterns.push((pattern, "gitignore".to_string()));
            }
        }
        for pattern in &ignore_config.additional_patterns {
            patterns.push((pattern.clone(), "additional".to_string()));
        }

        let mut builder = GitignoreBuilder::new(project_root);
        for (pattern, _) in &patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| ParanoidError::ConfigError {
                    message: format!("invalid ignore pattern '{}': {}", pattern, e),
                })?;
        }
        let matcher = builder.build().map_err(|e| ParanoidError::ConfigError {
            message: format!("failed to build ignore matcher: {}", e),
        })?;

        Ok(Self {
            project_root: project_root.to_path_buf(),
            matcher,
            patterns,
        })
    }

    /// Whether a path is excluded from indexing. Paths outside the
    /// project root never match.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        if path.strip_prefix(&self.project_root).is_err() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }

    /// The pattern list this matcher was built from
    pub fn patterns(&self) -> &[(String, String)] {
        &self.patterns
    }

    /// Mirror the current pattern set into the store's audit table,
    /// replacing each source that appears in the list.
    pub fn sync_to_store(&self, store: &Store) -> Result<()> {
        let mut by_source: std::collections::BTreeMap<&str, Vec<String>> = Default::default();
        for (pattern, source) in &self.patterns {
            by_source.entry(source).or_default().push(pattern.clone());
        }
        for (source, patterns) in by_source {
            store.set_ignore_patterns_for_source(source, &patterns)?;
        }
        Ok(())
    }
}
