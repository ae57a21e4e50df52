//! Configuration loading and project root discovery
//!
//! Merge order: built-in defaults, then the global config at
//! `~/.paranoid/config.json`, then the project config at
//! `<project>/.paranoid-coder/config.json`. JSON objects merge
//! recursively; scalars and arrays override. The merged config is read
//! once per command and passed by reference.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ParanoidError, Result};

/// Directory name inside a target project that holds the engine's data
pub const PARANOID_DIR: &str = ".paranoid-coder";
/// Database file name inside the project data directory
pub const SUMMARIES_DB: &str = "summaries.db";
/// Config file name (global and project)
pub const CONFIG_FILENAME: &str = "config.json";
/// Prompt override file name inside the project data directory
pub const PROMPTS_FILENAME: &str = "prompts.json";

/// Merged configuration for a single command invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_model: String,
    pub default_embedding_model: String,
    pub default_classifier_model: String,
    pub ollama_host: String,
    /// 0 = isolated, 1 = with graph context, 2 = with RAG (reserved, behaves as 1)
    pub default_context_level: u8,
    /// Per-call timeout for model host requests
    pub request_timeout_secs: u64,
    pub smart_invalidation: SmartInvalidation,
    pub ignore: IgnoreConfig,
    pub logging: LoggingConfig,
}

/// Thresholds for re-summarizing a file when its graph context drifts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartInvalidation {
    pub callers_threshold: i64,
    pub callees_threshold: i64,
    pub re_summarize_on_imports_change: bool,
}

/// Ignore pattern options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    pub use_gitignore: bool,
    pub builtin_patterns: Vec<String>,
    pub additional_patterns: Vec<String>,
}

/// Logging options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: "qwen2.5-coder:7b".to_string(),
            default_embedding_model: "nomic-embed-text".to_string(),
            default_classifier_model: "qwen2.5-coder:1.5b".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            default_context_level: 1,
            request_timeout_secs: 120,
            smart_invalidation: SmartInvalidation::default(),
            ignore: IgnoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SmartInvalidation {
    fn default() -> Self {
        Self {
            callers_threshold: 3,
            callees_threshold: 3,
            re_summarize_on_imports_change: true,
        }
    }
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            builtin_patterns: vec![".git/".to_string(), format!("{}/", PARANOID_DIR)],
            additional_patterns: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Path to the global config file (`~/.paranoid/config.json`)
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".paranoid").join(CONFIG_FILENAME))
}

/// Path to the project-local config (`<project>/.paranoid-coder/config.json`)
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PARANOID_DIR).join(CONFIG_FILENAME)
}

/// Merge `overlay` into `base` recursively. Objects merge key-by-key;
/// anything else in the overlay replaces the base value.
fn deep_merge(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn load_json_file(path: &Path) -> Result<Option<serde_json::Value>> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    let value = serde_json::from_str(&text).map_err(|e| ParanoidError::ConfigError {
        message: format!("{}: {}", path.display(), e),
    })?;
    Ok(Some(value))
}

/// Load merged configuration. When `project_root` is None only defaults
/// and the global config participate.
pub fn load_config(project_root: Option<&Path>) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default()).expect("default config serializes");

    if let Some(global_path) = global_config_path() {
        if let Some(value) = load_json_file(&global_path)? {
            deep_merge(&mut merged, value);
        }
    }

    if let Some(root) = project_root {
        if let Some(value) = load_json_file(&project_config_path(root))? {
            deep_merge(&mut merged, value);
        }
    }

    serde_json::from_value(merged).map_err(|e| ParanoidError::ConfigError {
        message: format!("invalid configuration: {}", e),
    })
}

/// Return absolute, normalized path as a posix-style string. Storage
/// keys, entity file paths, and relationship locations all use this form.
pub fn normalize_path(path: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let canonical = absolute.canonicalize().unwrap_or(absolute);
    canonical.to_string_lossy().replace('\\', "/")
}

/// Walk upward from `path` looking for a directory containing
/// `.paranoid-coder`. Returns None when no project is found.
pub fn find_project_root(path: &Path) -> Option<PathBuf> {
    let start = path.canonicalize().ok()?;
    let mut current = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start
    };
    loop {
        if current.join(PARANOID_DIR).is_dir() {
            return Some(current);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
}

/// Like [`find_project_root`] but errors with `NoProjectFound`.
/// Use for every command except init.
pub fn require_project_root(path: &Path) -> Result<PathBuf> {
    find_project_root(path).ok_or_else(|| ParanoidError::NoProjectFound {
        path: path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_model, "qwen2.5-coder:7b");
        assert_eq!(config.default_context_level, 1);
        assert_eq!(config.smart_invalidation.callers_threshold, 3);
        assert!(config.ignore.use_gitignore);
        assert!(config
            .ignore
            .builtin_patterns
            .contains(&".paranoid-coder/".to_string()));
    }

    #[test]
    fn test_deep_merge_nested() {
        let mut base = serde_json::json!({
            "default_model": "a",
            "smart_invalidation": {"callers_threshold": 3, "callees_threshold": 3}
        });
        let overlay = serde_json::json!({
            "smart_invalidation": {"callers_threshold": 10}
        });
        deep_merge(&mut base, overlay);
        assert_eq!(base["default_model"], "a");
        assert_eq!(base["smart_invalidation"]["callers_threshold"], 10);
        assert_eq!(base["smart_invalidation"]["callees_threshold"], 3);
    }

    #[test]
    fn test_project_config_overrides() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join(PARANOID_DIR);
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(
            data_dir.join(CONFIG_FILENAME),
            r#"{"default_model": "llama3:8b", "smart_invalidation": {"callers_threshold": 7}}"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path())).unwrap();
        assert_eq!(config.default_model, "llama3:8b");
        assert_eq!(config.smart_invalidation.callers_threshold, 7);
        // Untouched keys keep defaults
        assert_eq!(config.default_embedding_model, "nomic-embed-text");
    }

    #[test]
    fn test_invalid_project_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join(PARANOID_DIR);
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(data_dir.join(CONFIG_FILENAME), "{not json").unwrap();

        assert!(load_config(Some(dir.path())).is_err());
    }

    #[test]
    fn test_find_project_root_walks_up() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(PARANOID_DIR)).unwrap();
        let nested = dir.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();

        let found = find_project_root(&nested).unwrap();
        assert_eq!(
            found.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_require_project_root_fails_outside() {
        let dir = TempDir::new().unwrap();
        let err = require_project_root(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ParanoidError::NoProjectFound { .. }
        ));
    }

    #[test]
    fn test_normalize_path_uses_forward_slashes() {
        let dir = TempDir::new().unwrap();
        let normalized = normalize_path(dir.path());
        assert!(!normalized.contains('\\'));
    }
}
