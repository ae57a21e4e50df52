//! Common test fixtures for paranoid-engine integration tests
//!
//! Provides a `TestProject` builder (temp directory + initialized
//! store) and a recording `MockHost` so no test needs a live model
//! host.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::TempDir;

use paranoid_engine::config::{normalize_path, Config};
use paranoid_engine::error::Result;
use paranoid_engine::ignore::IgnoreMatcher;
use paranoid_engine::llm::prompts::PromptLibrary;
use paranoid_engine::llm::{GenerateOptions, Generation, ModelHost};
use paranoid_engine::store::Store;

/// Builder for a temp project with an initialized store
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add a source file, creating parent directories
    pub fn add_file(&self, relative_path: &str, content: &str) -> &Self {
        let full_path = self.dir.path().join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("failed to write file");
        self
    }

    pub fn remove_file(&self, relative_path: &str) -> &Self {
        fs::remove_file(self.dir.path().join(relative_path)).expect("failed to remove file");
        self
    }

    /// Normalized storage key for a relative path
    pub fn key(&self, relative_path: &str) -> String {
        normalize_path(&self.dir.path().join(relative_path))
    }

    pub fn root_key(&self) -> String {
        normalize_path(self.dir.path())
    }

    /// Initialize the project and open its store
    pub fn init(&self) -> Store {
        Store::create(self.dir.path()).expect("failed to create store")
    }

    pub fn open(&self) -> Store {
        Store::open(self.dir.path()).expect("failed to open store")
    }

    pub fn matcher(&self) -> IgnoreMatcher {
        let config = Config::default();
        IgnoreMatcher::build(self.dir.path(), &config).expect("failed to build matcher")
    }

    pub fn config(&self) -> Config {
        Config::default()
    }

    pub fn prompts(&self) -> PromptLibrary {
        PromptLibrary::load(self.dir.path()).expect("failed to load prompts")
    }

    pub fn join(&self, relative_path: &str) -> PathBuf {
        self.dir.path().join(relative_path)
    }
}

/// Recording model host. Generates `S(<name>)` for summaries, a fixed
/// classifier label, and deterministic embeddings derived from the
/// input text.
pub struct MockHost {
    pub classifier_label: Mutex<String>,
    pub generate_calls: Mutex<Vec<String>>,
    pub embed_calls: Mutex<Vec<Vec<String>>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            classifier_label: Mutex::new("EXPLANATION".to_string()),
            generate_calls: Mutex::new(Vec::new()),
            embed_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_label(label: &str) -> Self {
        let host = Self::new();
        *host.classifier_label.lock() = label.to_string();
        host
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.lock().len()
    }

    pub fn embed_count(&self) -> usize {
        self.embed_calls.lock().len()
    }

    /// Deterministic 4-dim embedding from byte sums, so distinct texts
    /// land at distinct points
    fn embedding_for(text: &str) -> Vec<f32> {
        let mut acc = [0u32; 4];
        for (index, byte) in text.bytes().enumerate() {
            acc[index % 4] = acc[index % 4].wrapping_add(byte as u32);
        }
        acc.iter().map(|v| (*v % 997) as f32 / 997.0).collect()
    }
}

impl ModelHost for MockHost {
    fn generate(&self, _model: &str, prompt: &str, _options: &GenerateOptions) -> Result<Generation> {
        self.generate_calls.lock().push(prompt.to_string());
        let target = prompt
            .lines()
            .find_map(|line| {
                line.strip_prefix("File: ")
                    .or_else(|| line.strip_prefix("Directory: "))
            })
            .unwrap_or("answer");
        let name = target
            .split_whitespace()
            .next()
            .unwrap_or("answer")
            .rsplit('/')
            .next()
            .unwrap_or("answer");
        Ok(Generation {
            text: format!("S({})", name),
            model_version: Some("mock-1".to_string()),
            tokens_used: Some(12),
            elapsed_ms: Some(3),
        })
    }

    fn generate_simple(&self, _model: &str, _prompt: &str) -> Result<String> {
        Ok(self.classifier_label.lock().clone())
    }

    fn embed(&self, _model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_calls.lock().push(inputs.to_vec());
        Ok(inputs.iter().map(|text| Self::embedding_for(text)).collect())
    }
}
