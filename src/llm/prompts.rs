//! Versioned prompt templates for file and directory summaries
//!
//! Templates are opaque strings with named placeholders; substitution
//! is plain textual replacement. Project overrides come from
//! `.paranoid-coder/prompts.json`, keyed `<language>:file` /
//! `<language>:directory`, and are rejected with `InvalidTemplate` when
//! a required placeholder is missing.

use std::collections::HashMap;
use std::path::Path;

use crate::config::{PARANOID_DIR, PROMPTS_FILENAME};
use crate::error::{ParanoidError, Result};
use crate::llm::context::truncate_for_context;

/// Bump when prompt wording or structure changes; stored with each summary
pub const PROMPT_VERSION: &str = "v1";

/// Placeholders every file template must contain
pub const FILE_PLACEHOLDERS: &[&str] =
    &["{filename}", "{content}", "{existing}", "{length}", "{extension}"];
/// Placeholders every directory template must contain
pub const DIRECTORY_PLACEHOLDERS: &[&str] =
    &["{dir_path}", "{children}", "{existing}", "{n_paragraphs}"];

const DEFAULT_FILE_TEMPLATE: &str = "\
Generate a concise description ({length}) for this file.
File: {filename} (extension: {extension})

Content:
{content}

Existing summary (improve if present, or write from scratch if None):
{existing}

Focus: purpose, main functions/classes, important logic, notable patterns.";

const DEFAULT_DIRECTORY_TEMPLATE: &str = "\
Create or improve a concise directory description ({n_paragraphs} paragraphs).
Directory: {dir_path}

Direct children (name, kind, summary):
{children}

Previous description (improve if present):
{existing}

Focus: overall purpose, how pieces work together, main responsibilities.";

/// Expected summary length hint from input size in characters.
/// Monotone in content length.
pub fn description_length_for_content(content: &str) -> &'static str {
    let n = content.len();
    if n < 5_000 {
        "a few lines"
    } else if n < 15_000 {
        "1-3 paragraphs"
    } else {
        "3-5 paragraphs"
    }
}

/// Template set: built-in defaults plus validated project overrides
#[derive(Debug)]
pub struct PromptLibrary {
    overrides: HashMap<String, String>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }
}

impl PromptLibrary {
    /// Load overrides from the project's prompts.json, if present.
    /// Every override is validated on load.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(PARANOID_DIR).join(PROMPTS_FILENAME);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        let raw: HashMap<String, String> =
            serde_json::from_str(&text).map_err(|e| ParanoidError::ConfigError {
                message: format!("{}: {}", path.display(), e),
            })?;

        for (key, template) in &raw {
            validate_template(key, template)?;
        }
        Ok(Self { overrides: raw })
    }

    fn template_for(&self, language: Option<&str>, kind: &str, default: &'static str) -> String {
        if let Some(language) = language {
            if let Some(template) = self.overrides.get(&format!("{}:{}", language, kind)) {
                return template.clone();
            }
        }
        if let Some(template) = self.overrides.get(&format!("default:{}", kind)) {
            return template.clone();
        }
        default.to_string()
    }

    /// Build the prompt for a file summary. Content is truncated to fit
    /// the maximum context window; an optional graph context block goes
    /// directly before the content.
    pub fn file_prompt(
        &self,
        language: Option<&str>,
        filename: &str,
        extension: &str,
        content: &str,
        existing: Option<&str>,
        graph_context: Option<&str>,
    ) -> String {
        let template = self.template_for(language, "file", DEFAULT_FILE_TEMPLATE);
        let reserved = template.len()
            + filename.len()
            + existing.map_or(4, str::len)
            + graph_context.map_or(0, str::len)
            + 64;
        let truncated = truncate_for_context(content, reserved);
        let body = match graph_context {
            Some(context) => format!("{}\n\n{}", context, truncated),
            None => truncated.to_string(),
        };

        template
            .replace("{filename}", filename)
            .replace("{extension}", extension)
            .replace("{length}", description_length_for_content(content))
            .replace("{existing}", existing.unwrap_or("None").trim())
            .replace("{content}", &body)
    }

    /// Build the prompt for a directory summary from its children.
    /// `children` is the formatted (name, kind, one-line description)
    /// list; the root directory gets a longer target.
    pub fn directory_prompt(
        &self,
        language: Option<&str>,
        dir_path: &str,
        children: &str,
        existing: Option<&str>,
        is_root: bool,
    ) -> String {
        let template = self.template_for(language, "directory", DEFAULT_DIRECTORY_TEMPLATE);
        let n_paragraphs = if is_root { "5-10" } else { "1-5" };
        let children_text = if children.is_empty() {
            "(empty)"
        } else {
            children
        };

        template
            .replace("{dir_path}", dir_path)
            .replace("{n_paragraphs}", n_paragraphs)
            .replace("{existing}", existing.unwrap_or("None").trim())
            .replace("{children}", children_text)
    }
}

/// Check that a template carries every placeholder its key requires.
/// Keys look like `python:file` or `default:directory`.
pub fn validate_template(key: &str, template: &str) -> Result<()> {
    let required: &[&str] = if key.ends_with(":file") {
        FILE_PLACEHOLDERS
    } else if key.ends_with(":directory") {
        DIRECTORY_PLACEHOLDERS
    } else {
        return Err(ParanoidError::InvalidTemplate {
            key: key.to_string(),
            placeholder: "(key must end in :file or :directory)".to_string(),
        });
    };

    for placeholder in required {
        if !template.contains(placeholder) {
            return Err(ParanoidError::InvalidTemplate {
                key: key.to_string(),
                placeholder: placeholder.to_string(),
            });
        }
    }
    Ok(())
}
