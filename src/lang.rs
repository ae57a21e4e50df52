//! Language detection and tree-sitter grammar loading

use std::path::Path;
use tree_sitter::Language;

use crate::error::{ParanoidError, Result};

/// Languages the graph extractor supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Python,
    JavaScript,
    Jsx,
    TypeScript,
    Tsx,
}

impl Lang {
    /// Detect language from file path extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ParanoidError::UnsupportedLanguage {
                extension: "none".to_string(),
            })?;

        Self::from_extension(ext)
    }

    /// Detect language from file extension string
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_lowercase().as_str() {
            "py" | "pyi" => Ok(Self::Python),
            "js" | "mjs" | "cjs" => Ok(Self::JavaScript),
            "jsx" => Ok(Self::Jsx),
            "ts" | "mts" | "cts" => Ok(Self::TypeScript),
            "tsx" => Ok(Self::Tsx),
            _ => Err(ParanoidError::UnsupportedLanguage {
                extension: ext.to_string(),
            }),
        }
    }

    /// Language label stored on summaries and entities
    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Jsx => "jsx",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
        }
    }

    /// Get the tree-sitter Language for parsing
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::JavaScript | Self::Jsx => tree_sitter_javascript::LANGUAGE.into(),
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Grammar family used for node-kind lookup during extraction.
    /// JSX shares the JavaScript grammar; TSX shares TypeScript.
    pub fn family(&self) -> LangFamily {
        match self {
            Self::Python => LangFamily::Python,
            Self::JavaScript | Self::Jsx => LangFamily::JavaScript,
            Self::TypeScript | Self::Tsx => LangFamily::TypeScript,
        }
    }

    /// Language label for a path, or "unknown" when unsupported.
    /// Used for the summaries table; directories get their label elsewhere.
    pub fn label_for_path(path: &Path) -> String {
        Self::from_path(path)
            .map(|l| l.name().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

/// Grammar families for shared extraction logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LangFamily {
    Python,
    JavaScript,
    TypeScript,
}
