//! Error types and exit codes for paranoid-engine

use std::process::ExitCode;
use thiserror::Error;

/// Main error type for paranoid-engine operations
#[derive(Error, Debug)]
pub enum ParanoidError {
    #[error("No paranoid project found for {path}. Run 'paranoid init' in the project directory first.")]
    NoProjectFound { path: String },

    #[error("Project already initialized at {path}")]
    AlreadyInitialized { path: String },

    #[error("Unsupported language for extension: {extension}")]
    UnsupportedLanguage { extension: String },

    #[error("Failed to parse {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Model host unreachable at {host}: {message}")]
    ModelHostUnreachable { host: String, message: String },

    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    #[error("Model error: {message}")]
    ModelError { message: String },

    #[error("Vector index is empty. Run 'paranoid index' to embed summaries first.")]
    IndexEmpty,

    #[error("Database schema version {found} is newer than supported version {supported}. Upgrade paranoid-engine.")]
    SchemaIncompatible { found: i64, supported: i64 },

    #[error("Invalid prompt template '{key}': missing placeholder {placeholder}")]
    InvalidTemplate { key: String, placeholder: String },

    #[error("Prompt exceeds maximum context window: {message}")]
    ContextOverflow { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParanoidError {
    /// Convert error to exit code:
    /// - 0: Success
    /// - 1: IO / storage / model host errors
    /// - 2: No project / already initialized misuse
    /// - 3: Parse or language failures
    /// - 4: Query failures (empty index, bad template, overflow)
    /// - 5: Schema or config incompatibility
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::NoProjectFound { .. } | Self::AlreadyInitialized { .. } => ExitCode::from(2),
            Self::UnsupportedLanguage { .. } | Self::ParseError { .. } => ExitCode::from(3),
            Self::IndexEmpty | Self::InvalidTemplate { .. } | Self::ContextOverflow { .. } => {
                ExitCode::from(4)
            }
            Self::SchemaIncompatible { .. } | Self::ConfigError { .. } => ExitCode::from(5),
            Self::ModelHostUnreachable { .. }
            | Self::ModelNotFound { .. }
            | Self::ModelError { .. }
            | Self::Storage(_)
            | Self::Io(_) => ExitCode::from(1),
        }
    }

    /// Short machine-readable kind tag for structured error output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoProjectFound { .. } => "no_project_found",
            Self::AlreadyInitialized { .. } => "already_initialized",
            Self::UnsupportedLanguage { .. } => "unsupported_language",
            Self::ParseError { .. } => "parse_error",
            Self::ModelHostUnreachable { .. } => "model_host_unreachable",
            Self::ModelNotFound { .. } => "model_not_found",
            Self::ModelError { .. } => "model_error",
            Self::IndexEmpty => "index_empty",
            Self::SchemaIncompatible { .. } => "schema_incompatible",
            Self::InvalidTemplate { .. } => "invalid_template",
            Self::ContextOverflow { .. } => "context_overflow",
            Self::ConfigError { .. } => "config_error",
            Self::Storage(_) => "storage_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Suggested remedy for structured error output; None when there is no obvious one
    pub fn remedy(&self) -> Option<&'static str> {
        match self {
            Self::NoProjectFound { .. } => Some("paranoid init"),
            Self::IndexEmpty => Some("paranoid index"),
            Self::ModelHostUnreachable { .. } => Some("start the local model host (ollama serve)"),
            Self::ModelNotFound { .. } => Some("pull the model (ollama pull <model>)"),
            Self::SchemaIncompatible { .. } => Some("upgrade paranoid-engine"),
            _ => None,
        }
    }
}

/// Result type alias for paranoid-engine operations
pub type Result<T> = std::result::Result<T, ParanoidError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of(error: &ParanoidError) -> String {
        // ExitCode has no PartialEq; its Debug form carries the value
        format!("{:?}", error.exit_code())
    }

    #[test]
    fn test_exit_codes() {
        let e = ParanoidError::NoProjectFound {
            path: "/tmp/x".into(),
        };
        assert_eq!(code_of(&e), format!("{:?}", ExitCode::from(2)));

        let e = ParanoidError::IndexEmpty;
        assert_eq!(code_of(&e), format!("{:?}", ExitCode::from(4)));

        let e = ParanoidError::SchemaIncompatible {
            found: 9,
            supported: 4,
        };
        assert_eq!(code_of(&e), format!("{:?}", ExitCode::from(5)));
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(ParanoidError::IndexEmpty.kind(), "index_empty");
        assert_eq!(
            ParanoidError::ModelNotFound {
                model: "m".into()
            }
            .kind(),
            "model_not_found"
        );
    }

    #[test]
    fn test_remedies() {
        assert_eq!(
            ParanoidError::NoProjectFound { path: "p".into() }.remedy(),
            Some("paranoid init")
        );
        assert!(ParanoidError::ContextOverflow {
            message: "big".into()
        }
        .remedy()
        .is_none());
    }
}
