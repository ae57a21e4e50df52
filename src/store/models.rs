//! Data models backing the per-project store

use serde::{Deserialize, Serialize};

/// Whether a summary describes a file or a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    File,
    Directory,
}

impl SummaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "directory" => Some(Self::Directory),
            _ => None,
        }
    }
}

/// A single file or directory summary stored in the database.
///
/// `path` is the primary key: an absolute, normalized posix-style path.
/// `hash` is the content hash for files and the tree hash for directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub path: String,
    pub kind: SummaryKind,
    pub hash: String,
    pub description: String,
    pub file_extension: Option<String>,
    pub language: Option<String>,
    pub error: Option<String>,
    pub needs_update: bool,

    // Model metadata
    pub model: String,
    pub model_version: Option<String>,
    pub prompt_version: String,
    /// 0 = isolated, 1 = with graph context, 2 = with RAG (reserved)
    pub context_level: u8,

    // RFC 3339 UTC timestamps
    pub generated_at: String,
    pub updated_at: String,

    pub tokens_used: Option<i64>,
    pub generation_time_ms: Option<i64>,
}

/// Kinds of code entities the extractor emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Class,
    Function,
    Method,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Function => "function",
            Self::Method => "method",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "class" => Some(Self::Class),
            "function" => Some(Self::Function),
            "method" => Some(Self::Method),
            _ => None,
        }
    }
}

/// A code entity (class, function, or method) extracted by static parsing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Database id; None before insert
    pub id: Option<i64>,
    pub file_path: String,
    pub kind: EntityKind,
    pub name: String,
    /// Dotted concatenation of enclosing names, e.g. `Outer.Inner.method`
    pub qualified_name: String,
    /// Enclosing class qualified name (for methods)
    pub parent_name: Option<String>,
    pub parent_entity_id: Option<i64>,
    pub start_line: i64,
    pub end_line: i64,
    pub docstring: Option<String>,
    pub signature: Option<String>,
    pub language: String,
}

/// Directed edge kinds between entities and files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Calls,
    Imports,
    Inherits,
    Instantiates,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::Imports => "imports",
            Self::Inherits => "inherits",
            Self::Instantiates => "instantiates",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "calls" => Some(Self::Calls),
            "imports" => Some(Self::Imports),
            "inherits" => Some(Self::Inherits),
            "instantiates" => Some(Self::Instantiates),
            _ => None,
        }
    }
}

/// A directed relationship between entities or files.
///
/// For imports, `to_file` carries the raw imported module path. For
/// unresolved calls and inheritance, `to_entity_id` stays None and
/// `to_file` keeps the textual target name as a hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Option<i64>,
    pub kind: RelationKind,
    pub from_entity_id: Option<i64>,
    pub to_entity_id: Option<i64>,
    pub from_file: Option<String>,
    pub to_file: Option<String>,
    /// Source location as `file:line`
    pub location: Option<String>,
    /// Qualified name of the source entity, used to resolve
    /// `from_entity_id` before storage; not persisted.
    #[serde(skip)]
    pub from_entity_qualified_name: Option<String>,
}

/// Snapshot of a file's graph context at summarization time, used by
/// smart invalidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryContext {
    pub path: String,
    /// SHA-256 of the sorted, deduplicated imported module names
    pub imports_hash: String,
    pub callers_count: i64,
    pub callees_count: i64,
    pub context_version: String,
}

/// Per-entity documentation quality heuristics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocQuality {
    pub entity_id: i64,
    pub has_docstring: bool,
    pub has_examples: bool,
    pub has_type_hints: bool,
    pub priority_score: i64,
    pub last_reviewed: Option<String>,
}

/// An ignore pattern recorded in the append-only audit table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnorePatternRow {
    pub id: Option<i64>,
    pub pattern: String,
    pub added_at: String,
    pub source: String,
}

/// Aggregated statistics over stored summaries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectStats {
    /// kind -> count ("file", "directory")
    pub count_by_kind: Vec<(String, i64)>,
    /// language -> file count, descending
    pub count_by_language: Vec<(String, i64)>,
    /// model -> count, descending
    pub model_breakdown: Vec<(String, i64)>,
    pub last_updated_at: Option<String>,
}
