//! Query classification for the hybrid ask router
//!
//! A small model labels the question USAGE, DEFINITION, EXPLANATION, or
//! GENERATION; a regex pass extracts a candidate entity name. Host
//! failures and unrecognized outputs fall back to EXPLANATION so a dead
//! classifier never blocks the RAG path.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::llm::ModelHost;

const CLASSIFY_PROMPT: &str = r#"Classify this code query into ONE category:
- USAGE: asks where/how something is used (e.g., "where is X called?", "what uses Y?")
- DEFINITION: asks what/where something is (e.g., "where is class X?", "find function Y")
- EXPLANATION: asks how/why something works (e.g., "explain X", "how does Y work?")
- GENERATION: asks to create/write code (e.g., "write a function", "generate tests")

Query: "{query}"

Category (one word):"#;

/// Routing label for a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Usage,
    Definition,
    Explanation,
    Generation,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usage => "usage",
            Self::Definition => "definition",
            Self::Explanation => "explanation",
            Self::Generation => "generation",
        }
    }
}

/// Classification outcome with the extracted entity candidate
#[derive(Debug, Clone)]
pub struct ClassifiedQuery {
    pub query_type: QueryType,
    pub entity_name: Option<String>,
}

// Entity extraction patterns; first match wins. Captures identifier-like
// names (bare words and Class.method chains).
static ENTITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)where\s+is\s+(?P<entity>[\w.]+)\s+(?:used|called|defined)",
        r"(?i)where\s+are\s+(?P<entity>[\w.]+)\s+(?:used|called|defined)",
        r"(?i)(?:who|what)\s+calls\s+(?P<entity>[\w.]+)",
        r"(?i)find\s+(?:all\s+)?usages?\s+of\s+(?P<entity>[\w.]+)",
        r"(?i)find\s+(?:the\s+)?(?P<entity>[\w.]+)",
        r"(?i)references?\s+to\s+(?P<entity>[\w.]+)",
        r"(?i)explain\s+how\s+(?P<entity>[\w.]+)\s+works?",
        r"(?i)explain\s+(?P<entity>[\w.]+)",
        r"(?i)how\s+does\s+(?P<entity>[\w.]+)\s+(?:work|function)",
        r"(?i)what\s+does\s+(?P<entity>[\w.]+)\s+do",
        r"(?i)describe\s+(?P<entity>[\w.]+)",
        r"(?i)tell\s+me\s+about\s+(?P<entity>[\w.]+)",
        r"(?i)what\s+is\s+(?P<entity>[\w.]+)\s*\??",
        r"(?i)where\s+is\s+(?P<entity>[\w.]+)\s*\??",
        r"(?i)definition\s+of\s+(?P<entity>[\w.]+)",
        r"(?i)define\s+(?P<entity>[\w.]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid pattern"))
    .collect()
});

/// Extract a candidate entity name from a question
pub fn extract_entity(query: &str) -> Option<String> {
    let trimmed = query.trim();
    for pattern in ENTITY_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(trimmed) {
            if let Some(entity) = captures.name("entity") {
                let name = entity.as_str().trim_matches('.');
                if !name.is_empty() && !is_stopword(name) {
                    return Some(name.to_string());
                }
            }
        }
    }
    None
}

/// Filler words the patterns sometimes capture instead of a name
fn is_stopword(word: &str) -> bool {
    matches!(
        word.to_lowercase().as_str(),
        "how" | "the" | "a" | "an" | "is" | "it" | "this" | "that" | "do" | "does"
    )
}

/// Parse the classifier's raw output, defaulting to EXPLANATION
fn parse_category(raw: &str) -> QueryType {
    let upper = raw.trim().to_uppercase();
    let first = upper.split_whitespace().next().unwrap_or("");
    match first {
        "USAGE" => QueryType::Usage,
        "DEFINITION" => QueryType::Definition,
        "GENERATION" => QueryType::Generation,
        "EXPLANATION" => QueryType::Explanation,
        _ => {
            // Tolerate extra prose around the label
            if upper.contains("USAGE") {
                QueryType::Usage
            } else if upper.contains("DEFINITION") {
                QueryType::Definition
            } else if upper.contains("GENERATION") {
                QueryType::Generation
            } else {
                QueryType::Explanation
            }
        }
    }
}

/// Classify a question using the configured classifier model. Any host
/// error degrades to EXPLANATION with whatever entity the regex found.
pub fn classify_query(
    host: &dyn ModelHost,
    classifier_model: &str,
    query: &str,
) -> ClassifiedQuery {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return ClassifiedQuery {
            query_type: QueryType::Explanation,
            entity_name: None,
        };
    }

    let prompt = CLASSIFY_PROMPT.replace("{query}", trimmed);
    let query_type = match host.generate_simple(classifier_model, &prompt) {
        Ok(response) => parse_category(&response),
        Err(e) => {
            tracing::debug!("classifier unavailable, falling back to explanation: {}", e);
            QueryType::Explanation
        }
    };

    let entity_name = match query_type {
        QueryType::Generation => None,
        _ => extract_entity(trimmed),
    };

    ClassifiedQuery {
        query_type,
        entity_name,
    }
}
