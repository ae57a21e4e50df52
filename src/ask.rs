//! Hybrid query routing
//!
//! Factual questions (usage, definition) resolve directly against the
//! code graph with no answer-model call; explanatory and generative
//! questions go through vector retrieval plus synthesis. Classifier
//! failures and unresolvable entities degrade to the RAG path.

use std::path::Path;

use serde::Serialize;

use crate::config::Config;
use crate::error::{ParanoidError, Result};
use crate::graph::GraphQueries;
use crate::llm::classifier::{classify_query, extract_entity, ClassifiedQuery, QueryType};
use crate::llm::context::truncate_for_context;
use crate::llm::{GenerateOptions, ModelHost};
use crate::store::Store;

const EXPLANATION_SYSTEM: &str = "You are answering a question about a codebase. Use only the \
following codebase summaries. If the answer is not in the summaries, say so. Be concise and \
cite paths when relevant.";

const GENERATION_SYSTEM: &str = "You are writing code for an existing codebase. Use the \
following codebase summaries for conventions and context. Produce the requested code with a \
brief explanation, matching the project's style.";

/// How many nearest summaries to retrieve by default
pub const DEFAULT_TOP_K: usize = 5;

/// Options for one ask invocation
#[derive(Debug, Clone)]
pub struct AskOptions {
    /// Route everything through retrieval + synthesis
    pub force_rag: bool,
    pub top_k: usize,
    /// Also retrieve entity vectors when present
    pub include_entities: bool,
    pub model: Option<String>,
    pub embedding_model: Option<String>,
    pub classifier_model: Option<String>,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self {
            force_rag: false,
            top_k: DEFAULT_TOP_K,
            include_entities: true,
            model: None,
            embedding_model: None,
            classifier_model: None,
        }
    }
}

/// Which pipeline produced the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AskRoute {
    GraphUsage,
    GraphDefinition,
    RagExplanation,
    RagGeneration,
}

/// One source backing the response
#[derive(Debug, Clone, Serialize)]
pub struct AskSource {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    pub preview: String,
}

/// Router output: answer text plus structured sources
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub route: AskRoute,
    pub query_type: QueryType,
    pub answer: String,
    pub sources: Vec<AskSource>,
}

/// Answer a natural-language question about the project
pub fn run_ask(
    store: &Store,
    project_root: &Path,
    config: &Config,
    host: &dyn ModelHost,
    question: &str,
    options: &AskOptions,
) -> Result<AskResponse> {
    let classified = if options.force_rag {
        ClassifiedQuery {
            query_type: QueryType::Explanation,
            entity_name: extract_entity(question),
        }
    } else {
        let classifier_model = options
            .classifier_model
            .clone()
            .unwrap_or_else(|| config.default_classifier_model.clone());
        classify_query(host, &classifier_model, question)
    };

    let graph = GraphQueries::new(store, project_root);

    if !options.force_rag {
        if let Some(entity_name) = classified.entity_name.as_deref() {
            match classified.query_type {
                QueryType::Usage => {
                    if let Some(response) = answer_usage(&graph, entity_name)? {
                        return Ok(response);
                    }
                }
                QueryType::Definition => {
                    if let Some(response) = answer_definition(&graph, entity_name)? {
                        return Ok(response);
                    }
                }
                _ => {}
            }
        }
    }

    answer_with_rag(store, &graph, config, host, question, &classified, options)
}

/// USAGE fast path: exactly one definition resolves, return its
/// callers with no answer-model call. Zero or ambiguous matches fall
/// back to RAG.
fn answer_usage(graph: &GraphQueries<'_>, entity_name: &str) -> Result<Option<AskResponse>> {
    let definitions = graph.find_definition(entity_name)?;
    if definitions.len() != 1 {
        return Ok(None);
    }
    let entity = &definitions[0];
    let Some(entity_id) = entity.id else {
        return Ok(None);
    };

    let callers = graph.get_callers(entity_id)?;
    let mut answer = format!(
        "{} caller(s) of {}:\n",
        callers.len(),
        entity.qualified_name
    );
    let sources: Vec<AskSource> = callers
        .iter()
        .map(|caller| {
            answer.push_str(&format!(
                "  {} ({})\n",
                caller.qualified_name,
                caller.location.as_deref().unwrap_or(&caller.file_path),
            ));
            AskSource {
                path: caller.file_path.clone(),
                qualified_name: Some(caller.qualified_name.clone()),
                location: caller.location.clone(),
                relevance: None,
                preview: String::new(),
            }
        })
        .collect();

    Ok(Some(AskResponse {
        route: AskRoute::GraphUsage,
        query_type: QueryType::Usage,
        answer: answer.trim_end().to_string(),
        sources,
    }))
}

/// DEFINITION fast path: return all matches with signature and
/// docstring preview, no answer-model call
fn answer_definition(graph: &GraphQueries<'_>, entity_name: &str) -> Result<Option<AskResponse>> {
    let definitions = graph.find_definition(entity_name)?;
    if definitions.is_empty() {
        return Ok(None);
    }

    let mut answer = format!("{} definition(s) of {}:\n", definitions.len(), entity_name);
    let sources: Vec<AskSource> = definitions
        .iter()
        .map(|entity| {
            let location = format!("{}:{}", entity.file_path, entity.start_line);
            answer.push_str(&format!(
                "  {} {} ({})\n",
                entity.kind.as_str(),
                entity.qualified_name,
                location
            ));
            AskSource {
                path: entity.file_path.clone(),
                qualified_name: Some(entity.qualified_name.clone()),
                location: Some(location),
                relevance: None,
                preview: preview(entity.docstring.as_deref().unwrap_or("")),
            }
        })
        .collect();

    Ok(Some(AskResponse {
        route: AskRoute::GraphDefinition,
        query_type: QueryType::Definition,
        answer: answer.trim_end().to_string(),
        sources,
    }))
}

/// Retrieval + synthesis path for explanation and generation queries
fn answer_with_rag(
    store: &Store,
    graph: &GraphQueries<'_>,
    config: &Config,
    host: &dyn ModelHost,
    question: &str,
    classified: &ClassifiedQuery,
    options: &AskOptions,
) -> Result<AskResponse> {
    if store.summary_vector_count()? == 0 {
        return Err(ParanoidError::IndexEmpty);
    }

    let embedding_model = options
        .embedding_model
        .clone()
        .unwrap_or_else(|| config.default_embedding_model.clone());
    let model = options
        .model
        .clone()
        .unwrap_or_else(|| config.default_model.clone());

    let query_embedding = host
        .embed(&embedding_model, &[question.to_string()])?
        .into_iter()
        .next()
        .ok_or_else(|| ParanoidError::ModelError {
            message: "embed returned no vector for the question".to_string(),
        })?;

    let mut hits = store.nearest_summaries(&query_embedding, options.top_k)?;
    if options.include_entities && store.entity_vector_count()? > 0 {
        hits.extend(store.nearest_entities(&query_embedding, options.top_k)?);
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(options.top_k);
    }

    // Most similar first in the context block
    let context_body = hits
        .iter()
        .map(|hit| format!("--- {} ---\n{}", hit.path, hit.description))
        .collect::<Vec<_>>()
        .join("\n\n");

    let system = match classified.query_type {
        QueryType::Generation => GENERATION_SYSTEM,
        _ => EXPLANATION_SYSTEM,
    };

    // Graph context for an entity named in the question, when available
    let entity_context = match classified.entity_name.as_deref() {
        Some(name) if store.has_graph_data()? => entity_context_block(graph, name)?,
        _ => None,
    };

    let reserved =
        system.len() + question.len() + entity_context.as_deref().map_or(0, str::len) + 128;
    let context_block = truncate_for_context(&context_body, reserved);

    let mut prompt = format!(
        "{}\n\n## Codebase summaries\n\n{}\n",
        system, context_block
    );
    if let Some(entity_context) = entity_context {
        prompt.push_str(&format!("\n## Entity context\n{}\n", entity_context));
    }
    prompt.push_str(&format!("\n## Question\n{}\n\n## Answer\n", question));

    let generation = host.generate(&model, &prompt, &GenerateOptions::default())?;

    let sources = hits
        .iter()
        .map(|hit| AskSource {
            path: hit.path.clone(),
            qualified_name: hit.qualified_name.clone(),
            location: hit
                .start_line
                .map(|line| format!("{}:{}", hit.path, line)),
            relevance: Some(hit.relevance()),
            preview: preview(&hit.description),
        })
        .collect();

    let route = match classified.query_type {
        QueryType::Generation => AskRoute::RagGeneration,
        _ => AskRoute::RagExplanation,
    };
    Ok(AskResponse {
        route,
        query_type: classified.query_type,
        answer: generation.text,
        sources,
    })
}

/// Compact callers/callees block for one named entity, used to ground
/// RAG answers when the graph knows the entity
fn entity_context_block(graph: &GraphQueries<'_>, name: &str) -> Result<Option<String>> {
    let definitions = graph.find_definition(name)?;
    if definitions.len() != 1 {
        return Ok(None);
    }
    let entity = &definitions[0];
    let Some(entity_id) = entity.id else {
        return Ok(None);
    };

    let mut lines = vec![format!(
        "{} {} defined at {}:{}",
        entity.kind.as_str(),
        entity.qualified_name,
        entity.file_path,
        entity.start_line
    )];
    let callers = graph.get_callers(entity_id)?;
    if !callers.is_empty() {
        let names: Vec<&str> = callers
            .iter()
            .take(5)
            .map(|c| c.qualified_name.as_str())
            .collect();
        lines.push(format!("called by: {}", names.join(", ")));
    }
    let callees = graph.get_callees(entity_id)?;
    if !callees.is_empty() {
        let names: Vec<&str> = callees
            .iter()
            .take(5)
            .map(|c| c.target_name.as_str())
            .collect();
        lines.push(format!("calls: {}", names.join(", ")));
    }
    Ok(Some(lines.join("\n")))
}

fn preview(text: &str) -> String {
    const MAX: usize = 100;
    if text.len() <= MAX {
        return text.to_string();
    }
    let mut end = MAX;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
