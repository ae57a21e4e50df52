//! Hybrid ask routing over a real extracted graph and vector index

mod common;

use common::{MockHost, TestProject};
use paranoid_engine::analysis::run_analysis;
use paranoid_engine::ask::{run_ask, AskOptions, AskRoute};
use paranoid_engine::error::ParanoidError;
use paranoid_engine::indexer::{run_index, IndexOptions};
use paranoid_engine::jobs::CancelToken;
use paranoid_engine::summarize::{run_summarize, SummarizeOptions};

const AUTH_PY: &str = r#"class User:
    """A user account."""

    def login(self, password):
        """Check the password."""
        return password == self.password


def authenticate(user, password):
    return User.login(user, password)
"#;

/// Analyze + summarize + index the project with the mock host
fn build_index(project: &TestProject, store: &paranoid_engine::Store, host: &MockHost) {
    run_analysis(
        store,
        project.path(),
        &project.matcher(),
        false,
        &CancelToken::new(),
    )
    .unwrap();
    run_summarize(
        store,
        project.path(),
        project.path(),
        &project.matcher(),
        &project.config(),
        host,
        &project.prompts(),
        &SummarizeOptions::default(),
        &CancelToken::new(),
    )
    .unwrap();
    run_index(
        store,
        None,
        &project.config(),
        host,
        &IndexOptions::default(),
        &CancelToken::new(),
    )
    .unwrap();
}

#[test]
fn usage_question_routes_to_graph_without_generate() {
    let project = TestProject::new();
    project.add_file("auth.py", AUTH_PY);
    let store = project.init();
    let host = MockHost::with_label("USAGE");
    build_index(&project, &store, &host);

    let generate_calls_before = host.generate_count();
    let response = run_ask(
        &store,
        project.path(),
        &project.config(),
        &host,
        "where is User.login used?",
        &AskOptions::default(),
    )
    .unwrap();

    assert_eq!(response.route, AskRoute::GraphUsage);
    // No answer-model call for a resolved usage query
    assert_eq!(host.generate_count(), generate_calls_before);
    assert_eq!(response.sources.len(), 1);
    let source = &response.sources[0];
    assert_eq!(source.qualified_name.as_deref(), Some("authenticate"));
    assert_eq!(source.path, project.key("auth.py"));
    assert!(source.location.as_deref().unwrap().contains(':'));
}

#[test]
fn definition_question_returns_signature_and_doc() {
    let project = TestProject::new();
    project.add_file("auth.py", AUTH_PY);
    let store = project.init();
    let host = MockHost::with_label("DEFINITION");
    build_index(&project, &store, &host);

    let generate_calls_before = host.generate_count();
    let response = run_ask(
        &store,
        project.path(),
        &project.config(),
        &host,
        "where is User.login defined?",
        &AskOptions::default(),
    )
    .unwrap();

    assert_eq!(response.route, AskRoute::GraphDefinition);
    assert_eq!(host.generate_count(), generate_calls_before);
    assert_eq!(response.sources.len(), 1);
    assert!(response.sources[0].preview.contains("Check the password"));
}

#[test]
fn explanation_question_retrieves_and_synthesizes() {
    let project = TestProject::new();
    project.add_file("auth.py", AUTH_PY);
    project.add_file("db.py", "def connect():\n    return 'connection'\n");
    let store = project.init();
    let host = MockHost::with_label("EXPLANATION");
    build_index(&project, &store, &host);

    let generate_calls_before = host.generate_count();
    let response = run_ask(
        &store,
        project.path(),
        &project.config(),
        &host,
        "explain how authentication works",
        &AskOptions::default(),
    )
    .unwrap();

    assert_eq!(response.route, AskRoute::RagExplanation);
    assert_eq!(host.generate_count(), generate_calls_before + 1);
    assert!(!response.answer.is_empty());
    assert!(!response.sources.is_empty());

    // Similarity scores are present and sorted descending
    let relevances: Vec<f64> = response
        .sources
        .iter()
        .filter_map(|s| s.relevance)
        .collect();
    assert_eq!(relevances.len(), response.sources.len());
    assert!(relevances.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn explanation_without_index_fails_fast() {
    let project = TestProject::new();
    project.add_file("auth.py", AUTH_PY);
    let store = project.init();
    let host = MockHost::with_label("EXPLANATION");

    let err = run_ask(
        &store,
        project.path(),
        &project.config(),
        &host,
        "explain how authentication works",
        &AskOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ParanoidError::IndexEmpty));
}

#[test]
fn unresolved_usage_falls_back_to_retrieval() {
    let project = TestProject::new();
    project.add_file("auth.py", AUTH_PY);
    let store = project.init();
    let host = MockHost::with_label("USAGE");
    build_index(&project, &store, &host);

    let response = run_ask(
        &store,
        project.path(),
        &project.config(),
        &host,
        "where is frobnicate used?",
        &AskOptions::default(),
    )
    .unwrap();
    assert_eq!(response.route, AskRoute::RagExplanation);
}

#[test]
fn force_rag_bypasses_graph_routing() {
    let project = TestProject::new();
    project.add_file("auth.py", AUTH_PY);
    let store = project.init();
    let host = MockHost::with_label("USAGE");
    build_index(&project, &store, &host);

    let response = run_ask(
        &store,
        project.path(),
        &project.config(),
        &host,
        "where is User.login used?",
        &AskOptions {
            force_rag: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(response.route, AskRoute::RagExplanation);
    assert!(response.sources.iter().all(|s| s.relevance.is_some()));
}

#[test]
fn index_twice_without_changes_embeds_nothing() {
    let project = TestProject::new();
    project.add_file("auth.py", AUTH_PY);
    let store = project.init();
    let host = MockHost::new();
    build_index(&project, &store, &host);

    let embed_calls_before = host.embed_count();
    run_index(
        &store,
        None,
        &project.config(),
        &host,
        &IndexOptions::default(),
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(host.embed_count(), embed_calls_before);
}
