//! Graph extraction, smart invalidation, and cascade behavior

mod common;

use common::{MockHost, TestProject};
use paranoid_engine::analysis::run_analysis;
use paranoid_engine::graph::GraphQueries;
use paranoid_engine::hashing::needs_summarization;
use paranoid_engine::jobs::CancelToken;
use paranoid_engine::store::EntityKind;
use paranoid_engine::summarize::{run_summarize, SummarizeOptions};

const AUTH_PY: &str = r#"class User:
    """A user account."""

    def login(self, password):
        """Check the password."""
        return password == self.password


def authenticate(user, password):
    return User.login(user, password)
"#;

fn analyze(project: &TestProject, store: &paranoid_engine::Store) {
    run_analysis(
        store,
        project.path(),
        &project.matcher(),
        false,
        &CancelToken::new(),
    )
    .expect("analysis failed");
}

#[test]
fn analyze_extracts_entities_and_call_edges() {
    let project = TestProject::new();
    project.add_file("auth.py", AUTH_PY);
    let store = project.init();

    analyze(&project, &store);

    let graph = GraphQueries::new(&store, project.path());

    let user = graph.find_definition("User").unwrap();
    assert_eq!(user.len(), 1);
    assert_eq!(user[0].kind, EntityKind::Class);

    let login = graph.find_definition("User.login").unwrap();
    assert_eq!(login.len(), 1);
    assert_eq!(login[0].kind, EntityKind::Method);
    assert_eq!(login[0].parent_name.as_deref(), Some("User"));
    assert_eq!(login[0].docstring.as_deref(), Some("Check the password."));

    let authenticate = graph.find_definition("authenticate").unwrap();
    assert_eq!(authenticate.len(), 1);
    assert_eq!(authenticate[0].kind, EntityKind::Function);

    // calls(authenticate -> User.login)
    let callers = graph.get_callers(login[0].id.unwrap()).unwrap();
    assert_eq!(callers.len(), 1);
    assert_eq!(callers[0].qualified_name, "authenticate");
    assert!(callers[0].location.as_deref().unwrap().contains(":"));

    let callees = graph.get_callees(authenticate[0].id.unwrap()).unwrap();
    assert!(callees.iter().any(|c| c.target_name == "User.login"));
}

#[test]
fn reanalyzing_unchanged_file_keeps_graph_identical() {
    let project = TestProject::new();
    project.add_file("auth.py", AUTH_PY);
    let store = project.init();

    analyze(&project, &store);
    let before: Vec<String> = store
        .entities_for_file(&project.key("auth.py"))
        .unwrap()
        .iter()
        .map(|e| format!("{}:{}", e.qualified_name, e.start_line))
        .collect();

    let stats = run_analysis(
        &store,
        project.path(),
        &project.matcher(),
        false,
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(stats.analyzed, 0);

    let after: Vec<String> = store
        .entities_for_file(&project.key("auth.py"))
        .unwrap()
        .iter()
        .map(|e| format!("{}:{}", e.qualified_name, e.start_line))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn smart_invalidation_triggers_on_new_callers() {
    let project = TestProject::new();
    project.add_file("x.py", "def handler():\n    return 1\n");
    project.add_file("a.py", "from x import handler\n\ndef a():\n    return handler()\n");
    project.add_file("b.py", "from x import handler\n\ndef b():\n    return handler()\n");
    let store = project.init();
    let host = MockHost::new();
    let config = project.config();

    // Graph first, then a level-1 summary snapshot with 2 callers
    analyze(&project, &store);
    run_summarize(
        &store,
        project.path(),
        project.path(),
        &project.matcher(),
        &config,
        &host,
        &project.prompts(),
        &SummarizeOptions::default(),
        &CancelToken::new(),
    )
    .unwrap();

    let x_key = project.key("x.py");
    let snapshot = store.get_summary_context(&x_key).unwrap().unwrap();
    assert_eq!(snapshot.callers_count, 2);

    // x.py unchanged on disk, so nothing to re-summarize yet
    let x_hash = store.get_summary(&x_key).unwrap().unwrap().hash;
    assert!(!needs_summarization(&x_key, &x_hash, &store, &config).unwrap());

    // Five new callers appear in other files (total 7, threshold 3)
    for i in 0..5 {
        project.add_file(
            &format!("caller_{}.py", i),
            "from x import handler\n\ndef call():\n    return handler()\n",
        );
    }
    analyze(&project, &store);

    assert!(needs_summarization(&x_key, &x_hash, &store, &config).unwrap());
}

#[test]
fn cascading_delete_removes_every_keyed_row() {
    let project = TestProject::new();
    project.add_file("auth.py", AUTH_PY);
    let store = project.init();
    let host = MockHost::new();

    analyze(&project, &store);
    run_summarize(
        &store,
        project.path(),
        project.path(),
        &project.matcher(),
        &project.config(),
        &host,
        &project.prompts(),
        &SummarizeOptions::default(),
        &CancelToken::new(),
    )
    .unwrap();
    paranoid_engine::indexer::run_index(
        &store,
        None,
        &project.config(),
        &host,
        &paranoid_engine::indexer::IndexOptions::default(),
        &CancelToken::new(),
    )
    .unwrap();

    let auth_key = project.key("auth.py");
    let entity_ids: Vec<i64> = store
        .entities_for_file(&auth_key)
        .unwrap()
        .iter()
        .filter_map(|e| e.id)
        .collect();
    assert!(!entity_ids.is_empty());
    assert!(store.summary_vector_count().unwrap() > 0);
    assert!(store.entity_vector_count().unwrap() > 0);

    store.delete_summary(&auth_key).unwrap();

    assert!(store.get_summary(&auth_key).unwrap().is_none());
    assert!(store.entities_for_file(&auth_key).unwrap().is_empty());
    assert!(store.imports_of_file(&auth_key).unwrap().is_empty());
    assert!(store.get_summary_context(&auth_key).unwrap().is_none());
    assert!(store.get_analysis_hash(&auth_key).unwrap().is_none());
    let indexed = store.indexed_summary_vectors().unwrap();
    assert!(!indexed.contains_key(&auth_key));
    let indexed_entities = store.indexed_entity_vectors().unwrap();
    for entity_id in entity_ids {
        assert!(!indexed_entities.contains_key(&entity_id));
    }
}

#[test]
fn typescript_imports_resolve_importers() {
    let project = TestProject::new();
    project.add_file("src/db.ts", "export function query() { return 1; }\n");
    project.add_file(
        "src/app.ts",
        "import { query } from './db';\n\nfunction main() { return query(); }\n",
    );
    let store = project.init();

    analyze(&project, &store);

    let graph = GraphQueries::new(&store, project.path());
    let imports = graph.get_imports(&project.join("src/app.ts")).unwrap();
    assert_eq!(imports, vec!["./db"]);

    let importers = graph.get_importers(&project.join("src/db.ts")).unwrap();
    assert_eq!(importers, vec![project.key("src/app.ts")]);
}
