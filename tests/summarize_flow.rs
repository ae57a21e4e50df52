//! End-to-end summarize pipeline: bottom-up walk, hashing, idempotence

mod common;

use common::{MockHost, TestProject};
use paranoid_engine::hashing::{content_hash, tree_hash};
use paranoid_engine::jobs::CancelToken;
use paranoid_engine::store::SummaryKind;
use paranoid_engine::summarize::{run_summarize, SummarizeOptions};

fn summarize(project: &TestProject, store: &paranoid_engine::Store, host: &MockHost) {
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
    .expect("summarize run failed");
}

#[test]
fn summarize_builds_file_and_directory_summaries() {
    let project = TestProject::new();
    project.add_file("src/a.py", "def alpha():\n    return 1\n");
    project.add_file("src/b.py", "def beta():\n    return 2\n");
    let store = project.init();
    let host = MockHost::new();

    summarize(&project, &store, &host);

    // File summaries carry the content hash at generation time
    let a = store.get_summary(&project.key("src/a.py")).unwrap().unwrap();
    assert_eq!(a.kind, SummaryKind::File);
    assert_eq!(a.description, "S(a.py)");
    assert_eq!(a.hash, content_hash(&project.join("src/a.py")).unwrap());
    assert_eq!(a.language.as_deref(), Some("python"));
    assert_eq!(a.model_version.as_deref(), Some("mock-1"));
    assert!(a.generated_at <= a.updated_at);

    let b = store.get_summary(&project.key("src/b.py")).unwrap().unwrap();
    assert_eq!(b.description, "S(b.py)");

    // The directory hash is the tree hash over its children
    let src_key = project.key("src");
    let src = store.get_summary(&src_key).unwrap().unwrap();
    assert_eq!(src.kind, SummaryKind::Directory);
    assert_eq!(src.description, "S(src)");
    assert_eq!(src.hash, tree_hash(&src_key, &store).unwrap());

    // Root summary exists too
    assert!(store.get_summary(&project.root_key()).unwrap().is_some());
}

#[test]
fn unchanged_tree_makes_zero_generate_calls() {
    let project = TestProject::new();
    project.add_file("src/a.py", "def alpha():\n    return 1\n");
    project.add_file("src/b.py", "def beta():\n    return 2\n");
    let store = project.init();
    let host = MockHost::new();

    summarize(&project, &store, &host);
    let first_run_calls = host.generate_count();
    assert!(first_run_calls > 0);

    summarize(&project, &store, &host);
    assert_eq!(host.generate_count(), first_run_calls);
}

#[test]
fn descendant_change_reaches_every_ancestor() {
    let project = TestProject::new();
    project.add_file("src/deep/nested.py", "x = 1\n");
    let store = project.init();
    let host = MockHost::new();

    summarize(&project, &store, &host);
    let root_hash_before = store
        .get_summary(&project.root_key())
        .unwrap()
        .unwrap()
        .hash;
    let deep_hash_before = store.get_summary(&project.key("src/deep")).unwrap().unwrap().hash;

    project.add_file("src/deep/nested.py", "x = 2\n");
    summarize(&project, &store, &host);

    let deep_hash_after = store.get_summary(&project.key("src/deep")).unwrap().unwrap().hash;
    let root_hash_after = store
        .get_summary(&project.root_key())
        .unwrap()
        .unwrap()
        .hash;
    assert_ne!(deep_hash_before, deep_hash_after);
    assert_ne!(root_hash_before, root_hash_after);
}

#[test]
fn needs_update_flag_forces_single_item() {
    let project = TestProject::new();
    project.add_file("a.py", "x = 1\n");
    project.add_file("b.py", "y = 1\n");
    let store = project.init();
    let host = MockHost::new();

    summarize(&project, &store, &host);
    store.mark_needs_update(&project.key("a.py")).unwrap();

    let calls_before = host.generate_count();
    summarize(&project, &store, &host);
    // a.py regenerates; its new updated_at does not change its hash, so
    // only the file itself re-runs
    let a = store.get_summary(&project.key("a.py")).unwrap().unwrap();
    assert!(!a.needs_update);
    assert_eq!(host.generate_count(), calls_before + 1);
}

#[test]
fn ignored_files_never_get_summaries() {
    let project = TestProject::new();
    project.add_file("kept.py", "x = 1\n");
    project.add_file("skip.log", "noise\n");
    project.add_file(".paranoidignore", "*.log\n");
    let store = project.init();
    let host = MockHost::new();

    summarize(&project, &store, &host);

    assert!(store.get_summary(&project.key("kept.py")).unwrap().is_some());
    assert!(store.get_summary(&project.key("skip.log")).unwrap().is_none());
}
