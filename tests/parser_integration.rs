//! Integration tests for the Go front-end.
//!
//! These tests validate fact extraction and package grouping against the
//! `testdata/goapp` fixture and ad-hoc modules in temp directories.

use std::fs;
use std::path::{Path, PathBuf};

use goatlas::analysis::{
    get_analyzer, AnalysisContext, BodyStrategy, ChannelOpKind, ImportKind, LoadOptions,
    ModuleInfo, SpawnTarget,
};
use tempfile::TempDir;

fn goapp_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/goapp")
}

fn load(root: &Path, options: LoadOptions) -> goatlas::GoRawData {
    let module = ModuleInfo::from_root(root).expect("go.mod should parse");
    AnalysisContext::new(module, options)
        .expect("context")
        .load()
        .expect("load should succeed")
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

// =============================================================================
// go.mod
// =============================================================================

#[test]
fn test_goapp_module_descriptor() {
    let module = ModuleInfo::from_root(&goapp_path()).unwrap();
    assert_eq!(module.module_name, "example.com/goapp");
    assert_eq!(module.requires.len(), 2);
    assert!(!module.requires[0].indirect);
    assert!(module.requires[1].indirect);
    assert_eq!(module.classify_import("example.com/goapp/internal/store"), ImportKind::Internal);
    assert_eq!(module.classify_import("net/http"), ImportKind::Std);
    assert_eq!(module.classify_import("github.com/go-chi/chi/v5"), ImportKind::External);
}

// =============================================================================
// Package grouping
// =============================================================================

#[test]
fn test_goapp_packages() {
    let raw = load(&goapp_path(), LoadOptions::default());
    let names: Vec<&str> = raw.packages.iter().map(|p| p.full_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "cmd/server",
            "internal/api",
            "internal/store",
            "internal/testutil",
            "internal/worker",
            "tests/e2e",
        ]
    );

    let store = raw.find_package("internal/store").unwrap();
    assert_eq!(store.name, "store");
    assert_eq!(store.source_files, vec!["internal/store/store.go", "internal/store/store_test.go"]);
    let memory = store.find_struct("Memory").unwrap();
    let methods: Vec<&str> = memory.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(methods, vec!["Get", "Put"]);

    let server = raw.find_package("cmd/server").unwrap();
    assert!(server.is_main());
    assert!(server
        .imports
        .iter()
        .all(|i| i.kind.is_some()));
}

#[test]
fn test_exclude_tests_skips_test_files() {
    let raw = load(
        &goapp_path(),
        LoadOptions {
            exclude_tests: true,
            ..Default::default()
        },
    );
    let store = raw.find_package("internal/store").unwrap();
    assert_eq!(store.source_files, vec!["internal/store/store.go"]);
    assert!(store.find_struct("stubStore").is_none());
}

#[test]
fn test_excluded_paths() {
    let raw = load(
        &goapp_path(),
        LoadOptions {
            excluded_paths: vec!["internal/worker/**".to_string()],
            ..Default::default()
        },
    );
    assert!(raw.find_package("internal/worker").is_none());
    assert!(raw.find_package("internal/store").is_some());
}

// =============================================================================
// Bodies
// =============================================================================

#[test]
fn test_goapp_bodies() {
    let raw = load(&goapp_path(), LoadOptions::default());
    let worker = raw.find_package("internal/worker").unwrap();

    let pool = worker.find_struct("Pool").unwrap();
    let run = pool.find_method("Run").unwrap();
    let body = run.body.as_ref().expect("Run spawns, so its body is extracted");
    assert_eq!(body.spawns.len(), 3);
    assert_eq!(
        body.spawns[0].target,
        SpawnTarget::Named {
            name: "consume".to_string(),
            qualifier: Some("p".to_string()),
        }
    );
    assert_eq!(body.spawns[0].args, vec!["ctx", "queue"]);

    let make = body.channel_makes().next().unwrap();
    assert_eq!(make.channel_name, "queue");
    assert_eq!(make.buffer_size, Some(16));
    assert!(body
        .channel_ops
        .iter()
        .any(|op| op.operation == ChannelOpKind::Send && op.channel_name == "queue"));

    // no concurrency signal in these bodies
    assert!(pool.find_method("handle").unwrap().body.is_none());
    assert!(worker.find_function("NewPool").unwrap().body.is_none());

    let broadcast = worker.find_function("Broadcast").unwrap().body.as_ref().unwrap();
    assert!(broadcast.spawns.iter().all(|s| s.target == SpawnTarget::Anonymous));
}

#[test]
fn test_body_strategy_full_and_none() {
    let full = load(
        &goapp_path(),
        LoadOptions {
            body_strategy: BodyStrategy::Full,
            ..Default::default()
        },
    );
    let store = full.find_package("internal/store").unwrap();
    let get = store.find_struct("Memory").unwrap().find_method("Get").unwrap();
    let calls: Vec<String> = get.body.as_ref().unwrap().calls.iter().map(|c| c.qualified_name()).collect();
    assert!(calls.contains(&"m.mu.RLock".to_string()));

    let none = load(
        &goapp_path(),
        LoadOptions {
            body_strategy: BodyStrategy::None,
            ..Default::default()
        },
    );
    assert!(none
        .packages
        .iter()
        .flat_map(|p| p.functions.iter())
        .all(|f| f.body.is_none()));
}

#[test]
fn test_module_without_go_files_in_root() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "go.mod", "module example.com/empty\n");
    write(temp.path(), "vendor/x/x.go", "package x\nfunc X() {}\n");
    write(temp.path(), ".hidden/h.go", "package h\nfunc H() {}\n");
    let raw = load(temp.path(), LoadOptions::default());
    assert!(raw.packages.is_empty());
}

#[test]
fn test_root_package_uses_module_name() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "go.mod", "module example.com/tool\n");
    write(temp.path(), "tool.go", "package tool\n\ntype Tool struct{}\n");
    let raw = load(temp.path(), LoadOptions::default());
    assert_eq!(raw.packages.len(), 1);
    assert_eq!(raw.packages[0].full_name, "example.com/tool");
    assert_eq!(raw.packages[0].name, "tool");
}

#[test]
fn test_analyzer_tolerates_syntax_errors() {
    let analyzer = get_analyzer("go").unwrap();
    let parsed = analyzer
        .parse("broken.go", b"package broken\n\ntype Ok struct{ A int }\n\nfunc (o *Ok) {\n")
        .unwrap();
    let facts = analyzer.extract_facts(&parsed, BodyStrategy::Full).unwrap();
    assert!(facts.has_parse_errors);
    assert_eq!(facts.package.as_deref(), Some("broken"));
    assert_eq!(facts.structs.len(), 1);
}
