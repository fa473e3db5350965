//! Tests for the JSON output format.
//!
//! These tests pin the field names consumers rely on: camelCase keys, the
//! `goAtlas` extension block and the metrics snapshot.

use std::path::PathBuf;
use std::process::Command;

use goatlas::report;
use goatlas::{ArchGraph, AtlasBuilder, AtlasOptions};
use serde_json::Value;

fn goapp_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/goapp")
}

fn graph_json() -> Value {
    let graph = AtlasBuilder::new(AtlasOptions {
        exclude_tests: true,
        ..Default::default()
    })
    .analyze_path(&goapp_path())
    .expect("analysis should succeed");
    let json = report::render_json(&graph).expect("graph should serialize");
    serde_json::from_str(&json).expect("output should be valid JSON")
}

#[test]
fn test_top_level_fields() {
    let json = graph_json();
    assert_eq!(json["version"], "1.0");
    assert_eq!(json["language"], "go");
    assert_eq!(json["sourceFiles"].as_array().unwrap().len(), 5);
    assert!(json["entities"].is_array());
    assert!(json["relations"].is_array());
}

#[test]
fn test_relation_fields() {
    let json = graph_json();
    let relations = json["relations"].as_array().unwrap();
    let implementation = relations
        .iter()
        .find(|r| r["type"] == "implementation")
        .unwrap();
    assert!(implementation["id"].as_str().unwrap().starts_with("impl-"));
    assert_eq!(implementation["inferenceSource"], "inferred");
    assert_eq!(implementation["confidence"], 1.0);

    let composition = relations.iter().find(|r| r["type"] == "composition").unwrap();
    assert_eq!(composition["inferenceSource"], "explicit");
    assert!(composition.get("confidence").is_none());
}

#[test]
fn test_extension_block() {
    let json = graph_json();
    let atlas = &json["extensions"]["goAtlas"];
    assert_eq!(atlas["version"], "2.0");
    assert_eq!(atlas["metadata"]["functionBodyStrategy"], "selective");
    assert_eq!(atlas["metadata"]["goplsEnabled"], false);
    assert!(atlas["metadata"].get("warnings").is_none());

    let goroutine = &atlas["layers"]["goroutine"];
    let main = goroutine["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["type"] == "main")
        .unwrap();
    assert_eq!(main["id"], "cmd/server.main");
    assert!(main.get("spawnType").is_none());

    let pooled = goroutine["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["pattern"] == "worker-pool")
        .unwrap();
    assert_eq!(pooled["spawnType"], "named_func");

    let lifecycle = goroutine["lifecycle"].as_array().unwrap();
    let anonymous = lifecycle
        .iter()
        .find(|l| l["spawnTargetName"] == "<anonymous>")
        .unwrap();
    assert_eq!(anonymous["orphan"], true);
    assert_eq!(anonymous["cancellationCheckAvailable"], false);
    assert!(anonymous.get("hasCancellationCheck").is_none());

    let edge_types: Vec<&str> = goroutine["channelEdges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["edgeType"].as_str().unwrap())
        .collect();
    assert!(edge_types.contains(&"make"));
    assert!(edge_types.contains(&"recv"));

    let package = &atlas["layers"]["package"];
    assert_eq!(package["nodes"][0]["type"], "cmd");
    assert_eq!(package["nodes"][0]["fileCount"], 1);

    let capability = &atlas["layers"]["capability"];
    let concrete = capability["edges"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["concreteUsage"] == true)
        .unwrap();
    assert_eq!(concrete["type"], "uses");
    assert_eq!(concrete["context"]["fieldType"], true);
    assert!(capability["concreteUsageRisks"][0]["concreteType"].is_string());
    assert!(capability["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["type"] == "interface" && n["fanIn"] == 3));

    let flow = &atlas["layers"]["flow"];
    let route = flow["entryPoints"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["protocol"] == "http")
        .unwrap();
    assert_eq!(route["location"]["line"], 22);
    assert!(route.get("method").is_none());
    assert!(flow["callChains"][0]["entryPoint"].is_string());

    assert!(atlas["metadata"].get("protocols").is_none());
    assert_eq!(atlas["metadata"]["completeness"]["package"], 1.0);
}

#[test]
fn test_metrics_block() {
    let json = graph_json();
    let metrics = &json["metrics"];
    assert_eq!(metrics["level"], "class");
    assert_eq!(metrics["entityCount"], 7);
    assert_eq!(metrics["relationTypeBreakdown"]["implementation"], 2);
    assert!(metrics["relationTypeBreakdown"].get("inheritance").is_none());
    assert_eq!(metrics["inferredRelationRatio"], 0.33);
}

#[test]
fn test_json_round_trips_into_graph() {
    let json = graph_json();
    let graph: ArchGraph = serde_json::from_value(json).unwrap();
    assert!(graph.extensions.go_atlas.is_some());
    assert!(graph.metrics.is_some());
}

#[test]
fn test_cli_json_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("atlas.json");
    let status = Command::new(env!("CARGO_BIN_EXE_goatlas"))
        .arg("analyze")
        .arg(goapp_path())
        .args(["--format", "json", "--exclude-tests", "--level", "package", "--output"])
        .arg(&output)
        .status()
        .expect("binary should run");
    assert_eq!(status.code(), Some(0));

    let json: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["metrics"]["level"], "package");
    assert_eq!(json["extensions"]["goAtlas"]["metadata"]["excludeTests"], true);
}

#[test]
fn test_cli_rejects_unknown_format() {
    let status = Command::new(env!("CARGO_BIN_EXE_goatlas"))
        .arg("analyze")
        .arg(goapp_path())
        .args(["--format", "sarif"])
        .status()
        .expect("binary should run");
    assert_eq!(status.code(), Some(2));
}
