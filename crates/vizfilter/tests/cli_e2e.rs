#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use vizfilterapp::host::memory::MemHost;
use vizfilterapp::model::{
    ParamValue, ParameterDescriptor, ParameterId, RuleKind, Selection, StorageType, Value,
};

const COMMENTS: ParameterId = ParameterId(1);

fn vizfilter_cmd() -> Command {
    let mut cmd = Command::new(cargo_bin("vizfilter"));
    cmd.env_remove("RUST_LOG");
    cmd
}

struct Workspace {
    _temp: TempDir,
    document: PathBuf,
    selection: PathBuf,
    walls: i64,
    plan: i64,
}

fn workspace(values: &[&str]) -> Workspace {
    let temp = TempDir::new().unwrap();

    let mut host = MemHost::new();
    let walls = host.add_category("Walls");
    let plan = host.add_view("Level 1 Plan");
    for (i, comment) in ["Fire Rated", "Acoustic", "fire rated"].iter().enumerate() {
        host.add_element(
            walls,
            &format!("W{}", i + 1),
            vec![(COMMENTS, ParamValue::Text(comment.to_string()))],
        );
    }

    let mut selection = Selection::new(
        [walls],
        ParameterDescriptor::new(COMMENTS, "Comments", StorageType::Text),
        RuleKind::Equals,
        values.iter().map(|v| Value::text(*v)).collect(),
    );
    selection.override_existing = true;

    let document = temp.path().join("document.json");
    let selection_path = temp.path().join("selection.json");
    fs::write(&document, host.to_json().unwrap()).unwrap();
    fs::write(
        &selection_path,
        serde_json::to_string_pretty(&selection).unwrap(),
    )
    .unwrap();

    Workspace {
        _temp: temp,
        document,
        selection: selection_path,
        walls: walls.0,
        plan: plan.0,
    }
}

#[test]
fn test_apply_write_then_order() {
    let ws = workspace(&["Fire Rated", "Acoustic"]);

    vizfilter_cmd()
        .arg("apply")
        .arg(&ws.document)
        .arg(&ws.selection)
        .arg("--write")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created filter 'Walls _ Fire Rated'"))
        .stdout(predicate::str::contains("Level 1 Plan (reordered)"))
        .stdout(predicate::str::contains("2 created, 0 updated, 0 skipped"));

    vizfilter_cmd()
        .arg("order")
        .arg(&ws.document)
        .arg(ws.plan.to_string())
        .assert()
        .success()
        .stdout(predicate::str::contains(" 1. Walls _ Fire Rated"))
        .stdout(predicate::str::contains(" 2. Walls _ Acoustic"));
}

#[test]
fn test_apply_without_write_leaves_document() {
    let ws = workspace(&["Acoustic"]);
    let before = fs::read_to_string(&ws.document).unwrap();

    vizfilter_cmd()
        .arg("apply")
        .arg(&ws.document)
        .arg(&ws.selection)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&ws.document).unwrap(), before);
}

#[test]
fn test_rerun_updates_in_place() {
    let ws = workspace(&["Acoustic"]);
    for _ in 0..2 {
        vizfilter_cmd()
            .arg("apply")
            .arg(&ws.document)
            .arg(&ws.selection)
            .arg("--write")
            .assert()
            .success();
    }

    let host = MemHost::from_json(&fs::read_to_string(&ws.document).unwrap()).unwrap();
    assert_eq!(host.snapshot().filters.len(), 1);
}

#[test]
fn test_apply_json_output() {
    let ws = workspace(&["Fire Rated"]);

    let output = vizfilter_cmd()
        .arg("apply")
        .arg(&ws.document)
        .arg(&ws.selection)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["created"], 1);
    assert_eq!(report["views"][0]["path"]["path"], "rebuilt");
}

#[test]
fn test_values_lists_distinct_values() {
    let ws = workspace(&["x"]);

    vizfilter_cmd()
        .arg("values")
        .arg(&ws.document)
        .args(["--category", &ws.walls.to_string()])
        .args(["--parameter", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acoustic"))
        .stdout(predicate::str::contains("2 distinct value(s) from 3 element(s)"));
}

#[test]
fn test_values_respects_limit() {
    let ws = workspace(&["x"]);

    vizfilter_cmd()
        .arg("values")
        .arg(&ws.document)
        .args(["--category", &ws.walls.to_string()])
        .args(["--parameter", "1", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("scan limit reached"));
}

#[test]
fn test_missing_document_fails() {
    let ws = workspace(&["x"]);

    vizfilter_cmd()
        .arg("apply")
        .arg(ws.document.with_file_name("nope.json"))
        .arg(&ws.selection)
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading document"));
}

#[test]
fn test_unknown_view_fails() {
    let ws = workspace(&["x"]);

    vizfilter_cmd()
        .arg("order")
        .arg(&ws.document)
        .arg("424242")
        .assert()
        .failure()
        .stderr(predicate::str::contains("View not found"));
}
