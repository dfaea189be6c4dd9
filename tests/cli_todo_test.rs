//! Integration tests for todo commands via CLI.
//!
//! These tests verify that todo operations work correctly through the CLI:
//! - `todokv add` creates records and their index entries
//! - `todokv list` goes through the project/context/priority/completion indexes
//! - `todokv update` moves index entries along with the record
//! - `todokv rm` removes the record and every index entry

mod common;

use common::TestEnv;
use predicates::prelude::*;

fn ids(listing: &serde_json::Value) -> Vec<String> {
    let mut ids: Vec<String> = listing["todos"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

// === Add / Show ===

#[test]
fn test_add_and_show() {
    let env = TestEnv::new();
    let id = env.add(&[
        "buy milk",
        "-p",
        "A",
        "--project",
        "home",
        "--context",
        "errand",
        "--tag",
        "due:2024-05-01",
    ]);

    let todo = env.json(&["show", &id]);
    assert_eq!(todo["id"], id.as_str());
    assert_eq!(todo["description"], "buy milk");
    assert_eq!(todo["priority"], "A");
    assert_eq!(todo["projects"][0], "home");
    assert_eq!(todo["contexts"][0], "errand");
    assert_eq!(todo["tags"]["due"], "2024-05-01");
    assert_eq!(todo["completed"], false);
}

#[test]
fn test_show_human_renders_todo_line() {
    let env = TestEnv::new();
    let id = env.add(&["call mom", "-p", "B", "--context", "phone"]);

    env.todokv()
        .args(["show", &id, "-H"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(format!("#id:{} (B) ", id)))
        .stdout(predicate::str::contains("call mom @phone"));
}

#[test]
fn test_show_missing_fails_with_json_error() {
    let env = TestEnv::new();
    env.todokv()
        .args(["show", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#""error""#))
        .stderr(predicate::str::contains("Todo with id does-not-exist not found"));
}

#[test]
fn test_add_blank_description_fails() {
    let env = TestEnv::new();
    env.todokv()
        .args(["add", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid input"));
}

// === List ===

#[test]
fn test_list_empty_database() {
    let env = TestEnv::new();
    let listing = env.json(&["list"]);
    assert_eq!(listing["count"], 0);

    env.todokv()
        .args(["list", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No todos found."));
}

#[test]
fn test_list_through_each_index() {
    let env = TestEnv::new();
    let a = env.add(&["a", "-p", "A", "--project", "home", "--context", "errand"]);
    let b = env.add(&["b", "-p", "B", "--project", "work", "--context", "errand"]);
    let c = env.add(&["c", "--project", "home"]);
    env.json(&["update", &b, "--completed", "true"]);

    assert_eq!(ids(&env.json(&["list"])), sorted(vec![a.clone(), b.clone(), c.clone()]));
    assert_eq!(
        ids(&env.json(&["list", "--project", "home"])),
        sorted(vec![a.clone(), c.clone()])
    );
    assert_eq!(
        ids(&env.json(&["list", "--context", "errand"])),
        sorted(vec![a.clone(), b.clone()])
    );
    assert_eq!(ids(&env.json(&["list", "--priority", "A"])), vec![a.clone()]);
    assert_eq!(ids(&env.json(&["list", "--completed", "true"])), vec![b.clone()]);
    assert_eq!(
        ids(&env.json(&["list", "--completed", "false"])),
        sorted(vec![a, c])
    );
    assert_eq!(env.json(&["list", "--project", "hom"])["count"], 0);
}

// === Update ===

#[test]
fn test_update_moves_project_index() {
    let env = TestEnv::new();
    let id = env.add(&["x", "--project", "old"]);

    let updated = env.json(&["update", &id, "--project", "new"]);
    assert_eq!(updated["todo"]["projects"][0], "new");

    assert_eq!(env.json(&["list", "--project", "old"])["count"], 0);
    assert_eq!(ids(&env.json(&["list", "--project", "new"])), vec![id]);
}

#[test]
fn test_update_priority_and_clear() {
    let env = TestEnv::new();
    let id = env.add(&["x", "-p", "A"]);

    env.json(&["update", &id, "-p", "B"]);
    assert_eq!(env.json(&["list", "--priority", "A"])["count"], 0);
    assert_eq!(env.json(&["list", "--priority", "B"])["count"], 1);

    let cleared = env.json(&["update", &id, "--clear-priority"]);
    assert!(cleared["todo"].get("priority").is_none());
    assert_eq!(env.json(&["list", "--priority", "B"])["count"], 0);
}

#[test]
fn test_update_completion_sets_and_clears_completed_at() {
    let env = TestEnv::new();
    let id = env.add(&["x"]);

    let done = env.json(&["update", &id, "--completed", "true"]);
    assert_eq!(done["todo"]["completed"], true);
    assert!(done["todo"]["completedAt"].is_string());

    let reopened = env.json(&["update", &id, "--completed", "false"]);
    assert_eq!(reopened["todo"]["completed"], false);
    assert!(reopened["todo"].get("completedAt").is_none());
}

#[test]
fn test_update_without_fields_fails() {
    let env = TestEnv::new();
    let id = env.add(&["x"]);
    env.todokv()
        .args(["update", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to update"));
}

#[test]
fn test_update_missing_fails_and_writes_nothing() {
    let env = TestEnv::new();
    env.todokv()
        .args(["update", "ghost", "--description", "boo", "-H"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error:"))
        .stderr(predicate::str::contains("not found"));
    assert_eq!(env.json(&["list"])["count"], 0);
}

// === Remove ===

#[test]
fn test_rm_removes_from_every_listing() {
    let env = TestEnv::new();
    let keep = env.add(&["keep", "--project", "p", "--context", "c", "-p", "C"]);
    let gone = env.add(&["gone", "--project", "p", "--context", "c", "-p", "C"]);

    let deleted = env.json(&["rm", &gone]);
    assert_eq!(deleted["id"], gone.as_str());
    assert_eq!(deleted["deleted"], true);

    for args in [
        vec!["list"],
        vec!["list", "--project", "p"],
        vec!["list", "--context", "c"],
        vec!["list", "--priority", "C"],
        vec!["list", "--completed", "false"],
    ] {
        assert_eq!(ids(&env.json(&args)), vec![keep.clone()], "{:?}", args);
    }

    env.todokv().args(["rm", &gone]).assert().failure();
}

// === Persistence ===

#[test]
fn test_db_flag_overrides_env() {
    let env = TestEnv::new();
    let other = env.path().join("other.db");
    let other = other.to_str().unwrap();

    env.todokv()
        .args(["--db", other, "add", "elsewhere"])
        .assert()
        .success();

    assert_eq!(env.json(&["list"])["count"], 0);
    assert_eq!(env.json(&["--db", other, "list"])["count"], 1);
    assert!(env.path().join("other.db").exists());
}
