//! Integration tests for queue commands.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_queue_list_empty() {
    let env = TestEnv::new();
    env.td()
        .args(["queue", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No queues found"));
}

#[test]
fn test_queue_add_and_list() {
    let env = TestEnv::new();
    env.td()
        .args([
            "queue",
            "add",
            "--name",
            "backend",
            "--title",
            "Backend work",
            "--description",
            "Server-side tasks",
        ])
        .assert()
        .success();

    env.td()
        .args(["queue", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backend"))
        .stdout(predicate::str::contains("Backend work"))
        .stdout(predicate::str::contains("Server-side tasks"));

    // The queue directory and metadata record exist on disk.
    assert!(env.tasks_root().join("backend").join("meta.json").exists());
}

#[test]
fn test_queue_add_duplicate_fails() {
    let env = TestEnv::new();
    env.td()
        .args(["queue", "add", "--name", "q", "--title", "Q"])
        .assert()
        .success();

    env.td()
        .args(["queue", "add", "--name", "q", "--title", "Again"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_queue_add_rejects_unsafe_name() {
    let env = TestEnv::new();
    env.td()
        .args(["queue", "add", "--name", "a/b", "--title", "T"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_queue_delete_removes_tasks() {
    let env = TestEnv::with_queue();
    env.td()
        .args(["task", "add", "--title", "T", "--queue", "q"])
        .assert()
        .success();

    env.td()
        .args(["queue", "delete", "--name", "q"])
        .assert()
        .success();

    assert!(!env.tasks_root().join("q").exists());
    env.td()
        .args(["queue", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No queues found"));
}

#[test]
fn test_queue_delete_missing_fails() {
    let env = TestEnv::new();
    env.td()
        .args(["queue", "delete", "--name", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
