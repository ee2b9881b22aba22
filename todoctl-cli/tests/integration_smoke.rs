//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

fn todoctl() -> Command {
    let mut cmd = Command::cargo_bin("todoctl").unwrap();
    // Keep the developer's environment out of the assertions
    cmd.env_remove("DATABASE_URL").env_remove("TODOCTL_BIND");
    cmd
}

#[test]
fn test_top_level_help_lists_subcommands() {
    todoctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("migrate"));
}

#[test]
fn test_serve_help() {
    todoctl()
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--in-memory"))
        .stdout(predicate::str::contains("--database-url"))
        .stdout(predicate::str::contains("--cors-permissive"));
}

#[test]
fn test_migrate_help() {
    todoctl()
        .arg("migrate")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database URL"));
}

#[test]
fn test_serve_rejects_bad_bind() {
    todoctl()
        .args(["serve", "--bind", "not-an-address", "--in-memory"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    todoctl()
        .current_dir(dir.path())
        .args(["serve", "--in-memory", "--config"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load todoctl configuration"));
}

#[test]
fn test_invalid_executor_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[executor]\ncore_workers = 4\nmax_workers = 2\n").unwrap();

    todoctl()
        .current_dir(dir.path())
        .args(["serve", "--in-memory", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load todoctl configuration"));
}
