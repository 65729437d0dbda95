//! CLI integration tests for mongo-move.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for configuration and connection failures.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the mongo-move binary.
fn cmd() -> Command {
    Command::cargo_bin("mongo-move").unwrap()
}

fn config_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tui"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mongo-move"));
}

#[test]
fn test_global_flag_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: config.json]"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: info]"));
}

#[test]
fn test_health_check_command_exists() {
    cmd()
        .args(["health-check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test connections to both servers"))
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_init_command_exists() {
    cmd()
        .args(["init", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    cmd()
        .args(["--config", "nonexistent_config_file.json", "health-check"])
        .assert()
        .code(7);
}

#[test]
fn test_tui_missing_config_exits_before_terminal_setup() {
    cmd()
        .args(["--config", "nonexistent_config_file.json", "tui"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_invalid_json_exits_with_code_1() {
    let file = config_file("{ \"sourceServer\": ");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_missing_source_server_exits_with_code_1() {
    let file = config_file(r#"{ "targetServer": "mongodb://localhost:27017" }"#);

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "config value \"sourceServer\" is missing",
        ));
}

#[test]
fn test_wrong_scheme_exits_with_code_1() {
    let file = config_file(
        r#"{ "sourceServer": "postgres://localhost", "targetServer": "mongodb://localhost" }"#,
    );

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("sourceServer"));
}

#[test]
fn test_unreachable_server_exits_with_code_2() {
    let file = config_file(
        r#"{
            "sourceServer": "mongodb://127.0.0.1:1",
            "targetServer": "mongodb://127.0.0.1:1",
            "session": { "serverSelectionTimeoutSecs": 1 }
        }"#,
    );

    cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "health-check",
            "--output-json",
        ])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"healthy\": false"));
}
