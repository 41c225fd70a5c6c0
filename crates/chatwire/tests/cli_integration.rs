//! CLI integration tests for the chatwire command-line interface.
//!
//! These tests verify:
//! - Help text and argument parsing
//! - Context management against a throwaway config directory
//! - Credential commands that need no server round-trip
//!
//! Note: no test here talks to a live service.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A chatwire command isolated to `dir`.
fn chatwire(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("chatwire").unwrap();
    cmd.env("CHATWIRE_CONFIG_DIR", dir.path())
        .env_remove("CHATWIRE_SERVER_URL")
        .env_remove("CHATWIRE_CONTEXT");
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("models"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("chatwire"));
}

#[test]
fn test_chat_help_shows_options() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .args(["chat", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--model"))
        .stdout(predicate::str::contains("--no-stream"));
}

#[test]
fn test_auth_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .args(["auth", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("set-key"));
}

#[test]
fn test_unknown_command_fails() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_chat_requires_prompt() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir).arg("chat").assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_get_contexts_empty() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .args(["config", "get-contexts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No contexts configured"));
}

#[test]
fn test_set_context_creates_and_selects() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .args(["config", "set-context", "prod", "--server", "https://chat.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Context \"prod\" created."))
        .stdout(predicate::str::contains("set as current context"));

    chatwire(&dir)
        .args(["config", "current-context"])
        .assert()
        .success()
        .stdout(predicate::str::diff("prod\n"));

    let yaml = std::fs::read_to_string(dir.path().join("client.yaml")).unwrap();
    assert!(yaml.contains("https://chat.example.com"));
}

#[test]
fn test_set_context_requires_server_when_new() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .args(["config", "set-context", "prod"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--server is required"));
}

#[test]
fn test_use_context_switches() {
    let dir = TempDir::new().unwrap();
    for (name, server) in [("prod", "https://chat.example.com"), ("local", "http://localhost:8080")] {
        chatwire(&dir)
            .args(["config", "set-context", name, "--server", server])
            .assert()
            .success();
    }

    chatwire(&dir)
        .args(["config", "use-context", "local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Switched to context \"local\""));

    chatwire(&dir)
        .args(["--json", "config", "get-contexts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"current\": true"))
        .stdout(predicate::str::contains("http://localhost:8080"));
}

#[test]
fn test_use_unknown_context_fails() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .args(["config", "use-context", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn test_delete_context_clears_current() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .args(["config", "set-context", "prod", "--server", "https://chat.example.com"])
        .assert()
        .success();

    chatwire(&dir)
        .args(["config", "delete-context", "prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No current context"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_auth_status_without_context_fails() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .args(["auth", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("use-context"));
}

#[test]
fn test_auth_status_not_signed_in() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .args(["--server", "http://127.0.0.1:9", "auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[test]
fn test_set_key_is_persisted_per_context() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .args(["config", "set-context", "prod", "--server", "https://chat.example.com"])
        .assert()
        .success();

    chatwire(&dir)
        .args(["auth", "set-key", "sk-test-123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("API key stored for 'prod'"));

    assert!(dir.path().join("credentials/prod/credentials.json").exists());

    chatwire(&dir)
        .args(["--json", "auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"signedIn\": true"))
        .stdout(predicate::str::contains("api_keys"))
        .stdout(predicate::str::contains("sk-test-123").not());
}

#[test]
fn test_models_without_credential_fails() {
    let dir = TempDir::new().unwrap();
    chatwire(&dir)
        .args(["--server", "http://127.0.0.1:9", "models"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no credential"));
}
