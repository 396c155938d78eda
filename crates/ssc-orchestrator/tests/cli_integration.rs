//! CLI integration tests
//!
//! Tests the ssc binary using assert_cmd.

use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;

fn ssc() -> Command {
    let mut cmd = Command::cargo_bin("ssc")
        .expect("Failed to locate ssc binary - ensure it's built before running tests");
    // Keep a user's config file out of the picture
    let home = std::env::temp_dir().join("ssc-cli-tests-home");
    cmd.env("HOME", &home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .timeout(Duration::from_secs(30));
    cmd
}

#[test]
fn test_cli_help() {
    ssc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ssc"))
        .stdout(predicate::str::contains("Suspend a process"))
        .stdout(predicate::str::contains("--freeze-delay"));
}

#[test]
fn test_cli_version() {
    ssc()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ssc"));
}

#[test]
fn test_missing_command_fails() {
    ssc()
        .args(["-p", "127.0.0.1:0=127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no command given"));
}

#[test]
fn test_bad_mapping_fails() {
    ssc()
        .args(["-p", "127.0.0.1:9000", "--", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid port mapping"));
}

#[test]
fn test_bad_duration_fails() {
    ssc()
        .args(["-d", "soon", "--", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid duration"));
}

#[test]
fn test_exits_cleanly_when_child_exits() {
    ssc().args(["-d", "30s", "--", "true"]).assert().success();
}

#[test]
fn test_child_failure_is_not_ssc_failure() {
    ssc()
        .args(["-d", "30s", "--", "sh", "-c", "exit 3"])
        .assert()
        .success();
}

#[test]
fn test_child_output_passes_through() {
    ssc()
        .args(["-d", "30s", "--", "echo", "hello from child"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello from child"));
}

#[test]
fn test_child_arguments_with_hyphens() {
    ssc()
        .args(["-d", "30s", "--", "sh", "-c", "echo -n dashed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dashed"));
}

#[test]
fn test_bind_conflict_fails() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap();

    ssc()
        .args(["-p", &format!("{}=127.0.0.1:1", addr), "-d", "30s"])
        .args(["--", "sleep", "30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to bind"));
}

#[test]
fn test_spawn_failure_fails() {
    ssc()
        .args(["-d", "30s", "--", "/nonexistent/ssc-test-binary"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to spawn"));
}

#[test]
fn test_command_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
freeze_delay = "30s"
command = ["sh", "-c", "echo from config"]
"#,
    )
    .unwrap();

    ssc()
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("from config"));
}

#[test]
fn test_missing_config_file_fails() {
    ssc()
        .args(["--config", "/nonexistent/ssc.toml", "--", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
