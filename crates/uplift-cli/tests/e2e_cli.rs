//! E2E tests for the `uplift` binary that need no running backend.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn uplift_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("uplift"));
    cmd.current_dir(dir);
    cmd.env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd.env("HOME", dir);
    cmd.env("UPLIFT_LOG", "error");
    for key in [
        "UPLIFT_BACKEND_URL",
        "UPLIFT_BUGZILLA_URL",
        "UPLIFT_CLIENT_ID",
        "UPLIFT_ACCESS_TOKEN",
        "FORMAT",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    uplift_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyses"))
        .stdout(predicate::str::contains("approve"))
        .stdout(predicate::str::contains("reject"));
}

#[test]
fn config_json_reflects_env_overrides() {
    let dir = TempDir::new().unwrap();
    let output = uplift_cmd(dir.path())
        .env("UPLIFT_BACKEND_URL", "http://dashboard.test/")
        .env("UPLIFT_CLIENT_ID", "mozilla-ldap/reviewer")
        .env("UPLIFT_ACCESS_TOKEN", "s3cr3t")
        .args(["config", "--json"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "config failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(config["backend_url"], "http://dashboard.test");
    assert_eq!(config["bugzilla_url"], "https://bugzilla.mozilla.org/rest");
    assert_eq!(config["client_id"], "mozilla-ldap/reviewer");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("s3cr3t"));
}

#[test]
fn project_config_file_is_read() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".uplift")).unwrap();
    fs::write(
        dir.path().join(".uplift/config.toml"),
        "default_comment = \"Reviewed in the terminal.\"\n",
    )
    .unwrap();

    uplift_cmd(dir.path())
        .args(["config"])
        .env("FORMAT", "text")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "default_comment\tReviewed in the terminal.",
        ))
        .stdout(predicate::str::contains("client_id\t-"));
}

#[test]
fn malformed_config_reports_code() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".uplift")).unwrap();
    fs::write(dir.path().join(".uplift/config.toml"), "backend_url = [").unwrap();

    uplift_cmd(dir.path())
        .args(["config", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
}

#[test]
fn publishing_without_credentials_fails() {
    let dir = TempDir::new().unwrap();
    uplift_cmd(dir.path())
        .args([
            "approve",
            "3",
            "1234",
            "--version",
            "approval-mozilla-beta",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3001"));
}

#[test]
fn unreachable_backend_reports_transport_code() {
    let dir = TempDir::new().unwrap();
    uplift_cmd(dir.path())
        .env("UPLIFT_BACKEND_URL", "http://127.0.0.1:9")
        .args(["analyses", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E4001"));
}

#[test]
fn bad_set_argument_is_rejected_by_parser() {
    let dir = TempDir::new().unwrap();
    uplift_cmd(dir.path())
        .args(["flags", "3", "1234", "--set", "status_firefox55"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("KEY=VALUE"));
}
