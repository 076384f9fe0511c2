//! Smoke tests -- verify the binary runs and its subcommands parse.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn mtqueue() -> Command {
    let mut cmd = Command::cargo_bin("mtqueue").unwrap();
    cmd.env_remove("MTQUEUE_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    mtqueue()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Priority-queued machine translation service",
        ));
}

#[test]
fn test_cli_version() {
    mtqueue()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mtqueue"));
}

#[test]
fn test_serve_subcommand_exists() {
    mtqueue()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"));
}

#[test]
fn test_config_prints_file_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
listen_address = "127.0.0.1:9100"

[processor]
backend = "echo"
"#
    )
    .unwrap();

    mtqueue()
        .args(["config", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("listen_address = \"127.0.0.1:9100\""))
        .stdout(predicate::str::contains("backend = \"echo\""))
        .stdout(predicate::str::contains("request_timeout_sec = 300"));
}

#[test]
fn test_config_env_var_is_honored() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[logging]\nformat = \"json\"").unwrap();

    mtqueue()
        .arg("config")
        .env("MTQUEUE_CONFIG", file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("format = \"json\""));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[server]\nrequest_timeout_sec = 0").unwrap();

    mtqueue()
        .args(["config", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("request_timeout_sec"));
}

#[test]
fn test_serve_rejects_bad_bind_address() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[processor]\nbackend = \"echo\"").unwrap();

    mtqueue()
        .args(["serve", "--bind", "not-an-address", "--config"])
        .arg(file.path())
        .assert()
        .failure();
}
