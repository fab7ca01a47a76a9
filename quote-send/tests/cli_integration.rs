//! Integration tests for the quote-send binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn quote_send(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("quote-send").unwrap();
    cmd.env_remove("QUOTECAST_GEMINI_API_KEY")
        .env_remove("QUOTECAST_PASSWORD")
        .env_remove("QUOTECAST_USERNAME")
        .env_remove("QUOTECAST_TRIGGER")
        .env_remove("QUOTECAST_OUTPUT")
        .env_remove("RUST_LOG")
        .env("QUOTECAST_CONFIG", dir.path().join("absent.toml"));
    cmd
}

#[test]
fn test_help_lists_flags() {
    let dir = TempDir::new().unwrap();
    quote_send(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--once"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--log-format"));
}

#[test]
fn test_invalid_log_format_is_rejected() {
    let dir = TempDir::new().unwrap();
    quote_send(&dir)
        .args(["--log-format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log format"));
}

#[test]
fn test_invalid_policy_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        "[policy]\nmin_post_interval = \"8h\"\nmax_post_interval = \"4h\"\n",
    )
    .unwrap();

    quote_send(&dir)
        .args(["--once", "--dry-run", "--config"])
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid posting policy"));
}

#[test]
fn test_missing_explicit_config_exits_with_config_code() {
    let dir = TempDir::new().unwrap();
    quote_send(&dir)
        .args(["--once", "--config"])
        .arg(dir.path().join("nope.toml"))
        .assert()
        .code(2);
}

#[test]
fn test_live_run_requires_credentials() {
    let dir = TempDir::new().unwrap();
    quote_send(&dir)
        .arg("--once")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("platform.username"));
}

#[test]
fn test_dry_run_with_missing_font_fails_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    let output = dir.path().join("post.jpg");
    fs::write(
        &config,
        format!(
            "[render]\noutput_path = \"{}\"\nfont_path = \"{}\"\n",
            output.display().to_string().replace('\\', "/"),
            dir.path()
                .join("missing.ttf")
                .display()
                .to_string()
                .replace('\\', "/")
        ),
    )
    .unwrap();

    quote_send(&dir)
        .args(["--once", "--dry-run", "--config"])
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Render error"));

    assert!(!output.exists());
}
