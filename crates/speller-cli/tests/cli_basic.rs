//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs. Each test points
//! HOME at its own directory so the user's configuration is never touched.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command with `home` as HOME and return (stdout, stderr, code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "speller-cli", "--"])
        .args(args)
        .env("HOME", home)
        .env_remove("SPELLER_ENV")
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

const FAST_CONFIG: &str = r#"
symbols = "ABCD"
targets = "AB"
seed = 3

[repetitions]
train = 1
test = 1

[durations]
baseline_eyes_open = 0
baseline_eyes_closed = 0
focus = 10
inter_block = 10
flash = { expectation = 5.0, min = 1.0, max = 10.0 }
inter_flash = { expectation = 5.0, min = 1.0, max = 10.0 }
"#;

#[test]
fn test_config_get_default() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "targets"]);
    assert_eq!(code, 0, "Config get failed");
    assert_eq!(stdout.trim(), "TIMEFLUX");
}

#[test]
fn test_config_set_then_get() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "set", "durations.flash.max", "200"]);
    assert_eq!(code, 0, "Config set failed");
    assert_eq!(stdout.trim(), "durations.flash.max = 200.0");

    let (stdout, _, code) = run_cli(home.path(), &["config", "set", "stim.face", "true"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "stim.face = true");
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "durations.flash.max"]);
    assert_eq!(stdout.trim().parse::<f64>().unwrap(), 200.0);
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "targets", "HELLO?"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_get_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_and_path() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0, "Config list failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["repetitions"]["train"], 8);

    let (stdout, _, code) = run_cli(home.path(), &["config", "path"]);
    assert_eq!(code, 0);
    assert!(stdout.trim().ends_with("config.toml"));
}

#[test]
fn test_config_validate_file() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("fast.toml");
    std::fs::write(&file, FAST_CONFIG).unwrap();
    let (stdout, _, code) = run_cli(
        home.path(),
        &["config", "validate", "--file", file.to_str().unwrap()],
    );
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok: 4 symbols in 2 groups");
}

#[test]
fn test_run_streams_events_as_json_lines() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("fast.toml");
    std::fs::write(&file, FAST_CONFIG).unwrap();

    // stdin closes at once, so the session ends after training.
    let (stdout, _, code) = run_cli(
        home.path(),
        &["run", "--config", file.to_str().unwrap(), "--skip-wait"],
    );
    assert_eq!(code, 0, "Run failed");

    let labels: Vec<String> = stdout
        .lines()
        .map(|line| {
            let event: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(event["at"].is_string());
            event["label"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(labels.first().map(String::as_str), Some("session_begins"));
    assert_eq!(labels.last().map(String::as_str), Some("session_ends"));
    assert_eq!(labels.iter().filter(|l| *l == "focus_begins").count(), 2);
    assert!(labels.iter().any(|l| l == "calibration_ends"));
    assert!(!labels.iter().any(|l| l == "testing_begins"));
}

#[test]
fn test_run_quiet_logs_labels_instead() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("fast.toml");
    std::fs::write(&file, FAST_CONFIG).unwrap();

    let (stdout, stderr, code) = run_cli(
        home.path(),
        &["run", "--config", file.to_str().unwrap(), "--skip-wait", "--quiet"],
    );
    assert_eq!(code, 0, "Run failed");
    assert!(stdout.is_empty());
    assert!(stderr.contains("session_begins"));
    assert!(stderr.contains("calibration_ends"));
}

#[test]
fn test_run_with_render_draws_grid() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("fast.toml");
    std::fs::write(&file, FAST_CONFIG).unwrap();

    let mut child = Command::new("cargo")
        .args(["run", "-q", "-p", "speller-cli", "--", "run", "--render"])
        .args(["--config", file.to_str().unwrap(), "--targets", "C"])
        .env("HOME", home.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn CLI");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"not a message\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(">C<"));
    assert!(stderr.contains("+---+"));
}
