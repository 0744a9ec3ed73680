//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and
//! verify outputs.

use std::path::Path;
use std::process::Command;

use focusflow_core::Database;
use serde_json::Value;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_focusflow-cli"))
        .env("FOCUSFLOW_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Value {
    let (code, stdout, stderr) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("{args:?} printed non-JSON ({e}): {stdout}"))
}

#[test]
fn test_steps_log_and_show() {
    let dir = tempfile::tempdir().unwrap();

    let logged = run_json(dir.path(), &["steps", "log", "4000"]);
    assert_eq!(logged["steps"], 4000);

    let added = run_json(dir.path(), &["steps", "log", "1500", "--add"]);
    assert_eq!(added["steps"], 5500);

    let shown = run_json(dir.path(), &["steps", "show", "--days", "3"]);
    let entries = shown.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["steps"], 5500);
}

#[test]
fn test_bonus_refresh_awards_minutes() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["steps", "log", "12000"]);

    let out = run_json(dir.path(), &["bonus", "refresh"]);
    assert_eq!(out["refresh"]["outcome"], "completed");
    assert_eq!(out["refresh"]["newly_earned_minutes"], 20);
    assert_eq!(out["snapshot"]["available_bonus_minutes"], 20);
    assert_eq!(out["snapshot"]["phase"], "unblocked");

    // Same steps again: nothing new, balance persisted.
    let again = run_json(dir.path(), &["bonus", "refresh"]);
    assert_eq!(again["refresh"]["newly_earned_minutes"], 0);
    assert_eq!(again["snapshot"]["available_bonus_minutes"], 20);
}

#[test]
fn test_bonus_limit_start_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["steps", "log", "10000"]);

    let limited = run_json(dir.path(), &["bonus", "limit", "--group", "social"]);
    assert_eq!(limited["snapshot"]["phase"], "blocked_waiting");
    assert_eq!(limited["snapshot"]["blocked_group_identifier"], "social");
    assert_eq!(limited["shield"]["status"], "applied");
    assert_eq!(limited["shield"]["group_id"], "social");

    let started = run_json(dir.path(), &["bonus", "start", "--minutes", "5"]);
    assert_eq!(started["snapshot"]["phase"], "blocked_unlocked");
    assert_eq!(started["snapshot"]["available_bonus_minutes"], 10);
    assert!(started["snapshot"]["active_unlock_until"].is_string());
    assert_eq!(started["shield"]["status"], "clear");

    // The open window survives a restart.
    let status = run_json(dir.path(), &["bonus", "status"]);
    assert_eq!(status["snapshot"]["phase"], "blocked_unlocked");

    let cleared = run_json(dir.path(), &["bonus", "clear"]);
    assert_eq!(cleared["snapshot"]["phase"], "unblocked");
    assert!(cleared["snapshot"]["active_unlock_until"].is_null());
    assert_eq!(cleared["shield"]["status"], "clear");
}

#[test]
fn test_bonus_status_applies_new_day() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["steps", "log", "12000"]);
    run_json(dir.path(), &["bonus", "limit", "--group", "social"]);
    let started = run_json(dir.path(), &["bonus", "start", "--minutes", "5"]);
    assert_eq!(started["snapshot"]["available_bonus_minutes"], 15);

    // Pretend the stored state is from a long-gone day.
    {
        let db = Database::open_at(&dir.path().join("focusflow.db")).unwrap();
        let mut snapshot: Value = db.kv_get_json("bonus_orchestrator").unwrap().unwrap();
        snapshot["last_bonus_day"] = Value::from("2000-01-01");
        snapshot["bonus_state"]["last_evaluated_day"] = Value::from("2000-01-01");
        db.kv_set_json("bonus_orchestrator", &snapshot).unwrap();
    }

    let status = run_json(dir.path(), &["bonus", "status"]);
    assert_eq!(status["snapshot"]["available_bonus_minutes"], 0);
    assert_eq!(status["snapshot"]["phase"], "blocked_waiting");
    assert!(status["snapshot"]["active_unlock_until"].is_null());
    assert_eq!(status["shield"]["status"], "applied");
    assert_eq!(status["snapshot"]["bonus_state"]["base_bonus_granted"], false);
}

#[test]
fn test_bonus_start_without_block_fails() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["steps", "log", "10000"]);

    let (code, _, stderr) = run_cli(dir.path(), &["bonus", "start"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("no bonus session started"));
}

#[test]
fn test_limit_uses_configured_group() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(dir.path(), &["config", "set", "limits.blocked_group", "games"]);
    assert_eq!(code, 0);

    let limited = run_json(dir.path(), &["bonus", "limit"]);
    assert_eq!(limited["snapshot"]["blocked_group_identifier"], "games");
}

#[test]
fn test_reward() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_json(dir.path(), &["reward", "--steps", "5000"]);
    assert_eq!(out["bonus_minutes"], 15);
    assert_eq!(out["allowed_minutes"], 45);
    assert_eq!(out["progress"], 0.5);
}

#[test]
fn test_config_get_set_reset() {
    let dir = tempfile::tempdir().unwrap();

    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "bonus.daily_step_goal"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "10000");

    let (code, _, _) = run_cli(dir.path(), &["config", "set", "bonus.daily_step_goal", "8000"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "bonus.daily_step_goal"]);
    assert_eq!(stdout.trim(), "8000");

    let (code, _, _) = run_cli(dir.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "bonus.daily_step_goal"]);
    assert_eq!(stdout.trim(), "10000");
}

#[test]
fn test_config_set_echoes_stored_value() {
    let dir = tempfile::tempdir().unwrap();

    let (code, stdout, _) = run_cli(
        dir.path(),
        &["config", "set", "limits.daily_limit_minutes", "150"],
    );
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "limits.daily_limit_minutes = 150 (2 h 30 min)");

    let (code, stdout, _) = run_cli(
        dir.path(),
        &["config", "set", "bonus.bonus_steps_per_block", "0"],
    );
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "bonus.bonus_steps_per_block = 1 (clamped from 0)");

    let (_, stdout, _) = run_cli(dir.path(), &["config", "set", "limits.blocked_group", "games"]);
    assert_eq!(stdout.trim(), "limits.blocked_group = games");
}

#[test]
fn test_config_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["config", "get", "nonexistent.key"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_json(dir.path(), &["config", "list"]);
    assert!(out.get("bonus").is_some());
    assert!(out.get("limits").is_some());
    assert!(out.get("reward").is_some());
}
