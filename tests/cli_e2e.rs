use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn run_statusline(home: &Path, args: &[&str], stdin: &str) -> Output {
    run_statusline_with_env(home, args, stdin, &[])
}

/// Spawn the binary with every external data source pointed at nothing
fn run_statusline_with_env(
    home: &Path,
    args: &[&str],
    stdin: &str,
    extra_env: &[(&str, &str)],
) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_blueprint-statusline"))
        .args(args)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env("CLAUDE_STATUSLINE_FETCH_USAGE", "0")
        .env("CLAUDE_STATUSLINE_CCUSAGE_PATH", home.join("missing-ccusage"))
        .env("CLAUDE_STATUSLINE_DB_PATH", home.join("statusline.db"))
        .env_remove("CLAUDE_CONFIG_DIR")
        .env_remove("CLAUDE_STATUSLINE_CONFIG")
        .env_remove("CLAUDE_DEBUG")
        .env_remove("RUST_LOG")
        .envs(extra_env.iter().copied())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn statusline");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn hook_json(cwd: &Path) -> String {
    serde_json::json!({
        "session_id": "e2e-session",
        "transcript_path": cwd.join("missing.jsonl"),
        "model": {"id": "claude-opus-4", "display_name": "Opus"},
        "workspace": {"current_dir": cwd, "project_dir": cwd},
        "version": "1.0.0",
        "cost": {"total_cost_usd": 1.25, "total_duration_ms": 60000}
    })
    .to_string()
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn two_line_mode_survives_missing_sources() {
    let home = TempDir::new().unwrap();
    let output = run_statusline(home.path(), &["--two-line"], &hook_json(home.path()));

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2, "unexpected output: {lines:?}");
    assert!(lines.iter().all(|l| !l.trim().is_empty()));
    assert!(lines[0].contains("Opus"));
    assert!(lines[1].contains("S:"));
    assert!(lines[1].contains("0%"));
    assert!(!lines.join("\n").contains('\x1b'));
}

#[test]
fn one_line_mode_prints_blank_second_line() {
    let home = TempDir::new().unwrap();
    let output = run_statusline(home.path(), &[], &hook_json(home.path()));

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("Opus") && lines[0].contains("S:"));
    assert!(lines[1].is_empty());
}

#[test]
fn config_file_in_home_is_applied() {
    let home = TempDir::new().unwrap();
    std::fs::create_dir_all(home.path().join(".claude")).unwrap();
    std::fs::write(
        home.path().join(".claude/statusline.json"),
        r#"{"oneLine": false, "separator": "|"}"#,
    )
    .unwrap();

    let output = run_statusline(home.path(), &[], &hook_json(home.path()));
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains(" | "));
    assert!(!lines[1].is_empty());
}

#[test]
fn malformed_stdin_prints_error_fallback() {
    let home = TempDir::new().unwrap();
    let output = run_statusline(home.path(), &[], "{definitely not json");

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Error:"));
    assert_eq!(lines[1], "Check statusline configuration");
}

#[test]
fn invalid_config_prints_error_fallback() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.json");
    std::fs::write(&config, r#"{"limits": {"progressBarLength": 7}}"#).unwrap();

    let output = run_statusline(
        home.path(),
        &["--config", config.to_str().unwrap()],
        &hook_json(home.path()),
    );

    assert!(output.status.success());
    assert!(stdout_lines(&output)[0].starts_with("Error:"));
}

#[test]
fn empty_no_color_keeps_escape_codes() {
    let home = TempDir::new().unwrap();
    let output = run_statusline_with_env(
        home.path(),
        &["--two-line"],
        &hook_json(home.path()),
        &[("NO_COLOR", "")],
    );

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert!(lines[0].contains('\x1b'));
}

#[test]
fn float_duration_renders_normally() {
    let home = TempDir::new().unwrap();
    let stdin = hook_json(home.path())
        .replace(r#""total_duration_ms":60000"#, r#""total_duration_ms":60000.0"#);
    assert!(stdin.contains("60000.0"));

    let output = run_statusline(home.path(), &["--two-line"], &stdin);
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert!(!lines[0].starts_with("Error:"), "{lines:?}");
    assert!(lines[0].contains("Opus"));
}
