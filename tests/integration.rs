//! Integration tests for clearcase-scm.

mod scm;

#[test]
fn test_binary_help_lists_actions() {
    use std::process::Command;

    let output = Command::new(env!("CARGO_BIN_EXE_clearcase-scm"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for subcommand in ["status", "watch", "checkout", "checkin", "undo-checkout", "version-tree"] {
        assert!(stdout.contains(subcommand), "Help should mention {subcommand}");
    }
}

#[test]
fn test_checkin_help_mentions_comment() {
    use std::process::Command;

    let output = Command::new(env!("CARGO_BIN_EXE_clearcase-scm"))
        .args(["checkin", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--comment"), "Expected --comment in help");
}

#[test]
fn test_missing_cleartool_reports_not_found() {
    use std::process::Command;

    let workspace = tempfile::TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_clearcase-scm"))
        .args(["--executable", "cleartool-definitely-missing", "--workspace"])
        .arg(workspace.path())
        .arg("info")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("ClearCase not found"),
        "Expected not-found error, got: {stderr}"
    );
}

#[test]
fn test_missing_explicit_config_is_reported() {
    use std::process::Command;

    let output = Command::new(env!("CARGO_BIN_EXE_clearcase-scm"))
        .args(["--config", "/nonexistent/clearcase-scm.toml", "status"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Cannot read config file"),
        "Expected config read error, got: {stderr}"
    );
}
