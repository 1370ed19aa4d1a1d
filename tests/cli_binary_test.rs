//! Runs the rota-session binary for the commands that need no backend.

use std::process::Command;

fn run(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_rota-session"))
        .args(args)
        .env_remove("ROTA_BACKEND_URL")
        .env_remove("ROTA_ANON_KEY")
        .env(
            "ROTA_STORAGE_PATH",
            std::env::temp_dir().join("rota-session-cli-test.json"),
        )
        .output()
        .expect("Failed to execute binary")
}

#[test]
fn test_version_matches_cargo_toml() {
    let output = run(&["--version"]);

    assert!(output.status.success(), "Version flag should exit with code 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = stdout.trim().strip_prefix("rota-session ").unwrap_or("");
    assert_eq!(version, env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_help_lists_commands() {
    let output = run(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sign-in <EMAIL>"));
    assert!(stdout.contains("ROTA_BACKEND_URL"));
}

#[test]
fn test_status_without_backend_fails() {
    let output = run(&["status"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ROTA_BACKEND_URL"), "stderr was: {}", stderr);
    assert!(stderr.contains("Configuration problem"), "stderr was: {}", stderr);
}

#[test]
fn test_unknown_command_fails_with_usage() {
    let output = run(&["frobnicate"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage: rota-session"));
    assert!(stderr.contains("unknown command: frobnicate"));
}
