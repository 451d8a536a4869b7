// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn shell_runner_captures_stdout_and_exit() {
    let runner = ShellCommandRunner;
    let dir = tempfile::tempdir().unwrap();
    let output = runner.run("echo hello", dir.path()).await.unwrap();
    assert!(output.success());
    assert_eq!(output.stdout.trim(), "hello");
}

#[tokio::test]
async fn shell_runner_reports_nonzero_exit() {
    let runner = ShellCommandRunner;
    let dir = tempfile::tempdir().unwrap();
    let output = runner.run("exit 3", dir.path()).await.unwrap();
    assert!(!output.success());
    assert_eq!(output.exit_code, 3);
}

#[tokio::test]
async fn shell_runner_runs_in_cwd() {
    let runner = ShellCommandRunner;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
    let output = runner.run("ls", dir.path()).await.unwrap();
    assert!(output.stdout.contains("marker.txt"));
}

#[tokio::test]
async fn fake_runner_scripts_and_records() {
    let runner = FakeCommandRunner::new();
    runner.push_output(1, "2 passed, 1 failed");

    let output = runner
        .run("npm test", std::path::Path::new("/ws"))
        .await
        .unwrap();
    assert_eq!(output.exit_code, 1);
    assert_eq!(output.stdout, "2 passed, 1 failed");
    assert_eq!(
        runner.calls(),
        vec![("npm test".to_string(), std::path::PathBuf::from("/ws"))]
    );
}

#[tokio::test]
async fn fake_runner_defaults_to_success() {
    let runner = FakeCommandRunner::new();
    let output = runner.run("true", std::path::Path::new("/")).await.unwrap();
    assert!(output.success());
}
