// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess seam for test commands.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors from command execution
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    #[error("failed to spawn command: {0}")]
    Spawn(String),
    #[error("command interrupted by task stop")]
    Interrupted,
}

/// Runs workspace commands (test suites, verification shell-outs).
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, CommandError>;
}

/// Production runner: `bash -c` with strict mode, captured output.
#[derive(Clone, Default)]
pub struct ShellCommandRunner;

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, CommandError> {
        info!(%command, cwd = %cwd.display(), "running command");

        let wrapped = format!("set -euo pipefail\n{command}");
        let output = tokio::process::Command::new("bash")
            .arg("-c")
            .arg(&wrapped)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|e| CommandError::Spawn(e.to_string()))?;

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        if !result.success() {
            warn!(%command, exit_code = result.exit_code, "command failed");
        }
        Ok(result)
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeCommandRunner;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Arc;

    /// Fake runner with scripted outputs, recording every invocation.
    #[derive(Clone, Default)]
    pub struct FakeCommandRunner {
        inner: Arc<Mutex<FakeCommandState>>,
    }

    #[derive(Default)]
    struct FakeCommandState {
        script: VecDeque<Result<CommandOutput, CommandError>>,
        calls: Vec<(String, PathBuf)>,
    }

    impl FakeCommandRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_output(&self, exit_code: i32, stdout: impl Into<String>) {
            self.inner.lock().script.push_back(Ok(CommandOutput {
                exit_code,
                stdout: stdout.into(),
                stderr: String::new(),
            }));
        }

        pub fn push_error(&self, error: CommandError) {
            self.inner.lock().script.push_back(Err(error));
        }

        /// `(command, cwd)` pairs seen so far.
        pub fn calls(&self) -> Vec<(String, PathBuf)> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeCommandRunner {
        async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, CommandError> {
            let mut state = self.inner.lock();
            state.calls.push((command.to_string(), cwd.to_path_buf()));
            state.script.pop_front().unwrap_or(Ok(CommandOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            }))
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
