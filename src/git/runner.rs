//! git CLI spawning.
//!
//! All working tree queries shell out to the system `git` binary so they see
//! the user's own config, attributes and ignore rules.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{CollectError, GitCommandError};

/// Captured result of a finished git process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Trait for running git commands in a working tree.
///
/// This abstraction allows scripting git responses in tests.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run git with the given arguments and capture its output.
    ///
    /// A non-zero exit is still `Ok`; only spawn failures and timeouts are errors.
    async fn run(&self, args: &[&str]) -> Result<GitOutput, GitCommandError>;

    /// Run git and require a zero exit status, returning stdout.
    async fn run_checked(&self, args: &[&str]) -> Result<String, GitCommandError> {
        let output = self.run(args).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(GitCommandError::NonZeroExit {
                command: args.join(" "),
                code: output.code.unwrap_or(-1),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Default runner that calls the real git CLI inside a working tree.
#[derive(Debug, Clone)]
pub struct ShellGit {
    workdir: PathBuf,
    timeout: Duration,
}

impl ShellGit {
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            workdir: workdir.into(),
            timeout,
        }
    }
}

#[async_trait]
impl GitRunner for ShellGit {
    async fn run(&self, args: &[&str]) -> Result<GitOutput, GitCommandError> {
        let output = timeout(
            self.timeout,
            Command::new("git")
                .args(args)
                .current_dir(&self.workdir)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| GitCommandError::Timeout {
            command: args.join(" "),
            seconds: self.timeout.as_secs(),
        })?
        .map_err(GitCommandError::SpawnFailed)?;

        Ok(GitOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Check that a git executable is available.
///
/// Uses the `which` crate for cross-platform executable detection.
pub fn check_git_installed() -> Result<(), CollectError> {
    which::which("git")
        .map(|_| ())
        .map_err(|_| CollectError::GitNotInstalled)
}
