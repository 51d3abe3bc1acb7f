//! The generate pipeline: collect changes, request a message, deliver it.
//!
//! Stages:
//! 1. Locate the working tree
//! 2. Collect the change set
//! 3. Short-circuit when there is nothing to describe
//! 4. Build the prompt and request a message
//! 5. Publish the message to the sink

use std::path::Path;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::commit::build_and_request;
use crate::config::{ConfigSource, DEFAULT_TIMEOUT_SECS};
use crate::error::PipelineError;
use crate::git::{
    ChangeSet, ShellGit, check_git_installed, collect_with, default_strategies, discover_workdir,
};
use crate::host::{MessageSink, Notifier};
use crate::llm::CompletionClient;

/// Successful end states of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A message was generated and handed to the sink.
    Published(String),
    /// Nothing staged, modified or new.
    NoChanges,
}

/// Runs the pipeline against its collaborators, one invocation at a time.
pub struct Generator {
    config: Box<dyn ConfigSource>,
    client: Box<dyn CompletionClient>,
    sink: Box<dyn MessageSink>,
    git_timeout: Duration,
    in_flight: Mutex<()>,
}

impl Generator {
    pub fn new(
        config: Box<dyn ConfigSource>,
        client: Box<dyn CompletionClient>,
        sink: Box<dyn MessageSink>,
    ) -> Self {
        Self {
            config,
            client,
            sink,
            git_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            in_flight: Mutex::new(()),
        }
    }

    /// Bound each git query by `timeout`.
    pub fn with_git_timeout(mut self, timeout: Duration) -> Self {
        self.git_timeout = timeout;
        self
    }

    /// Generate and publish a message for the working tree containing `start_dir`.
    ///
    /// Returns [`PipelineError::AlreadyRunning`] if another invocation on this
    /// generator has not finished yet.
    #[instrument(skip_all, fields(dir = %start_dir.display()))]
    pub async fn run(&self, start_dir: &Path) -> Result<Outcome, PipelineError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| PipelineError::AlreadyRunning)?;

        let workdir = discover_workdir(start_dir)
            .ok_or_else(|| PipelineError::NoWorkspace(start_dir.to_path_buf()))?;

        check_git_installed()?;

        let git = ShellGit::new(&workdir, self.git_timeout);
        let changes = collect_with(&git, &default_strategies()).await?;

        self.describe(&changes).await
    }

    /// Stages 3-5 for an already collected change set.
    pub async fn describe(&self, changes: &ChangeSet) -> Result<Outcome, PipelineError> {
        if changes.is_empty() {
            info!("No changes detected, skipping request");
            return Ok(Outcome::NoChanges);
        }

        let api_key = self.config.credential();
        let message = build_and_request(changes, api_key.as_deref(), self.client.as_ref()).await?;

        self.sink.publish(&message)?;
        Ok(Outcome::Published(message))
    }
}

/// Report the result of an invocation through `notifier`.
pub fn report(result: &Result<Outcome, PipelineError>, notifier: &dyn Notifier) {
    match result {
        Ok(Outcome::Published(_)) => notifier.info("Commit message generated successfully!"),
        Ok(Outcome::NoChanges) => {
            notifier.info("No changes detected to generate commit message.")
        }
        Err(e) if e.is_informational() => notifier.info(&e.to_string()),
        Err(e) => notifier.error(&format!("Error generating commit message: {e}")),
    }
}
