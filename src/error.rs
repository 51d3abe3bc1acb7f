//! Error types for gitmessage modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from a single git CLI invocation.
#[derive(Error, Debug)]
pub enum GitCommandError {
    #[error("Failed to spawn git: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("git {command} timed out after {seconds} seconds")]
    Timeout { command: String, seconds: u64 },

    #[error("git {command} exited with code {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Errors from working tree change collection.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("git not found on PATH. Install git to inspect the working tree")]
    GitNotInstalled,

    #[error("Every git query failed while collecting changes: {0}")]
    ToolingFailed(#[source] GitCommandError),
}

/// Errors from building the prompt and requesting a message.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(
        "Mistral API key not found. Run 'gitmessage config set-key' or set GITMESSAGE_API_KEY"
    )]
    MissingCredential,

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Request to the completion endpoint failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Completion endpoint timed out after {0} seconds")]
    Timeout(u64),

    #[error("Completion endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Completion endpoint returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("Completion endpoint returned no choices")]
    NoChoices,

    #[error("Completion endpoint returned an empty message")]
    EmptyMessage,
}

/// Errors from delivering the generated message.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("No commit message input available: {0}")]
    Unavailable(String),

    #[error("Failed to write commit message to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from loading or saving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine a configuration directory. Set GITMESSAGE_CONFIG")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to write config file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal failures of one generate invocation.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No git working tree found at {}", .0.display())]
    NoWorkspace(PathBuf),

    #[error("Failed to collect changes: {0}")]
    Collection(#[from] CollectError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Could not deliver commit message: {0}")]
    SinkUnavailable(#[from] SinkError),

    #[error("A commit message is already being generated")]
    AlreadyRunning,
}

impl PipelineError {
    /// Whether the failure should surface as an informational notice rather than an error.
    pub fn is_informational(&self) -> bool {
        matches!(self, PipelineError::NoWorkspace(_))
    }

    /// Whether the failure can be remedied by configuring an API key.
    pub fn is_missing_credential(&self) -> bool {
        matches!(
            self,
            PipelineError::Generation(GenerationError::MissingCredential)
        )
    }
}
