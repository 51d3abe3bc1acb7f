//! Destinations for a generated commit message.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::SinkError;

/// Somewhere a generated commit message can be placed.
#[cfg_attr(test, mockall::automock)]
pub trait MessageSink: Send + Sync {
    fn publish(&self, message: &str) -> Result<(), SinkError>;
}

/// Prints the message on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl MessageSink for StdoutSink {
    fn publish(&self, message: &str) -> Result<(), SinkError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{message}")
            .and_then(|()| stdout.flush())
            .map_err(|e| SinkError::Unavailable(format!("stdout: {e}")))
    }
}

/// Writes the message into a commit message file, such as the one git hands
/// to a `prepare-commit-msg` hook.
///
/// Existing content (git's comment template) is kept below the suggestion.
#[derive(Debug, Clone)]
pub struct MessageFileSink {
    path: PathBuf,
}

impl MessageFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MessageSink for MessageFileSink {
    fn publish(&self, message: &str) -> Result<(), SinkError> {
        let dir = match self.path.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => {
                return Err(SinkError::Unavailable(format!(
                    "{} is not a file path",
                    self.path.display()
                )));
            }
        };
        if !dir.is_dir() {
            return Err(SinkError::Unavailable(format!(
                "directory {} does not exist",
                dir.display()
            )));
        }

        let existing = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                return Err(SinkError::WriteFailed {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let mut content = String::with_capacity(message.len() + existing.len() + 1);
        content.push_str(message);
        content.push('\n');
        if !existing.is_empty() {
            content.push('\n');
            content.push_str(&existing);
        }

        let write_failed = |source| SinkError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        // Atomic replace
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_failed)?;
        tmp.write_all(content.as_bytes()).map_err(write_failed)?;
        tmp.persist(&self.path)
            .map_err(|e| write_failed(e.error))?;

        debug!("Wrote commit message to {}", self.path.display());
        Ok(())
    }
}
