//! gitmessage - suggest a commit message for the changes in a git working tree.
//!
//! # Overview
//!
//! gitmessage collects the staged (or unstaged) diff and the list of new
//! files from the working tree, builds a bounded prompt from them, and asks a
//! Mistral agent to write the commit message. The result is printed or
//! written into a commit message file.

pub mod commit;
pub mod config;
pub mod error;
pub mod generate;
pub mod git;
pub mod host;
pub mod llm;

// Re-export commonly used types
pub use config::{ConfigSource, Settings};
pub use error::{CollectError, ConfigError, GenerationError, PipelineError, SinkError};
pub use generate::{Generator, Outcome};
pub use git::ChangeSet;
