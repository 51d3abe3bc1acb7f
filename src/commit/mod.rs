//! AI-generated commit messages from working tree changes.

pub mod message;
pub mod prompt;

pub use message::build_and_request;
pub use prompt::{MAX_DIFF_CHARS, TRUNCATION_MARKER, build_commit_prompt};
