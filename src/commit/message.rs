//! Commit message generation via the completion endpoint.

use tracing::{debug, info};

use crate::commit::prompt::{MAX_DIFF_CHARS, build_commit_prompt};
use crate::error::GenerationError;
use crate::git::ChangeSet;
use crate::llm::CompletionClient;

/// Generate a commit message for `changes`.
///
/// Fails with [`GenerationError::MissingCredential`] before any network
/// traffic when `api_key` is absent or blank. Makes exactly one request;
/// failures are returned as-is, without retrying.
pub async fn build_and_request<C>(
    changes: &ChangeSet,
    api_key: Option<&str>,
    client: &C,
) -> Result<String, GenerationError>
where
    C: CompletionClient + ?Sized,
{
    let api_key = api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(GenerationError::MissingCredential)?;

    let prompt = build_commit_prompt(changes);

    debug!("Commit prompt length: {} chars", prompt.len());
    debug!(
        "Changes: {} modified, {} new, diff truncated={}",
        changes.modified_files.len(),
        changes.new_files.len(),
        changes.diff_text.chars().count() > MAX_DIFF_CHARS
    );

    let content = client.complete(api_key, &prompt).await?;
    let message = content.trim();

    if message.is_empty() {
        return Err(GenerationError::EmptyMessage);
    }

    info!("Generated {} char commit message", message.len());
    Ok(message.to_string())
}
