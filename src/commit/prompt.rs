//! Prompt construction for generated commit messages.

use crate::git::ChangeSet;

/// Maximum characters of diff text forwarded to the model.
pub const MAX_DIFF_CHARS: usize = 32_000;

/// Marker appended to a diff cut at [`MAX_DIFF_CHARS`].
pub const TRUNCATION_MARKER: &str = "...(truncated)";

/// Build the prompt sent as the sole user message.
///
/// Layout: instruction header, blank line, diff text (truncated), and a
/// new-files section when the change set adds untracked files.
pub fn build_commit_prompt(changes: &ChangeSet) -> String {
    let mut prompt = instruction_header(changes.modified_files.len(), changes.new_files.len());
    prompt.push_str("\n\n");
    prompt.push_str(&truncate_diff(&changes.diff_text, MAX_DIFF_CHARS));

    if !changes.new_files.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&new_files_section(&changes.new_files));
    }

    prompt
}

/// Instruction header; wording depends on which kinds of change are present.
fn instruction_header(modified: usize, new: usize) -> String {
    match (modified, new) {
        (m, n) if m > 0 && n > 0 => format!(
            "Write a git commit message for the diff below. Cover the significant changes \
             to existing files, and mention that this commit also adds {}. \
             Do not describe the new files individually.",
            count_files(n)
        ),
        (0, n) if n > 0 => format!(
            "Write a git commit message for this commit. It primarily adds {}. \
             Summarize their overall purpose without detailing each file.",
            count_files(n)
        ),
        _ => "Write a git commit message for the diff below. Make sure it covers all \
              significant changes."
            .to_string(),
    }
}

/// "1 new file" / "N new files".
fn count_files(n: usize) -> String {
    if n == 1 {
        "1 new file".to_string()
    } else {
        format!("{n} new files")
    }
}

/// Section listing every new file, one `- ` bullet per path in input order.
fn new_files_section(paths: &[String]) -> String {
    let mut section = format!("New Files Added ({}):", paths.len());
    for path in paths {
        section.push_str("\n- ");
        section.push_str(path);
    }
    section
}

/// Cut `diff` to at most `max_chars` characters, appending [`TRUNCATION_MARKER`] when cut.
///
/// Counts Unicode scalar values, so multi-byte content never splits mid-character.
pub fn truncate_diff(diff: &str, max_chars: usize) -> String {
    match diff.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut truncated = String::with_capacity(cut + TRUNCATION_MARKER.len());
            truncated.push_str(&diff[..cut]);
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => diff.to_string(),
    }
}
