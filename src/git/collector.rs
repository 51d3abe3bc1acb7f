//! Working tree change collection.
//!
//! Produces a [`ChangeSet`] from a handful of git queries. Every query is
//! allowed to fail: a failed step degrades toward "no changes" instead of
//! aborting the whole pass.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{CollectError, GitCommandError};

use super::runner::{GitRunner, ShellGit};

const STAGED_DIFF_ARGS: &[&str] = &["diff", "--cached", "--no-color", "--no-ext-diff"];
const UNSTAGED_DIFF_ARGS: &[&str] = &["diff", "--no-color", "--no-ext-diff"];

/// Result of one collection pass over the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Unified diff of staged changes, or of unstaged tracked changes when nothing is staged.
    pub diff_text: String,
    /// Tracked paths with changes, in detection order.
    pub modified_files: Vec<String>,
    /// Untracked, non-ignored paths, in detection order.
    pub new_files: Vec<String>,
}

impl ChangeSet {
    /// Whether there is nothing to describe.
    pub fn is_empty(&self) -> bool {
        self.diff_text.is_empty() && self.new_files.is_empty()
    }
}

/// How an enumeration strategy classified a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Modified,
    New,
}

/// A path reported by an enumeration strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedPath {
    pub path: String,
    pub kind: PathKind,
}

/// Paths found by one enumeration strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enumeration {
    pub entries: Vec<ListedPath>,
    /// When false, each path's kind is a guess to be confirmed against the index.
    pub authoritative: bool,
}

/// One way of listing modified and untracked paths.
#[async_trait]
pub trait EnumerationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn enumerate(&self, git: &dyn GitRunner) -> Result<Enumeration, GitCommandError>;
}

/// Lists modified tracked and untracked paths in a single `git ls-files` call.
///
/// The status tag `ls-files -t` prints is used as the initial guess.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombinedListing;

#[async_trait]
impl EnumerationStrategy for CombinedListing {
    fn name(&self) -> &'static str {
        "combined listing"
    }

    async fn enumerate(&self, git: &dyn GitRunner) -> Result<Enumeration, GitCommandError> {
        let stdout = git
            .run_checked(&[
                "ls-files",
                "-t",
                "-z",
                "--modified",
                "--others",
                "--exclude-standard",
            ])
            .await?;

        let mut entries: Vec<ListedPath> = Vec::new();
        for record in split_nul(&stdout) {
            let Some((tag, path)) = record.split_once(' ') else {
                debug!("Skipping malformed ls-files record: {:?}", record);
                continue;
            };
            let kind = if tag == "?" {
                PathKind::New
            } else {
                PathKind::Modified
            };
            push_unique(&mut entries, path, kind);
        }

        Ok(Enumeration {
            entries,
            authoritative: false,
        })
    }
}

/// Lists tracked modifications and untracked paths with two separate queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitListing;

#[async_trait]
impl EnumerationStrategy for SplitListing {
    fn name(&self) -> &'static str {
        "split listing"
    }

    async fn enumerate(&self, git: &dyn GitRunner) -> Result<Enumeration, GitCommandError> {
        let modified = git.run_checked(&["diff", "--name-only", "-z"]).await;
        let untracked = git
            .run_checked(&["ls-files", "-z", "--others", "--exclude-standard"])
            .await;

        let (modified, untracked) = match (modified, untracked) {
            (Err(modified_err), Err(untracked_err)) => {
                warn!("Untracked file listing failed: {}", untracked_err);
                return Err(modified_err);
            }
            (modified, untracked) => (
                modified.unwrap_or_else(|e| {
                    warn!("Modified file listing failed: {}", e);
                    String::new()
                }),
                untracked.unwrap_or_else(|e| {
                    warn!("Untracked file listing failed: {}", e);
                    String::new()
                }),
            ),
        };

        let mut entries = Vec::new();
        for path in split_nul(&modified) {
            push_unique(&mut entries, path, PathKind::Modified);
        }
        for path in split_nul(&untracked) {
            push_unique(&mut entries, path, PathKind::New);
        }

        Ok(Enumeration {
            entries,
            authoritative: true,
        })
    }
}

/// The enumeration strategies in the order they are tried.
pub fn default_strategies() -> Vec<Box<dyn EnumerationStrategy>> {
    vec![Box::new(CombinedListing), Box::new(SplitListing)]
}

/// Collect the changes in the working tree rooted at `workdir` using the git CLI.
pub async fn collect_changes(workdir: &Path, timeout: Duration) -> Result<ChangeSet, CollectError> {
    let git = ShellGit::new(workdir, timeout);
    collect_with(&git, &default_strategies()).await
}

/// Collect changes through the given runner, trying `strategies` in order.
///
/// Steps:
/// 1. Enumerate paths with the first strategy that succeeds
/// 2. Confirm non-authoritative classifications by probing the index
/// 3. Pick the staged diff, or the unstaged diff when nothing is staged
///
/// Only returns an error when every git query in the pass failed.
pub async fn collect_with(
    git: &dyn GitRunner,
    strategies: &[Box<dyn EnumerationStrategy>],
) -> Result<ChangeSet, CollectError> {
    let mut health = QueryHealth::default();

    // 1. Enumerate modified and untracked paths
    let mut enumeration = Enumeration::default();
    for strategy in strategies {
        match strategy.enumerate(git).await {
            Ok(found) => {
                health.succeeded();
                info!(
                    "Enumerated {} paths via {}",
                    found.entries.len(),
                    strategy.name()
                );
                enumeration = found;
                break;
            }
            Err(e) => {
                warn!("{} failed: {}", strategy.name(), e);
                health.failed(e);
            }
        }
    }

    // 2. Index membership wins over a guessed classification
    if !enumeration.authoritative {
        for entry in &mut enumeration.entries {
            let kind = probe_index(git, entry, &mut health).await;
            entry.kind = kind;
        }
    }

    let mut modified_files = Vec::new();
    let mut new_files = Vec::new();
    for entry in enumeration.entries {
        match entry.kind {
            PathKind::Modified => modified_files.push(entry.path),
            PathKind::New => new_files.push(entry.path),
        }
    }

    // 3. Staged changes take precedence for the diff text
    let staged = match git
        .run_checked(&["diff", "--cached", "--name-only", "-z"])
        .await
    {
        Ok(stdout) => {
            health.succeeded();
            split_nul(&stdout)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        }
        Err(e) => {
            warn!("Staged file listing failed: {}", e);
            health.failed(e);
            Vec::new()
        }
    };

    for path in &staged {
        new_files.retain(|p| p != path);
        if !modified_files.contains(path) {
            modified_files.push(path.clone());
        }
    }

    let diff_args = if !staged.is_empty() {
        debug!("{} staged files, using staged diff", staged.len());
        Some(STAGED_DIFF_ARGS)
    } else if !modified_files.is_empty() {
        debug!("Nothing staged, using unstaged diff");
        Some(UNSTAGED_DIFF_ARGS)
    } else {
        None
    };

    let diff_text = match diff_args {
        Some(args) => match git.run_checked(args).await {
            Ok(diff) => {
                health.succeeded();
                diff
            }
            Err(e) => {
                warn!("Diff query failed: {}", e);
                health.failed(e);
                String::new()
            }
        },
        None => String::new(),
    };

    health.into_result()?;

    info!(
        "Collected {} modified, {} new files, {} chars of diff",
        modified_files.len(),
        new_files.len(),
        diff_text.len()
    );

    Ok(ChangeSet {
        diff_text,
        modified_files,
        new_files,
    })
}

/// Classify a path by whether it is present in the index.
///
/// Falls back to the enumeration's guess when the probe cannot run or
/// exits with something other than "matched" (0) or "unmatched" (1).
async fn probe_index(
    git: &dyn GitRunner,
    entry: &ListedPath,
    health: &mut QueryHealth,
) -> PathKind {
    let args = [
        "--literal-pathspecs",
        "ls-files",
        "--error-unmatch",
        "--",
        entry.path.as_str(),
    ];

    match git.run(&args).await {
        Ok(output) => {
            health.succeeded();
            match output.code {
                Some(0) => PathKind::Modified,
                Some(1) => PathKind::New,
                code => {
                    warn!(
                        "Index probe for {} exited with {:?}, keeping {:?}",
                        entry.path, code, entry.kind
                    );
                    entry.kind
                }
            }
        }
        Err(e) => {
            warn!("Index probe for {} failed: {}", entry.path, e);
            health.failed(e);
            entry.kind
        }
    }
}

/// Tracks whether any git query in a pass succeeded.
#[derive(Debug, Default)]
struct QueryHealth {
    successes: usize,
    last_error: Option<GitCommandError>,
}

impl QueryHealth {
    fn succeeded(&mut self) {
        self.successes += 1;
    }

    fn failed(&mut self, error: GitCommandError) {
        self.last_error = Some(error);
    }

    fn into_result(self) -> Result<(), CollectError> {
        match (self.successes, self.last_error) {
            (0, Some(e)) => Err(CollectError::ToolingFailed(e)),
            _ => Ok(()),
        }
    }
}

/// Split NUL-terminated git output into non-empty records.
fn split_nul(output: &str) -> Vec<&str> {
    output.split('\0').filter(|s| !s.is_empty()).collect()
}

fn push_unique(entries: &mut Vec<ListedPath>, path: &str, kind: PathKind) {
    if !entries.iter().any(|e| e.path == path) {
        entries.push(ListedPath {
            path: path.to_string(),
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::git::runner::GitOutput;

    /// Canned reply for a scripted git command.
    #[derive(Clone)]
    enum Reply {
        Exit(i32, &'static str),
        SpawnFailure,
    }

    /// Test runner that answers from a script keyed by the joined arguments.
    ///
    /// Unscripted commands behave as if git could not be spawned.
    #[derive(Default)]
    struct ScriptedGit {
        replies: HashMap<String, Reply>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedGit {
        fn on(mut self, command: &str, reply: Reply) -> Self {
            self.replies.insert(command.to_string(), reply);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GitRunner for ScriptedGit {
        async fn run(&self, args: &[&str]) -> Result<GitOutput, GitCommandError> {
            let command = args.join(" ");
            self.calls.lock().unwrap().push(command.clone());
            match self.replies.get(&command) {
                Some(Reply::Exit(code, stdout)) => Ok(GitOutput {
                    code: Some(*code),
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                }),
                Some(Reply::SpawnFailure) | None => Err(GitCommandError::SpawnFailed(
                    std::io::Error::new(std::io::ErrorKind::NotFound, "git"),
                )),
            }
        }
    }

    const COMBINED: &str = "ls-files -t -z --modified --others --exclude-standard";
    const SPLIT_MODIFIED: &str = "diff --name-only -z";
    const SPLIT_UNTRACKED: &str = "ls-files -z --others --exclude-standard";
    const STAGED_NAMES: &str = "diff --cached --name-only -z";
    const STAGED_DIFF: &str = "diff --cached --no-color --no-ext-diff";
    const UNSTAGED_DIFF: &str = "diff --no-color --no-ext-diff";

    fn probe(path: &str) -> String {
        format!("--literal-pathspecs ls-files --error-unmatch -- {}", path)
    }

    #[tokio::test]
    async fn test_combined_listing_with_probe_classification() {
        let git = ScriptedGit::default()
            .on(COMBINED, Reply::Exit(0, "C src/a.rs\0? notes.md\0"))
            .on(&probe("src/a.rs"), Reply::Exit(0, "src/a.rs\n"))
            .on(&probe("notes.md"), Reply::Exit(1, ""))
            .on(STAGED_NAMES, Reply::Exit(0, ""))
            .on(UNSTAGED_DIFF, Reply::Exit(0, "diff --git a/src/a.rs b/src/a.rs\n"));

        let changes = collect_with(&git, &default_strategies()).await.unwrap();

        assert_eq!(changes.modified_files, vec!["src/a.rs"]);
        assert_eq!(changes.new_files, vec!["notes.md"]);
        assert_eq!(changes.diff_text, "diff --git a/src/a.rs b/src/a.rs\n");
    }

    #[tokio::test]
    async fn test_probe_overrides_listing_guess() {
        // Listing guesses "new", but the path is in the index
        let git = ScriptedGit::default()
            .on(COMBINED, Reply::Exit(0, "? added.rs\0"))
            .on(&probe("added.rs"), Reply::Exit(0, "added.rs\n"))
            .on(STAGED_NAMES, Reply::Exit(0, ""))
            .on(UNSTAGED_DIFF, Reply::Exit(0, "+x\n"));

        let changes = collect_with(&git, &default_strategies()).await.unwrap();

        assert_eq!(changes.modified_files, vec!["added.rs"]);
        assert!(changes.new_files.is_empty());
    }

    #[tokio::test]
    async fn test_failed_probe_keeps_listing_guess() {
        let git = ScriptedGit::default()
            .on(COMBINED, Reply::Exit(0, "? fresh.rs\0C old.rs\0"))
            .on(&probe("fresh.rs"), Reply::SpawnFailure)
            .on(&probe("old.rs"), Reply::Exit(128, ""))
            .on(STAGED_NAMES, Reply::Exit(0, ""))
            .on(UNSTAGED_DIFF, Reply::Exit(0, "+y\n"));

        let changes = collect_with(&git, &default_strategies()).await.unwrap();

        assert_eq!(changes.new_files, vec!["fresh.rs"]);
        assert_eq!(changes.modified_files, vec!["old.rs"]);
    }

    #[tokio::test]
    async fn test_split_listing_fallback_is_authoritative() {
        let git = ScriptedGit::default()
            .on(COMBINED, Reply::Exit(129, ""))
            .on(SPLIT_MODIFIED, Reply::Exit(0, "lib.rs\0"))
            .on(SPLIT_UNTRACKED, Reply::Exit(0, "new.rs\0"))
            .on(STAGED_NAMES, Reply::Exit(0, ""))
            .on(UNSTAGED_DIFF, Reply::Exit(0, "-old\n+new\n"));

        let changes = collect_with(&git, &default_strategies()).await.unwrap();

        assert_eq!(changes.modified_files, vec!["lib.rs"]);
        assert_eq!(changes.new_files, vec!["new.rs"]);
        assert!(
            !git.calls().iter().any(|c| c.contains("--error-unmatch")),
            "fallback classification must not be probed: {:?}",
            git.calls()
        );
    }

    #[tokio::test]
    async fn test_split_listing_uses_surviving_half() {
        let git = ScriptedGit::default()
            .on(COMBINED, Reply::SpawnFailure)
            .on(SPLIT_MODIFIED, Reply::SpawnFailure)
            .on(SPLIT_UNTRACKED, Reply::Exit(0, "only-new.txt\0"))
            .on(STAGED_NAMES, Reply::Exit(0, ""));

        let changes = collect_with(&git, &default_strategies()).await.unwrap();

        assert!(changes.modified_files.is_empty());
        assert_eq!(changes.new_files, vec!["only-new.txt"]);
        assert!(changes.diff_text.is_empty());
    }

    #[tokio::test]
    async fn test_staged_diff_preferred_and_staged_paths_are_modified() {
        let git = ScriptedGit::default()
            .on(COMBINED, Reply::Exit(0, "? b.ts\0"))
            .on(&probe("b.ts"), Reply::Exit(1, ""))
            .on(STAGED_NAMES, Reply::Exit(0, "a.ts\0"))
            .on(STAGED_DIFF, Reply::Exit(0, "staged diff\n"))
            .on(UNSTAGED_DIFF, Reply::Exit(0, "unstaged diff\n"));

        let changes = collect_with(&git, &default_strategies()).await.unwrap();

        assert_eq!(
            changes,
            ChangeSet {
                diff_text: "staged diff\n".to_string(),
                modified_files: vec!["a.ts".to_string()],
                new_files: vec!["b.ts".to_string()],
            }
        );
        assert!(!git.calls().contains(&UNSTAGED_DIFF.to_string()));
    }

    #[tokio::test]
    async fn test_staged_path_never_listed_as_new() {
        let git = ScriptedGit::default()
            .on(COMBINED, Reply::SpawnFailure)
            .on(SPLIT_MODIFIED, Reply::Exit(0, ""))
            .on(SPLIT_UNTRACKED, Reply::Exit(0, "x.rs\0"))
            .on(STAGED_NAMES, Reply::Exit(0, "x.rs\0"))
            .on(STAGED_DIFF, Reply::Exit(0, "+x\n"));

        let changes = collect_with(&git, &default_strategies()).await.unwrap();

        assert_eq!(changes.modified_files, vec!["x.rs"]);
        assert!(changes.new_files.is_empty());
    }

    #[tokio::test]
    async fn test_clean_tree_has_empty_diff_and_no_diff_query() {
        let git = ScriptedGit::default()
            .on(COMBINED, Reply::Exit(0, ""))
            .on(STAGED_NAMES, Reply::Exit(0, ""));

        let changes = collect_with(&git, &default_strategies()).await.unwrap();

        assert!(changes.is_empty());
        assert!(!git.calls().iter().any(|c| c.contains("--no-color")));
    }

    #[tokio::test]
    async fn test_failed_diff_degrades_to_empty_text() {
        let git = ScriptedGit::default()
            .on(COMBINED, Reply::Exit(0, "C a.rs\0"))
            .on(&probe("a.rs"), Reply::Exit(0, "a.rs\n"))
            .on(STAGED_NAMES, Reply::Exit(0, ""))
            .on(UNSTAGED_DIFF, Reply::Exit(128, ""));

        let changes = collect_with(&git, &default_strategies()).await.unwrap();

        assert_eq!(changes.modified_files, vec!["a.rs"]);
        assert!(changes.diff_text.is_empty());
    }

    #[tokio::test]
    async fn test_every_query_failing_is_tooling_failure() {
        let git = ScriptedGit::default();

        let result = collect_with(&git, &default_strategies()).await;

        assert!(
            matches!(result, Err(CollectError::ToolingFailed(_))),
            "Expected ToolingFailed, got: {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_duplicate_listing_records_are_collapsed() {
        let git = ScriptedGit::default()
            .on(COMBINED, Reply::Exit(0, "C conflict.rs\0C conflict.rs\0"))
            .on(&probe("conflict.rs"), Reply::Exit(0, "conflict.rs\n"))
            .on(STAGED_NAMES, Reply::Exit(0, ""))
            .on(UNSTAGED_DIFF, Reply::Exit(0, "+c\n"));

        let changes = collect_with(&git, &default_strategies()).await.unwrap();

        assert_eq!(changes.modified_files, vec!["conflict.rs"]);
    }

    #[test]
    fn test_split_nul_drops_empty_records() {
        assert_eq!(split_nul("a\0b c\0\0"), vec!["a", "b c"]);
        assert!(split_nul("").is_empty());
    }

    #[test]
    fn test_change_set_is_empty() {
        assert!(ChangeSet::default().is_empty());

        let only_new = ChangeSet {
            new_files: vec!["n.rs".into()],
            ..Default::default()
        };
        assert!(!only_new.is_empty());

        // Modified names without any diff text have nothing to describe
        let names_only = ChangeSet {
            modified_files: vec!["m.rs".into()],
            ..Default::default()
        };
        assert!(names_only.is_empty());
    }
}
