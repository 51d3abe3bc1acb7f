//! Working tree inspection through the git CLI.

pub mod collector;
pub mod runner;
pub mod workspace;

pub use collector::{
    ChangeSet, CombinedListing, EnumerationStrategy, SplitListing, collect_changes, collect_with,
    default_strategies,
};
pub use runner::{GitOutput, GitRunner, ShellGit, check_git_installed};
pub use workspace::discover_workdir;
