//! Working tree discovery.

use std::path::{Path, PathBuf};

use git2::Repository;
use tracing::debug;

/// Locate the root of the git working tree containing `start`.
///
/// Walks up from `start` like `git` itself does. Returns `None` for
/// directories outside any repository and for bare repositories, since
/// neither has a working tree to inspect.
pub fn discover_workdir(start: &Path) -> Option<PathBuf> {
    let repo = match Repository::discover(start) {
        Ok(repo) => repo,
        Err(e) => {
            debug!("No repository found from {}: {}", start.display(), e);
            return None;
        }
    };

    let workdir = repo.workdir()?.to_path_buf();
    debug!("Discovered working tree at {}", workdir.display());
    Some(workdir)
}
