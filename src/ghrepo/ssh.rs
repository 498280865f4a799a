use std::path::Path;

use anyhow::{bail, Result};
use log::warn;

use crate::config::DEFAULT_REMOTE;
use crate::git::{CommandRunner, Git};

/// Push the current branch to the existing `origin` over SSH, without touching the API.
///
/// Returns the pushed branch, or `None` when HEAD is not on a branch.
pub fn push_over_ssh<R: CommandRunner>(git: &Git<R>, path: &Path) -> Result<Option<String>> {
    if !git.is_git_repo(path) {
        bail!("{} is not a git repository", path.display());
    }
    if !git.has_remote(path, DEFAULT_REMOTE) {
        bail!("No '{DEFAULT_REMOTE}' remote configured");
    }

    if !git.configure_ssh_for_github() {
        warn!("Could not configure git to use SSH for github.com");
    }

    match git.current_branch(path) {
        Some(branch) => {
            if !git.push(path, DEFAULT_REMOTE, &branch) {
                bail!("Push failed");
            }
            Ok(Some(branch))
        }
        None => Ok(None),
    }
}
