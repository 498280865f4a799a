use std::path::Path;

use anyhow::{bail, Result};
use log::{debug, warn};

use crate::config::DEFAULT_REMOTE;
use crate::git::{CommandRunner, Git};
use crate::github::{GitHubClient, RepositoryDescriptor, Transport};

/// How `origin` was pointed at the new repository
#[derive(Debug, PartialEq, Eq)]
pub enum RemoteChange {
    Added,
    Updated,
}

/// What happened after the repository was created
#[derive(Debug, PartialEq, Eq)]
pub struct Linked {
    pub ssh_url: String,
    pub remote: RemoteChange,
    /// The branch that was pushed, `None` when HEAD is not on a branch
    pub pushed_branch: Option<String>,
}

/// Check the local side and create the repository on GitHub
pub async fn create_repository<T: Transport, R: CommandRunner>(
    client: &GitHubClient<T>,
    git: &Git<R>,
    path: &Path,
    repository: &RepositoryDescriptor,
) -> Result<()> {
    if !git.is_git_repo(path) {
        bail!("{} is not a git repository", path.display());
    }

    if !git.configure_ssh_for_github() {
        warn!("Could not configure git to use SSH for github.com");
    }

    if client.repository_exists(&repository.name).await {
        bail!(
            "Repository '{}' already exists on your GitHub account.",
            repository.name
        );
    }

    debug!("Creating {} ({})", repository.name, repository.visibility());
    if !client.create_repository(repository).await {
        bail!("Failed to create repository '{}'", repository.name);
    }
    Ok(())
}

/// Point `origin` at the freshly created repository and push the current branch.
///
/// Errors from here on mean the repository exists on GitHub but the local copy is
/// not (fully) linked to it, and say so.
pub async fn link_and_push<T: Transport, R: CommandRunner>(
    client: &mut GitHubClient<T>,
    git: &Git<R>,
    path: &Path,
    name: &str,
) -> Result<Linked> {
    let owner = client.username().await;
    if owner.is_empty() {
        bail!(
            "Repository '{name}' was created, but the GitHub username could not be determined to set up the remote"
        );
    }
    let ssh_url = RepositoryDescriptor::new(name, "", false).ssh_url(&owner);

    let remote = if git.has_remote(path, DEFAULT_REMOTE) {
        if !git.set_remote_url(path, DEFAULT_REMOTE, &ssh_url) {
            bail!("Repository '{name}' was created, but updating the '{DEFAULT_REMOTE}' remote failed");
        }
        RemoteChange::Updated
    } else {
        if !git.add_remote(path, DEFAULT_REMOTE, &ssh_url) {
            bail!("Repository '{name}' was created, but adding the '{DEFAULT_REMOTE}' remote failed");
        }
        RemoteChange::Added
    };

    let pushed_branch = match git.current_branch(path) {
        Some(branch) => {
            if !git.push(path, DEFAULT_REMOTE, &branch) {
                bail!("Repository '{name}' was created, but pushing '{branch}' failed");
            }
            Some(branch)
        }
        None => {
            warn!("No current branch in {}, nothing pushed", path.display());
            None
        }
    };

    Ok(Linked {
        ssh_url,
        remote,
        pushed_branch,
    })
}

/// The whole one-shot create: validate, create, wire `origin`, push
pub async fn create_and_push<T: Transport, R: CommandRunner>(
    client: &mut GitHubClient<T>,
    git: &Git<R>,
    path: &Path,
    repository: &RepositoryDescriptor,
) -> Result<Linked> {
    create_repository(client, git, path, repository).await?;
    link_and_push(client, git, path, &repository.name).await
}
