use anyhow::{bail, Result};
use log::debug;

use crate::github::{GitHubClient, Transport};

/// The typed confirmation must repeat the repository name exactly
pub fn confirmation_matches(typed: &str, name: &str) -> bool {
    typed == name
}

pub async fn delete<T: Transport>(client: &mut GitHubClient<T>, name: &str) -> Result<()> {
    debug!("Deleting repository {name}");
    if !client.delete_repository(name).await {
        bail!("Failed to delete repository '{name}'");
    }
    Ok(())
}
