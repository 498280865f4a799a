use std::fmt;

use crate::github::RepositoryDescriptor;

/// The repository list as both the one-shot and interactive modes print it
pub struct RepositoryList<'a>(pub &'a [RepositoryDescriptor]);

impl fmt::Display for RepositoryList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No repositories found.");
        }

        writeln!(f, "Your Repositories:")?;
        writeln!(f, "{}", "-".repeat(60))?;
        for repository in self.0 {
            writeln!(f, "{} [{}]", repository.name, repository.visibility())?;
            if !repository.description.is_empty() {
                writeln!(f, "  {}", repository.description)?;
            }
            writeln!(f, "  {}\n", repository.html_url)?;
        }
        writeln!(f, "Total: {} repository(ies)", self.0.len())
    }
}

pub fn render(repositories: &[RepositoryDescriptor]) -> String {
    RepositoryList(repositories).to_string()
}
