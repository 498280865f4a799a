//! `--check`: a readiness report for the token, SSH access and the local repository.
use std::fmt;
use std::path::Path;
use std::process::Command;

use log::debug;

use crate::config::{CONFIG_FILE, DEFAULT_REMOTE, TOKEN_ENV_VAR};
use crate::git::{CommandRunner, Git};
use crate::github::{GitHubClient, Transport};
use crate::utils::{BOLD, GRAY, GREEN, RED, RESET, YELLOW};

/// Seconds `ssh -T` may spend connecting to github.com
pub const SSH_TIMEOUT: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pass,
    Fail,
    Warn,
    Skip,
}

impl Status {
    fn tag(&self) -> String {
        let (color, label) = match self {
            Status::Pass => (GREEN, "PASS"),
            Status::Fail => (RED, "FAIL"),
            Status::Warn => (YELLOW, "WARN"),
            Status::Skip => (YELLOW, "SKIP"),
        };
        format!("{color}[{label}]{RESET}")
    }
}

#[derive(Debug)]
pub struct CheckLine {
    pub status: Status,
    pub message: String,
    pub hints: Vec<String>,
}

#[derive(Debug)]
pub struct Section {
    pub title: String,
    pub lines: Vec<CheckLine>,
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub sections: Vec<Section>,
}

impl CheckReport {
    fn section(&mut self, title: &str) -> &mut Vec<CheckLine> {
        self.sections.push(Section {
            title: format!("{}. {title}", self.sections.len() + 1),
            lines: Vec::new(),
        });
        let index = self.sections.len() - 1;
        &mut self.sections[index].lines
    }

    /// True unless some check failed; warnings and skips do not count
    pub fn passed(&self) -> bool {
        self.sections
            .iter()
            .flat_map(|section| &section.lines)
            .all(|line| line.status != Status::Fail)
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n{BOLD}System Check{RESET}")?;
        writeln!(f, "{}\n", "-".repeat(40))?;
        for section in &self.sections {
            writeln!(f, "{BOLD}{}{RESET}", section.title)?;
            for line in &section.lines {
                writeln!(f, "   {} {}", line.status.tag(), line.message)?;
                for hint in &line.hints {
                    writeln!(f, "{GRAY}   -> {hint}{RESET}")?;
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "{}", "-".repeat(40))?;
        if self.passed() {
            writeln!(f, "{GREEN}{BOLD}All checks passed! You have full CRUD access.{RESET}")
        } else {
            writeln!(f, "{RED}{BOLD}Some checks failed. See errors above.{RESET}")
        }
    }
}

fn line(status: Status, message: impl Into<String>, hints: &[&str]) -> CheckLine {
    CheckLine {
        status,
        message: message.into(),
        hints: hints.iter().map(|hint| hint.to_string()).collect(),
    }
}

/// Combined output of `ssh -T git@github.com`, `None` when ssh could not be run.
///
/// GitHub answers the probe with a greeting on stderr and a non-zero exit, so only
/// the text matters.
pub fn probe_ssh() -> Option<String> {
    let connect_timeout = format!("ConnectTimeout={SSH_TIMEOUT}");
    debug!("ssh -T git@github.com");
    let output = Command::new("ssh")
        .args(["-T", "-o", "BatchMode=yes", "-o", &connect_timeout, "git@github.com"])
        .output()
        .ok()?;
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Some(text)
}

/// Run every check. `client` is `None` when no token could be found.
pub async fn run_checks<T: Transport, R: CommandRunner>(
    mut client: Option<&mut GitHubClient<T>>,
    git: &Git<R>,
    path: &Path,
    ssh_output: Option<&str>,
) -> CheckReport {
    let mut report = CheckReport::default();

    let mut authenticated = false;
    let api = report.section("GitHub API Access");
    match client.as_deref_mut() {
        None => {
            let file_hint = format!("Set {TOKEN_ENV_VAR} environment variable or add token to ~/{CONFIG_FILE}");
            api.push(line(
                Status::Fail,
                "No GitHub token found",
                &[file_hint.as_str(), "See: https://github.com/settings/tokens"],
            ));
        }
        Some(client) => {
            if client.authenticate().await {
                authenticated = true;
                let username = client.username().await;
                api.push(line(Status::Pass, format!("Authenticated as: {username}"), &[]));
            } else {
                api.push(line(
                    Status::Fail,
                    "Authentication failed - invalid token",
                    &[
                        "Your token may have expired or been revoked",
                        "Generate a new token at: https://github.com/settings/tokens",
                    ],
                ));
            }
        }
    }

    let ssh = report.section("GitHub SSH Access");
    match ssh_output {
        Some(output) if output.contains("successfully authenticated") => {
            ssh.push(line(Status::Pass, "SSH access to GitHub working", &[]));
        }
        Some(_) => ssh.push(line(
            Status::Fail,
            "SSH access not configured",
            &[
                "Add SSH key to GitHub: Settings > SSH and GPG keys",
                "Run: ssh-add ~/.ssh/id_ed25519",
            ],
        )),
        None => ssh.push(line(Status::Fail, "Could not test SSH", &[])),
    }

    let local = report.section("Local Git Repository");
    if git.is_git_repo(path) {
        local.push(line(
            Status::Pass,
            format!("{} is a git repository", path.display()),
            &[],
        ));
        if git.has_remote(path, DEFAULT_REMOTE) {
            if let Some(url) = git.remote_url(path, DEFAULT_REMOTE) {
                local.push(line(Status::Pass, format!("Origin remote: {url}"), &[]));
            }
        } else {
            local.push(line(
                Status::Warn,
                format!("No '{DEFAULT_REMOTE}' remote configured"),
                &[],
            ));
        }
    } else {
        local.push(line(
            Status::Skip,
            format!("{} is not a git repository", path.display()),
            &[],
        ));
    }

    if let (Some(client), true) = (client, authenticated) {
        let count = client.list_repositories().await.len();
        let permissions = report.section("Token Permissions");
        permissions.push(line(
            Status::Pass,
            format!("List repositories: OK ({count} repos)"),
            &["Token has 'repo' scope"],
        ));
    }

    report
}
