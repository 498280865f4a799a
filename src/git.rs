//! Local repository inspection and remote management by shelling out to `git`.
//!
//! Nothing here touches the network except `push`, which is git's own business.
//! Every operation answers with a `bool` or an `Option`; a git that cannot be
//! spawned, a non-zero exit, or empty output all count as "no".
use std::path::Path;
use std::process::{Command, Stdio};

use log::{debug, warn};

use crate::config::GIT_CONFIG_USER_KEY;

/// What we keep from a finished `git` process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
}

/// Runs `git` with the given arguments, optionally inside `dir`.
///
/// Returns `None` only when the process could not be started at all.
pub trait CommandRunner {
    fn run(&self, dir: Option<&Path>, args: &[&str]) -> Option<CommandOutput>;
}

/// Spawns the real `git` found on `PATH`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, dir: Option<&Path>, args: &[&str]) -> Option<CommandOutput> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        // Push progress goes to the terminal, everything else is captured.
        let interactive = args.first() == Some(&"push");
        if interactive {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stderr(Stdio::null());
        }

        debug!("git {}", args.join(" "));
        match cmd.output() {
            Ok(output) => Some(CommandOutput {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            }),
            Err(e) => {
                warn!("Failed to run git: {e}");
                None
            }
        }
    }
}

/// The local git adapter
#[derive(Debug, Default, Clone)]
pub struct Git<R: CommandRunner = SystemRunner> {
    runner: R,
}

impl Git<SystemRunner> {
    pub fn system() -> Git<SystemRunner> {
        Git::with_runner(SystemRunner)
    }
}

impl<R: CommandRunner> Git<R> {
    pub fn with_runner(runner: R) -> Git<R> {
        Git { runner }
    }

    #[cfg(test)]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn succeeds(&self, dir: Option<&Path>, args: &[&str]) -> bool {
        self.runner
            .run(dir, args)
            .map(|output| output.success)
            .unwrap_or(false)
    }

    /// Trimmed stdout of a successful command, `None` when it fails or prints nothing
    fn stdout_of(&self, dir: Option<&Path>, args: &[&str]) -> Option<String> {
        let output = self.runner.run(dir, args)?;
        if !output.success {
            return None;
        }
        let text = output.stdout.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_owned())
        }
    }

    pub fn is_git_repo(&self, path: &Path) -> bool {
        self.succeeds(Some(path), &["rev-parse", "--git-dir"])
    }

    /// The checked-out branch, `None` on a detached HEAD or outside a repository
    pub fn current_branch(&self, path: &Path) -> Option<String> {
        self.stdout_of(Some(path), &["rev-parse", "--abbrev-ref", "HEAD"])
            .filter(|branch| branch != "HEAD")
    }

    pub fn has_remote(&self, path: &Path, name: &str) -> bool {
        self.succeeds(Some(path), &["remote", "show", name])
    }

    pub fn remote_url(&self, path: &Path, name: &str) -> Option<String> {
        self.stdout_of(Some(path), &["remote", "get-url", name])
    }

    pub fn add_remote(&self, path: &Path, name: &str, url: &str) -> bool {
        self.succeeds(Some(path), &["remote", "add", name, url])
    }

    pub fn set_remote_url(&self, path: &Path, name: &str, url: &str) -> bool {
        self.succeeds(Some(path), &["remote", "set-url", name, url])
    }

    /// Push `branch` and set its upstream.
    ///
    /// A freshly created repository with `auto_init` already has a commit the local
    /// branch lacks, so a rejected first push is retried once with `--force`.
    pub fn push(&self, path: &Path, remote: &str, branch: &str) -> bool {
        if self.succeeds(Some(path), &["push", "-u", remote, branch]) {
            return true;
        }
        debug!("Push of {branch} to {remote} rejected, retrying with --force");
        self.succeeds(Some(path), &["push", "-u", remote, branch, "--force"])
    }

    /// Globally rewrite `https://github.com/` URLs to the SSH transport
    pub fn configure_ssh_for_github(&self) -> bool {
        self.succeeds(
            None,
            &[
                "config",
                "--global",
                "url.git@github.com:.insteadOf",
                "https://github.com/",
            ],
        )
    }

    /// The GitHub username recorded in the global git configuration, if any
    pub fn github_user(&self) -> Option<String> {
        self.stdout_of(None, &["config", "--global", GIT_CONFIG_USER_KEY])
    }
}
