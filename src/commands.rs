///! This module defines the command-line flags for gh-repo-create.
use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::Verbosity;

/// The top level clap parser and CLI arguments
#[derive(Parser, Debug)]
#[command(name = "gh-repo-create")]
#[command(version = clap::crate_version!())]
#[command(about = "Create GitHub repositories from the command line")]
#[command(after_help = "Examples:
  gh-repo-create --path ./my-project --name my-repo --public
  gh-repo-create -p . -n new-repo -d \"My project\" --private
  gh-repo-create --list
  gh-repo-create --delete my-old-repo
  gh-repo-create --ssh-only -p .

Or run without arguments to enter interactive REPL mode.")]
pub struct Opts {
    #[arg(long = "access-token", help = "GitHub access token (overrides GH_TOKEN and the config file)")]
    pub access_token: Option<String>,

    #[arg(short = 'p', long, default_value = ".", help = "Path to local git repository")]
    pub path: PathBuf,

    #[arg(short = 'n', long, help = "Repository name")]
    pub name: Option<String>,

    #[arg(short = 'd', long, default_value = "", help = "Repository description")]
    pub description: String,

    #[arg(long, conflicts_with = "private", help = "Make repository public (default)")]
    pub public: bool,

    #[arg(long, help = "Make repository private")]
    pub private: bool,

    #[arg(short = 'l', long, help = "List all your GitHub repositories")]
    pub list: bool,

    #[arg(short = 'D', long = "delete", value_name = "NAME", help = "Delete a repository by name")]
    pub delete: Option<String>,

    #[arg(long = "ssh-only", help = "Skip GitHub API, just push via SSH")]
    pub ssh_only: bool,

    #[arg(long, help = "Check token, SSH access and the local repository")]
    pub check: bool,

    #[arg(long, help = "Print debug output, including the masked token")]
    pub debug: bool,

    #[command(flatten)]
    pub verbose: Verbosity,
}

/// What a one-shot invocation asks for, in priority order
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Check,
    SshOnly,
    List,
    Delete(String),
    Create,
}

impl Opts {
    pub fn action(&self) -> Action {
        if self.check {
            Action::Check
        } else if self.ssh_only {
            Action::SshOnly
        } else if self.list {
            Action::List
        } else if let Some(name) = &self.delete {
            Action::Delete(name.clone())
        } else {
            Action::Create
        }
    }
}
