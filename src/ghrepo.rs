///! This module defines the code that executes one-shot gh-repo-create invocations.
pub mod check;
pub mod create;
pub mod delete;
pub mod list;
pub mod ssh;

use std::process::ExitCode;

use anyhow::{anyhow, bail, Result};
use log::{debug, LevelFilter};

use crate::commands::{Action, Opts};
use crate::config::{CredentialStore, TOKEN_ENV_VAR};
use crate::git::{Git, SystemRunner};
use crate::github::{GitHubClient, OctocrabTransport, RepositoryDescriptor};
use crate::utils::{mask_token, validate_description, validate_repo_name_length};

/// A context object that holds state for one invocation
pub struct Context {
    pub access_token: Option<String>,
    pub opts: Opts,
    pub store: CredentialStore,
    pub git: Git<SystemRunner>,
}

/// Build a context object from the command-line arguments
fn build_context(opts: Opts, store: CredentialStore) -> Context {
    let access_token = get_access_token(&opts, &store);
    Context {
        access_token,
        opts,
        store,
        git: Git::system(),
    }
}

/// The `--access-token` flag, then whatever the credential store finds
fn get_access_token(opts: &Opts, store: &CredentialStore) -> Option<String> {
    match &opts.access_token {
        Some(access_token) => Some(access_token.clone()),
        None => store.load(),
    }
}

/// Build a client for `access_token` and make sure GitHub accepts it.
///
/// The username falls back to `git config --global github.user`.
pub async fn authenticated_client(
    access_token: Option<&str>,
) -> Result<GitHubClient<OctocrabTransport>> {
    let access_token = access_token.ok_or_else(|| {
        anyhow!(
            "No GitHub token found. Set {TOKEN_ENV_VAR} env var or run without args to authenticate."
        )
    })?;
    let mut client = GitHubClient::connect(access_token)?
        .with_username_fallback(|| Git::system().github_user());
    if !client.authenticate().await {
        bail!("Authentication failed");
    }
    Ok(client)
}

pub fn init_logging(level: LevelFilter) {
    env_logger::builder()
        .filter_level(level)
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .init();
}

/// Run a one-shot invocation
pub async fn cli(opts: Opts) -> ExitCode {
    let level = if opts.debug {
        LevelFilter::Debug
    } else {
        opts.verbose.log_level_filter()
    };
    init_logging(level);

    let context = build_context(opts, CredentialStore::default_location());
    if context.opts.debug {
        eprintln!("[DEBUG] Debug mode enabled");
        eprintln!(
            "[DEBUG] Token: {}",
            mask_token(context.access_token.as_deref().unwrap_or(""))
        );
        debug!("Credential file: {}", context.store.path().display());
    }

    match run(&context).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(context: &Context) -> Result<()> {
    let opts = &context.opts;
    let path = opts.path.as_path();

    match opts.action() {
        Action::Check => {
            let mut client = match &context.access_token {
                Some(access_token) => Some(
                    GitHubClient::connect(access_token)?
                        .with_username_fallback(|| Git::system().github_user()),
                ),
                None => None,
            };
            let ssh_output = check::probe_ssh();
            let report =
                check::run_checks(client.as_mut(), &context.git, path, ssh_output.as_deref()).await;
            print!("{report}");
            if !report.passed() {
                bail!("Some checks failed");
            }
        }
        Action::SshOnly => match ssh::push_over_ssh(&context.git, path)? {
            Some(branch) => println!("Pushed {branch} successfully!"),
            None => println!("Nothing to push: not on a branch"),
        },
        Action::List => {
            let client = authenticated_client(context.access_token.as_deref()).await?;
            print!("{}", list::render(&client.list_repositories().await));
        }
        Action::Delete(name) => {
            let mut client = authenticated_client(context.access_token.as_deref()).await?;
            println!("Deleting repository '{name}'...");
            delete::delete(&mut client, &name).await?;
            println!("Repository deleted successfully!");
        }
        Action::Create => {
            let repository = repository_from_opts(opts)?;
            let mut client = authenticated_client(context.access_token.as_deref()).await?;

            println!("Creating repository '{}'...", repository.name);
            let linked =
                create::create_and_push(&mut client, &context.git, path, &repository).await?;
            println!("Repository created successfully!");
            debug!("origin ({:?}) is now {}", linked.remote, linked.ssh_url);
            if linked.pushed_branch.is_some() {
                println!("Pushed successfully!");
            }
        }
    }
    Ok(())
}

/// Validate the create flags before any network traffic
fn repository_from_opts(opts: &Opts) -> Result<RepositoryDescriptor> {
    let name = match opts.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => bail!("Repository name is required (use --name, or --help for usage)"),
    };
    validate_repo_name_length(name)?;
    validate_description(&opts.description)?;
    Ok(RepositoryDescriptor::new(name, opts.description.as_str(), opts.private))
}
