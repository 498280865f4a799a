//! The interactive mode, entered when gh-repo-create runs without arguments.
pub mod completion;
pub mod history;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};
use log::{debug, warn, LevelFilter};

use crate::config::{home_file, CredentialStore, HISTORY_FILE, HISTORY_MAX_ENTRIES};
use crate::ghrepo::create::RemoteChange;
use crate::ghrepo::{create, delete, init_logging, list, ssh};
use crate::git::{Git, SystemRunner};
use crate::github::{GitHubClient, OctocrabTransport, RepositoryDescriptor};
use crate::utils::{
    validate_description, validate_repo_name, validate_repo_name_length, BLUE, BOLD, GRAY, GREEN,
    RED, RESET, YELLOW,
};
use completion::{CommandCompletion, PathCompletion};
use history::FileHistory;

#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Create,
    List,
    Delete,
    Ssh,
    Auth,
    Help,
    Exit,
    Unknown(String),
}

impl ReplCommand {
    /// `None` for a blank line
    pub fn parse(input: &str) -> Option<ReplCommand> {
        let command = match input.trim() {
            "" => return None,
            "create" | "c" => ReplCommand::Create,
            "list" | "l" => ReplCommand::List,
            "delete" | "d" => ReplCommand::Delete,
            "ssh" | "s" => ReplCommand::Ssh,
            "auth" => ReplCommand::Auth,
            "help" | "?" => ReplCommand::Help,
            "exit" | "quit" => ReplCommand::Exit,
            other => ReplCommand::Unknown(other.to_string()),
        };
        Some(command)
    }
}

fn print_banner() {
    println!(
        "{BLUE}{}{RESET}",
        r#"
             _                                                       _
   __ _| |__        _ __ ___ _ __   ___         ___ _ __ ___  __ _| |_ ___
  / _` | '_ \ _____| '__/ _ \ '_ \ / _ \ _____ / __| '__/ _ \/ _` | __/ _ \
 | (_| | | | |_____| | |  __/ |_) | (_) |_____| (__| | |  __/ (_| | ||  __/
  \__, |_| |_|     |_|  \___| .__/ \___/       \___|_|  \___|\__,_|\__\___|
  |___/                     |_|"#
    );
    println!(
        "{BOLD}  gh-repo-create v{}{RESET}{GRAY} - GitHub Repository Creator{RESET}",
        clap::crate_version!()
    );
    println!("{GRAY}  Type 'help' for available commands{RESET}\n");
}

fn print_help() {
    println!("{BOLD}Available commands:{RESET}");
    println!("  {GREEN}create{RESET} (c)  - Create a new GitHub repository");
    println!("  {GREEN}list{RESET} (l)    - List your GitHub repositories");
    println!("  {GREEN}delete{RESET} (d)  - Delete a GitHub repository");
    println!("  {GREEN}ssh{RESET} (s)     - Push an existing repository over SSH");
    println!("  {GREEN}auth{RESET}        - Manage authentication");
    println!("  {GREEN}help{RESET} (?)    - Show this help message");
    println!("  {GREEN}exit{RESET}        - Exit the REPL");
}

fn print_error(message: &str) {
    println!("{RED}{message}{RESET}");
}

/// The REPL session: one credential store, at most one authenticated client
pub struct Repl {
    store: CredentialStore,
    git: Git<SystemRunner>,
    client: Option<GitHubClient<OctocrabTransport>>,
    history: FileHistory,
    theme: ColorfulTheme,
    running: bool,
}

impl Repl {
    pub fn new(store: CredentialStore, history: FileHistory) -> Repl {
        Repl {
            store,
            git: Git::system(),
            client: None,
            history,
            theme: ColorfulTheme::default(),
            running: false,
        }
    }

    pub async fn run(&mut self) {
        print_banner();
        debug!(
            "Loaded {} history entries from {}",
            self.history.len(),
            self.history.path().display()
        );

        self.running = true;
        while self.running {
            let input = Input::<String>::with_theme(&self.theme)
                .with_prompt("gh-repo")
                .allow_empty(true)
                .history_with(&mut self.history)
                .completion_with(&CommandCompletion)
                .interact_text();
            let line = match input {
                Ok(line) => line,
                Err(e) => {
                    debug!("Leaving REPL: {e}");
                    break;
                }
            };

            if let Some(command) = ReplCommand::parse(&line) {
                if let Err(e) = self.dispatch(command).await {
                    print_error(&format!("Error: {e}"));
                }
            }
        }

        if let Err(e) = self.history.save() {
            warn!("Could not save history to {}: {e}", self.history.path().display());
        }
    }

    async fn dispatch(&mut self, command: ReplCommand) -> Result<()> {
        match command {
            ReplCommand::Exit => {
                self.running = false;
                println!("Goodbye!");
            }
            ReplCommand::Help => print_help(),
            ReplCommand::Create => self.cmd_create().await?,
            ReplCommand::List => self.cmd_list().await?,
            ReplCommand::Delete => self.cmd_delete().await?,
            ReplCommand::Ssh => self.cmd_ssh()?,
            ReplCommand::Auth => self.cmd_auth()?,
            ReplCommand::Unknown(command) => {
                print_error(&format!("Unknown command: {command}"));
                println!("Type 'help' for available commands");
            }
        }
        Ok(())
    }

    async fn connect(&self) -> Result<Option<GitHubClient<OctocrabTransport>>> {
        let token = self
            .store
            .load()
            .ok_or_else(|| anyhow!("No GitHub token configured"))?;
        let mut client =
            GitHubClient::connect(&token)?.with_username_fallback(|| Git::system().github_user());
        if client.authenticate().await {
            Ok(Some(client))
        } else {
            Ok(None)
        }
    }

    /// Make sure there is an authenticated client, walking through `auth` when needed
    async fn ensure_auth(&mut self) -> Result<&mut GitHubClient<OctocrabTransport>> {
        if self.client.is_none() {
            if !self.store.has_token() {
                println!("{YELLOW}No GitHub token found. Please authenticate first.{RESET}");
                self.cmd_auth()?;
            }

            let mut client = self.connect().await?;
            if client.is_none() {
                print_error("Authentication failed. Please check your token and try again.");
                self.cmd_auth()?;
                client = self.connect().await?;
            }
            let mut client = client.ok_or_else(|| anyhow!("Authentication failed"))?;

            let username = client.username().await;
            println!("{GREEN}Authenticated as: {username}{RESET}");
            self.client = Some(client);
        }
        self.client
            .as_mut()
            .ok_or_else(|| anyhow!("Authentication failed"))
    }

    fn cmd_auth(&mut self) -> Result<()> {
        println!("\nTo create a GitHub Personal Access Token:");
        println!("  1. Go to https://github.com/settings/tokens");
        println!("  2. Click 'Generate new token (classic)'");
        println!("  3. Select scopes: 'repo' and 'delete_repo'");
        println!("  4. Copy the token and paste below\n");

        let token = Password::with_theme(&self.theme)
            .with_prompt("Enter your GitHub token")
            .allow_empty_password(true)
            .interact()?;
        let token = token.trim();
        if token.is_empty() {
            return Ok(());
        }

        if !self.store.save(token) {
            bail!("Failed to save token to {}", self.store.path().display());
        }
        // A new token means a new session.
        self.client = None;
        println!("{GREEN}Token saved successfully!{RESET}");
        Ok(())
    }

    fn prompt_path(&self) -> Result<PathBuf> {
        println!("\nEnter the path to your local git repository:");
        println!("{GRAY}(press Enter to use current directory){RESET}");
        let path = Input::<String>::with_theme(&self.theme)
            .with_prompt("Path")
            .allow_empty(true)
            .completion_with(&PathCompletion)
            .interact_text()?;
        let path = path.trim();
        Ok(PathBuf::from(if path.is_empty() { "." } else { path }))
    }

    async fn cmd_create(&mut self) -> Result<()> {
        self.ensure_auth().await?;
        let path = self.prompt_path()?;
        self.process_repo_creation(&path).await
    }

    async fn process_repo_creation(&mut self, path: &Path) -> Result<()> {
        if !self.git.is_git_repo(path) {
            bail!("{} is not a git repository", path.display());
        }

        println!("\n{BOLD}{BLUE}Repository Creation{RESET}");
        println!("{}", "-".repeat(40));

        let name = Input::<String>::with_theme(&self.theme)
            .with_prompt("Repository name")
            .validate_with(|input: &String| validate_repo_name(input.trim()))
            .interact_text()?;
        let name = name.trim().to_string();

        let description = Input::<String>::with_theme(&self.theme)
            .with_prompt("Description (max 350 chars, Enter to skip)")
            .allow_empty(true)
            .validate_with(|input: &String| validate_description(input.trim()))
            .interact_text()?;
        let description = description.trim().to_string();

        let visibility = Select::with_theme(&self.theme)
            .with_prompt("Visibility")
            .items(&["Public", "Private"])
            .default(0)
            .interact()?;

        let repository = RepositoryDescriptor::new(name, description, visibility == 1);

        println!("\n{BOLD}Summary:{RESET}");
        println!("  Name: {}", repository.name);
        println!(
            "  Description: {}",
            if repository.description.is_empty() {
                "(none)"
            } else {
                repository.description.as_str()
            }
        );
        println!("  Visibility: {}\n", repository.visibility());

        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt("Create repository?")
            .default(true)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }

        println!("{YELLOW}Creating repository...{RESET}");
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| anyhow!("Not authenticated"))?;
        create::create_repository(client, &self.git, path, &repository).await?;
        println!("{GREEN}Repository created successfully!{RESET}");

        let push = Confirm::with_theme(&self.theme)
            .with_prompt("Push to GitHub?")
            .default(true)
            .interact()?;
        if !push {
            return Ok(());
        }

        let linked = create::link_and_push(client, &self.git, path, &repository.name).await?;
        match linked.remote {
            RemoteChange::Added => println!("Added 'origin' remote"),
            RemoteChange::Updated => println!("Updated 'origin' remote"),
        }
        if linked.pushed_branch.is_some() {
            println!("{GREEN}Pushed successfully!{RESET}");
        }
        Ok(())
    }

    async fn cmd_list(&mut self) -> Result<()> {
        let client = self.ensure_auth().await?;
        let repositories = client.list_repositories().await;
        print!("{}", list::render(&repositories));
        Ok(())
    }

    async fn cmd_delete(&mut self) -> Result<()> {
        self.ensure_auth().await?;

        let name = Input::<String>::with_theme(&self.theme)
            .with_prompt("Repository to delete")
            .validate_with(|input: &String| validate_repo_name_length(input.trim()))
            .interact_text()?;
        let name = name.trim().to_string();

        println!("{RED}{BOLD}This permanently deletes '{name}' and cannot be undone.{RESET}");
        let typed = Input::<String>::with_theme(&self.theme)
            .with_prompt(format!("Type '{name}' to confirm"))
            .allow_empty(true)
            .interact_text()?;
        if !delete::confirmation_matches(&typed, &name) {
            println!("Names do not match. Deletion cancelled.");
            return Ok(());
        }

        let client = self
            .client
            .as_mut()
            .ok_or_else(|| anyhow!("Not authenticated"))?;
        delete::delete(client, &name).await?;
        println!("{GREEN}Repository '{name}' deleted.{RESET}");
        Ok(())
    }

    fn cmd_ssh(&mut self) -> Result<()> {
        let path = self.prompt_path()?;
        match ssh::push_over_ssh(&self.git, &path)? {
            Some(branch) => println!("{GREEN}Pushed {branch} successfully!{RESET}"),
            None => println!("{YELLOW}Nothing to push: not on a branch{RESET}"),
        }
        Ok(())
    }
}

/// Run the interactive mode until `exit` or end of input
pub async fn run() -> ExitCode {
    init_logging(LevelFilter::Error);
    let history = FileHistory::load(home_file(HISTORY_FILE), HISTORY_MAX_ENTRIES);
    let mut repl = Repl::new(CredentialStore::default_location(), history);
    repl.run().await;
    ExitCode::SUCCESS
}
