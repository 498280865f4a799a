//! Credential storage and the fixed names and limits the tool works with.
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the credential file
pub const TOKEN_ENV_VAR: &str = "GH_TOKEN";
pub const CONFIG_FILE: &str = ".gh-repo-create.json";
pub const HISTORY_FILE: &str = ".gh-repo-create-history";
pub const HISTORY_MAX_ENTRIES: usize = 100;

pub const DEFAULT_REMOTE: &str = "origin";
pub const GIT_CONFIG_USER_KEY: &str = "github.user";

pub const API_BASE_URL: &str = "https://api.github.com";
pub const API_REPOS_PER_PAGE: usize = 100;
pub const MAX_REPO_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 350;

/// The on-disk shape of the credential file
#[derive(Debug, Serialize, Deserialize)]
struct CredentialFile {
    token: String,
}

/// Reads and writes the single GitHub token this tool uses.
///
/// The environment variable always wins over the file. Nothing is cached: every
/// `load()` looks at both sources again.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    env_var: String,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> CredentialStore {
        CredentialStore::with_env_var(path, TOKEN_ENV_VAR)
    }

    pub fn with_env_var(path: impl Into<PathBuf>, env_var: impl Into<String>) -> CredentialStore {
        CredentialStore {
            path: path.into(),
            env_var: env_var.into(),
        }
    }

    /// `~/.gh-repo-create.json`, or the file name relative to the working directory
    /// when no home directory can be found
    pub fn default_location() -> CredentialStore {
        CredentialStore::new(home_file(CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the token. A missing or malformed file is "no token", not an error.
    pub fn load(&self) -> Option<String> {
        if let Ok(token) = std::env::var(&self.env_var) {
            debug!("Using token from ${}", self.env_var);
            return Some(token);
        }

        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("No credential file at {}: {e}", self.path.display());
                return None;
            }
        };

        match serde_json::from_str::<CredentialFile>(&contents) {
            Ok(file) => Some(file.token),
            Err(e) => {
                warn!("Ignoring unreadable credential file {}: {e}", self.path.display());
                None
            }
        }
    }

    /// Overwrite the credential file with `token`
    pub fn save(&self, token: &str) -> bool {
        let file = CredentialFile {
            token: token.to_owned(),
        };
        let json = match serde_json::to_string_pretty(&file) {
            Ok(json) => json,
            Err(e) => {
                warn!("Could not serialize token: {e}");
                return false;
            }
        };
        match std::fs::write(&self.path, json) {
            Ok(()) => {
                debug!("Saved token to {}", self.path.display());
                true
            }
            Err(e) => {
                warn!("Could not write {}: {e}", self.path.display());
                false
            }
        }
    }

    pub fn has_token(&self) -> bool {
        self.load().is_some()
    }
}

/// Resolve a file name against the user's home directory
pub fn home_file(name: &str) -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(name);
    path
}
