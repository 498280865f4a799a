use thiserror::Error;

use crate::config::{MAX_DESCRIPTION_LENGTH, MAX_REPO_NAME_LENGTH};

// ANSI styles for terminal output
pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const BLUE: &str = "\x1b[34m";
pub const GREEN: &str = "\x1b[32m";
pub const RED: &str = "\x1b[31m";
pub const YELLOW: &str = "\x1b[33m";
pub const GRAY: &str = "\x1b[90m";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Repository name cannot be empty")]
    EmptyName,
    #[error("Repository name too long ({0}/{max})", max = MAX_REPO_NAME_LENGTH)]
    NameTooLong(usize),
    #[error("Invalid name. Use only letters, numbers, hyphens, and underscores.")]
    InvalidNameCharacters,
    #[error("Description too long ({0}/{max})", max = MAX_DESCRIPTION_LENGTH)]
    DescriptionTooLong(usize),
}

/// Length rule applied to every repository name
pub fn validate_repo_name_length(name: &str) -> Result<(), ValidationError> {
    let length = name.chars().count();
    if length == 0 {
        return Err(ValidationError::EmptyName);
    }
    if length > MAX_REPO_NAME_LENGTH {
        return Err(ValidationError::NameTooLong(length));
    }
    Ok(())
}

/// The stricter rule for names typed at the interactive prompt
pub fn validate_repo_name(name: &str) -> Result<(), ValidationError> {
    validate_repo_name_length(name)?;
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidNameCharacters);
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    let length = description.chars().count();
    if length > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::DescriptionTooLong(length));
    }
    Ok(())
}

/// Show only the last five characters of a token
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 5 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("*****{tail}")
}
