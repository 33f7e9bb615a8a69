//! Error types for command orchestration.
//!
//! Library errors ([`AstError`], [`ConfigError`]) pass through unchanged;
//! everything the user can fix by changing their input carries a hint.

use crate::prompt::PromptError;
use scaffold_ast::AstError;
use scaffold_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{message}")]
    Validation { message: String, hint: String },

    #[error("{kind} '{name}' not found. Available: {}", display_available(.available))]
    NotFound {
        kind: String,
        name: String,
        available: Vec<String>,
    },

    #[error("{message}")]
    MissingRequired { message: String, hint: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Timed out waiting for input")]
    TimedOut,

    #[error(transparent)]
    Ast(#[from] AstError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Failed to install {packages}: {reason}")]
    Install { packages: String, reason: String },
}

fn display_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

impl CommandError {
    pub fn validation(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CommandError::Validation {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn missing(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CommandError::MissingRequired {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Process exit code. A cancellation is not a failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Cancelled => 0,
            _ => 1,
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            CommandError::Validation { hint, .. } | CommandError::MissingRequired { hint, .. } => {
                Some(hint.clone())
            }
            CommandError::NotFound { kind, .. } => {
                Some(format!("Pass one of the available {kind} names exactly as declared"))
            }
            CommandError::TimedOut => Some(
                "Run the command again with the required options as flags, or pass --non-interactive"
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Errors that mean the project's code (or a bundled template) does not
    /// have the expected shape. These are reported with their full chain.
    pub fn is_structural(&self) -> bool {
        matches!(self, CommandError::Ast(err) if err.is_structural())
    }
}

impl From<PromptError> for CommandError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Cancelled => CommandError::Cancelled,
            PromptError::TimedOut => CommandError::TimedOut,
            PromptError::Io(message) => CommandError::Prompt(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_candidates() {
        let err = CommandError::NotFound {
            kind: "Plugin".to_string(),
            name: "Missing".to_string(),
            available: vec!["ReviewsPlugin".to_string(), "WishlistPlugin".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Plugin 'Missing' not found. Available: ReviewsPlugin, WishlistPlugin"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CommandError::Cancelled.exit_code(), 0);
        assert_eq!(CommandError::TimedOut.exit_code(), 1);
        assert_eq!(
            CommandError::validation("Invalid name", "Use PascalCase").exit_code(),
            1
        );
    }

    #[test]
    fn test_prompt_errors_convert() {
        assert!(matches!(
            CommandError::from(PromptError::Cancelled),
            CommandError::Cancelled
        ));
        let timed_out = CommandError::from(PromptError::TimedOut);
        assert!(timed_out.hint().unwrap().contains("flags"));
    }
}
