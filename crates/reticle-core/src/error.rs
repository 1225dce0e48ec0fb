//! Error types for reticle-core
//!
//! Two layers:
//! - [`Error`]: framework failures (configuration, discovery, parser assembly)
//! - [`CommandError`]: what a command handler may return to the dispatcher

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::ModuleId;

/// Core error type for reticle operations
#[derive(Debug, Error)]
pub enum Error {
    /// The discovery package has no `base` module
    #[error("Base commands module not found in: {package}.base")]
    MissingBase { package: String },

    /// A discovered module has no compiled-in implementation
    #[error("Command module not found: {0}")]
    ModuleNotFound(ModuleId),

    /// Listing the discovery directory failed
    #[error("Failed to list command modules in {}: {reason}", path.display())]
    Discovery { path: PathBuf, reason: String },

    /// A group was asked to load while its own load was still running.
    ///
    /// Guard only: `CommandGroup::load` takes `&mut self` and a module sees
    /// nothing but its `BuildContext`, so no caller can reach this today.
    #[error("Command group '{0}' is already loading")]
    ReentrantLoad(ModuleId),

    /// Two entries claim the same name in one parser
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An argument declaration was rejected
    #[error("Invalid argument '{arg}' for command '{command}': {reason}")]
    InvalidArgument {
        command: String,
        arg: String,
        reason: String,
    },

    /// Configuration could not be read or failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Handler raised something the dispatcher does not recover from
    #[error("Command '{command}' failed: {source}")]
    Handler {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the process exit code for this error.
    ///
    /// - 1: configuration or declaration problems
    /// - 2: system errors (IO, listing, handler failures)
    /// - 3: not found
    /// - 4: invalid state
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::MissingBase { .. }
            | Self::Conflict(_)
            | Self::InvalidArgument { .. }
            | Self::InvalidConfig(_) => 1,
            Self::Discovery { .. } | Self::Handler { .. } | Self::Io(_) => 2,
            Self::ModuleNotFound(_) => 3,
            Self::ReentrantLoad(_) => 4,
        }
    }
}

/// Result type alias for reticle-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds a command handler hands back to the dispatcher
#[derive(Debug, Error)]
pub enum CommandError {
    /// Reported as a single `ERROR:` line; the caller keeps running
    #[error("{0}")]
    Recoverable(String),

    #[error("To perform this command you need super user privileges.")]
    PermissionDenied,

    /// Handler asked for the process to end with this status
    #[error("exit requested with status {0}")]
    Exit(i32),

    /// Anything else; propagated out of `dispatch`
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        Self::Failed(err.into())
    }
}

impl CommandError {
    pub fn recoverable(msg: impl Into<String>) -> Self {
        Self::Recoverable(msg.into())
    }

    /// Whether the dispatcher reports this error and carries on.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable(_) | Self::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_base_message_names_package() {
        let err = Error::MissingBase {
            package: "commands".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Base commands module not found in: commands.base"
        );
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_codes_by_category() {
        let not_found = Error::ModuleNotFound(ModuleId::new("commands.gone"));
        assert_eq!(not_found.exit_code(), 3);

        let io = Error::from(std::io::Error::other("disk"));
        assert_eq!(io.exit_code(), 2);

        let reentrant = Error::ReentrantLoad(ModuleId::new("commands.base"));
        assert_eq!(reentrant.exit_code(), 4);
    }

    #[test]
    fn test_command_error_recoverability() {
        assert!(CommandError::recoverable("nope").is_recoverable());
        assert!(CommandError::PermissionDenied.is_recoverable());
        assert!(!CommandError::Exit(0).is_recoverable());
        assert!(!CommandError::Failed(anyhow::anyhow!("boom")).is_recoverable());
    }

    #[test]
    fn test_io_errors_are_not_recoverable() {
        let err = CommandError::from(std::io::Error::other("broken pipe"));
        assert!(matches!(err, CommandError::Failed(_)));
        assert_eq!(err.to_string(), "broken pipe");
    }

    #[test]
    fn test_permission_denied_message() {
        assert_eq!(
            CommandError::PermissionDenied.to_string(),
            "To perform this command you need super user privileges."
        );
    }
}
