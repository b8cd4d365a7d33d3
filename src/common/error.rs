//! Error types for the application.

use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {message}")]
    IoError { path: String, message: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// A record handed to the host that is not a recognized outbound shape.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Unrecognized record: {record}")]
    Unrecognized { record: String },

    #[error("Malformed record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised inside the worker process.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Cannot send to an unresolved destination")]
    UnresolvedDestination,

    #[error("Invalid command configuration: {message}")]
    InvalidCommand { message: String },

    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("Platform error: {message}")]
    Platform { message: String },
}

/// Failure while dispatching or running a text command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Command \"{name}\" is not found")]
    NotFound { name: String },

    #[error("{name} command is disabled")]
    Disabled { name: String },

    #[error("Command raised an exception: {0}")]
    Invoke(#[from] WorkerError),
}

impl CommandError {
    /// Whether the error text is meant to be shown to the invoking user as-is.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Disabled { .. })
    }
}

/// Result type alias for worker operations.
pub type WorkerResult<T> = std::result::Result<T, WorkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_command_errors() {
        assert!(CommandError::NotFound { name: "x".to_string() }.is_expected());
        assert!(CommandError::Disabled { name: "x".to_string() }.is_expected());
        assert!(!CommandError::Invoke(WorkerError::UnresolvedDestination).is_expected());
    }

    #[test]
    fn test_not_found_text() {
        let err = CommandError::NotFound { name: "ask".to_string() };
        assert_eq!(err.to_string(), "Command \"ask\" is not found");
    }
}
