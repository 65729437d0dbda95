//! Error types for mongo-move.

use crate::mapping::MappingId;
use thiserror::Error;

/// Main error type for catalog, session and copy operations.
#[derive(Error, Debug)]
pub enum MoveError {
    /// Configuration error (missing server, malformed URI, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server could not be reached
    #[error("Connection error ({server}): {message}")]
    Connection { server: String, message: String },

    /// Listing or counting failed on a reachable server
    #[error("Query failed while {context}: {message}")]
    Query { context: String, message: String },

    /// Source collection holds no documents, nothing to copy
    #[error("no records in source collection {database}.{collection} to copy")]
    EmptySource {
        database: String,
        collection: String,
    },

    /// Document read or insert failed mid-stream
    #[error("Transfer failed for collection {collection}: {message}")]
    Transfer { collection: String, message: String },

    /// Action not valid in the current session state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Action refused because of the target's status
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Unknown mapping id
    #[error("Mapping {0} not found")]
    NotFound(MappingId),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Process exit code for configuration problems.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Process exit code when a server is unreachable.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Process exit code for failed listings or counts.
pub const EXIT_QUERY_ERROR: u8 = 3;
/// Process exit code for failed copies.
pub const EXIT_TRANSFER_ERROR: u8 = 4;
/// Process exit code for rejected session actions.
pub const EXIT_STATE_ERROR: u8 = 5;
/// Process exit code for file IO failures.
pub const EXIT_IO_ERROR: u8 = 7;

impl MoveError {
    /// Create a Connection error for the given server label
    pub fn connection(server: impl Into<String>, message: impl Into<String>) -> Self {
        MoveError::Connection {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a Query error with context about what was being fetched
    pub fn query(context: impl Into<String>, message: impl Into<String>) -> Self {
        MoveError::Query {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(collection: impl Into<String>, message: impl Into<String>) -> Self {
        MoveError::Transfer {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidState error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        MoveError::InvalidState(message.into())
    }

    /// Whether the error comes from misuse of the session rather than the outside world.
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            MoveError::InvalidState(_) | MoveError::Precondition(_) | MoveError::NotFound(_)
        )
    }

    /// Exit code reported by the CLI for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MoveError::Config(_) | MoveError::Json(_) | MoveError::Yaml(_) => EXIT_CONFIG_ERROR,
            MoveError::Connection { .. } => EXIT_CONNECTION_ERROR,
            MoveError::Query { .. } => EXIT_QUERY_ERROR,
            MoveError::EmptySource { .. } | MoveError::Transfer { .. } => EXIT_TRANSFER_ERROR,
            MoveError::InvalidState(_) | MoveError::Precondition(_) | MoveError::NotFound(_) => {
                EXIT_STATE_ERROR
            }
            MoveError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for mongo-move operations.
pub type Result<T> = std::result::Result<T, MoveError>;
