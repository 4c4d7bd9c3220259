//! Error types for watch-sql.
//!
//! Every failure that crosses the integration boundary is an [`IntegrationError`].
//! Runtime database failures are always reported as [`IntegrationError::Execution`]
//! with the original error kept as the source.

use thiserror::Error;

/// Boxed error produced by connection and query-service collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by collaborators (connections, query services).
pub type DriverResult<T> = std::result::Result<T, BoxError>;

/// Broad classification of an [`IntegrationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or missing configuration, detected at construction time.
    Configuration,
    /// The API was called in a way that cannot be satisfied.
    Usage,
    /// Opening the connection, running the statement or mapping rows failed.
    Execution,
}

/// Main error type for integration operations.
#[derive(Error, Debug)]
pub enum IntegrationError {
    /// Configuration errors (missing configuration, invalid connection string, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Usage errors (no query to run, etc.)
    #[error("Usage error: {0}")]
    Usage(String),

    /// Failures from the database side of an invocation.
    #[error("Integration error: {message}")]
    Execution {
        message: String,
        #[source]
        source: BoxError,
    },
}

impl IntegrationError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a usage error with the given message.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Wraps a collaborator failure into the execution error kind.
    pub fn execution(msg: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Execution {
            message: msg.into(),
            source: source.into(),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Usage(_) => ErrorKind::Usage,
            Self::Execution { .. } => ErrorKind::Execution,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => "Configuration Error",
            ErrorKind::Usage => "Usage Error",
            ErrorKind::Execution => "Integration Error",
        }
    }
}

/// Result type alias using IntegrationError.
pub type Result<T> = std::result::Result<T, IntegrationError>;
