//! Error types for nav-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for nav-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Machine-readable cause of a failed object store call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    NotFound,
    AccessDenied,
    Timeout,
    Network,
    Unknown,
}

impl std::fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StoreErrorKind::NotFound => "not found",
            StoreErrorKind::AccessDenied => "access denied",
            StoreErrorKind::Timeout => "timeout",
            StoreErrorKind::Network => "network",
            StoreErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Error types for nav-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Local filesystem error tied to a path
    #[error("{path}: {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Object store call failed
    #[error("{operation} failed ({kind}): {message}")]
    Store {
        operation: String,
        kind: StoreErrorKind,
        message: String,
    },

    /// An object in a delete batch could not be removed
    #[error("delete failed for {key}: {message}")]
    DeleteFailed { key: String, message: String },

    /// A transfer job stopped on one of its objects
    #[error("transfer failed for {target}: {source}")]
    Transfer {
        target: String,
        #[source]
        source: Box<Error>,
    },

    /// The operation was interrupted by a cancel request
    #[error("Operation cancelled")]
    Cancelled,

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Build a store error for the named operation
    pub fn store(
        operation: impl Into<String>,
        kind: StoreErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Error::Store {
            operation: operation.into(),
            kind,
            message: message.into(),
        }
    }

    /// Attach a filesystem path to an IO error
    pub fn local(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Wrap an error with the key or path of the transfer target it happened on
    pub fn transfer(target: impl Into<String>, source: Error) -> Self {
        Error::Transfer {
            target: target.into(),
            source: Box::new(source),
        }
    }

    /// Store cause of this error, looking through transfer wrappers
    pub fn store_kind(&self) -> Option<StoreErrorKind> {
        match self {
            Error::Store { kind, .. } => Some(*kind),
            Error::Transfer { source, .. } => source.store_kind(),
            _ => None,
        }
    }

    /// Whether this error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Transfer { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::Config(_) | Error::InvalidUrl(_) => 2, // UsageError
            Error::ProfileNotFound(_) => 5,                                       // NotFound
            Error::LocalIo { source, .. } | Error::Io(source)
                if source.kind() == std::io::ErrorKind::AlreadyExists =>
            {
                6 // Conflict
            }
            Error::Cancelled => 130, // Interrupted
            Error::Transfer { source, .. } => source.exit_code(),
            Error::Store { kind, .. } => match kind {
                StoreErrorKind::Network | StoreErrorKind::Timeout => 3, // NetworkError
                StoreErrorKind::AccessDenied => 4,                      // AuthError
                StoreErrorKind::NotFound => 5,                          // NotFound
                StoreErrorKind::Unknown => 1,
            },
            _ => 1, // GeneralError
        }
    }
}
