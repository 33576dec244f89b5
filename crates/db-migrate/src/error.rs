//! Error types for the migration engine.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (malformed URL, missing required parameter, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection URL failed to parse.
    #[error("Invalid connection url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Backend unreachable or connection lost.
    #[error("Connection error: {0}")]
    Connection(String),

    /// No driver registered for the requested URL scheme.
    #[error("Driver '{0}' not found")]
    DriverNotFound(String),

    /// Advisory lock is already held by this driver instance.
    #[error("can't acquire lock: already locked")]
    AlreadyLocked,

    /// Advisory lock command failed on the backend.
    #[error("Lock error: {0}")]
    Lock(String),

    /// Migration statement failed, with positional diagnostics when available.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Named method not present in the registered method set.
    #[error("Missing method: {0}")]
    MissingMethod(String),

    /// Named method resolved but its session type does not match.
    #[error("Wrong method signature: {0}")]
    WrongSignature(String),

    /// Named method executed and returned an error.
    #[error("Method '{method}' failed: {source}")]
    InvocationFailed {
        method: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Driver was initialized or invoked before a method set was registered.
    #[error("Unregistered methods receiver for driver: {0}")]
    UnregisteredReceiver(String),

    /// Backend database error.
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// IO error (lazy migration file loading).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    /// Create a Config error.
    pub fn config(message: impl Into<String>) -> Self {
        MigrateError::Config(message.into())
    }

    /// Create a Connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        MigrateError::Connection(message.into())
    }

    /// Create a Lock error.
    pub fn lock(message: impl Into<String>) -> Self {
        MigrateError::Lock(message.into())
    }

    /// Create a Migration error.
    pub fn migration(message: impl Into<String>) -> Self {
        MigrateError::Migration(message.into())
    }

    /// Wrap an error returned by a named migration method.
    pub fn invocation_failed(
        method: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        MigrateError::InvocationFailed {
            method: method.into(),
            source,
        }
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
