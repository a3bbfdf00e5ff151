//! Error types for flightledger.
//!
//! This module defines all error types used throughout the flightledger crate.
//! Missing aggregates are not errors; a missing session is, because the
//! lifecycle handler has to report it.

use std::path::PathBuf;

use rust_decimal::Decimal;
use thiserror::Error;

/// The main error type for flightledger operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Ledger Errors ===
    /// A ledger transaction failed; no counter was changed.
    #[error("ledger write failed during {operation}: {source}")]
    LedgerWrite {
        /// The reconciliation step that was running.
        operation: &'static str,
        /// The underlying storage error.
        #[source]
        source: rusqlite::Error,
    },

    /// An hour value cannot be stored as a fixed-point counter.
    #[error("{field} value {value} is outside the storable range")]
    HoursOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// The referenced session does not exist.
    #[error("flight session not found: {id}")]
    SessionNotFound {
        /// The session identifier that was looked up.
        id: String,
    },

    // === Parse Errors ===
    /// Unrecognised session type.
    #[error("unknown session type: {0}")]
    InvalidSessionType(String),

    /// Unrecognised session status.
    #[error("unknown session status: {0}")]
    InvalidSessionStatus(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for flightledger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a session-not-found error.
    #[must_use]
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::SessionNotFound { id: id.into() }
    }

    /// Rewrap a storage failure raised inside a ledger transaction.
    ///
    /// Non-storage errors pass through untouched.
    #[must_use]
    pub fn into_ledger_write(self, operation: &'static str) -> Self {
        match self {
            Self::DatabaseQuery(source) => Self::LedgerWrite { operation, source },
            other => other,
        }
    }

    /// Check if this error reports a missing session.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound { .. })
    }

    /// Check if this error is a failed ledger transaction.
    #[must_use]
    pub fn is_ledger_write(&self) -> bool {
        matches!(self, Self::LedgerWrite { .. })
    }
}
