//! Error types for rowkit
//!
//! All fallible operations in this crate return [`Error`]. Underlying SQLite
//! failures are wrapped rather than swallowed, and the original cause chain is
//! preserved through [`std::error::Error::source`].

use rusqlite::ErrorCode;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by rowkit operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A connection, statement, or cursor operation failed in the underlying
    /// database client.
    #[error("data access failed: {0}")]
    DataAccess(#[from] rusqlite::Error),

    /// A query expected to match at most one row matched several.
    #[error("query to find single row returned multiple")]
    MultipleRows,

    /// A migration step failed. The remaining migration run is aborted.
    #[error("migration '{identifier}' failed")]
    Migration {
        /// Identifier of the migration that failed.
        identifier: String,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// The primary SQLite result code of the deepest data-access cause,
    /// if there is one.
    pub fn sqlite_code(&self) -> Option<ErrorCode> {
        match self {
            Error::DataAccess(e) => e.sqlite_error_code(),
            Error::Migration { source, .. } => source.sqlite_code(),
            Error::MultipleRows => None,
        }
    }

    /// The extended (vendor) SQLite result code of the deepest data-access
    /// cause, if there is one. More specific than [`Error::sqlite_code`],
    /// e.g. `SQLITE_CONSTRAINT_PRIMARYKEY` rather than `SQLITE_CONSTRAINT`.
    pub fn vendor_code(&self) -> Option<i32> {
        match self {
            Error::DataAccess(rusqlite::Error::SqliteFailure(e, _)) => Some(e.extended_code),
            Error::Migration { source, .. } => source.vendor_code(),
            _ => None,
        }
    }
}
