//! Error types for graphauth.

use thiserror::Error;

/// Common error type for graphauth infrastructure.
#[derive(Error, Debug)]
pub enum GraphAuthError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// Unique constraint violation reported by the database.
    ///
    /// Carries the offending column (e.g. `users.username`).
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for GraphAuthError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                // SQLite reports "UNIQUE constraint failed: users.username"
                let column = db_err
                    .message()
                    .rsplit(": ")
                    .next()
                    .unwrap_or_default()
                    .to_string();
                return GraphAuthError::UniqueViolation(column);
            }
        }
        GraphAuthError::Database(e.to_string())
    }
}

/// Result type alias for graphauth operations.
pub type Result<T> = std::result::Result<T, GraphAuthError>;
