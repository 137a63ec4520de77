//! Core error types.

use thiserror::Error;

/// Errors raised while compiling filters, encoding values, or validating models.
///
/// All of these are compile-time errors: they are returned before any SQL
/// reaches the database.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Filter shape cannot be compiled without ambiguity.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A value could not be coerced to its property's declared type.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Field the value was supplied for.
        field: String,
        /// Why the coercion failed.
        reason: String,
    },

    /// Model declaration violates a schema invariant.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Input data is unusable for the requested statement.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A bulk-update entry lacks its `where` or `update` half.
    #[error("Where or Update fields are missing")]
    MissingWhereOrUpdate,
}

impl Error {
    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
