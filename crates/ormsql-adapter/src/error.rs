//! Adapter error types.

use std::fmt;

use thiserror::Error;

use crate::gateway::{ExecInfo, GatewayError};

/// Errors returned by adapter operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    /// Compilation or validation failed before anything was executed.
    #[error(transparent)]
    Core(#[from] ormsql_core::Error),

    /// The gateway reported an error while executing SQL.
    #[error("execution failed: {0}")]
    Execution(#[from] GatewayError),

    /// No model with this name has been defined.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// The gateway returned the wrong kind of output for the statement.
    #[error("unexpected gateway output: expected {0}")]
    UnexpectedOutput(&'static str),

    /// Settings could not be parsed or are inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Outcome of a bulk update where at least one item failed.
///
/// Both vectors are positional and have one slot per input item: a failed
/// item has `errors[i] = Some(..)` and `results[i] = None`, a successful one
/// the reverse.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkUpdateError {
    /// Per-item errors.
    pub errors: Vec<Option<AdapterError>>,
    /// Per-item results.
    pub results: Vec<Option<ExecInfo>>,
}

impl BulkUpdateError {
    /// Number of failed items.
    pub fn failed(&self) -> usize {
        self.errors.iter().filter(|e| e.is_some()).count()
    }
}

impl fmt::Display for BulkUpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} updates failed", self.failed(), self.errors.len())?;
        if let Some(first) = self.errors.iter().flatten().next() {
            write!(f, "; first error: {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BulkUpdateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AdapterError::UnknownModel("Person".into());
        assert_eq!(err.to_string(), "unknown model: Person");

        let err: AdapterError = ormsql_core::Error::MissingWhereOrUpdate.into();
        assert_eq!(err.to_string(), "Where or Update fields are missing");

        let err: AdapterError = GatewayError::NoSuchTable("person".into()).into();
        assert_eq!(err.to_string(), "execution failed: table does not exist: person");
    }

    #[test]
    fn test_bulk_error_display() {
        let err = BulkUpdateError {
            errors: vec![None, Some(ormsql_core::Error::MissingWhereOrUpdate.into())],
            results: vec![Some(ExecInfo::default()), None],
        };
        assert_eq!(err.failed(), 1);
        assert_eq!(
            err.to_string(),
            "1 of 2 updates failed; first error: Where or Update fields are missing"
        );
    }
}
