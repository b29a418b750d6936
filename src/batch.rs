//! Multi-row execution outcomes
//!
//! `execute_many` runs a statement once per iteration of its bound arrays.
//! The backend reports one outcome per attempted row; this module applies
//! the execution policy to them:
//!
//! - fail fast (the default): the first row error fails the whole call and
//!   no batch errors are recorded;
//! - batch errors ([`ExecMode::batch_errors`]): every failure is recorded as
//!   a [`BatchError`] keyed by its 0-based row offset, in the order
//!   encountered, and the call itself succeeds.

use std::fmt;

use crate::constants::{error_code, ExecMode};
use crate::error::{DbError, Error, Result};
use crate::statement::Statement;

/// An error that occurred for one row of a batch execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchError {
    /// The row offset where the error occurred (0-based)
    pub row_offset: u32,
    /// Oracle error code
    pub code: u32,
    /// Error message
    pub message: String,
    /// Whether the row may succeed if retried
    pub is_recoverable: bool,
}

impl BatchError {
    /// Create a new batch error
    pub fn new(row_offset: u32, code: u32, message: impl Into<String>) -> Self {
        Self {
            row_offset,
            code,
            message: message.into(),
            is_recoverable: false,
        }
    }

    fn from_db(row_offset: u32, error: DbError) -> Self {
        Self {
            row_offset,
            code: error.code,
            message: error.message,
            is_recoverable: error.is_recoverable,
        }
    }

    /// The record as a database error
    pub fn to_error(&self) -> Error {
        Error::Database(DbError {
            code: self.code,
            message: self.message.clone(),
            offset: self.row_offset,
            is_recoverable: self.is_recoverable,
        })
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Row {}: ORA-{:05}: {}",
            self.row_offset, self.code, self.message
        )
    }
}

impl std::error::Error for BatchError {}

impl Statement {
    /// Apply the per-row outcomes reported by the backend
    pub(crate) fn apply_row_outcomes(
        &mut self,
        mode: ExecMode,
        outcomes: Vec<std::result::Result<u64, DbError>>,
    ) -> Result<()> {
        let mut counts = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        for (offset, outcome) in (0u32..).zip(outcomes) {
            match outcome {
                Ok(count) => counts.push(count),
                Err(error) if mode.batch_errors => {
                    tracing::trace!(offset, code = error.code, "row failed");
                    self.batch_errors.push(BatchError::from_db(offset, error));
                    counts.push(0);
                }
                Err(error) => {
                    first_error = Some(error.with_offset(offset));
                    break;
                }
            }
        }
        self.dml_row_count = counts.iter().sum();
        if mode.array_dml_row_counts {
            self.row_counts = Some(counts);
        }
        if !self.batch_errors.is_empty() {
            tracing::debug!(
                errors = self.batch_errors.len(),
                code = error_code::ARRAY_DML_ERRORS,
                "batch completed with row errors"
            );
        }
        match first_error {
            Some(error) => Err(Error::Database(error)),
            None => Ok(()),
        }
    }

    /// Number of rows that failed in the last batch execution
    pub fn batch_error_count(&self) -> u32 {
        self.batch_errors.len() as u32
    }

    /// Batch error records; `capacity` must hold all of them
    pub fn batch_errors(&self, capacity: u32) -> Result<Vec<BatchError>> {
        self.check_open()?;
        if (capacity as usize) < self.batch_errors.len() {
            return Err(Error::ArraySizeTooSmall { size: capacity });
        }
        Ok(self.batch_errors.clone())
    }

    /// Affected-row count of each iteration of the last execution
    pub fn row_counts(&self) -> Result<&[u64]> {
        self.check_open()?;
        self.row_counts.as_deref().ok_or_else(|| {
            Error::oracle(
                error_code::ARRAY_DML_ROW_COUNTS_UNAVAILABLE,
                "array DML row counts not available",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_error_display() {
        let err = BatchError::new(5, 1, "test error");
        assert_eq!(err.to_string(), "Row 5: ORA-00001: test error");
    }

    #[test]
    fn test_batch_error_from_db() {
        let db = DbError::new(1438, "value larger than specified precision").recoverable();
        let err = BatchError::from_db(2, db);
        assert_eq!(err.row_offset, 2);
        assert!(err.is_recoverable);
        let back = err.to_error();
        assert_eq!(back.db_error().map(|e| e.offset), Some(2));
        assert_eq!(
            back.to_string(),
            "ORA-01438: value larger than specified precision"
        );
    }

    #[test]
    fn test_exec_mode_flags() {
        let mode = ExecMode::new().with_batch_errors().with_row_counts().with_commit();
        assert!(mode.batch_errors);
        assert!(mode.array_dml_row_counts);
        assert!(mode.commit_on_success);
        assert!(!mode.describe_only);
    }
}
