//! Error types for the binding engine
//!
//! Every fallible operation returns [`Result`]. Engine-detected failures carry
//! a stable `DPI-NNNN` number ([`Error::dpi_code`]); failures reported by the
//! database collaborator are passed through untouched as [`Error::Database`].
//! The context additionally keeps the most recent failure as an [`ErrorInfo`]
//! record in its last-error slot.

use thiserror::Error;

use crate::constants::{NativeType, OracleType};

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error reported by the database for a statement or a single batch row
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("ORA-{code:05}: {message}")]
pub struct DbError {
    /// Oracle error number (ORA-NNNNN)
    pub code: u32,
    /// Message text as reported by the database
    pub message: String,
    /// Row offset (batch operations) or parse offset
    pub offset: u32,
    /// Whether the operation may succeed if retried
    pub is_recoverable: bool,
}

impl DbError {
    /// Create a database error with no offset
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            offset: 0,
            is_recoverable: false,
        }
    }

    /// Set the row or parse offset
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Mark the error as recoverable
    pub fn recoverable(mut self) -> Self {
        self.is_recoverable = true;
        self
    }

    /// Check if this error reports a call timeout or a user cancellation
    pub fn is_call_timeout(&self) -> bool {
        matches!(
            self.code,
            crate::constants::error_code::CALL_TIMEOUT
                | crate::constants::error_code::USER_CANCELLED
        )
    }
}

/// Main error type for the binding engine
#[derive(Error, Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Error {
    // =========================================================================
    // Handle Errors
    // =========================================================================
    /// Operation on a released, checked-out or never-issued handle
    #[error("DPI-1002: invalid {kind} handle")]
    InvalidHandle { kind: &'static str },

    /// Statement was closed or became unusable
    #[error("DPI-1039: statement was already closed")]
    StatementClosed,

    /// LOB was closed
    #[error("DPI-1040: LOB was already closed")]
    LobClosed,

    // =========================================================================
    // Binding Errors
    // =========================================================================
    /// Positional bind outside 1..=placeholder count
    #[error("DPI-2001: bind position {position} is invalid (statement has {count} placeholders)")]
    InvalidBindPosition { position: u32, count: u32 },

    /// Named bind that matches no placeholder
    #[error("DPI-2002: no placeholder named \"{0}\"")]
    InvalidBindName(String),

    // =========================================================================
    // Sizing Errors
    // =========================================================================
    /// Array size of zero requested
    #[error("DPI-1031: array size cannot be zero")]
    ArraySizeZero,

    /// Array size larger than allowed
    #[error("DPI-1015: array size of {size} is too large")]
    ArraySizeTooLarge { size: u32 },

    /// Array size smaller than required
    #[error("DPI-1018: array size of {size} is too small")]
    ArraySizeTooSmall { size: u32 },

    /// Element byte capacity exceeded
    #[error("DPI-1019: buffer size of {capacity} is too small (need {needed})")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// Element count larger than the variable's array size
    #[error("DPI-1009: number of elements {count} exceeds array size of {max}")]
    ElementCountTooLarge { count: u32, max: u32 },

    /// Fetched value longer than the declared element size
    #[error("DPI-2004: fetched value of {actual} bytes exceeds declared size of {declared} bytes")]
    DataTooLarge { actual: usize, declared: usize },

    // =========================================================================
    // Conversion Errors
    // =========================================================================
    /// Text is not a valid number
    #[error("DPI-1043: invalid number: {0}")]
    InvalidNumber(String),

    /// Value outside the magnitude or precision the NUMBER format supports
    #[error("DPI-1044: value cannot be represented as an Oracle number: {0}")]
    NumberOutOfRange(String),

    /// Number text too long to be converted
    #[error("DPI-1045: strings converted to numbers can only be up to 172 characters long")]
    NumberStringTooLong,

    /// Bytes or text do not form a valid row identifier
    #[error("DPI-2005: invalid ROWID: {0}")]
    InvalidRowid(String),

    /// Calendar fields do not form a valid date
    #[error("DPI-1016: invalid date: {0}")]
    InvalidDate(String),

    /// Value kind does not match the variable's native type
    #[error("DPI-2003: native type mismatch: variable holds {expected:?}, got {actual:?}")]
    TypeMismatch {
        expected: NativeType,
        actual: NativeType,
    },

    /// Oracle type cannot be converted to the requested native type
    #[error("DPI-1014: conversion between Oracle type {oracle_type:?} and native type {native_type:?} is not implemented")]
    UnhandledConversion {
        oracle_type: OracleType,
        native_type: NativeType,
    },

    /// Wire type number with no engine mapping
    #[error("DPI-1008: data type {0} is not supported")]
    UnhandledDataType(u16),

    /// Element slot is null
    #[error("DPI-1017: value is null")]
    ValueIsNull,

    // =========================================================================
    // State Errors
    // =========================================================================
    /// Operation requires an executed statement
    #[error("DPI-1007: no query has been executed")]
    NotExecuted,

    /// No row is current in the fetch buffer
    #[error("DPI-1029: no row currently fetched")]
    NoCurrentRow,

    /// Query column position outside 1..=column count
    #[error("DPI-1028: query position {0} is invalid")]
    QueryPositionInvalid(u32),

    /// Scroll moved outside the result set
    #[error("DPI-1027: scroll operation would go out of the result set")]
    ScrollOutOfResultSet,

    /// Index outside a variable, collection or returned-data range
    #[error("DPI-1024: element at index {0} does not exist")]
    InvalidIndex(i64),

    /// Collection operation on a non-collection object
    #[error("DPI-1023: object {0} is not a collection")]
    NotCollection(String),

    /// Attribute does not belong to the object's type
    #[error("DPI-1022: attribute {attribute} is not part of object type {type_name}")]
    WrongAttribute {
        attribute: String,
        type_name: String,
    },

    /// Operation not supported in this configuration
    #[error("DPI-1013: not supported: {0}")]
    NotSupported(String),

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Error reported by the database, passed through verbatim
    #[error(transparent)]
    Database(#[from] DbError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (should not happen)
    #[error("DPI-2099: internal error: {0}")]
    Internal(String),
}

/// Classification of an [`Error`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ErrorKind {
    InvalidHandle,
    StatementClosed,
    LobClosed,
    InvalidBindPosition,
    InvalidBindName,
    ArraySizeZero,
    ArraySizeTooLarge,
    ArraySizeTooSmall,
    BufferTooSmall,
    ElementCountTooLarge,
    DataTooLarge,
    InvalidNumber,
    NumberOutOfRange,
    NumberStringTooLong,
    InvalidDate,
    InvalidRowid,
    TypeMismatch,
    UnhandledConversion,
    UnhandledDataType,
    ValueIsNull,
    NotExecuted,
    NoCurrentRow,
    QueryPositionInvalid,
    ScrollOutOfResultSet,
    InvalidIndex,
    NotCollection,
    WrongAttribute,
    NotSupported,
    Database,
    Internal,
}

impl Error {
    /// Create a new Oracle database error
    pub fn oracle(code: u32, message: impl Into<String>) -> Self {
        Error::Database(DbError::new(code, message))
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidHandle { .. } => ErrorKind::InvalidHandle,
            Error::StatementClosed => ErrorKind::StatementClosed,
            Error::LobClosed => ErrorKind::LobClosed,
            Error::InvalidBindPosition { .. } => ErrorKind::InvalidBindPosition,
            Error::InvalidBindName(_) => ErrorKind::InvalidBindName,
            Error::ArraySizeZero => ErrorKind::ArraySizeZero,
            Error::ArraySizeTooLarge { .. } => ErrorKind::ArraySizeTooLarge,
            Error::ArraySizeTooSmall { .. } => ErrorKind::ArraySizeTooSmall,
            Error::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
            Error::ElementCountTooLarge { .. } => ErrorKind::ElementCountTooLarge,
            Error::DataTooLarge { .. } => ErrorKind::DataTooLarge,
            Error::InvalidNumber(_) => ErrorKind::InvalidNumber,
            Error::NumberOutOfRange(_) => ErrorKind::NumberOutOfRange,
            Error::NumberStringTooLong => ErrorKind::NumberStringTooLong,
            Error::InvalidDate(_) => ErrorKind::InvalidDate,
            Error::InvalidRowid(_) => ErrorKind::InvalidRowid,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::UnhandledConversion { .. } => ErrorKind::UnhandledConversion,
            Error::UnhandledDataType(_) => ErrorKind::UnhandledDataType,
            Error::ValueIsNull => ErrorKind::ValueIsNull,
            Error::NotExecuted => ErrorKind::NotExecuted,
            Error::NoCurrentRow => ErrorKind::NoCurrentRow,
            Error::QueryPositionInvalid(_) => ErrorKind::QueryPositionInvalid,
            Error::ScrollOutOfResultSet => ErrorKind::ScrollOutOfResultSet,
            Error::InvalidIndex(_) => ErrorKind::InvalidIndex,
            Error::NotCollection(_) => ErrorKind::NotCollection,
            Error::WrongAttribute { .. } => ErrorKind::WrongAttribute,
            Error::NotSupported(_) => ErrorKind::NotSupported,
            Error::Database(_) => ErrorKind::Database,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Driver error number (`DPI-NNNN`), or `None` for database errors
    pub fn dpi_code(&self) -> Option<u32> {
        let code = match self.kind() {
            ErrorKind::InvalidHandle => 1002,
            ErrorKind::NotExecuted => 1007,
            ErrorKind::UnhandledDataType => 1008,
            ErrorKind::ElementCountTooLarge => 1009,
            ErrorKind::NotSupported => 1013,
            ErrorKind::UnhandledConversion => 1014,
            ErrorKind::ArraySizeTooLarge => 1015,
            ErrorKind::InvalidDate => 1016,
            ErrorKind::ValueIsNull => 1017,
            ErrorKind::ArraySizeTooSmall => 1018,
            ErrorKind::BufferTooSmall => 1019,
            ErrorKind::WrongAttribute => 1022,
            ErrorKind::NotCollection => 1023,
            ErrorKind::InvalidIndex => 1024,
            ErrorKind::ScrollOutOfResultSet => 1027,
            ErrorKind::QueryPositionInvalid => 1028,
            ErrorKind::NoCurrentRow => 1029,
            ErrorKind::ArraySizeZero => 1031,
            ErrorKind::StatementClosed => 1039,
            ErrorKind::LobClosed => 1040,
            ErrorKind::InvalidNumber => 1043,
            ErrorKind::NumberOutOfRange => 1044,
            ErrorKind::NumberStringTooLong => 1045,
            ErrorKind::InvalidBindPosition => 2001,
            ErrorKind::InvalidBindName => 2002,
            ErrorKind::TypeMismatch => 2003,
            ErrorKind::DataTooLarge => 2004,
            ErrorKind::InvalidRowid => 2005,
            ErrorKind::Internal => 2099,
            ErrorKind::Database => return None,
        };
        Some(code)
    }

    /// The database error, if this error came from the database
    pub fn db_error(&self) -> Option<&DbError> {
        match self {
            Error::Database(e) => Some(e),
            _ => None,
        }
    }

    /// Check if the caller may retry the failed operation
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Database(e) => e.is_recoverable || e.is_call_timeout(),
            _ => false,
        }
    }

    /// Check if this error guards against truncation, overflow or precision loss
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::BufferTooSmall
                | ErrorKind::DataTooLarge
                | ErrorKind::NumberOutOfRange
                | ErrorKind::ElementCountTooLarge
        )
    }
}

/// Structured record of the most recent failure, kept in the last-error slot
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    /// Error classification
    pub kind: ErrorKind,
    /// Oracle error number for database errors, 0 otherwise
    pub code: u32,
    /// Driver error number for engine errors
    pub dpi_code: Option<u32>,
    /// Row or parse offset reported with the error
    pub offset: u32,
    /// Full message text
    pub message: String,
    /// Public operation that failed
    pub fn_name: &'static str,
    /// Whether the operation may be retried
    pub is_recoverable: bool,
}

impl ErrorInfo {
    /// Build the record for an error raised by `fn_name`
    pub fn new(error: &Error, fn_name: &'static str) -> Self {
        let (code, offset) = match error.db_error() {
            Some(db) => (db.code, db.offset),
            None => (0, 0),
        };
        Self {
            kind: error.kind(),
            code,
            dpi_code: error.dpi_code(),
            offset,
            message: error.to_string(),
            fn_name,
            is_recoverable: error.is_recoverable(),
        }
    }
}
