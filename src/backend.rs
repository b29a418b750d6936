//! Boundary to the SQL-processing collaborator
//!
//! The engine never parses SQL or talks to a server itself. A prepared
//! statement is handed to [`Context::prepare`](crate::Context::prepare) as a
//! [`StatementBackend`], which describes the statement's placeholders and
//! result columns and performs executions and fetches on wire-encoded data.
//!
//! Values cross the boundary as [`WireValue`]s in the database's own binary
//! formats (packed NUMBER, 7/11/13-byte dates, 13-byte ROWIDs and so on).
//! LOB contents, object instances and nested cursors travel as their own
//! variants.

use std::fmt;

use bytes::Bytes;

use crate::constants::{BindDirection, ExecMode, FetchOrientation, OracleType};
use crate::dbobject::DbObject;
use crate::error::DbError;
use crate::statement::{ColumnInfo, StatementInfo};
use crate::types::RowId;

/// A prepared statement as seen by the engine
pub trait StatementBackend: fmt::Debug {
    /// Statement classification and placeholder table
    fn info(&self) -> &StatementInfo;

    /// Result columns known without executing (nested cursors, implicit results)
    fn query_columns(&self) -> &[ColumnInfo];

    /// Execute the statement for `request.iterations` rows
    ///
    /// Row-level failures are reported in [`ExecuteResponse::row_outcomes`].
    /// Without [`ExecMode::batch_errors`] the backend stops after the first
    /// failing row. An `Err` aborts the whole call.
    fn execute(&mut self, request: &ExecuteRequest) -> Result<ExecuteResponse, DbError>;

    /// Fetch the next block of rows
    fn fetch(&mut self, request: &FetchRequest) -> Result<FetchResponse, DbError>;

    /// Next statement-shaped result produced by the last execution, if any
    fn next_implicit_result(&mut self) -> Result<Option<Box<dyn StatementBackend>>, DbError>;
}

/// A single value in wire format
#[derive(Debug)]
pub enum WireValue {
    /// Null indicator
    Null,
    /// Scalar value encoded in the column's wire format
    Data(Bytes),
    /// Full contents of a LOB locator
    Lob(Bytes),
    /// Object or collection instance
    Object(DbObject),
    /// Nested statement (REF CURSOR)
    Cursor(Box<dyn StatementBackend>),
}

impl WireValue {
    /// Check for the null indicator
    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }
}

impl From<Vec<u8>> for WireValue {
    fn from(data: Vec<u8>) -> Self {
        WireValue::Data(Bytes::from(data))
    }
}

impl From<&[u8]> for WireValue {
    fn from(data: &[u8]) -> Self {
        WireValue::Data(Bytes::copy_from_slice(data))
    }
}

/// Values sent for one placeholder
#[derive(Debug)]
pub struct WireBind {
    /// 1-based placeholder position
    pub position: u32,
    /// Placeholder name
    pub name: String,
    /// Direction declared by the statement
    pub direction: BindDirection,
    /// Type of the bound variable
    pub oracle_type: OracleType,
    /// Per-element capacity in bytes
    pub max_size: u32,
    /// PL/SQL index-by array bind
    pub is_array: bool,
    /// One value per iteration, or the array elements of an array bind.
    /// Empty for output-only placeholders.
    pub values: Vec<WireValue>,
}

/// Execution request
#[derive(Debug)]
pub struct ExecuteRequest {
    /// Execution flags
    pub mode: ExecMode,
    /// Number of rows (1 for a single execution)
    pub iterations: u32,
    /// Bound values in placeholder order
    pub binds: Vec<WireBind>,
}

/// Values returned for an output placeholder
#[derive(Debug)]
pub struct OutBind {
    /// 1-based placeholder position
    pub position: u32,
    /// One value per iteration, or the array elements of an array bind
    pub values: Vec<WireValue>,
}

/// Rows produced by a RETURNING INTO placeholder
#[derive(Debug)]
pub struct ReturningBind {
    /// 1-based placeholder position
    pub position: u32,
    /// Returned rows, one list per iteration
    pub rows: Vec<Vec<WireValue>>,
}

/// Outcome of an execution
#[derive(Debug, Default)]
pub struct ExecuteResponse {
    /// Rows affected or the error, per attempted iteration
    pub row_outcomes: Vec<Result<u64, DbError>>,
    /// Output placeholder values
    pub out_values: Vec<OutBind>,
    /// DML RETURNING rows
    pub returning: Vec<ReturningBind>,
    /// Result columns for queries
    pub columns: Vec<ColumnInfo>,
    /// Row identifier of the last modified row
    pub last_rowid: Option<RowId>,
}

/// Fetch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    /// Direction of the fetch
    pub orientation: FetchOrientation,
    /// Row number for absolute fetches, distance for relative ones
    pub offset: i64,
    /// Maximum rows to return
    pub max_rows: u32,
}

/// Rows returned by a fetch
#[derive(Debug, Default)]
pub struct FetchResponse {
    /// Rows in column order
    pub rows: Vec<Vec<WireValue>>,
    /// Whether the result set has rows beyond this block
    pub more_rows: bool,
    /// 1-based position of the last row returned (scrollable cursors)
    pub current_position: u64,
}
