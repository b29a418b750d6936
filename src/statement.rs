//! Prepared statement state
//!
//! A [`Statement`] wraps the [`StatementBackend`] handed over by the
//! SQL-processing collaborator together with everything the engine tracks
//! for it: bound variables, query columns and their variables, the fetch
//! buffer position, row counts, batch errors and the last ROWID.
//!
//! The statement lives in the context's statement table. Operations that
//! also need the variable table check it out with
//! [`HandleTable::take`](crate::HandleTable::take) for their duration.

use std::sync::Arc;

use crate::backend::{ExecuteRequest, ExecuteResponse, StatementBackend};
use crate::batch::BatchError;
use crate::bind::BindEntry;
use crate::config::Config;
use crate::constants::{BindDirection, ExecMode, NativeType, OracleType, StatementType};
use crate::context::{Released, Store};
use crate::cursor::FetchState;
use crate::dbobject::DbObjectType;
use crate::error::{DbError, Error, Result};
use crate::handle::{RowidHandle, VarHandle};
use crate::variable::HeldHandle;

/// Metadata for a placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindInfo {
    /// Placeholder name (without leading colon)
    pub name: String,
    /// Whether this is a RETURNING INTO placeholder
    pub is_return_bind: bool,
    /// Direction declared by the statement
    pub direction: BindDirection,
}

impl BindInfo {
    /// Create a placeholder with the given name
    pub fn new(name: impl Into<String>, is_return_bind: bool) -> Self {
        Self {
            name: name.into(),
            is_return_bind,
            direction: if is_return_bind {
                BindDirection::Output
            } else {
                BindDirection::Input
            },
        }
    }

    /// IN placeholder
    pub fn input(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }

    /// OUT placeholder
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            direction: BindDirection::Output,
            ..Self::new(name, false)
        }
    }

    /// IN OUT placeholder
    pub fn input_output(name: impl Into<String>) -> Self {
        Self {
            direction: BindDirection::InputOutput,
            ..Self::new(name, false)
        }
    }

    /// RETURNING INTO placeholder
    pub fn returning(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }
}

/// Statement classification and placeholder table
///
/// ```
/// use oracle_vars::{BindInfo, StatementInfo, StatementType};
///
/// let info = StatementInfo::new(StatementType::Insert)
///     .with_bind(BindInfo::input("NAME"))
///     .with_bind(BindInfo::returning("ID"));
/// assert!(info.is_dml());
/// assert!(info.is_returning);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementInfo {
    /// Kind of statement
    pub statement_type: StatementType,
    /// Whether the statement has a RETURNING INTO clause
    pub is_returning: bool,
    /// Placeholders in order of appearance
    pub bind_info: Vec<BindInfo>,
}

impl StatementInfo {
    /// Create a statement description without placeholders
    pub fn new(statement_type: StatementType) -> Self {
        Self {
            statement_type,
            ..Self::default()
        }
    }

    /// Append a placeholder
    pub fn with_bind(mut self, bind: BindInfo) -> Self {
        self.is_returning |= bind.is_return_bind;
        self.bind_info.push(bind);
        self
    }

    /// Check if this is a query (SELECT)
    pub fn is_query(&self) -> bool {
        self.statement_type.is_query()
    }

    /// Check if this is a PL/SQL block
    pub fn is_plsql(&self) -> bool {
        self.statement_type.is_plsql()
    }

    /// Check if this is a DML statement
    pub fn is_dml(&self) -> bool {
        self.statement_type.is_dml()
    }

    /// Check if this is a DDL statement
    pub fn is_ddl(&self) -> bool {
        self.statement_type.is_ddl()
    }
}

/// Metadata for a column in a result set
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Oracle data type
    pub oracle_type: OracleType,
    /// Size of the column in bytes
    pub data_size: u32,
    /// Precision (for NUMBER)
    pub precision: i16,
    /// Scale (for NUMBER)
    pub scale: i8,
    /// Whether NULL values are allowed
    pub nullable: bool,
    /// Object type (for OBJECT columns)
    pub object_type: Option<Arc<DbObjectType>>,
}

impl ColumnInfo {
    /// Create a new column with minimal info
    pub fn new(name: impl Into<String>, oracle_type: OracleType) -> Self {
        Self {
            name: name.into(),
            oracle_type,
            data_size: 0,
            precision: 0,
            scale: 0,
            nullable: true,
            object_type: None,
        }
    }

    /// Set the column size in bytes
    pub fn with_size(mut self, data_size: u32) -> Self {
        self.data_size = data_size;
        self
    }

    /// Set NUMBER precision and scale
    pub fn with_precision(mut self, precision: i16, scale: i8) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Mark the column NOT NULL
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the object type of an OBJECT column
    pub fn with_object_type(mut self, object_type: Arc<DbObjectType>) -> Self {
        self.object_type = Some(object_type);
        self
    }

    /// Native type of the variable created when the column is not defined
    pub fn default_native_type(&self) -> NativeType {
        self.oracle_type.default_native_type()
    }

    /// Element size of the variable created when the column is not defined
    pub(crate) fn fetch_size(&self) -> u32 {
        if self.oracle_type.is_long() && self.data_size == 0 {
            i32::MAX as u32
        } else {
            self.data_size
        }
    }

    /// Check if this column is a LOB type
    pub fn is_lob(&self) -> bool {
        self.oracle_type.is_lob()
    }
}

/// A prepared statement
#[derive(Debug)]
pub struct Statement {
    pub(crate) backend: Option<Box<dyn StatementBackend>>,
    pub(crate) info: StatementInfo,
    pub(crate) scrollable: bool,
    pub(crate) executed: bool,
    pub(crate) binds: Vec<BindEntry>,
    pub(crate) columns: Vec<ColumnInfo>,
    pub(crate) query_vars: Vec<Option<VarHandle>>,
    pub(crate) fetch: FetchState,
    pub(crate) dml_row_count: u64,
    pub(crate) row_counts: Option<Vec<u64>>,
    pub(crate) batch_errors: Vec<BatchError>,
    pub(crate) last_rowid: Option<RowidHandle>,
}

impl Statement {
    pub(crate) fn new(backend: Box<dyn StatementBackend>, scrollable: bool, config: &Config) -> Self {
        Self {
            info: backend.info().clone(),
            backend: Some(backend),
            scrollable,
            executed: false,
            binds: Vec::new(),
            columns: Vec::new(),
            query_vars: Vec::new(),
            fetch: FetchState::new(config.fetch_array_size),
            dml_row_count: 0,
            row_counts: None,
            batch_errors: Vec::new(),
            last_rowid: None,
        }
    }

    /// Wrap a nested cursor; it is already executed and ready to fetch
    pub(crate) fn from_cursor(backend: Box<dyn StatementBackend>, config: &Config) -> Self {
        let columns = backend.query_columns().to_vec();
        let mut stmt = Self::new(backend, false, config);
        stmt.info.statement_type = StatementType::Select;
        stmt.query_vars = vec![None; columns.len()];
        stmt.columns = columns;
        stmt.executed = true;
        stmt.fetch.reset();
        stmt
    }

    /// Statement classification and placeholders
    pub fn info(&self) -> &StatementInfo {
        &self.info
    }

    /// Check if the statement was prepared as scrollable
    pub fn is_scrollable(&self) -> bool {
        self.scrollable
    }

    /// Check if the statement has been executed
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Check if the statement can still be used
    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    /// Result columns of the last execution
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub(crate) fn check_open(&self) -> Result<()> {
        if self.backend.is_none() {
            return Err(Error::StatementClosed);
        }
        Ok(())
    }

    pub(crate) fn backend_mut(&mut self) -> Result<&mut dyn StatementBackend> {
        match self.backend.as_deref_mut() {
            Some(backend) => Ok(backend),
            None => Err(Error::StatementClosed),
        }
    }

    /// Convert a backend failure, closing the statement after a call timeout
    pub(crate) fn backend_error(&mut self, error: DbError, released: &mut Released) -> Error {
        if error.is_call_timeout() {
            tracing::warn!(
                code = error.code,
                "call timed out, statement is no longer usable"
            );
            self.close_into(released);
        }
        Error::Database(error)
    }

    /// Drop the backend and hand every owned reference to `released`
    pub(crate) fn close_into(&mut self, released: &mut Released) {
        self.backend = None;
        released.vars.extend(self.binds.drain(..).map(|entry| entry.var));
        released.vars.extend(self.query_vars.drain(..).flatten());
        released.held.extend(self.last_rowid.take().map(HeldHandle::Rowid));
        self.columns.clear();
        self.batch_errors.clear();
        self.row_counts = None;
    }

    pub(crate) fn into_released(mut self) -> Released {
        let mut released = Released::default();
        self.close_into(&mut released);
        released
    }

    /// Number of rows fetched (queries) or affected by the last execution
    pub fn row_count(&self) -> u64 {
        if self.info.is_query() {
            self.fetch.row_count
        } else {
            self.dml_row_count
        }
    }

    /// Row identifier of the last row modified by the last execution
    pub fn last_rowid(&self) -> Option<RowidHandle> {
        self.last_rowid
    }

    /// Execute for `iterations` rows, returning the number of query columns
    pub(crate) fn execute(
        &mut self,
        store: &mut Store,
        mode: ExecMode,
        iterations: u32,
        released: &mut Released,
    ) -> Result<u32> {
        self.check_open()?;
        self.batch_errors.clear();
        self.row_counts = None;
        self.dml_row_count = 0;
        released.held.extend(self.last_rowid.take().map(HeldHandle::Rowid));

        let binds = self.wire_binds(store, iterations)?;
        for (position, placeholder) in (1u32..).zip(self.info.bind_info.iter()) {
            if placeholder.is_return_bind {
                if let Some(handle) = self.resolve_bind(position) {
                    store.vars.get_mut(handle)?.clear_returned(&mut released.held);
                }
            }
        }
        let request = ExecuteRequest {
            mode,
            iterations,
            binds,
        };
        let outcome = self.backend_mut()?.execute(&request);
        let response = match outcome {
            Ok(response) => response,
            Err(e) => return Err(self.backend_error(e, released)),
        };
        tracing::debug!(
            statement_type = ?self.info.statement_type,
            iterations,
            "statement executed"
        );
        self.apply_response(store, mode, response, released)
    }

    fn apply_response(
        &mut self,
        store: &mut Store,
        mode: ExecMode,
        response: ExecuteResponse,
        released: &mut Released,
    ) -> Result<u32> {
        let ExecuteResponse {
            row_outcomes,
            out_values,
            returning,
            columns,
            last_rowid,
        } = response;

        for out in out_values {
            let handle = self.bound_var(out.position)?;
            let var = store.vars.get_mut(handle)?;
            if var.is_array() {
                var.set_num_elements(out.values.len() as u32)?;
            }
            for (index, wire) in (0u32..).zip(out.values) {
                var.set_from_wire(index, wire, &mut store.res, &mut released.held)?;
            }
        }
        for ret in returning {
            let handle = self.bound_var(ret.position)?;
            store
                .vars
                .get_mut(handle)?
                .set_returned(ret.rows, &mut store.res, &mut released.held)?;
        }
        if let Some(rowid) = last_rowid {
            self.last_rowid = Some(store.res.rowids.insert(rowid));
        }
        if self.info.is_query() {
            self.set_query_columns(columns, released);
            self.fetch.reset();
        }
        self.executed = true;
        self.apply_row_outcomes(mode, row_outcomes)?;
        Ok(self.columns.len() as u32)
    }

    fn bound_var(&self, position: u32) -> Result<VarHandle> {
        self.resolve_bind(position).ok_or_else(|| {
            Error::Internal(format!("values returned for unbound placeholder {position}"))
        })
    }

    /// Replace the result columns, dropping query variables when the shape changed
    pub(crate) fn set_query_columns(&mut self, columns: Vec<ColumnInfo>, released: &mut Released) {
        if columns.len() != self.query_vars.len() {
            released.vars.extend(self.query_vars.drain(..).flatten());
            self.query_vars = vec![None; columns.len()];
        }
        self.columns = columns;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_info_flags() {
        let info = StatementInfo::new(StatementType::Update)
            .with_bind(BindInfo::input("A"))
            .with_bind(BindInfo::returning("B"));
        assert!(info.is_dml());
        assert!(!info.is_query());
        assert!(info.is_returning);
        assert_eq!(info.bind_info[1].direction, BindDirection::Output);

        let plain = StatementInfo::new(StatementType::Begin).with_bind(BindInfo::output("X"));
        assert!(plain.is_plsql());
        assert!(!plain.is_returning);
    }

    #[test]
    fn test_bind_info_directions() {
        assert_eq!(BindInfo::input("A").direction, BindDirection::Input);
        assert_eq!(BindInfo::output("A").direction, BindDirection::Output);
        assert_eq!(
            BindInfo::input_output("A").direction,
            BindDirection::InputOutput
        );
        assert!(BindInfo::returning("A").is_return_bind);
    }

    #[test]
    fn test_column_fetch_size() {
        let col = ColumnInfo::new("DESCRIPTION", OracleType::Varchar).with_size(200);
        assert_eq!(col.fetch_size(), 200);
        assert_eq!(col.default_native_type(), NativeType::Bytes);

        let long = ColumnInfo::new("NOTES", OracleType::LongVarchar);
        assert_eq!(long.fetch_size(), i32::MAX as u32);

        let num = ColumnInfo::new("ID", OracleType::Number).with_precision(9, 0).not_null();
        assert_eq!(num.default_native_type(), NativeType::Double);
        assert!(!num.nullable);
    }
}
