//! Engine context
//!
//! [`Context`] owns every resource table (variables, statements, LOBs, row
//! identifiers and objects) plus the [`Config`], and is the single entry
//! point of the engine. All handles are issued by a context and are only
//! meaningful to it.
//!
//! Every fallible operation returns a [`Result`]. A failure is additionally
//! recorded as an [`ErrorInfo`] in the context's last-error slot, which
//! stays untouched by successful calls.
//!
//! # Example
//!
//! ```
//! use oracle_vars::{Context, NativeType, OracleType, Value, VarOptions};
//!
//! let mut ctx = Context::new();
//! let var = ctx
//!     .new_var(VarOptions::new(OracleType::Varchar, NativeType::Bytes).size(20))
//!     .unwrap();
//! ctx.set_value(var, 0, Value::from("hello")).unwrap();
//! assert_eq!(ctx.value(var, 0).unwrap(), Some(Value::Bytes(b"hello")));
//!
//! assert!(ctx.set_value(var, 5, Value::from("x")).is_err());
//! assert_eq!(ctx.last_error().unwrap().fn_name, "set_value");
//! ctx.release_var(var).unwrap();
//! ```

use std::cell::RefCell;
use std::sync::Arc;

use crate::backend::StatementBackend;
use crate::config::Config;
use crate::constants::{ExecMode, FetchOrientation, NativeType, OracleType};
use crate::cursor::FetchedRows;
use crate::dbobject::{AttrValue, DbObject, DbObjectType};
use crate::error::{Error, ErrorInfo, Result};
use crate::handle::{HandleTable, LobHandle, ObjectHandle, RowidHandle, StmtHandle, VarHandle};
use crate::statement::{ColumnInfo, Statement, StatementInfo};
use crate::types::{Lob, RowId};
use crate::value::Value;
use crate::variable::{HeldHandle, Var, VarOptions};
use crate::BatchError;

/// Resource tables other than variables, plus the configuration
#[derive(Debug)]
pub(crate) struct Resources {
    pub(crate) stmts: HandleTable<Statement>,
    pub(crate) lobs: HandleTable<Lob>,
    pub(crate) rowids: HandleTable<RowId>,
    pub(crate) objects: HandleTable<DbObject>,
    pub(crate) config: Config,
}

impl Resources {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            stmts: HandleTable::new("statement"),
            lobs: HandleTable::new("LOB"),
            rowids: HandleTable::new("rowid"),
            objects: HandleTable::new("object"),
            config,
        }
    }
}

/// Every resource table
#[derive(Debug)]
pub(crate) struct Store {
    pub(crate) vars: HandleTable<Var>,
    pub(crate) res: Resources,
}

/// References given up during an operation, dropped once it completes
#[derive(Debug, Default)]
pub(crate) struct Released {
    pub(crate) vars: Vec<VarHandle>,
    pub(crate) held: Vec<HeldHandle>,
}

impl Store {
    fn new(config: Config) -> Self {
        Self {
            vars: HandleTable::new("variable"),
            res: Resources::new(config),
        }
    }

    pub(crate) fn release_var(&mut self, handle: VarHandle) -> Result<()> {
        if let Some(var) = self.vars.release(handle)? {
            tracing::debug!(var = ?handle, "variable freed");
            for held in var.into_held_handles() {
                self.release_held(held);
            }
        }
        Ok(())
    }

    pub(crate) fn release_stmt(&mut self, handle: StmtHandle) -> Result<()> {
        if let Some(stmt) = self.res.stmts.release(handle)? {
            tracing::debug!(stmt = ?handle, "statement freed");
            self.release_all(stmt.into_released());
        }
        Ok(())
    }

    fn add_ref_held(&mut self, held: HeldHandle) -> Result<()> {
        match held {
            HeldHandle::Lob(h) => self.res.lobs.add_ref(h),
            HeldHandle::Rowid(h) => self.res.rowids.add_ref(h),
            HeldHandle::Object(h) => self.res.objects.add_ref(h),
            HeldHandle::Stmt(h) => self.res.stmts.add_ref(h),
        }
    }

    fn release_held(&mut self, held: HeldHandle) {
        let result = match held {
            HeldHandle::Lob(h) => self.res.lobs.release(h).map(drop),
            HeldHandle::Rowid(h) => self.res.rowids.release(h).map(drop),
            HeldHandle::Object(h) => self.res.objects.release(h).map(drop),
            HeldHandle::Stmt(h) => self.release_stmt(h),
        };
        if let Err(e) = result {
            tracing::warn!(handle = ?held, error = %e, "failed to release held handle");
        }
    }

    pub(crate) fn release_all(&mut self, released: Released) {
        for var in released.vars {
            if let Err(e) = self.release_var(var) {
                tracing::warn!(var = ?var, error = %e, "failed to release variable");
            }
        }
        for held in released.held {
            self.release_held(held);
        }
    }

    /// Store a value, taking a reference on handle values for the slot
    fn set_value(&mut self, var: VarHandle, index: u32, value: Value<'_>) -> Result<()> {
        let held = HeldHandle::of(&value);
        if let Some(held) = held {
            self.add_ref_held(held)?;
        }
        match self.vars.get_mut(var).and_then(|v| v.set_value(index, value)) {
            Ok(previous) => {
                if let Some(previous) = previous {
                    self.release_held(previous);
                }
                Ok(())
            }
            Err(e) => {
                if let Some(held) = held {
                    self.release_held(held);
                }
                Err(e)
            }
        }
    }

    fn copy_data(
        &mut self,
        dst: VarHandle,
        dst_index: u32,
        src: VarHandle,
        src_index: u32,
    ) -> Result<()> {
        let held = self
            .vars
            .get(src)?
            .value(src_index)?
            .and_then(|value| HeldHandle::of(&value));
        if let Some(held) = held {
            self.add_ref_held(held)?;
        }
        let outcome = if src == dst {
            self.vars.get_mut(dst).and_then(|v| v.copy_within(dst_index, src_index))
        } else {
            let source = self.vars.take(src)?;
            let outcome = self
                .vars
                .get_mut(dst)
                .and_then(|v| v.copy_from(dst_index, &source, src_index));
            self.vars.restore(src, source)?;
            outcome
        };
        match outcome {
            Ok(previous) => {
                if let Some(previous) = previous {
                    self.release_held(previous);
                }
                Ok(())
            }
            Err(e) => {
                if let Some(held) = held {
                    self.release_held(held);
                }
                Err(e)
            }
        }
    }
}

/// The binding engine
#[derive(Debug)]
pub struct Context {
    store: Store,
    last_error: RefCell<Option<ErrorInfo>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a context with the default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a context with an explicit configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            store: Store::new(config),
            last_error: RefCell::new(None),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.store.res.config
    }

    /// Most recent failure recorded by this context
    pub fn last_error(&self) -> Option<ErrorInfo> {
        self.last_error.borrow().clone()
    }

    /// Empty the last-error slot
    pub fn clear_last_error(&self) {
        self.last_error.borrow_mut().take();
    }

    fn record<T>(&self, fn_name: &'static str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if matches!(e, Error::InvalidHandle { .. }) && fn_name.starts_with("release") {
                tracing::warn!(fn_name, error = %e, "release of a stale handle");
            } else {
                tracing::debug!(fn_name, error = %e, "operation failed");
            }
            *self.last_error.borrow_mut() = Some(ErrorInfo::new(e, fn_name));
        }
        result
    }

    /// Run `op` with the statement checked out of its table
    fn with_stmt<T>(
        &mut self,
        handle: StmtHandle,
        op: impl FnOnce(&mut Statement, &mut Store, &mut Released) -> Result<T>,
    ) -> Result<T> {
        let mut stmt = self.store.res.stmts.take(handle)?;
        let mut released = Released::default();
        let result = op(&mut stmt, &mut self.store, &mut released);
        self.store.res.stmts.restore(handle, stmt)?;
        self.store.release_all(released);
        result
    }

    fn stmt(&self, handle: StmtHandle) -> Result<&Statement> {
        self.store.res.stmts.get(handle)
    }

    fn open_stmt(&self, handle: StmtHandle) -> Result<&Statement> {
        let stmt = self.stmt(handle)?;
        stmt.check_open()?;
        Ok(stmt)
    }

    // =========================================================================
    // Variables
    // =========================================================================

    /// Create a variable with a reference count of one
    pub fn new_var(&mut self, options: VarOptions) -> Result<VarHandle> {
        let result = Var::new(options, &self.store.res.config).map(|var| {
            let handle = self.store.vars.insert(var);
            tracing::debug!(var = ?handle, "variable created");
            handle
        });
        self.record("new_var", result)
    }

    /// Borrow a variable for reading
    pub fn var(&self, var: VarHandle) -> Result<&Var> {
        let result = self.store.vars.get(var);
        self.record("var", result)
    }

    /// Take an additional reference to a variable
    pub fn add_ref_var(&mut self, var: VarHandle) -> Result<()> {
        let result = self.store.vars.add_ref(var);
        self.record("add_ref_var", result)
    }

    /// Drop a reference to a variable, freeing it and its held handles at zero
    pub fn release_var(&mut self, var: VarHandle) -> Result<()> {
        let result = self.store.release_var(var);
        self.record("release_var", result)
    }

    /// Set the number of populated elements of an array variable
    pub fn set_num_elements(&mut self, var: VarHandle, count: u32) -> Result<()> {
        let result = self
            .store
            .vars
            .get_mut(var)
            .and_then(|v| v.set_num_elements(count));
        self.record("set_num_elements", result)
    }

    /// Make the element at `index` null
    pub fn set_null(&mut self, var: VarHandle, index: u32) -> Result<()> {
        let result = self.store.vars.get_mut(var).and_then(|v| v.set_null(index));
        let result = result.map(|previous| {
            if let Some(previous) = previous {
                self.store.release_held(previous);
            }
        });
        self.record("set_null", result)
    }

    /// Store a value at `index`; handle values gain a reference held by the slot
    pub fn set_value(&mut self, var: VarHandle, index: u32, value: Value<'_>) -> Result<()> {
        let result = self.store.set_value(var, index, value);
        self.record("set_value", result)
    }

    /// Copy bytes into the element at `index`
    pub fn set_from_bytes(&mut self, var: VarHandle, index: u32, value: &[u8]) -> Result<()> {
        let result = self.store.set_value(var, index, Value::Bytes(value));
        self.record("set_from_bytes", result)
    }

    /// Store a LOB in the element at `index`
    pub fn set_from_lob(&mut self, var: VarHandle, index: u32, lob: LobHandle) -> Result<()> {
        let result = self.store.set_value(var, index, Value::Lob(lob));
        self.record("set_from_lob", result)
    }

    /// Store a row identifier in the element at `index`
    pub fn set_from_rowid(&mut self, var: VarHandle, index: u32, rowid: RowidHandle) -> Result<()> {
        let result = self.store.set_value(var, index, Value::Rowid(rowid));
        self.record("set_from_rowid", result)
    }

    /// Store an object in the element at `index`
    pub fn set_from_object(&mut self, var: VarHandle, index: u32, object: ObjectHandle) -> Result<()> {
        let result = self.store.set_value(var, index, Value::Object(object));
        self.record("set_from_object", result)
    }

    /// Store a statement in the element at `index`
    pub fn set_from_stmt(&mut self, var: VarHandle, index: u32, stmt: StmtHandle) -> Result<()> {
        let result = self.store.set_value(var, index, Value::Stmt(stmt));
        self.record("set_from_stmt", result)
    }

    /// Value at `index`, or `None` when null
    pub fn value(&self, var: VarHandle, index: u32) -> Result<Option<Value<'_>>> {
        let result = self.store.vars.get(var).and_then(|v| v.value(index));
        self.record("value", result)
    }

    /// Copy one element, including null-ness, from `src` into `dst`
    pub fn copy_data(
        &mut self,
        dst: VarHandle,
        dst_index: u32,
        src: VarHandle,
        src_index: u32,
    ) -> Result<()> {
        let result = self.store.copy_data(dst, dst_index, src, src_index);
        self.record("copy_data", result)
    }

    /// Rows produced by a RETURNING INTO clause for one iteration
    pub fn returned_data(&self, var: VarHandle, iteration: u32) -> Result<Vec<Option<Value<'_>>>> {
        let result = self.store.vars.get(var).and_then(|v| {
            let count = v.returned_count(iteration)?;
            (0..count).map(|row| v.returned_value(iteration, row)).collect()
        });
        self.record("returned_data", result)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Wrap a prepared statement
    pub fn prepare<B: StatementBackend + 'static>(&mut self, backend: B) -> StmtHandle {
        self.insert_stmt(Box::new(backend), false)
    }

    /// Wrap a prepared statement that supports scrolling
    pub fn prepare_scrollable<B: StatementBackend + 'static>(&mut self, backend: B) -> StmtHandle {
        self.insert_stmt(Box::new(backend), true)
    }

    fn insert_stmt(&mut self, backend: Box<dyn StatementBackend>, scrollable: bool) -> StmtHandle {
        let stmt = Statement::new(backend, scrollable, &self.store.res.config);
        let statement_type = stmt.info().statement_type;
        let handle = self.store.res.stmts.insert(stmt);
        tracing::debug!(stmt = ?handle, ?statement_type, scrollable, "statement prepared");
        handle
    }

    /// Borrow a statement for reading
    pub fn statement(&self, stmt: StmtHandle) -> Result<&Statement> {
        let result = self.stmt(stmt);
        self.record("statement", result)
    }

    /// Take an additional reference to a statement
    pub fn add_ref_stmt(&mut self, stmt: StmtHandle) -> Result<()> {
        let result = self.store.res.stmts.add_ref(stmt);
        self.record("add_ref_stmt", result)
    }

    /// Drop a reference to a statement, releasing its variables at zero
    pub fn release_stmt(&mut self, stmt: StmtHandle) -> Result<()> {
        let result = self.store.release_stmt(stmt);
        self.record("release_stmt", result)
    }

    /// Close a statement; later operations fail with `StatementClosed`
    pub fn close_stmt(&mut self, stmt: StmtHandle) -> Result<()> {
        let result = self.with_stmt(stmt, |stmt, _, released| {
            stmt.check_open()?;
            stmt.close_into(released);
            Ok(())
        });
        self.record("close_stmt", result)
    }

    /// Statement classification and placeholders
    pub fn statement_info(&self, stmt: StmtHandle) -> Result<StatementInfo> {
        let result = self.open_stmt(stmt).map(|s| s.info().clone());
        self.record("statement_info", result)
    }

    /// Number of placeholders
    pub fn bind_count(&self, stmt: StmtHandle) -> Result<u32> {
        let result = self.open_stmt(stmt).map(Statement::bind_count);
        self.record("bind_count", result)
    }

    /// Placeholder names, de-duplicated, in order of appearance
    pub fn bind_names(&self, stmt: StmtHandle) -> Result<Vec<String>> {
        let result = self
            .open_stmt(stmt)
            .map(|s| s.bind_names().into_iter().map(str::to_string).collect());
        self.record("bind_names", result)
    }

    /// Bind a variable to the placeholder at 1-based `pos`
    pub fn bind_by_pos(&mut self, stmt: StmtHandle, pos: u32, var: VarHandle) -> Result<()> {
        let result = self.with_stmt(stmt, |stmt, store, released| {
            stmt.bind_by_pos(store, pos, var, released)
        });
        self.record("bind_by_pos", result)
    }

    /// Bind a variable to the placeholder called `name`
    pub fn bind_by_name(&mut self, stmt: StmtHandle, name: &str, var: VarHandle) -> Result<()> {
        let result = self.with_stmt(stmt, |stmt, store, released| {
            stmt.bind_by_name(store, name, var, released)
        });
        self.record("bind_by_name", result)
    }

    /// Bind a single value to the placeholder at 1-based `pos`
    pub fn bind_value_by_pos(&mut self, stmt: StmtHandle, pos: u32, value: Value<'_>) -> Result<()> {
        let result = self.with_stmt(stmt, |stmt, store, released| {
            stmt.bind_value_by_pos(store, pos, value, released)
        });
        self.record("bind_value_by_pos", result)
    }

    /// Bind a single value to the placeholder called `name`
    pub fn bind_value_by_name(&mut self, stmt: StmtHandle, name: &str, value: Value<'_>) -> Result<()> {
        let result = self.with_stmt(stmt, |stmt, store, released| {
            stmt.bind_value_by_name(store, name, value, released)
        });
        self.record("bind_value_by_name", result)
    }

    /// Execute once, returning the number of query columns
    pub fn execute(&mut self, stmt: StmtHandle, mode: ExecMode) -> Result<u32> {
        let result = self.with_stmt(stmt, |stmt, store, released| {
            stmt.execute(store, mode, 1, released)
        });
        self.record("execute", result)
    }

    /// Execute once per row of the bound arrays
    pub fn execute_many(&mut self, stmt: StmtHandle, mode: ExecMode, iterations: u32) -> Result<()> {
        let result = self.with_stmt(stmt, |stmt, store, released| {
            stmt.check_open()?;
            if stmt.info().is_query() {
                return Err(Error::NotSupported(
                    "queries cannot be executed with execute_many".to_string(),
                ));
            }
            stmt.check_bind_array_sizes(store, iterations)?;
            stmt.execute(store, mode, iterations, released).map(drop)
        });
        self.record("execute_many", result)
    }

    /// Number of result columns
    pub fn num_query_columns(&self, stmt: StmtHandle) -> Result<u32> {
        let result = self.open_stmt(stmt).map(Statement::num_query_columns);
        self.record("num_query_columns", result)
    }

    /// Metadata of the result column at 1-based `pos`
    pub fn query_info(&self, stmt: StmtHandle, pos: u32) -> Result<ColumnInfo> {
        let result = self.open_stmt(stmt).and_then(|s| {
            s.columns()
                .get((pos as usize).wrapping_sub(1))
                .cloned()
                .ok_or(Error::QueryPositionInvalid(pos))
        });
        self.record("query_info", result)
    }

    /// Use `var` to receive the result column at 1-based `pos`
    pub fn define(&mut self, stmt: StmtHandle, pos: u32, var: VarHandle) -> Result<()> {
        let result = self.with_stmt(stmt, |stmt, store, released| {
            stmt.define(store, pos, var, released)
        });
        self.record("define", result)
    }

    /// Rows fetched per round trip
    pub fn fetch_array_size(&self, stmt: StmtHandle) -> Result<u32> {
        let result = self.open_stmt(stmt).map(Statement::fetch_array_size);
        self.record("fetch_array_size", result)
    }

    /// Change the rows fetched per round trip; 0 restores the default
    pub fn set_fetch_array_size(&mut self, stmt: StmtHandle, size: u32) -> Result<()> {
        let result = self.with_stmt(stmt, |stmt, store, _| stmt.set_fetch_array_size(store, size));
        self.record("set_fetch_array_size", result)
    }

    /// Fetch the next row, returning its index in the query variables
    pub fn fetch(&mut self, stmt: StmtHandle) -> Result<Option<u32>> {
        let result = self.with_stmt(stmt, |stmt, store, released| stmt.fetch(store, released));
        self.record("fetch", result)
    }

    /// Make up to `max_rows` rows available at once
    pub fn fetch_rows(&mut self, stmt: StmtHandle, max_rows: u32) -> Result<FetchedRows> {
        let result = self.with_stmt(stmt, |stmt, store, released| {
            stmt.fetch_rows(store, max_rows, released)
        });
        self.record("fetch_rows", result)
    }

    /// Move a scrollable statement to another row
    pub fn scroll(
        &mut self,
        stmt: StmtHandle,
        orientation: FetchOrientation,
        offset: i32,
        row_count_offset: i32,
    ) -> Result<()> {
        let result = self.with_stmt(stmt, |stmt, store, released| {
            stmt.scroll(store, orientation, offset, row_count_offset, released)
        });
        self.record("scroll", result)
    }

    /// Value of column `pos` in the current row, borrowed from its query variable
    pub fn query_value(&self, stmt: StmtHandle, pos: u32) -> Result<(NativeType, Option<Value<'_>>)> {
        let result = self
            .stmt(stmt)
            .and_then(|s| s.query_value(&self.store, pos));
        self.record("query_value", result)
    }

    /// Rows fetched so far (queries) or affected by the last execution
    pub fn row_count(&self, stmt: StmtHandle) -> Result<u64> {
        let result = self.open_stmt(stmt).map(Statement::row_count);
        self.record("row_count", result)
    }

    /// Rows affected by each iteration of the last execution
    pub fn row_counts(&self, stmt: StmtHandle) -> Result<Vec<u64>> {
        let result = self.stmt(stmt).and_then(|s| s.row_counts().map(<[u64]>::to_vec));
        self.record("row_counts", result)
    }

    /// Number of failed rows in the last batch execution
    pub fn batch_error_count(&self, stmt: StmtHandle) -> Result<u32> {
        let result = self.open_stmt(stmt).map(Statement::batch_error_count);
        self.record("batch_error_count", result)
    }

    /// Failed rows of the last batch execution; `capacity` must hold them all
    pub fn batch_errors(&self, stmt: StmtHandle, capacity: u32) -> Result<Vec<BatchError>> {
        let result = self.stmt(stmt).and_then(|s| s.batch_errors(capacity));
        self.record("batch_errors", result)
    }

    /// Next implicit result of the last execution, as a new statement handle
    pub fn next_implicit_result(&mut self, stmt: StmtHandle) -> Result<Option<StmtHandle>> {
        let result = self.with_stmt(stmt, |stmt, store, released| {
            stmt.next_implicit_result(store, released)
        });
        self.record("next_implicit_result", result)
    }

    /// Row identifier of the last modified row; owned by the statement
    pub fn last_rowid(&self, stmt: StmtHandle) -> Result<Option<RowidHandle>> {
        let result = self.open_stmt(stmt).map(Statement::last_rowid);
        self.record("last_rowid", result)
    }

    // =========================================================================
    // Row identifiers
    // =========================================================================

    /// Borrow a row identifier
    pub fn rowid(&self, rowid: RowidHandle) -> Result<&RowId> {
        let result = self.store.res.rowids.get(rowid);
        self.record("rowid", result)
    }

    /// The 18-character string form of a row identifier
    pub fn rowid_string(&self, rowid: RowidHandle) -> Result<String> {
        let result = self.store.res.rowids.get(rowid).map(RowId::to_string);
        self.record("rowid_string", result)
    }

    /// Take an additional reference to a row identifier
    pub fn add_ref_rowid(&mut self, rowid: RowidHandle) -> Result<()> {
        let result = self.store.res.rowids.add_ref(rowid);
        self.record("add_ref_rowid", result)
    }

    /// Drop a reference to a row identifier
    pub fn release_rowid(&mut self, rowid: RowidHandle) -> Result<()> {
        let result = self.store.res.rowids.release(rowid).map(drop);
        self.record("release_rowid", result)
    }

    // =========================================================================
    // LOBs
    // =========================================================================

    /// Create an empty temporary LOB
    pub fn new_temp_lob(&mut self, oracle_type: OracleType) -> Result<LobHandle> {
        let result = Lob::temporary(oracle_type, self.store.res.config.lob_chunk_size)
            .map(|lob| self.store.res.lobs.insert(lob));
        self.record("new_temp_lob", result)
    }

    /// Borrow a LOB
    pub fn lob(&self, lob: LobHandle) -> Result<&Lob> {
        let result = self.store.res.lobs.get(lob);
        self.record("lob", result)
    }

    /// Take an additional reference to a LOB
    pub fn add_ref_lob(&mut self, lob: LobHandle) -> Result<()> {
        let result = self.store.res.lobs.add_ref(lob);
        self.record("add_ref_lob", result)
    }

    /// Drop a reference to a LOB
    pub fn release_lob(&mut self, lob: LobHandle) -> Result<()> {
        let result = self.store.res.lobs.release(lob).map(drop);
        self.record("release_lob", result)
    }

    fn with_lob<T>(&mut self, lob: LobHandle, op: impl FnOnce(&mut Lob) -> Result<T>) -> Result<T> {
        self.store.res.lobs.get_mut(lob).and_then(op)
    }

    /// Size in characters (character LOBs) or bytes
    pub fn lob_size(&self, lob: LobHandle) -> Result<u64> {
        let result = self.store.res.lobs.get(lob).and_then(Lob::size);
        self.record("lob_size", result)
    }

    /// Read `amount` units starting at 1-based `offset`
    pub fn lob_read_bytes(&self, lob: LobHandle, offset: u64, amount: u64) -> Result<Vec<u8>> {
        let result = self
            .store
            .res
            .lobs
            .get(lob)
            .and_then(|l| l.read(offset, amount))
            .map(|data| data.to_vec());
        self.record("lob_read_bytes", result)
    }

    /// Write at 1-based `offset`, extending the LOB as needed
    pub fn lob_write_bytes(&mut self, lob: LobHandle, offset: u64, value: &[u8]) -> Result<()> {
        let result = self.with_lob(lob, |l| l.write(offset, value));
        self.record("lob_write_bytes", result)
    }

    /// Replace the whole contents
    pub fn lob_set_from_bytes(&mut self, lob: LobHandle, value: &[u8]) -> Result<()> {
        let result = self.with_lob(lob, |l| l.set_from_bytes(value));
        self.record("lob_set_from_bytes", result)
    }

    /// Shorten the LOB to `new_size`
    pub fn lob_trim(&mut self, lob: LobHandle, new_size: u64) -> Result<()> {
        let result = self.with_lob(lob, |l| l.trim(new_size));
        self.record("lob_trim", result)
    }

    /// Chunk size
    pub fn lob_chunk_size(&self, lob: LobHandle) -> Result<u32> {
        let result = self.store.res.lobs.get(lob).and_then(Lob::chunk_size);
        self.record("lob_chunk_size", result)
    }

    /// Bytes needed to hold `size_in_chars` characters of this LOB
    pub fn lob_buffer_size(&self, lob: LobHandle, size_in_chars: u64) -> Result<u64> {
        let result = self
            .store
            .res
            .lobs
            .get(lob)
            .and_then(|l| l.buffer_size(size_in_chars, &self.store.res.config));
        self.record("lob_buffer_size", result)
    }

    /// Open the LOB for a series of writes
    pub fn lob_open_resource(&mut self, lob: LobHandle) -> Result<()> {
        let result = self.with_lob(lob, Lob::open_resource);
        self.record("lob_open_resource", result)
    }

    /// Close a LOB opened with `lob_open_resource`
    pub fn lob_close_resource(&mut self, lob: LobHandle) -> Result<()> {
        let result = self.with_lob(lob, Lob::close_resource);
        self.record("lob_close_resource", result)
    }

    /// Check if the LOB was opened with `lob_open_resource`
    pub fn lob_is_resource_open(&self, lob: LobHandle) -> Result<bool> {
        let result = self.store.res.lobs.get(lob).and_then(Lob::is_resource_open);
        self.record("lob_is_resource_open", result)
    }

    /// Close the LOB; later operations fail with `LobClosed`
    pub fn lob_close(&mut self, lob: LobHandle) -> Result<()> {
        let result = self.with_lob(lob, |l| {
            l.close();
            Ok(())
        });
        self.record("lob_close", result)
    }

    /// Create an independent copy of a LOB
    pub fn lob_copy(&mut self, lob: LobHandle) -> Result<LobHandle> {
        let result = self
            .store
            .res
            .lobs
            .get(lob)
            .and_then(Lob::copy)
            .map(|copy| self.store.res.lobs.insert(copy));
        self.record("lob_copy", result)
    }

    /// Directory alias and file name of a BFILE
    pub fn lob_directory_and_file_name(&self, lob: LobHandle) -> Result<(String, String)> {
        let result = self
            .store
            .res
            .lobs
            .get(lob)
            .and_then(Lob::directory_and_file_name)
            .map(|(dir, file)| (dir.to_string(), file.to_string()));
        self.record("lob_directory_and_file_name", result)
    }

    /// Point a BFILE at a directory alias and file name
    pub fn lob_set_directory_and_file_name(
        &mut self,
        lob: LobHandle,
        directory: &str,
        file_name: &str,
    ) -> Result<()> {
        let result = self.with_lob(lob, |l| l.set_directory_and_file_name(directory, file_name));
        self.record("lob_set_directory_and_file_name", result)
    }

    // =========================================================================
    // Objects
    // =========================================================================

    /// Create an object instance with every attribute null
    pub fn new_object(&mut self, object_type: Arc<DbObjectType>) -> ObjectHandle {
        self.store.res.objects.insert(DbObject::new(object_type))
    }

    /// Borrow an object
    pub fn object(&self, object: ObjectHandle) -> Result<&DbObject> {
        let result = self.store.res.objects.get(object);
        self.record("object", result)
    }

    /// Mutably borrow an object for collection operations
    pub fn object_mut(&mut self, object: ObjectHandle) -> Result<&mut DbObject> {
        if let Err(e) = self.store.res.objects.get(object) {
            return self.record("object_mut", Err(e));
        }
        self.store.res.objects.get_mut(object)
    }

    /// Take an additional reference to an object
    pub fn add_ref_object(&mut self, object: ObjectHandle) -> Result<()> {
        let result = self.store.res.objects.add_ref(object);
        self.record("add_ref_object", result)
    }

    /// Drop a reference to an object
    pub fn release_object(&mut self, object: ObjectHandle) -> Result<()> {
        let result = self.store.res.objects.release(object).map(drop);
        self.record("release_object", result)
    }

    /// Value of an attribute
    pub fn object_get_attribute(&self, object: ObjectHandle, name: &str) -> Result<AttrValue> {
        let result = self
            .store
            .res
            .objects
            .get(object)
            .and_then(|o| o.get(name).cloned());
        self.record("object_get_attribute", result)
    }

    /// Replace the value of an attribute
    pub fn object_set_attribute(
        &mut self,
        object: ObjectHandle,
        name: &str,
        value: AttrValue,
    ) -> Result<()> {
        let result = self
            .store
            .res
            .objects
            .get_mut(object)
            .and_then(|o| o.set(name, value));
        self.record("object_set_attribute", result)
    }

    /// Create an independent copy of an object
    pub fn object_copy(&mut self, object: ObjectHandle) -> Result<ObjectHandle> {
        let result = self
            .store
            .res
            .objects
            .get(object)
            .cloned()
            .map(|copy| self.store.res.objects.insert(copy));
        self.record("object_copy", result)
    }
}
