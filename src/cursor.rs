//! Query fetching and scrollable cursor support
//!
//! Rows are fetched in blocks of the statement's fetch array size into the
//! query variables, one element per row. [`Statement`] keeps the position
//! inside that block: `fetch` hands out one buffer row index at a time and
//! only goes back to the backend once the block is drained.
//!
//! Scrollable statements additionally support [`FetchOrientation`] moves.
//! A move that lands inside the current block only repositions the buffer
//! index; anything else fetches a new block around the target row.

use crate::backend::{FetchRequest, WireValue};
use crate::constants::{FetchOrientation, NativeType};
use crate::context::{Released, Store};
use crate::error::{Error, Result};
use crate::handle::VarHandle;
use crate::statement::Statement;
use crate::value::Value;
use crate::variable::{Var, VarOptions};

/// Position of a statement inside its fetched rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FetchState {
    pub(crate) fetch_array_size: u32,
    /// Rows in the current block
    pub(crate) buffer_row_count: u32,
    /// Next row of the block to hand out
    pub(crate) buffer_row_index: u32,
    /// Result set row number of the first row in the block
    pub(crate) buffer_min_row: u64,
    /// Rows handed out so far
    pub(crate) row_count: u64,
    pub(crate) has_rows_to_fetch: bool,
    /// A block could not be stored; fetching resumes after the next execute
    pub(crate) block_failed: bool,
}

impl FetchState {
    pub(crate) fn new(fetch_array_size: u32) -> Self {
        Self {
            fetch_array_size,
            buffer_row_count: 0,
            buffer_row_index: 0,
            buffer_min_row: 0,
            row_count: 0,
            has_rows_to_fetch: false,
            block_failed: false,
        }
    }

    /// Start over for a freshly executed query
    pub(crate) fn reset(&mut self) {
        *self = Self {
            has_rows_to_fetch: true,
            ..Self::new(self.fetch_array_size)
        };
    }

    fn is_drained(&self) -> bool {
        self.buffer_row_index >= self.buffer_row_count
    }

    /// Drop a partially stored block; its rows are gone from the backend
    fn fail_block(&mut self) {
        self.buffer_row_count = 0;
        self.buffer_row_index = 0;
        self.has_rows_to_fetch = false;
        self.block_failed = true;
    }
}

/// Rows made available by [`Statement::fetch_rows`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchedRows {
    /// Index of the first row in the query variables
    pub buffer_row_index: u32,
    /// Number of rows available from that index
    pub num_rows: u32,
    /// Whether more rows may be fetched
    pub more_rows: bool,
}

impl Statement {
    fn check_query(&self) -> Result<()> {
        self.check_open()?;
        if !self.executed || !self.info.is_query() {
            return Err(Error::NotExecuted);
        }
        Ok(())
    }

    /// Rows fetched per round trip
    pub fn fetch_array_size(&self) -> u32 {
        self.fetch.fetch_array_size
    }

    /// Number of result columns
    pub fn num_query_columns(&self) -> u32 {
        self.columns.len() as u32
    }

    fn check_query_position(&self, pos: u32) -> Result<usize> {
        if pos == 0 || pos as usize > self.columns.len() {
            return Err(Error::QueryPositionInvalid(pos));
        }
        Ok(pos as usize - 1)
    }

    /// Variable receiving the column at `pos`, once created or defined
    pub fn query_var(&self, pos: u32) -> Result<Option<VarHandle>> {
        let index = self.check_query_position(pos)?;
        Ok(self.query_vars[index])
    }

    /// Change the fetch array size; 0 selects the configured default
    pub(crate) fn set_fetch_array_size(&mut self, store: &Store, size: u32) -> Result<()> {
        self.check_open()?;
        let size = if size == 0 {
            store.res.config.fetch_array_size
        } else {
            size
        };
        for handle in self.query_vars.iter().flatten() {
            if store.vars.get(*handle)?.max_array_size() < size {
                return Err(Error::ArraySizeTooLarge { size });
            }
        }
        self.fetch.fetch_array_size = size;
        Ok(())
    }

    /// Use `var` for the column at `pos`; the statement takes a reference
    pub(crate) fn define(
        &mut self,
        store: &mut Store,
        pos: u32,
        var: VarHandle,
        released: &mut Released,
    ) -> Result<()> {
        self.check_query()?;
        let index = self.check_query_position(pos)?;
        store.vars.get(var)?;
        if self.query_vars[index] == Some(var) {
            return Ok(());
        }
        store.vars.add_ref(var)?;
        released
            .vars
            .extend(std::mem::replace(&mut self.query_vars[index], Some(var)));
        tracing::trace!(pos, var = ?var, "column defined");
        Ok(())
    }

    fn check_fetchable(&self) -> Result<()> {
        self.check_query()?;
        if self.fetch.block_failed {
            tracing::debug!("fetch after a failed block, statement must be executed again");
            return Err(Error::NotExecuted);
        }
        Ok(())
    }

    /// Create missing query variables and check the defined ones
    fn pre_fetch(&mut self, store: &mut Store) -> Result<()> {
        let fetch_array_size = self.fetch.fetch_array_size;
        for (column, slot) in self.columns.iter().zip(self.query_vars.iter_mut()) {
            match *slot {
                Some(handle) => {
                    let max = store.vars.get(handle)?.max_array_size();
                    if max < fetch_array_size {
                        return Err(Error::ArraySizeTooSmall { size: max });
                    }
                }
                None => {
                    let mut options =
                        VarOptions::new(column.oracle_type, column.default_native_type())
                            .max_array_size(fetch_array_size)
                            .size(column.fetch_size())
                            .size_is_bytes(true);
                    if let Some(object_type) = &column.object_type {
                        options = options.object_type(object_type.clone());
                    }
                    let var = Var::new(options, &store.res.config)?;
                    let handle = store.vars.insert(var);
                    tracing::trace!(column = %column.name, var = ?handle, "created query variable");
                    *slot = Some(handle);
                }
            }
        }
        Ok(())
    }

    /// Fetch a block from the backend into the query variables
    fn fetch_block(
        &mut self,
        store: &mut Store,
        request: FetchRequest,
        released: &mut Released,
    ) -> Result<u64> {
        self.pre_fetch(store)?;
        let outcome = self.backend_mut()?.fetch(&request);
        let response = match outcome {
            Ok(response) => response,
            Err(e) => return Err(self.backend_error(e, released)),
        };
        if response.rows.len() > request.max_rows as usize {
            return Err(Error::Internal(format!(
                "backend returned {} rows for a fetch of {}",
                response.rows.len(),
                request.max_rows
            )));
        }
        let num_rows = response.rows.len() as u32;
        if let Err(e) = self.store_block(store, response.rows, released) {
            tracing::warn!(error = %e, rows = num_rows, "fetched block could not be stored");
            self.fetch.fail_block();
            return Err(e);
        }
        self.fetch.buffer_row_count = num_rows;
        self.fetch.buffer_row_index = 0;
        self.fetch.has_rows_to_fetch = response.more_rows;
        tracing::debug!(rows = num_rows, more_rows = response.more_rows, "fetched block");
        Ok(response.current_position)
    }

    fn store_block(
        &self,
        store: &mut Store,
        rows: Vec<Vec<WireValue>>,
        released: &mut Released,
    ) -> Result<()> {
        for (row_index, row) in (0u32..).zip(rows) {
            if row.len() != self.query_vars.len() {
                return Err(Error::Internal(format!(
                    "row has {} values for {} columns",
                    row.len(),
                    self.query_vars.len()
                )));
            }
            for (handle, wire) in self.query_vars.iter().zip(row) {
                let handle = handle.ok_or_else(|| Error::Internal("query variable missing".into()))?;
                store
                    .vars
                    .get_mut(handle)?
                    .set_from_wire(row_index, wire, &mut store.res, &mut released.held)?;
            }
        }
        Ok(())
    }

    fn fetch_next_block(&mut self, store: &mut Store, released: &mut Released) -> Result<()> {
        let request = FetchRequest {
            orientation: FetchOrientation::Next,
            offset: 0,
            max_rows: self.fetch.fetch_array_size,
        };
        self.fetch_block(store, request, released)?;
        self.fetch.buffer_min_row = self.fetch.row_count + 1;
        Ok(())
    }

    /// Advance to the next row, returning its index in the query variables
    pub(crate) fn fetch(&mut self, store: &mut Store, released: &mut Released) -> Result<Option<u32>> {
        self.check_fetchable()?;
        if self.fetch.is_drained() {
            if self.fetch.has_rows_to_fetch {
                self.fetch_next_block(store, released)?;
            }
            if self.fetch.is_drained() {
                return Ok(None);
            }
        }
        let index = self.fetch.buffer_row_index;
        self.fetch.buffer_row_index += 1;
        self.fetch.row_count += 1;
        Ok(Some(index))
    }

    /// Hand out up to `max_rows` rows of the current block
    pub(crate) fn fetch_rows(
        &mut self,
        store: &mut Store,
        max_rows: u32,
        released: &mut Released,
    ) -> Result<FetchedRows> {
        self.check_fetchable()?;
        if self.fetch.is_drained() {
            if self.fetch.has_rows_to_fetch {
                self.fetch_next_block(store, released)?;
            }
            if self.fetch.is_drained() {
                return Ok(FetchedRows {
                    buffer_row_index: 0,
                    num_rows: 0,
                    more_rows: false,
                });
            }
        }
        let buffer_row_index = self.fetch.buffer_row_index;
        let mut num_rows = self.fetch.buffer_row_count - buffer_row_index;
        let mut more_rows = self.fetch.has_rows_to_fetch;
        if num_rows > max_rows {
            num_rows = max_rows;
            more_rows = true;
        }
        self.fetch.buffer_row_index += num_rows;
        self.fetch.row_count += u64::from(num_rows);
        Ok(FetchedRows {
            buffer_row_index,
            num_rows,
            more_rows,
        })
    }

    /// Move a scrollable statement; the next `fetch` returns the target row
    pub(crate) fn scroll(
        &mut self,
        store: &mut Store,
        orientation: FetchOrientation,
        offset: i32,
        row_count_offset: i32,
        released: &mut Released,
    ) -> Result<()> {
        self.check_fetchable()?;
        if !self.scrollable {
            return Err(Error::NotSupported(
                "statement was not prepared as scrollable".to_string(),
            ));
        }
        let state = self.fetch;
        let current = state.row_count as i64 + i64::from(row_count_offset);
        let mut fetch_offset = i64::from(offset);
        let desired_row = match orientation {
            FetchOrientation::Next => current + 1,
            FetchOrientation::Prior => current - 1,
            FetchOrientation::First => 1,
            FetchOrientation::Last => 0,
            FetchOrientation::Absolute => i64::from(offset),
            FetchOrientation::Relative => {
                let desired = current + i64::from(offset);
                fetch_offset =
                    desired - (state.buffer_min_row as i64 + i64::from(state.buffer_row_count) - 1);
                desired
            }
        };

        let block_start = state.buffer_min_row as i64;
        let block_end = block_start + i64::from(state.buffer_row_count);
        if orientation != FetchOrientation::Last
            && desired_row >= block_start
            && desired_row < block_end
        {
            self.fetch.buffer_row_index = (desired_row - block_start) as u32;
            self.fetch.row_count = (desired_row - 1) as u64;
            return Ok(());
        }

        let max_rows = if orientation == FetchOrientation::Last {
            1
        } else {
            state.fetch_array_size
        };
        let request = FetchRequest {
            orientation,
            offset: fetch_offset,
            max_rows,
        };
        let current_position = self.fetch_block(store, request, released)?;
        if orientation == FetchOrientation::Last {
            self.fetch.has_rows_to_fetch = false;
        }
        if self.fetch.buffer_row_count == 0 {
            if !matches!(orientation, FetchOrientation::First | FetchOrientation::Last) {
                return Err(Error::ScrollOutOfResultSet);
            }
            self.fetch.has_rows_to_fetch = false;
            self.fetch.row_count = 0;
            self.fetch.buffer_row_index = 0;
            self.fetch.buffer_min_row = 0;
            return Ok(());
        }
        self.fetch.row_count = current_position.saturating_sub(u64::from(self.fetch.buffer_row_count));
        self.fetch.buffer_min_row = self.fetch.row_count + 1;
        self.fetch.buffer_row_index = 0;
        tracing::trace!(?orientation, row = self.fetch.buffer_min_row, "scrolled");
        Ok(())
    }

    /// Value of column `pos` in the row most recently handed out by `fetch`
    pub(crate) fn query_value<'s>(
        &self,
        store: &'s Store,
        pos: u32,
    ) -> Result<(NativeType, Option<Value<'s>>)> {
        self.check_query()?;
        let index = self.check_query_position(pos)?;
        let handle = self.query_vars[index].ok_or(Error::NoCurrentRow)?;
        let row = self.fetch.buffer_row_index;
        if row == 0 || row > self.fetch.buffer_row_count {
            return Err(Error::NoCurrentRow);
        }
        let var = store.vars.get(handle)?;
        Ok((var.native_type(), var.value(row - 1)?))
    }
}
