//! Scripted statement backends shared by the integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use oracle_vars::types::{decode_oracle_number, encode_i64};
use oracle_vars::{
    BindInfo, ColumnInfo, DbError, ExecuteRequest, ExecuteResponse, FetchOrientation,
    FetchRequest, FetchResponse, OracleType, OutBind, ReturningBind, RowId, StatementBackend,
    StatementInfo, StatementType, WireValue,
};

/// A cell of a scripted result set
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Number(i64),
    Text(String),
}

impl Cell {
    pub fn text(s: &str) -> Self {
        Cell::Text(s.to_string())
    }

    pub fn to_wire(&self) -> WireValue {
        match self {
            Cell::Null => WireValue::Null,
            Cell::Number(n) => WireValue::from(encode_i64(*n).unwrap()),
            Cell::Text(s) => WireValue::from(s.as_bytes()),
        }
    }
}

/// Values seen by the backend for one execution, per placeholder
#[derive(Debug, Clone, Default)]
pub struct ExecuteLog {
    pub iterations: u32,
    pub binds: Vec<Vec<Option<Vec<u8>>>>,
}

pub type Log<T> = Rc<RefCell<Vec<T>>>;

/// Route engine logs to the test output, filtered by `RUST_LOG`
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

fn record(request: &ExecuteRequest) -> ExecuteLog {
    ExecuteLog {
        iterations: request.iterations,
        binds: request
            .binds
            .iter()
            .map(|bind| {
                bind.values
                    .iter()
                    .map(|value| match value {
                        WireValue::Data(data) => Some(data.to_vec()),
                        _ => None,
                    })
                    .collect()
            })
            .collect(),
    }
}

/// Decode a NUMBER sent by the engine
pub fn number(data: &Option<Vec<u8>>) -> i64 {
    decode_oracle_number(data.as_deref().unwrap())
        .unwrap()
        .to_i64()
        .unwrap()
}

/// `select id, name from t` over a fixed set of rows
///
/// Positions follow a server-side scrollable cursor: the cursor sits on the
/// last row returned and every fetch returns a contiguous run of rows
/// starting at the target row.
#[derive(Debug)]
pub struct QueryBackend {
    info: StatementInfo,
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<Cell>>,
    position: u64,
    pub fetches: Log<FetchRequest>,
}

impl QueryBackend {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self {
            info: StatementInfo::new(StatementType::Select),
            columns: vec![
                ColumnInfo::new("ID", OracleType::Number).with_precision(9, 0).not_null(),
                ColumnInfo::new("NAME", OracleType::Varchar).with_size(20),
            ],
            rows,
            position: 0,
            fetches: Rc::default(),
        }
    }

    /// Rows `(n, "row n")` for n in 1..=count
    pub fn numbered(count: i64) -> Self {
        Self::new(
            (1..=count)
                .map(|n| vec![Cell::Number(n), Cell::Text(format!("row {n}"))])
                .collect(),
        )
    }

    pub fn with_columns(mut self, columns: Vec<ColumnInfo>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_binds(mut self, binds: Vec<BindInfo>) -> Self {
        for bind in binds {
            self.info = self.info.with_bind(bind);
        }
        self
    }
}

impl StatementBackend for QueryBackend {
    fn info(&self) -> &StatementInfo {
        &self.info
    }

    fn query_columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    fn execute(&mut self, _request: &ExecuteRequest) -> Result<ExecuteResponse, DbError> {
        self.position = 0;
        Ok(ExecuteResponse {
            columns: self.columns.clone(),
            ..ExecuteResponse::default()
        })
    }

    fn fetch(&mut self, request: &FetchRequest) -> Result<FetchResponse, DbError> {
        self.fetches.borrow_mut().push(*request);
        let count = self.rows.len() as i64;
        let current = self.position as i64;
        let target = match request.orientation {
            FetchOrientation::Next => current + 1,
            FetchOrientation::Prior => current - 1,
            FetchOrientation::First => 1,
            FetchOrientation::Last => count,
            FetchOrientation::Absolute => request.offset,
            FetchOrientation::Relative => current + request.offset,
        };
        if target < 1 || target > count {
            return Ok(FetchResponse {
                current_position: self.position,
                ..FetchResponse::default()
            });
        }
        let last = (target + i64::from(request.max_rows) - 1).min(count);
        self.position = last as u64;
        Ok(FetchResponse {
            rows: self.rows[(target - 1) as usize..last as usize]
                .iter()
                .map(|row| row.iter().map(Cell::to_wire).collect())
                .collect(),
            more_rows: last < count,
            current_position: last as u64,
        })
    }

    fn next_implicit_result(&mut self) -> Result<Option<Box<dyn StatementBackend>>, DbError> {
        Ok(None)
    }
}

/// `insert into t (id, name) values (:id, :name)` with scripted row failures
#[derive(Debug)]
pub struct InsertBackend {
    info: StatementInfo,
    failures: Vec<(u32, DbError)>,
    error: Option<DbError>,
    rowid: Option<RowId>,
    pub executions: Log<ExecuteLog>,
}

impl InsertBackend {
    pub fn new() -> Self {
        Self {
            info: StatementInfo::new(StatementType::Insert)
                .with_bind(BindInfo::input("ID"))
                .with_bind(BindInfo::input("NAME")),
            failures: Vec::new(),
            error: None,
            rowid: None,
            executions: Rc::default(),
        }
    }

    /// Fail the row at 0-based `offset`
    pub fn failing_row(mut self, offset: u32, error: DbError) -> Self {
        self.failures.push((offset, error));
        self
    }

    /// Fail every execution with `error`
    pub fn failing_call(mut self, error: DbError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_rowid(mut self, rowid: RowId) -> Self {
        self.rowid = Some(rowid);
        self
    }
}

impl StatementBackend for InsertBackend {
    fn info(&self) -> &StatementInfo {
        &self.info
    }

    fn query_columns(&self) -> &[ColumnInfo] {
        &[]
    }

    fn execute(&mut self, request: &ExecuteRequest) -> Result<ExecuteResponse, DbError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        self.executions.borrow_mut().push(record(request));
        let mut row_outcomes = Vec::new();
        for offset in 0..request.iterations {
            match self.failures.iter().find(|(row, _)| *row == offset) {
                Some((_, error)) => {
                    row_outcomes.push(Err(error.clone()));
                    if !request.mode.batch_errors {
                        break;
                    }
                }
                None => row_outcomes.push(Ok(1)),
            }
        }
        Ok(ExecuteResponse {
            row_outcomes,
            last_rowid: self.rowid,
            ..ExecuteResponse::default()
        })
    }

    fn fetch(&mut self, _request: &FetchRequest) -> Result<FetchResponse, DbError> {
        Err(DbError::new(1002, "fetch out of sequence"))
    }

    fn next_implicit_result(&mut self) -> Result<Option<Box<dyn StatementBackend>>, DbError> {
        Ok(None)
    }
}

/// `update t set name = upper(name) where id = :id returning name into :name`
///
/// Iteration `i` updates `i + 1` rows.
#[derive(Debug)]
pub struct ReturningBackend {
    info: StatementInfo,
}

impl ReturningBackend {
    pub fn new() -> Self {
        Self {
            info: StatementInfo::new(StatementType::Update)
                .with_bind(BindInfo::input("ID"))
                .with_bind(BindInfo::returning("NAME")),
        }
    }
}

impl StatementBackend for ReturningBackend {
    fn info(&self) -> &StatementInfo {
        &self.info
    }

    fn query_columns(&self) -> &[ColumnInfo] {
        &[]
    }

    fn execute(&mut self, request: &ExecuteRequest) -> Result<ExecuteResponse, DbError> {
        let ids = &request.binds[0].values;
        let rows = ids
            .iter()
            .enumerate()
            .map(|(i, _)| {
                (0..=i)
                    .map(|r| WireValue::from(format!("NAME {i}.{r}").into_bytes()))
                    .collect()
            })
            .collect::<Vec<Vec<_>>>();
        Ok(ExecuteResponse {
            row_outcomes: rows.iter().map(|r| Ok(r.len() as u64)).collect(),
            returning: vec![ReturningBind { position: 2, rows }],
            ..ExecuteResponse::default()
        })
    }

    fn fetch(&mut self, _request: &FetchRequest) -> Result<FetchResponse, DbError> {
        Err(DbError::new(1002, "fetch out of sequence"))
    }

    fn next_implicit_result(&mut self) -> Result<Option<Box<dyn StatementBackend>>, DbError> {
        Ok(None)
    }
}

/// A PL/SQL block with scripted OUT values and implicit results
#[derive(Debug)]
pub struct PlsqlBackend {
    info: StatementInfo,
    out: Vec<(u32, OutValues)>,
    implicit: Vec<Box<dyn StatementBackend>>,
    pending: Vec<Box<dyn StatementBackend>>,
    pub executions: Log<ExecuteLog>,
}

/// Computes the OUT values of one placeholder from the request
pub struct OutValues(Box<dyn Fn(&ExecuteRequest) -> Vec<WireValue>>);

impl std::fmt::Debug for OutValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OutValues")
    }
}

impl PlsqlBackend {
    pub fn new(binds: Vec<BindInfo>) -> Self {
        let mut info = StatementInfo::new(StatementType::Begin);
        for bind in binds {
            info = info.with_bind(bind);
        }
        Self {
            info,
            out: Vec::new(),
            implicit: Vec::new(),
            pending: Vec::new(),
            executions: Rc::default(),
        }
    }

    /// Produce the OUT values of placeholder `position` from the request
    pub fn out_values(
        mut self,
        position: u32,
        values: impl Fn(&ExecuteRequest) -> Vec<WireValue> + 'static,
    ) -> Self {
        self.out.push((position, OutValues(Box::new(values))));
        self
    }

    /// Hand back `result` through `dbms_sql.return_result`
    pub fn implicit_result(mut self, result: impl StatementBackend + 'static) -> Self {
        self.pending.push(Box::new(result));
        self
    }
}

impl StatementBackend for PlsqlBackend {
    fn info(&self) -> &StatementInfo {
        &self.info
    }

    fn query_columns(&self) -> &[ColumnInfo] {
        &[]
    }

    fn execute(&mut self, request: &ExecuteRequest) -> Result<ExecuteResponse, DbError> {
        self.executions.borrow_mut().push(record(request));
        self.implicit = std::mem::take(&mut self.pending);
        self.implicit.reverse();
        Ok(ExecuteResponse {
            row_outcomes: vec![Ok(0)],
            out_values: self
                .out
                .iter()
                .map(|(position, values)| OutBind {
                    position: *position,
                    values: (values.0)(request),
                })
                .collect(),
            ..ExecuteResponse::default()
        })
    }

    fn fetch(&mut self, _request: &FetchRequest) -> Result<FetchResponse, DbError> {
        Err(DbError::new(1002, "fetch out of sequence"))
    }

    fn next_implicit_result(&mut self) -> Result<Option<Box<dyn StatementBackend>>, DbError> {
        Ok(self.implicit.pop())
    }
}
