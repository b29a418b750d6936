#![warn(missing_docs)]

//! # oracle-vars
//!
//! Variable binding and type marshaling for Oracle statements.
//!
//! This crate sits between an application and a SQL-processing backend. It
//! owns typed, array-capable buffers ("variables") that are bound to a
//! statement's placeholders or defined as receivers of its result columns,
//! converts between host values and Oracle's wire formats, and tracks the
//! lifecycle of everything a value can refer to: LOBs, row identifiers,
//! object instances and nested statements.
//!
//! ## Features
//!
//! - **Typed variables** - fixed-stride or dynamic element storage with null
//!   indicators, for every Oracle column type
//! - **Exact conversions** - packed Oracle NUMBER, DATE/TIMESTAMP, intervals,
//!   IEEE binary floats and the 18-character ROWID form
//! - **Array DML** - `execute_many` with fail-fast or batch error handling and
//!   per-row counts
//! - **Fetching** - block fetches, scrollable cursors, nested and implicit
//!   result sets
//! - **Handles** - reference-counted, generation-checked handles for every
//!   resource, with a per-context last-error record
//!
//! ## Quick Start
//!
//! ```rust
//! use oracle_vars::{Context, NativeType, OracleType, Value, VarOptions};
//!
//! let mut ctx = Context::new();
//!
//! // an array of three NUMBER values read as 64-bit integers
//! let ids = ctx
//!     .new_var(VarOptions::new(OracleType::Number, NativeType::Int64).max_array_size(3))
//!     .unwrap();
//! for (i, id) in [10i64, 20, 30].into_iter().enumerate() {
//!     ctx.set_value(ids, i as u32, Value::Int64(id)).unwrap();
//! }
//! assert_eq!(ctx.value(ids, 1).unwrap(), Some(Value::Int64(20)));
//!
//! ctx.set_null(ids, 2).unwrap();
//! assert!(ctx.var(ids).unwrap().is_null(2).unwrap());
//! ```
//!
//! Statements are supplied by a [`StatementBackend`] implementation and then
//! driven through the [`Context`]:
//!
//! ```rust,ignore
//! let stmt = ctx.prepare(backend);
//! ctx.bind_by_name(stmt, "id", ids)?;
//! ctx.execute_many(stmt, ExecMode::new().with_batch_errors(), 3)?;
//! for error in ctx.batch_errors(stmt, 3)? {
//!     println!("{error}");
//! }
//! ```
//!
//! ## Data Types
//!
//! | Oracle Type | Native Types |
//! |-------------|--------------|
//! | NUMBER | `Int64`, `Uint64`, `Double`, `Bytes` (decimal text) |
//! | BINARY_FLOAT / BINARY_DOUBLE | `Float` / `Double` |
//! | VARCHAR2, CHAR, NVARCHAR2, NCHAR, RAW, LONG | `Bytes` |
//! | DATE, TIMESTAMP [WITH [LOCAL] TIME ZONE] | `Timestamp` |
//! | INTERVAL DAY TO SECOND / YEAR TO MONTH | `IntervalDs` / `IntervalYm` |
//! | CLOB, NCLOB, BLOB, BFILE | `Lob` |
//! | ROWID | `Rowid`, `Bytes` |
//! | Named object types and collections | `Object` |
//! | REF CURSOR | `Stmt` |
//! | BOOLEAN | `Boolean` |

pub mod backend;
pub mod batch;
mod bind;
pub mod config;
pub mod constants;
pub mod context;
pub mod cursor;
pub mod dbobject;
pub mod error;
pub mod handle;
pub mod implicit;
pub mod statement;
pub mod types;
pub mod value;
pub mod variable;

// Re-export commonly used types
pub use backend::{
    ExecuteRequest, ExecuteResponse, FetchRequest, FetchResponse, OutBind, ReturningBind,
    StatementBackend, WireBind, WireValue,
};
pub use batch::BatchError;
pub use config::Config;
pub use constants::{BindDirection, ExecMode, FetchOrientation, NativeType, OracleType, StatementType};
pub use context::Context;
pub use cursor::FetchedRows;
pub use dbobject::{AttrValue, CollectionType, DbObject, DbObjectAttr, DbObjectType};
pub use error::{DbError, Error, ErrorInfo, ErrorKind, Result};
pub use handle::{Handle, HandleTable, LobHandle, ObjectHandle, RowidHandle, StmtHandle, VarHandle};
pub use statement::{BindInfo, ColumnInfo, Statement, StatementInfo};
pub use types::{IntervalDs, IntervalYm, Lob, OracleNumber, RowId, Timestamp};
pub use value::Value;
pub use variable::{Var, VarOptions};
