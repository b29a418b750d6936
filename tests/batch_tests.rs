//! Tests for multi-row execution
//!
//! These tests verify the fail-fast and batch error policies of
//! `execute_many`, per-row counts, and the error records left behind.

mod common;

use common::{number, InsertBackend};
use oracle_vars::{
    Context, DbError, Error, ErrorKind, ExecMode, NativeType, OracleType, StmtHandle, Value,
    VarOptions,
};

const UNIQUE: u32 = 1;
const PRECISION: u32 = 1438;

/// Prepare the insert with `rows` bound rows
fn prepare(ctx: &mut Context, backend: InsertBackend, rows: u32) -> StmtHandle {
    common::init_logging();
    let stmt = ctx.prepare(backend);
    let ids = ctx
        .new_var(VarOptions::new(OracleType::Number, NativeType::Int64).max_array_size(rows))
        .unwrap();
    let names = ctx
        .new_var(
            VarOptions::new(OracleType::Varchar, NativeType::Bytes)
                .size(10)
                .max_array_size(rows),
        )
        .unwrap();
    for row in 0..rows {
        ctx.set_value(ids, row, Value::Int64(i64::from(row) + 1)).unwrap();
        ctx.set_value(names, row, Value::from("name")).unwrap();
    }
    ctx.bind_by_name(stmt, "ID", ids).unwrap();
    ctx.bind_by_name(stmt, "NAME", names).unwrap();
    ctx.release_var(ids).unwrap();
    ctx.release_var(names).unwrap();
    stmt
}

fn failing_backend() -> InsertBackend {
    InsertBackend::new()
        .failing_row(1, DbError::new(UNIQUE, "unique constraint (APP.PK_T) violated"))
        .failing_row(
            2,
            DbError::new(PRECISION, "value larger than specified precision allowed"),
        )
}

mod fail_fast_tests {
    use super::*;

    #[test]
    fn test_first_row_error_fails_the_call() {
        let mut ctx = Context::new();
        let stmt = prepare(&mut ctx, failing_backend(), 4);

        let err = ctx.execute_many(stmt, ExecMode::new(), 4).unwrap_err();
        let db = err.db_error().unwrap();
        assert_eq!(db.code, UNIQUE);
        assert_eq!(db.offset, 1);
        assert_eq!(ctx.batch_error_count(stmt).unwrap(), 0);
        assert_eq!(ctx.row_count(stmt).unwrap(), 1);

        let info = ctx.last_error().unwrap();
        assert_eq!(info.fn_name, "execute_many");
        assert_eq!(info.code, UNIQUE);
        assert_eq!(info.offset, 1);
        assert!(info.message.starts_with("ORA-00001"));
    }

    #[test]
    fn test_all_rows_sent() {
        let mut ctx = Context::new();
        let backend = InsertBackend::new();
        let log = backend.executions.clone();
        let stmt = prepare(&mut ctx, backend, 3);

        ctx.execute_many(stmt, ExecMode::new().with_row_counts(), 3).unwrap();
        let log = log.borrow();
        assert_eq!(log[0].iterations, 3);
        let ids: Vec<i64> = log[0].binds[0].iter().map(number).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(ctx.row_counts(stmt).unwrap(), vec![1, 1, 1]);
        assert_eq!(ctx.row_count(stmt).unwrap(), 3);
    }
}

mod batch_error_tests {
    use super::*;

    #[test]
    fn test_errors_recorded_per_row() {
        let mut ctx = Context::new();
        let stmt = prepare(&mut ctx, failing_backend(), 4);
        let mode = ExecMode::new().with_batch_errors().with_row_counts();

        ctx.execute_many(stmt, mode, 4).unwrap();
        assert_eq!(ctx.batch_error_count(stmt).unwrap(), 2);
        let errors = ctx.batch_errors(stmt, 2).unwrap();
        assert_eq!(errors[0].row_offset, 1);
        assert_eq!(errors[0].code, UNIQUE);
        assert_eq!(errors[1].row_offset, 2);
        assert_eq!(errors[1].code, PRECISION);
        assert_eq!(
            errors[1].to_string(),
            "Row 2: ORA-01438: value larger than specified precision allowed"
        );
        assert_eq!(ctx.row_counts(stmt).unwrap(), vec![1, 0, 0, 1]);
        assert_eq!(ctx.row_count(stmt).unwrap(), 2);
    }

    #[test]
    fn test_capacity_too_small() {
        let mut ctx = Context::new();
        let stmt = prepare(&mut ctx, failing_backend(), 4);
        ctx.execute_many(stmt, ExecMode::new().with_batch_errors(), 4)
            .unwrap();
        let err = ctx.batch_errors(stmt, 1).unwrap_err();
        assert!(matches!(err, Error::ArraySizeTooSmall { size: 1 }));
    }

    #[test]
    fn test_errors_cleared_on_next_execute() {
        let mut ctx = Context::new();
        let stmt = prepare(&mut ctx, failing_backend(), 4);
        ctx.execute_many(stmt, ExecMode::new().with_batch_errors(), 4)
            .unwrap();
        ctx.execute_many(stmt, ExecMode::new().with_batch_errors(), 1)
            .unwrap();
        assert_eq!(ctx.batch_error_count(stmt).unwrap(), 0);
        assert!(ctx.batch_errors(stmt, 0).unwrap().is_empty());
    }

    #[test]
    fn test_row_counts_need_the_mode() {
        let mut ctx = Context::new();
        let stmt = prepare(&mut ctx, InsertBackend::new(), 2);
        ctx.execute_many(stmt, ExecMode::new(), 2).unwrap();
        let err = ctx.row_counts(stmt).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Database);
        assert_eq!(err.db_error().map(|e| e.code), Some(24349));
    }
}
