//! Implicit results support for PL/SQL blocks
//!
//! A PL/SQL block can hand result sets back to the caller with
//! `dbms_sql.return_result()`. The backend exposes them after execution as
//! nested statements; each call to
//! [`Context::next_implicit_result`](crate::Context::next_implicit_result)
//! wraps the next one in a new statement handle, in discovery order, and
//! returns `None` once they are exhausted.
//!
//! ```
//! use oracle_vars::{BindInfo, StatementInfo, StatementType};
//!
//! // the placeholder table of `begin open :c for select ...; end;`
//! let info = StatementInfo::new(StatementType::Begin).with_bind(BindInfo::output("C"));
//! assert!(info.is_plsql());
//! ```

use crate::context::{Released, Store};
use crate::error::{Error, Result};
use crate::handle::StmtHandle;
use crate::statement::Statement;

impl Statement {
    /// Wrap the next implicit result in a new statement handle
    pub(crate) fn next_implicit_result(
        &mut self,
        store: &mut Store,
        released: &mut Released,
    ) -> Result<Option<StmtHandle>> {
        self.check_open()?;
        if !self.executed {
            return Err(Error::NotExecuted);
        }
        let outcome = self.backend_mut()?.next_implicit_result();
        let backend = match outcome {
            Ok(Some(backend)) => backend,
            Ok(None) => return Ok(None),
            Err(e) => return Err(self.backend_error(e, released)),
        };
        let stmt = Statement::from_cursor(backend, &store.res.config);
        let columns = stmt.num_query_columns();
        let handle = store.res.stmts.insert(stmt);
        tracing::debug!(stmt = ?handle, columns, "implicit result discovered");
        Ok(Some(handle))
    }
}
