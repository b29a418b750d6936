//! Placeholder binding
//!
//! Variables are bound to a statement's placeholders either by 1-based
//! position or by name. The statement holds one reference to every bound
//! variable. Direction is never declared by the caller: it comes from the
//! statement's [`BindInfo`](crate::BindInfo) table, and output placeholders
//! are populated after execution.

use crate::backend::WireBind;
use crate::constants::{error_code, NativeType, OracleType};
use crate::context::{Released, Store};
use crate::error::{Error, Result};
use crate::handle::VarHandle;
use crate::statement::Statement;
use crate::value::Value;
use crate::variable::{Var, VarOptions};

/// A variable bound to a placeholder
#[derive(Debug, Clone)]
pub(crate) struct BindEntry {
    /// 1-based position, 0 for named binds
    pub(crate) pos: u32,
    /// Name without the leading colon, for named binds
    pub(crate) name: Option<String>,
    pub(crate) var: VarHandle,
}

impl BindEntry {
    fn matches(&self, pos: u32, name: Option<&str>) -> bool {
        match (name, &self.name) {
            (Some(name), Some(own)) => own.eq_ignore_ascii_case(name),
            (None, None) => self.pos == pos,
            _ => false,
        }
    }
}

/// Normalize a placeholder name supplied by the caller
fn bind_name(name: &str) -> Result<&str> {
    let name = name.strip_prefix(':').unwrap_or(name);
    if name.is_empty() {
        return Err(Error::NotSupported("bind names cannot be empty".to_string()));
    }
    Ok(name)
}

impl Statement {
    /// Number of placeholders
    pub fn bind_count(&self) -> u32 {
        self.info.bind_info.len() as u32
    }

    /// Placeholder names, de-duplicated, in order of appearance
    pub fn bind_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.info.bind_info.len());
        for info in &self.info.bind_info {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&info.name)) {
                names.push(&info.name);
            }
        }
        names
    }

    fn check_position(&self, pos: u32) -> Result<()> {
        let count = self.bind_count();
        if pos == 0 || pos > count {
            return Err(Error::InvalidBindPosition {
                position: pos,
                count,
            });
        }
        Ok(())
    }

    fn check_name<'a>(&self, name: &'a str) -> Result<&'a str> {
        let name = bind_name(name)?;
        if !self
            .info
            .bind_info
            .iter()
            .any(|info| info.name.eq_ignore_ascii_case(name))
        {
            return Err(Error::InvalidBindName(name.to_string()));
        }
        Ok(name)
    }

    /// Bind `var` to a placeholder; the caller has already taken the new reference
    fn bind_entry(&mut self, pos: u32, name: Option<&str>, var: VarHandle, released: &mut Released) {
        match self.binds.iter_mut().find(|entry| entry.matches(pos, name)) {
            Some(entry) => released.vars.push(std::mem::replace(&mut entry.var, var)),
            None => self.binds.push(BindEntry {
                pos,
                name: name.map(str::to_string),
                var,
            }),
        }
        tracing::trace!(pos, name, var = ?var, "variable bound");
    }

    fn is_bound(&self, pos: u32, name: Option<&str>, var: VarHandle) -> bool {
        self.binds
            .iter()
            .any(|entry| entry.matches(pos, name) && entry.var == var)
    }

    /// Bind a variable by 1-based position
    pub(crate) fn bind_by_pos(
        &mut self,
        store: &mut Store,
        pos: u32,
        var: VarHandle,
        released: &mut Released,
    ) -> Result<()> {
        self.check_open()?;
        self.check_position(pos)?;
        store.vars.get(var)?;
        if self.is_bound(pos, None, var) {
            return Ok(());
        }
        store.vars.add_ref(var)?;
        self.bind_entry(pos, None, var, released);
        Ok(())
    }

    /// Bind a variable by placeholder name
    pub(crate) fn bind_by_name(
        &mut self,
        store: &mut Store,
        name: &str,
        var: VarHandle,
        released: &mut Released,
    ) -> Result<()> {
        self.check_open()?;
        let name = self.check_name(name)?;
        store.vars.get(var)?;
        if self.is_bound(0, Some(name), var) {
            return Ok(());
        }
        store.vars.add_ref(var)?;
        self.bind_entry(0, Some(name), var, released);
        Ok(())
    }

    /// Bind a single value by position through a variable owned by the statement
    pub(crate) fn bind_value_by_pos(
        &mut self,
        store: &mut Store,
        pos: u32,
        value: Value<'_>,
        released: &mut Released,
    ) -> Result<()> {
        self.check_open()?;
        self.check_position(pos)?;
        let var = bind_value_var(store, value)?;
        self.bind_entry(pos, None, var, released);
        Ok(())
    }

    /// Bind a single value by name through a variable owned by the statement
    pub(crate) fn bind_value_by_name(
        &mut self,
        store: &mut Store,
        name: &str,
        value: Value<'_>,
        released: &mut Released,
    ) -> Result<()> {
        self.check_open()?;
        let name = self.check_name(name)?;
        let var = bind_value_var(store, value)?;
        self.bind_entry(0, Some(name), var, released);
        Ok(())
    }

    /// Variable bound to the placeholder at `pos`, by position or by its name
    pub(crate) fn resolve_bind(&self, pos: u32) -> Option<VarHandle> {
        let by_pos = self.binds.iter().find(|entry| entry.name.is_none() && entry.pos == pos);
        by_pos
            .or_else(|| {
                let info = self.info.bind_info.get(pos.checked_sub(1)? as usize)?;
                self.binds.iter().find(|entry| {
                    entry
                        .name
                        .as_deref()
                        .is_some_and(|name| name.eq_ignore_ascii_case(&info.name))
                })
            })
            .map(|entry| entry.var)
    }

    /// Encode every placeholder's input values
    pub(crate) fn wire_binds(&self, store: &Store, iterations: u32) -> Result<Vec<WireBind>> {
        (1u32..)
            .zip(self.info.bind_info.iter())
            .map(|(position, placeholder)| {
                let handle = self.resolve_bind(position).ok_or_else(|| {
                    Error::oracle(error_code::NOT_ALL_VARIABLES_BOUND, "not all variables bound")
                })?;
                let var = store.vars.get(handle)?;
                let count = if var.is_array() {
                    var.num_elements()
                } else {
                    iterations
                };
                let values = if placeholder.direction.is_input() && !placeholder.is_return_bind {
                    (0..count)
                        .map(|index| var.to_wire(index, &store.res))
                        .collect::<Result<Vec<_>>>()?
                } else {
                    Vec::new()
                };
                Ok(WireBind {
                    position,
                    name: placeholder.name.clone(),
                    direction: placeholder.direction,
                    oracle_type: var.oracle_type(),
                    max_size: var.size_in_bytes(),
                    is_array: var.is_array(),
                    values,
                })
            })
            .collect()
    }

    /// Every bound variable must hold one element per iteration
    pub(crate) fn check_bind_array_sizes(&self, store: &Store, iterations: u32) -> Result<()> {
        for entry in &self.binds {
            let var = store.vars.get(entry.var)?;
            if var.max_array_size() < iterations {
                return Err(Error::ArraySizeTooSmall {
                    size: var.max_array_size(),
                });
            }
        }
        Ok(())
    }
}

/// Create the one-element variable behind a value bind
fn bind_value_var(store: &mut Store, value: Value<'_>) -> Result<VarHandle> {
    let options = match value {
        Value::Int64(_) | Value::Uint64(_) | Value::Float(_) | Value::Double(_) => {
            VarOptions::new(OracleType::Number, value.native_type())
        }
        Value::Bytes(b) => VarOptions::new(OracleType::Varchar, NativeType::Bytes)
            .size(b.len() as u32)
            .size_is_bytes(true),
        Value::Timestamp(_) => VarOptions::new(OracleType::Timestamp, NativeType::Timestamp),
        Value::IntervalDs(_) => VarOptions::new(OracleType::IntervalDs, NativeType::IntervalDs),
        Value::IntervalYm(_) => VarOptions::new(OracleType::IntervalYm, NativeType::IntervalYm),
        Value::Boolean(_) => VarOptions::new(OracleType::Boolean, NativeType::Boolean),
        Value::Object(h) => VarOptions::new(OracleType::Object, NativeType::Object)
            .object_type(store.res.objects.get(h)?.object_type().clone()),
        other => {
            return Err(Error::UnhandledConversion {
                oracle_type: OracleType::Varchar,
                native_type: other.native_type(),
            })
        }
    };
    let mut var = Var::new(options, &store.res.config)?;
    if let Value::Object(h) = value {
        store.res.objects.add_ref(h)?;
    }
    if let Err(e) = var.set_value(0, value) {
        if let Value::Object(h) = value {
            store.res.objects.release(h)?;
        }
        return Err(e);
    }
    Ok(store.vars.insert(var))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::Config;
    use crate::handle::HandleTable;

    fn entry(pos: u32, name: Option<&str>) -> BindEntry {
        let mut vars = HandleTable::new("variable");
        let options = VarOptions::new(OracleType::Number, NativeType::Int64);
        let var = vars.insert(Var::new(options, &Config::default()).unwrap());
        BindEntry {
            pos,
            name: name.map(str::to_string),
            var,
        }
    }

    #[test]
    fn test_bind_name_normalization() {
        assert_eq!(bind_name(":emp_id").unwrap(), "emp_id");
        assert_eq!(bind_name("EMP_ID").unwrap(), "EMP_ID");
        assert!(matches!(bind_name(":"), Err(Error::NotSupported(_))));
        assert!(matches!(bind_name(""), Err(Error::NotSupported(_))));
    }

    #[test]
    fn test_entry_matching() {
        let named = entry(0, Some("Emp_Id"));
        assert!(named.matches(0, Some("EMP_ID")));
        assert!(!named.matches(1, None));

        let positional = entry(2, None);
        assert!(positional.matches(2, None));
        assert!(!positional.matches(1, None));
        assert!(!positional.matches(0, Some("EMP_ID")));
    }
}
