//! Value descriptors
//!
//! [`Value`] is the closed set of host values a variable element can hold.
//! Byte values borrow from the owning variable, so a value read from a
//! variable is only valid while the variable is borrowed. Null is expressed
//! as `Option::None` by every reader.

use crate::constants::NativeType;
use crate::error::{Error, Result};
use crate::handle::{LobHandle, ObjectHandle, RowidHandle, StmtHandle};
use crate::types::{IntervalDs, IntervalYm, Timestamp};

/// A non-null value of one native type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit unsigned integer
    Uint64(u64),
    /// Single-precision float
    Float(f32),
    /// Double-precision float
    Double(f64),
    /// Byte string (character data is UTF-8 encoded)
    Bytes(&'a [u8]),
    /// Date or timestamp
    Timestamp(Timestamp),
    /// Interval day to second
    IntervalDs(IntervalDs),
    /// Interval year to month
    IntervalYm(IntervalYm),
    /// Boolean
    Boolean(bool),
    /// LOB stream
    Lob(LobHandle),
    /// Row identifier
    Rowid(RowidHandle),
    /// Object or collection instance
    Object(ObjectHandle),
    /// Statement (ref cursor)
    Stmt(StmtHandle),
}

macro_rules! accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("Get the `", stringify!($variant), "` payload")]
        pub fn $name(&self) -> Result<$ty> {
            match self {
                Value::$variant(v) => Ok(*v),
                other => Err(Error::TypeMismatch {
                    expected: NativeType::$variant,
                    actual: other.native_type(),
                }),
            }
        }
    };
}

impl<'a> Value<'a> {
    /// Native type of the value
    pub fn native_type(&self) -> NativeType {
        match self {
            Value::Int64(_) => NativeType::Int64,
            Value::Uint64(_) => NativeType::Uint64,
            Value::Float(_) => NativeType::Float,
            Value::Double(_) => NativeType::Double,
            Value::Bytes(_) => NativeType::Bytes,
            Value::Timestamp(_) => NativeType::Timestamp,
            Value::IntervalDs(_) => NativeType::IntervalDs,
            Value::IntervalYm(_) => NativeType::IntervalYm,
            Value::Boolean(_) => NativeType::Boolean,
            Value::Lob(_) => NativeType::Lob,
            Value::Rowid(_) => NativeType::Rowid,
            Value::Object(_) => NativeType::Object,
            Value::Stmt(_) => NativeType::Stmt,
        }
    }

    accessor!(as_i64, Int64, i64);
    accessor!(as_u64, Uint64, u64);
    accessor!(as_f32, Float, f32);
    accessor!(as_f64, Double, f64);
    accessor!(as_bytes, Bytes, &'a [u8]);
    accessor!(as_timestamp, Timestamp, Timestamp);
    accessor!(as_interval_ds, IntervalDs, IntervalDs);
    accessor!(as_interval_ym, IntervalYm, IntervalYm);
    accessor!(as_bool, Boolean, bool);
    accessor!(as_lob, Lob, LobHandle);
    accessor!(as_rowid, Rowid, RowidHandle);
    accessor!(as_object, Object, ObjectHandle);
    accessor!(as_stmt, Stmt, StmtHandle);

    /// Get a byte value as UTF-8 text
    pub fn as_str(&self) -> Result<&'a str> {
        let bytes = self.as_bytes()?;
        std::str::from_utf8(bytes)
            .map_err(|e| Error::NotSupported(format!("value is not valid UTF-8: {e}")))
    }
}

impl From<i64> for Value<'_> {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<i32> for Value<'_> {
    fn from(v: i32) -> Self {
        Value::Int64(v as i64)
    }
}

impl From<u64> for Value<'_> {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Bytes(v.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(v: &'a [u8]) -> Self {
        Value::Bytes(v)
    }
}

impl From<Timestamp> for Value<'_> {
    fn from(v: Timestamp) -> Self {
        Value::Timestamp(v)
    }
}

impl From<IntervalDs> for Value<'_> {
    fn from(v: IntervalDs) -> Self {
        Value::IntervalDs(v)
    }
}

impl From<IntervalYm> for Value<'_> {
    fn from(v: IntervalYm) -> Self {
        Value::IntervalYm(v)
    }
}

impl From<LobHandle> for Value<'_> {
    fn from(v: LobHandle) -> Self {
        Value::Lob(v)
    }
}

impl From<RowidHandle> for Value<'_> {
    fn from(v: RowidHandle) -> Self {
        Value::Rowid(v)
    }
}

impl From<ObjectHandle> for Value<'_> {
    fn from(v: ObjectHandle) -> Self {
        Value::Object(v)
    }
}

impl From<StmtHandle> for Value<'_> {
    fn from(v: StmtHandle) -> Self {
        Value::Stmt(v)
    }
}
