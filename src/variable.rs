//! Typed variable buffers
//!
//! A [`Var`] is an array of `max_array_size` element slots of one declared
//! shape: database type, native type, per-element byte capacity and
//! array-ness. Byte values live in a backing store owned by the variable,
//! either one contiguous block of `max_array_size * size_in_bytes` bytes or,
//! for LONG types and elements above
//! [`Config::max_basic_buffer_size`](crate::Config), one growable buffer per
//! element.
//!
//! Variables are created and mutated through [`Context`](crate::Context);
//! the context hands out `&Var` for reading.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::config::Config;
use crate::constants::{csfrm, NativeType, OracleType, NUMBER_AS_TEXT_CHARS};
use crate::context::Resources;
use crate::backend::WireValue;
use crate::dbobject::DbObjectType;
use crate::error::{Error, Result};
use crate::handle::{LobHandle, ObjectHandle, RowidHandle, StmtHandle};
use crate::statement::Statement;
use crate::types::{
    decode_binary_double, decode_binary_float, decode_date, decode_interval_ds,
    decode_interval_ym, decode_oracle_number, decode_rowid, decode_timestamp,
    decode_timestamp_tz, encode_binary_double, encode_binary_float, encode_date, encode_f32,
    encode_f64, encode_i64, encode_interval_ds, encode_interval_ym, encode_oracle_number,
    encode_timestamp, encode_timestamp_tz, encode_u64, parse_rowid_string, IntervalDs,
    IntervalYm, Lob, Timestamp, ROWID_STRING_LENGTH,
};
use crate::value::Value;

/// Declared shape of a new variable
///
/// ```
/// use oracle_vars::{NativeType, OracleType, VarOptions};
///
/// let options = VarOptions::new(OracleType::Varchar, NativeType::Bytes)
///     .max_array_size(10)
///     .size(30);
/// assert_eq!(options.max_array_size, 10);
/// ```
#[derive(Debug, Clone)]
pub struct VarOptions {
    /// Database type
    pub oracle_type: OracleType,
    /// Host type of the element values
    pub native_type: NativeType,
    /// Number of element slots (at least 1)
    pub max_array_size: u32,
    /// Element size in characters (character types) or bytes
    pub size: u32,
    /// Interpret `size` as bytes for character types
    pub size_is_bytes: bool,
    /// PL/SQL index-by array bind
    pub is_array: bool,
    /// Type of the object instances held (OBJECT variables)
    pub object_type: Option<Arc<DbObjectType>>,
}

impl VarOptions {
    /// Options for a single-element variable
    pub fn new(oracle_type: OracleType, native_type: NativeType) -> Self {
        Self {
            oracle_type,
            native_type,
            max_array_size: 1,
            size: 0,
            size_is_bytes: false,
            is_array: false,
            object_type: None,
        }
    }

    /// Set the number of element slots
    pub fn max_array_size(mut self, max_array_size: u32) -> Self {
        self.max_array_size = max_array_size;
        self
    }

    /// Set the element size
    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Interpret the element size as bytes
    pub fn size_is_bytes(mut self, size_is_bytes: bool) -> Self {
        self.size_is_bytes = size_is_bytes;
        self
    }

    /// Mark the variable as a PL/SQL array
    pub fn array(mut self, is_array: bool) -> Self {
        self.is_array = is_array;
        self
    }

    /// Set the object type of an OBJECT variable
    pub fn object_type(mut self, object_type: Arc<DbObjectType>) -> Self {
        self.object_type = Some(object_type);
        self
    }
}

/// Handle held by an element slot; the slot owns one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeldHandle {
    Lob(LobHandle),
    Rowid(RowidHandle),
    Object(ObjectHandle),
    Stmt(StmtHandle),
}

impl HeldHandle {
    pub(crate) fn of(value: &Value<'_>) -> Option<Self> {
        match *value {
            Value::Lob(h) => Some(HeldHandle::Lob(h)),
            Value::Rowid(h) => Some(HeldHandle::Rowid(h)),
            Value::Object(h) => Some(HeldHandle::Object(h)),
            Value::Stmt(h) => Some(HeldHandle::Stmt(h)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Null,
    Int64(i64),
    Uint64(u64),
    Float(f32),
    Double(f64),
    Bytes(u32),
    Timestamp(Timestamp),
    IntervalDs(IntervalDs),
    IntervalYm(IntervalYm),
    Boolean(bool),
    Lob(LobHandle),
    Rowid(RowidHandle),
    Object(ObjectHandle),
    Stmt(StmtHandle),
}

impl Slot {
    fn held(&self) -> Option<HeldHandle> {
        match *self {
            Slot::Lob(h) => Some(HeldHandle::Lob(h)),
            Slot::Rowid(h) => Some(HeldHandle::Rowid(h)),
            Slot::Object(h) => Some(HeldHandle::Object(h)),
            Slot::Stmt(h) => Some(HeldHandle::Stmt(h)),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum ByteStore {
    Unused,
    Fixed { data: BytesMut, stride: usize },
    Dynamic(Vec<BytesMut>),
}

impl ByteStore {
    fn get(&self, index: usize, len: usize) -> &[u8] {
        match self {
            ByteStore::Unused => &[],
            ByteStore::Fixed { data, stride } => {
                let start = index * stride;
                &data[start..start + len]
            }
            ByteStore::Dynamic(elements) => &elements[index][..len],
        }
    }

    fn put(&mut self, index: usize, value: &[u8]) {
        match self {
            ByteStore::Unused => {}
            ByteStore::Fixed { data, stride } => {
                let start = index * *stride;
                data[start..start + value.len()].copy_from_slice(value);
            }
            ByteStore::Dynamic(elements) => {
                let element = &mut elements[index];
                element.clear();
                element.extend_from_slice(value);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Shape {
    oracle_type: OracleType,
    native_type: NativeType,
    size: u32,
    size_in_bytes: u32,
    is_dynamic: bool,
}

/// Element slots plus their byte store
#[derive(Debug)]
struct Buffer {
    slots: Vec<Slot>,
    bytes: ByteStore,
}

impl Buffer {
    fn new(shape: &Shape, len: usize) -> Self {
        let bytes = if shape.native_type != NativeType::Bytes {
            ByteStore::Unused
        } else if shape.is_dynamic {
            ByteStore::Dynamic((0..len).map(|_| BytesMut::new()).collect())
        } else {
            let stride = shape.size_in_bytes as usize;
            ByteStore::Fixed {
                data: BytesMut::zeroed(len * stride),
                stride,
            }
        };
        Self {
            slots: vec![Slot::Null; len],
            bytes,
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn value(&self, index: usize) -> Option<Value<'_>> {
        let value = match self.slots[index] {
            Slot::Null => return None,
            Slot::Int64(v) => Value::Int64(v),
            Slot::Uint64(v) => Value::Uint64(v),
            Slot::Float(v) => Value::Float(v),
            Slot::Double(v) => Value::Double(v),
            Slot::Bytes(len) => Value::Bytes(self.bytes.get(index, len as usize)),
            Slot::Timestamp(v) => Value::Timestamp(v),
            Slot::IntervalDs(v) => Value::IntervalDs(v),
            Slot::IntervalYm(v) => Value::IntervalYm(v),
            Slot::Boolean(v) => Value::Boolean(v),
            Slot::Lob(h) => Value::Lob(h),
            Slot::Rowid(h) => Value::Rowid(h),
            Slot::Object(h) => Value::Object(h),
            Slot::Stmt(h) => Value::Stmt(h),
        };
        Some(value)
    }

    /// Store a checked value, returning the handle the slot held before
    fn put(&mut self, index: usize, value: Option<Value<'_>>) -> Option<HeldHandle> {
        let slot = match value {
            None => Slot::Null,
            Some(Value::Int64(v)) => Slot::Int64(v),
            Some(Value::Uint64(v)) => Slot::Uint64(v),
            Some(Value::Float(v)) => Slot::Float(v),
            Some(Value::Double(v)) => Slot::Double(v),
            Some(Value::Bytes(b)) => {
                self.bytes.put(index, b);
                Slot::Bytes(b.len() as u32)
            }
            Some(Value::Timestamp(v)) => Slot::Timestamp(v),
            Some(Value::IntervalDs(v)) => Slot::IntervalDs(v),
            Some(Value::IntervalYm(v)) => Slot::IntervalYm(v),
            Some(Value::Boolean(v)) => Slot::Boolean(v),
            Some(Value::Lob(h)) => Slot::Lob(h),
            Some(Value::Rowid(h)) => Slot::Rowid(h),
            Some(Value::Object(h)) => Slot::Object(h),
            Some(Value::Stmt(h)) => Slot::Stmt(h),
        };
        std::mem::replace(&mut self.slots[index], slot).held()
    }

    fn held_handles(&self) -> impl Iterator<Item = HeldHandle> + '_ {
        self.slots.iter().filter_map(Slot::held)
    }
}

/// A typed variable buffer
#[derive(Debug)]
pub struct Var {
    shape: Shape,
    max_array_size: u32,
    is_array: bool,
    actual_elements: u32,
    object_type: Option<Arc<DbObjectType>>,
    buffer: Buffer,
    returned: Vec<Buffer>,
}

impl Var {
    /// Validate the options and allocate the element slots
    pub(crate) fn new(options: VarOptions, config: &Config) -> Result<Self> {
        let VarOptions {
            oracle_type,
            native_type,
            max_array_size,
            size,
            size_is_bytes,
            is_array,
            object_type,
        } = options;
        if max_array_size == 0 {
            return Err(Error::ArraySizeZero);
        }
        if !oracle_type.accepts(native_type) {
            return Err(Error::UnhandledConversion {
                oracle_type,
                native_type,
            });
        }
        if is_array && !oracle_type.can_be_in_array() {
            return Err(Error::NotSupported(format!(
                "{oracle_type:?} variables cannot be PL/SQL arrays"
            )));
        }
        if oracle_type == OracleType::Object && object_type.is_none() {
            return Err(Error::NotSupported(
                "object variables require an object type".to_string(),
            ));
        }

        let fixed = oracle_type.buffer_size();
        let size_in_bytes = match (oracle_type, native_type) {
            (OracleType::Number, NativeType::Bytes) => NUMBER_AS_TEXT_CHARS as u32,
            (OracleType::Rowid, NativeType::Bytes) => ROWID_STRING_LENGTH as u32,
            _ if fixed != 0 => fixed,
            _ if size_is_bytes || !oracle_type.is_character_data() => size,
            _ if oracle_type.charset_form() == csfrm::NCHAR => {
                size.saturating_mul(config.max_bytes_per_nchar)
            }
            _ => size.saturating_mul(config.max_bytes_per_character),
        };
        let is_dynamic = native_type == NativeType::Bytes
            && (oracle_type.is_long() || size_in_bytes > config.max_basic_buffer_size);
        if !is_dynamic
            && u64::from(max_array_size) * u64::from(size_in_bytes) > config.max_array_bytes
        {
            return Err(Error::ArraySizeTooLarge {
                size: max_array_size,
            });
        }

        let shape = Shape {
            oracle_type,
            native_type,
            size: if fixed == 0 { size } else { size_in_bytes },
            size_in_bytes,
            is_dynamic,
        };
        Ok(Self {
            buffer: Buffer::new(&shape, max_array_size as usize),
            shape,
            max_array_size,
            is_array,
            actual_elements: if is_array { 0 } else { max_array_size },
            object_type,
            returned: Vec::new(),
        })
    }

    /// Database type
    pub fn oracle_type(&self) -> OracleType {
        self.shape.oracle_type
    }

    /// Host type of the element values
    pub fn native_type(&self) -> NativeType {
        self.shape.native_type
    }

    /// Number of element slots
    pub fn max_array_size(&self) -> u32 {
        self.max_array_size
    }

    /// Declared element size
    pub fn size(&self) -> u32 {
        self.shape.size
    }

    /// Element capacity in bytes
    pub fn size_in_bytes(&self) -> u32 {
        self.shape.size_in_bytes
    }

    /// Check if this is a PL/SQL array variable
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// Check if byte values use the per-element dynamic pool
    pub fn is_dynamic(&self) -> bool {
        self.shape.is_dynamic
    }

    /// Number of elements currently populated
    pub fn num_elements(&self) -> u32 {
        self.actual_elements
    }

    /// Object type of an OBJECT variable
    pub fn object_type(&self) -> Option<&Arc<DbObjectType>> {
        self.object_type.as_ref()
    }

    fn check_index(&self, index: u32) -> Result<usize> {
        if index >= self.max_array_size {
            return Err(Error::InvalidIndex(i64::from(index)));
        }
        Ok(index as usize)
    }

    /// Value at `index`, or `None` when the element is null
    ///
    /// Array variables only expose their first [`num_elements`](Self::num_elements).
    pub fn value(&self, index: u32) -> Result<Option<Value<'_>>> {
        if self.is_array() && index >= self.actual_elements {
            return Err(Error::InvalidIndex(i64::from(index)));
        }
        let index = self.check_index(index)?;
        Ok(self.buffer.value(index))
    }

    /// Check if the element at `index` is null
    pub fn is_null(&self, index: u32) -> Result<bool> {
        Ok(self.value(index)?.is_none())
    }

    pub(crate) fn set_num_elements(&mut self, count: u32) -> Result<()> {
        if count > self.max_array_size {
            return Err(Error::ElementCountTooLarge {
                count,
                max: self.max_array_size,
            });
        }
        self.actual_elements = count;
        Ok(())
    }

    pub(crate) fn set_null(&mut self, index: u32) -> Result<Option<HeldHandle>> {
        let index = self.check_index(index)?;
        Ok(self.buffer.put(index, None))
    }

    /// Store a value; handle values must already carry the reference the slot will own
    pub(crate) fn set_value(&mut self, index: u32, value: Value<'_>) -> Result<Option<HeldHandle>> {
        let index = self.check_index(index)?;
        if value.native_type() != self.shape.native_type {
            return Err(Error::TypeMismatch {
                expected: self.shape.native_type,
                actual: value.native_type(),
            });
        }
        self.check_value(&value)?;
        Ok(self.buffer.put(index, Some(value)))
    }

    fn check_value(&self, value: &Value<'_>) -> Result<()> {
        match *value {
            Value::Bytes(b) => {
                let capacity = self.shape.size_in_bytes as usize;
                if b.len() > capacity {
                    return Err(Error::BufferTooSmall {
                        needed: b.len(),
                        capacity,
                    });
                }
                match self.shape.oracle_type {
                    OracleType::Number => {
                        encode_oracle_number(number_text(b)?)?;
                    }
                    OracleType::Rowid if !b.is_empty() => {
                        parse_rowid_string(&String::from_utf8_lossy(b))?;
                    }
                    _ => {}
                }
                Ok(())
            }
            Value::Lob(_) | Value::Rowid(_) | Value::Object(_) | Value::Stmt(_) => Ok(()),
            scalar => encode_scalar(self.shape.oracle_type, scalar).map(drop),
        }
    }

    /// Copy one element of `source` into slot `index`
    pub(crate) fn copy_from(
        &mut self,
        index: u32,
        source: &Var,
        source_index: u32,
    ) -> Result<Option<HeldHandle>> {
        if source.shape.native_type != self.shape.native_type {
            return Err(Error::NotSupported(format!(
                "cannot copy {:?} data into a {:?} variable",
                source.shape.native_type, self.shape.native_type
            )));
        }
        match source.value(source_index)? {
            Some(value) => self.set_value(index, value),
            None => self.set_null(index),
        }
    }

    /// Copy an element within this variable
    pub(crate) fn copy_within(&mut self, index: u32, source_index: u32) -> Result<Option<HeldHandle>> {
        let index = self.check_index(index)?;
        let source_index = self.check_index(source_index)?;
        let slot = self.buffer.slots[source_index];
        if let Slot::Bytes(len) = slot {
            let bytes = self.buffer.bytes.get(source_index, len as usize).to_vec();
            self.buffer.bytes.put(index, &bytes);
        }
        Ok(std::mem::replace(&mut self.buffer.slots[index], slot).held())
    }

    /// Encode the element at `index` for sending
    pub(crate) fn to_wire(&self, index: u32, res: &Resources) -> Result<WireValue> {
        let Some(value) = self.value(index)? else {
            return Ok(WireValue::Null);
        };
        let oracle_type = self.shape.oracle_type;
        Ok(match value {
            Value::Rowid(h) => WireValue::from(res.rowids.get(h)?.to_wire().to_vec()),
            Value::Lob(h) => WireValue::Lob(Bytes::copy_from_slice(res.lobs.get(h)?.as_bytes())),
            Value::Object(h) => WireValue::Object(res.objects.get(h)?.clone()),
            Value::Stmt(_) => WireValue::Null,
            Value::Bytes(b) if oracle_type != OracleType::Number => {
                WireValue::Data(Bytes::copy_from_slice(b))
            }
            scalar => WireValue::Data(encode_scalar(oracle_type, scalar)?),
        })
    }

    /// Decode a received value into slot `index`
    pub(crate) fn set_from_wire(
        &mut self,
        index: u32,
        wire: WireValue,
        res: &mut Resources,
        released: &mut Vec<HeldHandle>,
    ) -> Result<()> {
        let index = self.check_index(index)?;
        store_wire(&self.shape, &mut self.buffer, index, wire, res, released)
    }

    /// Replace the DML RETURNING rows with one list of rows per iteration
    pub(crate) fn set_returned(
        &mut self,
        iterations: Vec<Vec<WireValue>>,
        res: &mut Resources,
        released: &mut Vec<HeldHandle>,
    ) -> Result<()> {
        for old in self.returned.drain(..) {
            released.extend(old.held_handles());
        }
        for rows in iterations {
            self.returned.push(Buffer::new(&self.shape, rows.len()));
            let buffer = self
                .returned
                .last_mut()
                .ok_or_else(|| Error::Internal("returned buffer missing".into()))?;
            for (row, wire) in rows.into_iter().enumerate() {
                store_wire(&self.shape, buffer, row, wire, res, released)?;
            }
        }
        Ok(())
    }

    pub(crate) fn clear_returned(&mut self, released: &mut Vec<HeldHandle>) {
        for old in self.returned.drain(..) {
            released.extend(old.held_handles());
        }
    }

    /// Number of iterations with DML RETURNING data from the last execution
    pub fn returned_iterations(&self) -> u32 {
        self.returned.len() as u32
    }

    fn returned_buffer(&self, iteration: u32) -> Result<&Buffer> {
        self.returned
            .get(iteration as usize)
            .ok_or(Error::InvalidIndex(i64::from(iteration)))
    }

    /// Number of rows returned for one iteration
    pub fn returned_count(&self, iteration: u32) -> Result<u32> {
        Ok(self.returned_buffer(iteration)?.len() as u32)
    }

    /// One returned row value; rows past [`returned_count`](Self::returned_count) fail
    pub fn returned_value(&self, iteration: u32, row: u32) -> Result<Option<Value<'_>>> {
        let buffer = self.returned_buffer(iteration)?;
        if row as usize >= buffer.len() {
            return Err(Error::InvalidIndex(i64::from(row)));
        }
        Ok(buffer.value(row as usize))
    }

    /// Every handle owned by the element slots
    pub(crate) fn into_held_handles(self) -> Vec<HeldHandle> {
        self.buffer
            .held_handles()
            .chain(self.returned.iter().flat_map(Buffer::held_handles))
            .collect()
    }
}

fn number_text(b: &[u8]) -> Result<&str> {
    std::str::from_utf8(b).map_err(|_| Error::InvalidNumber(String::from_utf8_lossy(b).into_owned()))
}

/// Encode a non-handle value in the wire format of `oracle_type`
fn encode_scalar(oracle_type: OracleType, value: Value<'_>) -> Result<Bytes> {
    use OracleType as O;
    let data = match (oracle_type, value) {
        (O::Number, Value::Int64(v)) => encode_i64(v)?,
        (O::Number, Value::Uint64(v)) => encode_u64(v)?,
        (O::Number, Value::Double(v)) => encode_f64(v)?,
        (O::Number, Value::Float(v)) => encode_f32(v)?,
        (O::Number, Value::Bytes(b)) => encode_oracle_number(number_text(b)?)?,
        (O::NativeInt, Value::Int64(v)) => v.to_be_bytes().to_vec(),
        (O::NativeInt, Value::Uint64(v)) => i64::try_from(v)
            .map_err(|_| Error::NumberOutOfRange(v.to_string()))?
            .to_be_bytes()
            .to_vec(),
        (O::NativeUint, Value::Uint64(v)) => v.to_be_bytes().to_vec(),
        (O::NativeUint, Value::Int64(v)) => u64::try_from(v)
            .map_err(|_| Error::NumberOutOfRange(v.to_string()))?
            .to_be_bytes()
            .to_vec(),
        (O::NativeFloat, Value::Float(v)) => encode_binary_float(v).to_vec(),
        (O::NativeFloat, Value::Double(v)) => {
            if v.is_finite() && !(v as f32).is_finite() {
                return Err(Error::NumberOutOfRange(v.to_string()));
            }
            encode_binary_float(v as f32).to_vec()
        }
        (O::NativeDouble, Value::Double(v)) => encode_binary_double(v).to_vec(),
        (O::Date, Value::Timestamp(t)) => encode_date(&t)?.to_vec(),
        (O::Timestamp | O::TimestampLtz, Value::Timestamp(t)) => encode_timestamp(&t)?.to_vec(),
        (O::TimestampTz, Value::Timestamp(t)) => encode_timestamp_tz(&t)?.to_vec(),
        (O::IntervalDs, Value::IntervalDs(v)) => encode_interval_ds(&v)?.to_vec(),
        (O::IntervalYm, Value::IntervalYm(v)) => encode_interval_ym(&v)?.to_vec(),
        (O::Boolean, Value::Boolean(v)) => vec![u8::from(v)],
        (_, Value::Bytes(b)) if oracle_type.accepts(NativeType::Bytes) => b.to_vec(),
        (oracle_type, other) => {
            return Err(Error::UnhandledConversion {
                oracle_type,
                native_type: other.native_type(),
            })
        }
    };
    Ok(Bytes::from(data))
}

/// Decode a scalar wire value as the variable's native type
fn decode_scalar(oracle_type: OracleType, native_type: NativeType, data: &[u8]) -> Result<Value<'_>> {
    use NativeType as N;
    use OracleType as O;
    let value = match (oracle_type, native_type) {
        (O::Number, N::Int64) => Value::Int64(decode_oracle_number(data)?.to_i64()?),
        (O::Number, N::Uint64) => Value::Uint64(decode_oracle_number(data)?.to_u64()?),
        (O::Number, N::Double) => Value::Double(decode_oracle_number(data)?.to_f64()?),
        (O::Number, N::Float) => {
            let number = decode_oracle_number(data)?;
            let v = number.to_f64()?;
            if v.is_finite() && !(v as f32).is_finite() {
                return Err(Error::NumberOutOfRange(number.to_string()));
            }
            Value::Float(v as f32)
        }
        (O::NativeInt, N::Int64) => Value::Int64(native_int(data)?),
        (O::NativeInt, N::Uint64) => {
            let v = native_int(data)?;
            Value::Uint64(u64::try_from(v).map_err(|_| Error::NumberOutOfRange(v.to_string()))?)
        }
        (O::NativeUint, N::Uint64) => Value::Uint64(native_int(data)? as u64),
        (O::NativeUint, N::Int64) => {
            let v = native_int(data)? as u64;
            Value::Int64(i64::try_from(v).map_err(|_| Error::NumberOutOfRange(v.to_string()))?)
        }
        (O::NativeFloat, N::Float) => Value::Float(decode_binary_float(data)?),
        (O::NativeFloat, N::Double) => Value::Double(f64::from(decode_binary_float(data)?)),
        (O::NativeDouble, N::Double) => Value::Double(decode_binary_double(data)?),
        (O::Date, N::Timestamp) => Value::Timestamp(decode_date(data)?),
        (O::Timestamp | O::TimestampLtz, N::Timestamp) => Value::Timestamp(decode_timestamp(data)?),
        (O::TimestampTz, N::Timestamp) => Value::Timestamp(decode_timestamp_tz(data)?),
        (O::IntervalDs, N::IntervalDs) => Value::IntervalDs(decode_interval_ds(data)?),
        (O::IntervalYm, N::IntervalYm) => Value::IntervalYm(decode_interval_ym(data)?),
        (O::Boolean, N::Boolean) => Value::Boolean(
            *data
                .first()
                .ok_or_else(|| Error::Internal("empty BOOLEAN value".into()))?
                != 0,
        ),
        (_, N::Bytes) => Value::Bytes(data),
        (oracle_type, native_type) => {
            return Err(Error::UnhandledConversion {
                oracle_type,
                native_type,
            })
        }
    };
    Ok(value)
}

fn native_int(data: &[u8]) -> Result<i64> {
    let bytes: [u8; 8] = data
        .try_into()
        .map_err(|_| Error::InvalidNumber(format!("{} byte native integer", data.len())))?;
    Ok(i64::from_be_bytes(bytes))
}

fn store_wire(
    shape: &Shape,
    buffer: &mut Buffer,
    index: usize,
    wire: WireValue,
    res: &mut Resources,
    released: &mut Vec<HeldHandle>,
) -> Result<()> {
    let oracle_type = shape.oracle_type;
    let text: String;
    let value = match wire {
        WireValue::Null => None,
        WireValue::Data(ref data) => Some(match (oracle_type, shape.native_type) {
            (OracleType::Number, NativeType::Bytes) => {
                text = decode_oracle_number(data)?.to_string();
                Value::Bytes(text.as_bytes())
            }
            (OracleType::Rowid, NativeType::Bytes) => {
                text = decode_rowid(data)?.to_string();
                Value::Bytes(text.as_bytes())
            }
            (OracleType::Rowid, NativeType::Rowid) => {
                Value::Rowid(res.rowids.insert(decode_rowid(data)?))
            }
            (oracle_type, native_type) => decode_scalar(oracle_type, native_type, data)?,
        }),
        WireValue::Lob(ref data) if oracle_type.is_lob() => {
            let lob = Lob::from_wire(oracle_type, res.config.lob_chunk_size, data)?;
            Some(Value::Lob(res.lobs.insert(lob)))
        }
        WireValue::Object(object) if oracle_type == OracleType::Object => {
            Some(Value::Object(res.objects.insert(object)))
        }
        WireValue::Cursor(backend) if oracle_type == OracleType::Stmt => {
            let stmt = Statement::from_cursor(backend, &res.config);
            Some(Value::Stmt(res.stmts.insert(stmt)))
        }
        other => {
            return Err(Error::Internal(format!(
                "unexpected wire value {other:?} for {oracle_type:?}"
            )))
        }
    };
    if let Some(Value::Bytes(b)) = value {
        if b.len() > shape.size_in_bytes as usize {
            return Err(Error::DataTooLarge {
                actual: b.len(),
                declared: shape.size_in_bytes as usize,
            });
        }
    }
    tracing::trace!(index, oracle_type = ?oracle_type, is_null = value.is_none(), "stored fetched element");
    released.extend(buffer.put(index, value));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowId;

    fn var(options: VarOptions) -> Var {
        Var::new(options, &Config::default()).unwrap()
    }

    #[test]
    fn test_creation_checks() {
        let config = Config::default();
        let zero = VarOptions::new(OracleType::Number, NativeType::Int64).max_array_size(0);
        assert!(matches!(Var::new(zero, &config), Err(Error::ArraySizeZero)));

        let bad = VarOptions::new(OracleType::Date, NativeType::Double);
        assert!(matches!(
            Var::new(bad, &config),
            Err(Error::UnhandledConversion { .. })
        ));

        let clob_array = VarOptions::new(OracleType::Clob, NativeType::Lob).array(true);
        assert!(matches!(Var::new(clob_array, &config), Err(Error::NotSupported(_))));

        let huge = VarOptions::new(OracleType::Raw, NativeType::Bytes)
            .max_array_size(1 << 20)
            .size(4000);
        assert!(matches!(
            Var::new(huge, &config),
            Err(Error::ArraySizeTooLarge { size }) if size == 1 << 20
        ));
    }

    #[test]
    fn test_character_sizes() {
        let v = var(VarOptions::new(OracleType::Varchar, NativeType::Bytes).size(10));
        assert_eq!(v.size(), 10);
        assert_eq!(v.size_in_bytes(), 40);

        let v = var(VarOptions::new(OracleType::NChar, NativeType::Bytes).size(10));
        assert_eq!(v.size_in_bytes(), 20);

        let v = var(VarOptions::new(OracleType::Varchar, NativeType::Bytes)
            .size(10)
            .size_is_bytes(true));
        assert_eq!(v.size_in_bytes(), 10);

        let v = var(VarOptions::new(OracleType::Number, NativeType::Bytes));
        assert_eq!(v.size_in_bytes(), 172);
        let v = var(VarOptions::new(OracleType::Number, NativeType::Int64));
        assert_eq!(v.size_in_bytes(), 22);
    }

    #[test]
    fn test_element_count() {
        let mut v = var(VarOptions::new(OracleType::Number, NativeType::Int64)
            .max_array_size(3)
            .array(true));
        assert_eq!(v.num_elements(), 0);
        v.set_num_elements(3).unwrap();
        assert!(matches!(
            v.set_num_elements(4),
            Err(Error::ElementCountTooLarge { count: 4, max: 3 })
        ));
        assert_eq!(v.num_elements(), 3);

        let scalar = var(VarOptions::new(OracleType::Number, NativeType::Int64).max_array_size(5));
        assert_eq!(scalar.num_elements(), 5);
    }

    #[test]
    fn test_bytes_capacity() {
        let mut v = var(VarOptions::new(OracleType::Raw, NativeType::Bytes)
            .max_array_size(2)
            .size(4));
        v.set_value(1, Value::Bytes(b"abcd")).unwrap();
        assert_eq!(v.value(1).unwrap(), Some(Value::Bytes(b"abcd")));
        assert!(matches!(
            v.set_value(0, Value::Bytes(b"abcde")),
            Err(Error::BufferTooSmall {
                needed: 5,
                capacity: 4
            })
        ));
        assert_eq!(v.value(0).unwrap(), None);
        assert!(matches!(v.value(2), Err(Error::InvalidIndex(2))));
    }

    #[test]
    fn test_type_mismatch() {
        let mut v = var(VarOptions::new(OracleType::Number, NativeType::Int64));
        assert!(matches!(
            v.set_value(0, Value::Double(1.5)),
            Err(Error::TypeMismatch {
                expected: NativeType::Int64,
                actual: NativeType::Double
            })
        ));
    }

    #[test]
    fn test_number_text_validated_on_set() {
        let mut v = var(VarOptions::new(OracleType::Number, NativeType::Bytes));
        v.set_value(0, Value::Bytes(b"123.45")).unwrap();
        assert!(matches!(
            v.set_value(0, Value::Bytes(b"1.2.3")),
            Err(Error::InvalidNumber(_))
        ));
        assert!(matches!(
            v.set_value(0, Value::Bytes(b"1E+126")),
            Err(Error::NumberOutOfRange(_))
        ));
        assert_eq!(v.value(0).unwrap(), Some(Value::Bytes(b"123.45")));
    }

    #[test]
    fn test_dynamic_store() {
        let config = Config::default().max_basic_buffer_size(16);
        let mut v = Var::new(
            VarOptions::new(OracleType::Raw, NativeType::Bytes)
                .max_array_size(2)
                .size(64),
            &config,
        )
        .unwrap();
        assert!(v.is_dynamic());
        let data = vec![7u8; 64];
        v.set_value(0, Value::Bytes(&data)).unwrap();
        v.set_value(0, Value::Bytes(b"short")).unwrap();
        assert_eq!(v.value(0).unwrap(), Some(Value::Bytes(b"short")));
        assert!(v.set_value(1, Value::Bytes(&[0u8; 65])).is_err());
    }

    #[test]
    fn test_copy_within() {
        let mut v = var(VarOptions::new(OracleType::Varchar, NativeType::Bytes)
            .max_array_size(3)
            .size(8));
        v.set_value(0, Value::Bytes(b"left")).unwrap();
        v.copy_within(2, 0).unwrap();
        v.copy_within(0, 1).unwrap();
        assert_eq!(v.value(2).unwrap(), Some(Value::Bytes(b"left")));
        assert!(v.is_null(0).unwrap());
    }

    #[test]
    fn test_wire_roundtrip_number() {
        let mut res = Resources::new(Config::default());
        let mut released = Vec::new();
        let mut v = var(VarOptions::new(OracleType::Number, NativeType::Int64).max_array_size(2));
        v.set_value(0, Value::Int64(-42)).unwrap();
        let wire = v.to_wire(0, &res).unwrap();
        v.set_from_wire(1, wire, &mut res, &mut released).unwrap();
        assert_eq!(v.value(1).unwrap(), Some(Value::Int64(-42)));
        assert!(matches!(v.to_wire(0, &res).unwrap(), WireValue::Data(_)));
        v.set_null(0).unwrap();
        assert!(v.to_wire(0, &res).unwrap().is_null());
    }

    #[test]
    fn test_number_overflowing_float() {
        let mut res = Resources::new(Config::default());
        let mut released = Vec::new();
        let mut v = var(VarOptions::new(OracleType::Number, NativeType::Float).max_array_size(2));
        let huge = WireValue::from(encode_oracle_number("1E+100").unwrap());
        assert!(matches!(
            v.set_from_wire(0, huge, &mut res, &mut released),
            Err(Error::NumberOutOfRange(_))
        ));
        assert!(v.is_null(0).unwrap());

        let small = WireValue::from(encode_oracle_number("-2.5").unwrap());
        v.set_from_wire(1, small, &mut res, &mut released).unwrap();
        assert_eq!(v.value(1).unwrap(), Some(Value::Float(-2.5)));
    }

    #[test]
    fn test_array_reads_stop_at_num_elements() {
        let mut res = Resources::new(Config::default());
        let mut released = Vec::new();
        let mut v = var(VarOptions::new(OracleType::NativeInt, NativeType::Int64)
            .max_array_size(4)
            .array(true));
        v.set_num_elements(3).unwrap();
        for i in 0..3u32 {
            let wire = WireValue::from(i64::from(i).to_be_bytes().to_vec());
            v.set_from_wire(i, wire, &mut res, &mut released).unwrap();
        }
        assert_eq!(v.value(2).unwrap(), Some(Value::Int64(2)));

        // a later OUT bind returned a single element
        v.set_num_elements(1).unwrap();
        assert_eq!(v.value(0).unwrap(), Some(Value::Int64(0)));
        assert!(matches!(v.value(2), Err(Error::InvalidIndex(2))));
        assert!(matches!(v.value(3), Err(Error::InvalidIndex(3))));
    }

    #[test]
    fn test_fetched_data_too_large() {
        let mut res = Resources::new(Config::default());
        let mut released = Vec::new();
        let mut v = var(VarOptions::new(OracleType::Varchar, NativeType::Bytes)
            .size(3)
            .size_is_bytes(true));
        let err = v
            .set_from_wire(0, WireValue::from(b"too long".as_slice()), &mut res, &mut released)
            .unwrap_err();
        assert!(matches!(err, Error::DataTooLarge { actual: 8, declared: 3 }));
        assert!(v.is_null(0).unwrap());
    }

    #[test]
    fn test_rowid_from_wire() {
        let mut res = Resources::new(Config::default());
        let mut released = Vec::new();
        let rowid = RowId::new(73_620, 4, 1_364, 0);

        let mut text = var(VarOptions::new(OracleType::Rowid, NativeType::Bytes));
        text.set_from_wire(0, WireValue::from(rowid.to_wire().to_vec()), &mut res, &mut released)
            .unwrap();
        assert_eq!(text.value(0).unwrap(), Some(Value::Bytes(b"AAAR+UAAEAAAAVUAAA")));

        let mut handle = var(VarOptions::new(OracleType::Rowid, NativeType::Rowid));
        handle
            .set_from_wire(0, WireValue::from(rowid.to_wire().to_vec()), &mut res, &mut released)
            .unwrap();
        let h = handle.value(0).unwrap().unwrap().as_rowid().unwrap();
        assert_eq!(res.rowids.get(h).unwrap(), &rowid);
        assert!(released.is_empty());
        assert_eq!(handle.into_held_handles(), vec![HeldHandle::Rowid(h)]);
    }

    #[test]
    fn test_returned_rows() {
        let mut res = Resources::new(Config::default());
        let mut released = Vec::new();
        let mut v = var(VarOptions::new(OracleType::NativeInt, NativeType::Int64));
        let rows = vec![
            vec![WireValue::from(5i64.to_be_bytes().to_vec())],
            vec![],
        ];
        v.set_returned(rows, &mut res, &mut released).unwrap();
        assert_eq!(v.returned_iterations(), 2);
        assert_eq!(v.returned_count(0).unwrap(), 1);
        assert_eq!(v.returned_value(0, 0).unwrap(), Some(Value::Int64(5)));
        assert_eq!(v.returned_count(1).unwrap(), 0);
        assert!(matches!(v.returned_value(1, 0), Err(Error::InvalidIndex(0))));
        assert!(matches!(v.returned_count(2), Err(Error::InvalidIndex(2))));
    }
}
