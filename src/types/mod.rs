//! Oracle data type encoding and decoding
//!
//! This module provides functions for encoding host values to Oracle's wire
//! format and decoding Oracle wire format to host values, plus the in-engine
//! LOB stream.

mod binary;
mod date;
mod interval;
mod lob;
mod number;
mod rowid;

pub use binary::{
    decode_binary_double, decode_binary_float, encode_binary_double, encode_binary_float,
};
pub use date::{
    decode_date, decode_timestamp, decode_timestamp_tz, encode_date, encode_timestamp,
    encode_timestamp_tz, Timestamp,
};
pub use interval::{
    decode_interval_ds, decode_interval_ym, encode_interval_ds, encode_interval_ym, IntervalDs,
    IntervalYm,
};
pub use lob::Lob;
pub use number::{
    decode_oracle_number, encode_f32, encode_f64, encode_i64, encode_oracle_number, encode_u64,
    OracleNumber,
};
pub use rowid::{
    decode_rowid, parse_rowid_string, RowId, ROWID_STRING_LENGTH, ROWID_WIRE_LENGTH,
};
