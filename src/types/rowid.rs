//! Oracle ROWID encoding and decoding
//!
//! Physical ROWID wire format (13 bytes):
//! - Byte 0: Type indicator (1 = physical rowid)
//! - Bytes 1-4: Data object number (u32 big-endian)
//! - Bytes 5-6: Relative file number (u16 big-endian)
//! - Bytes 7-10: Block number (u32 big-endian)
//! - Bytes 11-12: Slot number (u16 big-endian)
//!
//! The 18-character string form uses a base64 alphabet:
//! 6 characters for the object number, 3 for the file number,
//! 6 for the block number and 3 for the slot number.

use std::fmt;

use crate::error::{Error, Result};

const BASE64_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Length of the encoded ROWID string
pub const ROWID_STRING_LENGTH: usize = 18;

/// Length of a physical ROWID on the wire
pub const ROWID_WIRE_LENGTH: usize = 13;

const PHYSICAL_ROWID: u8 = 1;

/// Decoded physical ROWID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RowId {
    /// Data object number
    pub rba: u32,
    /// Relative file number
    pub partition_id: u16,
    /// Block number within the data file
    pub block_num: u32,
    /// Slot number (row number within the block)
    pub slot_num: u16,
}

impl RowId {
    /// Create a ROWID from its components
    pub fn new(rba: u32, partition_id: u16, block_num: u32, slot_num: u16) -> Self {
        Self {
            rba,
            partition_id,
            block_num,
            slot_num,
        }
    }

    /// Check if any component is non-zero
    pub fn is_valid(&self) -> bool {
        *self != Self::default()
    }

    /// Encode to the 13-byte wire format
    pub fn to_wire(&self) -> [u8; ROWID_WIRE_LENGTH] {
        let mut out = [0u8; ROWID_WIRE_LENGTH];
        out[0] = PHYSICAL_ROWID;
        out[1..5].copy_from_slice(&self.rba.to_be_bytes());
        out[5..7].copy_from_slice(&self.partition_id.to_be_bytes());
        out[7..11].copy_from_slice(&self.block_num.to_be_bytes());
        out[11..13].copy_from_slice(&self.slot_num.to_be_bytes());
        out
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; ROWID_STRING_LENGTH];
        encode_base64(&mut buf[0..6], self.rba as u64);
        encode_base64(&mut buf[6..9], self.partition_id as u64);
        encode_base64(&mut buf[9..15], self.block_num as u64);
        encode_base64(&mut buf[15..18], self.slot_num as u64);
        // The alphabet is ASCII
        f.write_str(std::str::from_utf8(&buf).map_err(|_| fmt::Error)?)
    }
}

impl std::str::FromStr for RowId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_rowid_string(s)
    }
}

fn encode_base64(buf: &mut [u8], value: u64) {
    let mut val = value;
    for slot in buf.iter_mut().rev() {
        *slot = BASE64_ALPHABET[(val & 0x3f) as usize];
        val >>= 6;
    }
}

fn decode_base64(chars: &[u8]) -> Result<u64> {
    chars.iter().try_fold(0u64, |value, &c| {
        let idx = match c {
            b'A'..=b'Z' => c - b'A',
            b'a'..=b'z' => c - b'a' + 26,
            b'0'..=b'9' => c - b'0' + 52,
            b'+' => 62,
            b'/' => 63,
            _ => {
                return Err(Error::InvalidRowid(format!(
                    "invalid character {:?}",
                    char::from(c)
                )))
            }
        };
        Ok((value << 6) | idx as u64)
    })
}

/// Decode a ROWID received from the database
///
/// Accepts the 13-byte physical format or the 18-character string form.
pub fn decode_rowid(data: &[u8]) -> Result<RowId> {
    match data.len() {
        ROWID_WIRE_LENGTH if data[0] == PHYSICAL_ROWID => Ok(RowId {
            rba: u32::from_be_bytes([data[1], data[2], data[3], data[4]]),
            partition_id: u16::from_be_bytes([data[5], data[6]]),
            block_num: u32::from_be_bytes([data[7], data[8], data[9], data[10]]),
            slot_num: u16::from_be_bytes([data[11], data[12]]),
        }),
        ROWID_STRING_LENGTH => std::str::from_utf8(data)
            .map_err(|_| Error::InvalidRowid("not ASCII".to_string()))
            .and_then(parse_rowid_string),
        len => Err(Error::InvalidRowid(format!("unexpected length {len}"))),
    }
}

/// Parse the 18-character string form
pub fn parse_rowid_string(s: &str) -> Result<RowId> {
    if s.len() != ROWID_STRING_LENGTH {
        return Err(Error::InvalidRowid(format!(
            "string length {} (expected {ROWID_STRING_LENGTH})",
            s.len()
        )));
    }
    let bytes = s.as_bytes();
    Ok(RowId {
        rba: decode_base64(&bytes[0..6])? as u32,
        partition_id: decode_base64(&bytes[6..9])? as u16,
        block_num: decode_base64(&bytes[9..15])? as u32,
        slot_num: decode_base64(&bytes[15..18])? as u16,
    })
}
