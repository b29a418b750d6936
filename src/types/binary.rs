//! Oracle BINARY_FLOAT and BINARY_DOUBLE encoding and decoding
//!
//! Oracle stores binary floating point numbers big-endian in IEEE 754 format,
//! with the sign bit manipulated so that the byte strings sort like the values:
//!
//! Encoding:
//! - If the sign bit is 0 (positive), set it to 1
//! - If the sign bit is 1 (negative), invert all bytes
//!
//! Decoding:
//! - If the sign bit is 1, clear it
//! - If the sign bit is 0, invert all bytes

use crate::error::{Error, Result};

fn flip_encode<const N: usize>(mut bytes: [u8; N]) -> [u8; N] {
    if bytes[0] & 0x80 == 0 {
        bytes[0] |= 0x80;
    } else {
        bytes.iter_mut().for_each(|b| *b = !*b);
    }
    bytes
}

fn flip_decode<const N: usize>(data: &[u8], name: &str) -> Result<[u8; N]> {
    let mut bytes: [u8; N] = data
        .get(..N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            Error::InvalidNumber(format!("{name} requires {N} bytes, got {}", data.len()))
        })?;
    if bytes[0] & 0x80 != 0 {
        bytes[0] &= 0x7f;
    } else {
        bytes.iter_mut().for_each(|b| *b = !*b);
    }
    Ok(bytes)
}

/// Decode an Oracle BINARY_FLOAT from wire format (4 bytes)
pub fn decode_binary_float(data: &[u8]) -> Result<f32> {
    Ok(f32::from_be_bytes(flip_decode(data, "BINARY_FLOAT")?))
}

/// Encode an f32 to Oracle BINARY_FLOAT wire format (4 bytes)
pub fn encode_binary_float(value: f32) -> [u8; 4] {
    flip_encode(value.to_be_bytes())
}

/// Decode an Oracle BINARY_DOUBLE from wire format (8 bytes)
pub fn decode_binary_double(data: &[u8]) -> Result<f64> {
    Ok(f64::from_be_bytes(flip_decode(data, "BINARY_DOUBLE")?))
}

/// Encode an f64 to Oracle BINARY_DOUBLE wire format (8 bytes)
pub fn encode_binary_double(value: f64) -> [u8; 8] {
    flip_encode(value.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_float_one() {
        let encoded = encode_binary_float(1.0);
        assert_eq!(encoded, [0xbf, 0x80, 0x00, 0x00]);
        assert_eq!(decode_binary_float(&encoded).unwrap(), 1.0);
    }

    #[test]
    fn test_binary_double_negative() {
        let value = -3.141592653589793_f64;
        let encoded = encode_binary_double(value);
        assert_eq!(encoded[0] & 0x80, 0);
        assert_eq!(decode_binary_double(&encoded).unwrap(), value);
    }

    #[test]
    fn test_encoding_preserves_order() {
        let values = [f64::MIN, -100.0, -0.5, 0.0, 0.001, 100.0, f64::MAX];
        let encoded: Vec<[u8; 8]> = values.iter().map(|v| encode_binary_double(*v)).collect();
        assert!(encoded.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_binary_roundtrip_special_values() {
        for value in [f32::INFINITY, f32::NEG_INFINITY, f32::MAX, f32::MIN, -0.5] {
            assert_eq!(decode_binary_float(&encode_binary_float(value)).unwrap(), value);
        }
        let nan = decode_binary_double(&encode_binary_double(f64::NAN)).unwrap();
        assert!(nan.is_nan());
    }

    #[test]
    fn test_short_input_rejected() {
        assert!(decode_binary_float(&[0x80, 0]).is_err());
        assert!(decode_binary_double(&[0x80; 4]).is_err());
    }
}
