//! Oracle NUMBER encoding and decoding
//!
//! Oracle NUMBER is stored in a variable-length format:
//! - First byte: exponent (with sign encoding)
//! - Subsequent bytes: mantissa digits in base-100
//!
//! For positive numbers: exponent byte has high bit set, mantissa bytes are value + 1
//! For negative numbers: exponent byte is inverted, mantissa bytes are 101 - value,
//!                       and a trailing 102 byte is added (if not at max digits)
//!
//! The format holds at most 38 significant decimal digits and magnitudes in
//! `1e-130 <= |x| < 1e126`. Anything else is rejected with
//! [`Error::NumberOutOfRange`]; malformed text is rejected with
//! [`Error::InvalidNumber`]. Nothing is ever rounded or truncated.

use std::fmt;

use crate::constants::{NUMBER_AS_TEXT_CHARS, NUMBER_MAX_DIGITS};
use crate::error::{Error, Result};

/// Mantissa pairs at which the negative terminator byte is omitted
const MAX_MANTISSA_PAIRS: usize = 20;

/// Largest decimal point index the exponent byte can express
const MAX_DECIMAL_POINT_INDEX: i64 = 126;

/// Smallest decimal point index the exponent byte can express
const MIN_DECIMAL_POINT_INDEX: i64 = -129;

/// Decoded Oracle NUMBER as a canonical decimal string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleNumber {
    value: String,
    is_integer: bool,
    is_max_negative: bool,
}

impl OracleNumber {
    /// Canonical decimal text (no exponent, no trailing fractional zeros)
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Whether the number has no fractional part
    pub fn is_integer(&self) -> bool {
        self.is_integer
    }

    /// Whether this is the single-byte negative infinity marker (-1e126)
    pub fn is_max_negative(&self) -> bool {
        self.is_max_negative
    }

    /// Convert to i64; fractional or out-of-range values are rejected
    pub fn to_i64(&self) -> Result<i64> {
        self.check_integral()?;
        self.value
            .parse()
            .map_err(|_| Error::NumberOutOfRange(format!("{} does not fit in i64", self.value)))
    }

    /// Convert to u64; negative, fractional or out-of-range values are rejected
    pub fn to_u64(&self) -> Result<u64> {
        self.check_integral()?;
        self.value
            .parse()
            .map_err(|_| Error::NumberOutOfRange(format!("{} does not fit in u64", self.value)))
    }

    /// Convert to f64 (nearest representable value)
    pub fn to_f64(&self) -> Result<f64> {
        if self.is_max_negative {
            return Ok(-1e126);
        }
        self.value
            .parse()
            .map_err(|_| Error::InvalidNumber(self.value.clone()))
    }

    fn check_integral(&self) -> Result<()> {
        if self.is_max_negative || !self.is_integer {
            return Err(Error::NumberOutOfRange(format!(
                "{} is not an integer",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for OracleNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_max_negative {
            f.write_str("-1E+126")
        } else {
            f.write_str(&self.value)
        }
    }
}

/// Decode an Oracle NUMBER from wire format bytes
///
/// Oracle NUMBER format:
/// - Byte 0: Exponent byte (with sign encoding)
/// - Bytes 1..n: Mantissa digits in base-100 format
pub fn decode_oracle_number(data: &[u8]) -> Result<OracleNumber> {
    let Some(&exponent_byte) = data.first() else {
        return Err(Error::InvalidNumber("empty NUMBER value".to_string()));
    };
    let is_positive = (exponent_byte & 0x80) != 0;

    let exponent = if is_positive {
        exponent_byte as i32 - 193
    } else {
        (!exponent_byte) as i32 - 193
    };
    let mut decimal_point_index = exponent * 2 + 2;

    // Single byte means zero (positive) or -1e126 (negative)
    if data.len() == 1 {
        return Ok(if is_positive {
            OracleNumber {
                value: "0".to_string(),
                is_integer: true,
                is_max_negative: false,
            }
        } else {
            OracleNumber {
                value: String::new(),
                is_integer: true,
                is_max_negative: true,
            }
        });
    }

    let mantissa = if !is_positive && data[data.len() - 1] == 102 {
        &data[1..data.len() - 1]
    } else {
        &data[1..]
    };

    let mut digits: Vec<u8> = Vec::with_capacity(mantissa.len() * 2);
    for (i, &byte) in mantissa.iter().enumerate() {
        let value = if is_positive {
            byte.wrapping_sub(1)
        } else {
            101u8.wrapping_sub(byte)
        };
        if value > 99 {
            return Err(Error::InvalidNumber(format!(
                "mantissa byte {byte} is not a base-100 digit"
            )));
        }

        let high = value / 10;
        if high == 0 && digits.is_empty() {
            decimal_point_index -= 1;
        } else {
            digits.push(high);
        }

        let low = value % 10;
        if low != 0 || i < mantissa.len() - 1 {
            digits.push(low);
        }
    }

    while digits.last() == Some(&0) && digits.len() as i32 > decimal_point_index {
        digits.pop();
    }
    if digits.is_empty() {
        return Ok(OracleNumber {
            value: "0".to_string(),
            is_integer: true,
            is_max_negative: false,
        });
    }

    let mut result = String::with_capacity(NUMBER_AS_TEXT_CHARS);
    if !is_positive {
        result.push('-');
    }

    let is_integer;
    if decimal_point_index <= 0 {
        is_integer = false;
        result.push_str("0.");
        for _ in decimal_point_index..0 {
            result.push('0');
        }
        for d in &digits {
            result.push(char::from(b'0' + d));
        }
    } else {
        let dpi = decimal_point_index as usize;
        is_integer = dpi >= digits.len();
        for (i, d) in digits.iter().enumerate() {
            if i > 0 && i == dpi {
                result.push('.');
            }
            result.push(char::from(b'0' + d));
        }
        for _ in digits.len()..dpi {
            result.push('0');
        }
    }

    Ok(OracleNumber {
        value: result,
        is_integer,
        is_max_negative: false,
    })
}

/// Parsed decimal text: sign, significant digits, and decimal point index
struct ParsedDecimal {
    is_negative: bool,
    digits: Vec<u8>,
    decimal_point_index: i64,
}

fn parse_decimal(value: &str) -> Result<ParsedDecimal> {
    let invalid = || Error::InvalidNumber(value.to_string());
    let bytes = value.as_bytes();
    let mut pos = 0;

    let is_negative = match bytes.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    let mut digits = Vec::with_capacity(NUMBER_MAX_DIGITS + 2);
    let mut seen_digit = false;

    // integer part
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        let digit = bytes[pos] - b'0';
        if digit != 0 || !digits.is_empty() {
            digits.push(digit);
        }
        seen_digit = true;
        pos += 1;
    }
    let mut decimal_point_index = digits.len() as i64;

    // fractional part
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            let digit = bytes[pos] - b'0';
            if digit == 0 && digits.is_empty() {
                decimal_point_index -= 1;
            } else {
                digits.push(digit);
            }
            seen_digit = true;
            pos += 1;
        }
    }
    if !seen_digit {
        return Err(invalid());
    }

    // exponent
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        pos += 1;
        let exp_negative = match bytes.get(pos) {
            Some(b'-') => {
                pos += 1;
                true
            }
            Some(b'+') => {
                pos += 1;
                false
            }
            _ => false,
        };
        let exp_start = pos;
        let mut exp: i64 = 0;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            exp = exp
                .saturating_mul(10)
                .saturating_add((bytes[pos] - b'0') as i64);
            pos += 1;
        }
        if exp_start == pos {
            return Err(invalid());
        }
        decimal_point_index =
            decimal_point_index.saturating_add(if exp_negative { -exp } else { exp });
    }

    if pos != bytes.len() {
        return Err(invalid());
    }

    while digits.last() == Some(&0) {
        digits.pop();
    }

    Ok(ParsedDecimal {
        is_negative,
        digits,
        decimal_point_index,
    })
}

/// Encode a number string to Oracle NUMBER wire format
///
/// Accepts an optional sign, digits with at most one decimal point, and an
/// optional exponent (`1.5e10`, `-.25`, `9E+125`).
pub fn encode_oracle_number(value: &str) -> Result<Vec<u8>> {
    let value = value.trim();
    if value.len() > NUMBER_AS_TEXT_CHARS {
        return Err(Error::NumberStringTooLong);
    }

    let ParsedDecimal {
        is_negative,
        mut digits,
        decimal_point_index,
    } = parse_decimal(value)?;

    // Zero is a special case, whatever its exponent
    if digits.is_empty() {
        return Ok(vec![128]);
    }

    if digits.len() > NUMBER_MAX_DIGITS {
        return Err(Error::NumberOutOfRange(format!(
            "{value} has more than {NUMBER_MAX_DIGITS} significant digits"
        )));
    }
    if !(MIN_DECIMAL_POINT_INDEX..=MAX_DECIMAL_POINT_INDEX).contains(&decimal_point_index) {
        return Err(Error::NumberOutOfRange(format!(
            "magnitude of {value} is outside 1E-130 to 1E+126"
        )));
    }
    let mut decimal_point_index = decimal_point_index as i32;

    // An odd decimal point index puts a single digit in the first pair
    let prepend_zero = decimal_point_index.rem_euclid(2) == 1;
    if prepend_zero {
        digits.push(0);
        decimal_point_index += 1;
    }
    if digits.len() % 2 == 1 {
        digits.push(0);
    }

    let num_pairs = digits.len() / 2;
    let mut result = Vec::with_capacity(num_pairs + 2);

    let exponent_on_wire = (decimal_point_index.div_euclid(2) + 192) as u8;
    result.push(if is_negative {
        !exponent_on_wire
    } else {
        exponent_on_wire
    });

    let mut digit_pos = 0;
    for pair_num in 0..num_pairs {
        let pair_value = if pair_num == 0 && prepend_zero {
            digit_pos += 1;
            digits[0]
        } else {
            let v = digits[digit_pos] * 10 + digits[digit_pos + 1];
            digit_pos += 2;
            v
        };
        result.push(if is_negative {
            101 - pair_value
        } else {
            pair_value + 1
        });
    }

    if is_negative && num_pairs < MAX_MANTISSA_PAIRS {
        result.push(102);
    }

    Ok(result)
}

/// Encode an i64 to Oracle NUMBER wire format
pub fn encode_i64(value: i64) -> Result<Vec<u8>> {
    encode_oracle_number(&value.to_string())
}

/// Encode a u64 to Oracle NUMBER wire format
pub fn encode_u64(value: u64) -> Result<Vec<u8>> {
    encode_oracle_number(&value.to_string())
}

/// Encode an f64 to Oracle NUMBER wire format using its shortest exact digits
pub fn encode_f64(value: f64) -> Result<Vec<u8>> {
    if !value.is_finite() {
        return Err(Error::InvalidNumber(value.to_string()));
    }
    encode_oracle_number(&format!("{value:e}"))
}

/// Encode an f32 to Oracle NUMBER wire format using its shortest exact digits
pub fn encode_f32(value: f32) -> Result<Vec<u8>> {
    if !value.is_finite() {
        return Err(Error::InvalidNumber(value.to_string()));
    }
    encode_oracle_number(&format!("{value:e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(s: &str) -> String {
        let encoded = encode_oracle_number(s).unwrap();
        decode_oracle_number(&encoded).unwrap().as_str().to_string()
    }

    #[test]
    fn test_decode_zero() {
        let num = decode_oracle_number(&[128]).unwrap();
        assert_eq!(num.as_str(), "0");
        assert!(num.is_integer());
    }

    #[test]
    fn test_decode_positive_integer() {
        let num = decode_oracle_number(&[0xc2, 0x02, 0x18]).unwrap();
        assert_eq!(num.as_str(), "123");
        assert!(num.is_integer());
    }

    #[test]
    fn test_decode_negative_integer() {
        let num = decode_oracle_number(&[0x3d, 0x64, 0x4e, 0x66]).unwrap();
        assert_eq!(num.as_str(), "-123");
    }

    #[test]
    fn test_decode_decimal() {
        let num = decode_oracle_number(&[0xc1, 0x02, 0x33]).unwrap();
        assert_eq!(num.as_str(), "1.5");
        assert!(!num.is_integer());
    }

    #[test]
    fn test_decode_max_negative() {
        let num = decode_oracle_number(&[0x00]).unwrap();
        assert!(num.is_max_negative());
        assert_eq!(num.to_f64().unwrap(), -1e126);
        assert!(num.to_i64().is_err());
    }

    #[test]
    fn test_decode_rejects_bad_mantissa() {
        assert!(matches!(
            decode_oracle_number(&[0xc1, 0xff]),
            Err(Error::InvalidNumber(_))
        ));
        assert!(decode_oracle_number(&[]).is_err());
    }

    #[test]
    fn test_exponential_inputs_expand() {
        assert_eq!(roundtrip("4E+8"), "400000000");
        assert_eq!(roundtrip("1.521E+15"), "1521000000000000");
        assert_eq!(roundtrip("5.478E+18"), "5478000000000000000");
        assert_eq!(roundtrip("1E+11"), "100000000000");
        assert_eq!(roundtrip("1.5e10"), "15000000000");
    }

    #[test]
    fn test_small_fractions() {
        assert_eq!(roundtrip("1e-08"), "0.00000001");
        assert_eq!(roundtrip("1e-09"), "0.000000001");
        assert_eq!(roundtrip("0.05"), "0.05");
        assert_eq!(roundtrip("-0.005"), "-0.005");
        assert_eq!(roundtrip(".25"), "0.25");
    }

    #[test]
    fn test_zero_forms() {
        assert_eq!(roundtrip("-0"), "0");
        assert_eq!(roundtrip("0.0"), "0");
        assert_eq!(roundtrip("-0.0"), "0");
        assert_eq!(encode_oracle_number("0E+500").unwrap(), vec![128]);
    }

    #[test]
    fn test_full_precision_roundtrip() {
        let value = "-1234567890123456789012345678901234567.8";
        assert_eq!(roundtrip(value), value);
        assert_eq!(roundtrip("18446744073709551615"), "18446744073709551615");
    }

    #[test]
    fn test_range_limits() {
        assert!(encode_oracle_number("9E+125").is_ok());
        assert_eq!(roundtrip("9E+125").len(), 126);
        assert!(matches!(
            encode_oracle_number("1E+126"),
            Err(Error::NumberOutOfRange(_))
        ));
        assert!(matches!(
            encode_oracle_number("-1E+126"),
            Err(Error::NumberOutOfRange(_))
        ));
        assert!(encode_oracle_number("1E-130").is_ok());
        assert!(matches!(
            encode_oracle_number("1E-131"),
            Err(Error::NumberOutOfRange(_))
        ));
        assert!(matches!(
            encode_oracle_number("1E+99999999999999999999"),
            Err(Error::NumberOutOfRange(_))
        ));
    }

    #[test]
    fn test_smallest_magnitude_roundtrip() {
        let decoded = roundtrip("1E-130");
        assert!(decoded.starts_with("0.000"));
        assert!(decoded.ends_with('1'));
        // 0. + 129 zeros + 1
        assert_eq!(decoded.len(), 2 + 129 + 1);
        assert_eq!(roundtrip(&decoded), decoded);
    }

    #[test]
    fn test_precision_limit() {
        let thirty_eight = "12345678901234567890123456789012345678";
        assert_eq!(roundtrip(thirty_eight), thirty_eight);
        let thirty_nine = "123456789012345678901234567890123456789";
        assert!(matches!(
            encode_oracle_number(thirty_nine),
            Err(Error::NumberOutOfRange(_))
        ));
        // trailing zeros are not significant
        assert!(encode_oracle_number("123456789012345678901234567890123456780000").is_ok());
    }

    #[test]
    fn test_invalid_text() {
        for bad in ["www.json.org", "1.2.3", "a", "inf", "nan", "", "-", ".", "1e", "12abc", "--1", "1e+-2"] {
            assert!(
                matches!(encode_oracle_number(bad), Err(Error::InvalidNumber(_))),
                "{bad:?} should be rejected as invalid"
            );
        }
    }

    #[test]
    fn test_string_too_long() {
        let long = "1".repeat(NUMBER_AS_TEXT_CHARS + 1);
        assert!(matches!(
            encode_oracle_number(&long),
            Err(Error::NumberStringTooLong)
        ));
    }

    #[test]
    fn test_encode_decode_idempotent() {
        for s in ["1.500", "-00012.3400", "7E-3", "+42", "3.14159"] {
            let once = roundtrip(s);
            assert_eq!(roundtrip(&once), once);
        }
    }

    #[test]
    fn test_integer_conversions() {
        let encoded = encode_i64(i64::MIN).unwrap();
        let decoded = decode_oracle_number(&encoded).unwrap();
        assert_eq!(decoded.to_i64().unwrap(), i64::MIN);

        let encoded = encode_u64(u64::MAX).unwrap();
        let decoded = decode_oracle_number(&encoded).unwrap();
        assert_eq!(decoded.to_u64().unwrap(), u64::MAX);
        assert!(matches!(decoded.to_i64(), Err(Error::NumberOutOfRange(_))));

        let fractional = decode_oracle_number(&encode_oracle_number("2.5").unwrap()).unwrap();
        assert!(matches!(fractional.to_i64(), Err(Error::NumberOutOfRange(_))));

        let negative = decode_oracle_number(&encode_i64(-5).unwrap()).unwrap();
        assert!(negative.to_u64().is_err());
    }

    #[test]
    fn test_float_conversions() {
        let decoded = decode_oracle_number(&encode_f64(0.1).unwrap()).unwrap();
        assert_eq!(decoded.as_str(), "0.1");
        assert_eq!(decoded.to_f64().unwrap(), 0.1);

        let decoded = decode_oracle_number(&encode_f32(1.25).unwrap()).unwrap();
        assert_eq!(decoded.as_str(), "1.25");

        assert!(matches!(encode_f64(f64::NAN), Err(Error::InvalidNumber(_))));
        assert!(matches!(
            encode_f64(f64::INFINITY),
            Err(Error::InvalidNumber(_))
        ));
        assert!(matches!(encode_f64(1e200), Err(Error::NumberOutOfRange(_))));
    }

    // =========================================================================
    // WIRE-LEVEL FORMAT TESTS
    // =========================================================================

    /// Negative numbers end with 0x66 (102) unless all 20 mantissa pairs are used.
    #[test]
    fn test_wire_number_negative_terminator_0x66() {
        let encoded = encode_oracle_number("-123").unwrap();
        assert_eq!(*encoded.last().unwrap(), 0x66);

        let pos_encoded = encode_oracle_number("123").unwrap();
        assert_ne!(*pos_encoded.last().unwrap(), 0x66);
    }

    /// Exponent byte: 0xC1 + exponent for positives, inverted for negatives.
    #[test]
    fn test_wire_number_exponent_encoding() {
        assert_eq!(encode_oracle_number("0").unwrap(), vec![0x80]);
        assert_eq!(encode_oracle_number("5").unwrap()[0], 0xC1);
        assert_eq!(encode_oracle_number("123").unwrap()[0], 0xC2);
        assert_eq!(encode_oracle_number("-5").unwrap(), vec![0x3E, 0x60, 0x66]);
        assert_eq!(encode_oracle_number("0.05").unwrap(), vec![0xC0, 0x06]);
    }

    /// Mantissa bytes are base-100 digits stored as value + 1.
    #[test]
    fn test_wire_number_base100_encoding() {
        assert_eq!(encode_oracle_number("12").unwrap(), vec![0xC1, 13]);
        assert_eq!(encode_oracle_number("99").unwrap(), vec![0xC1, 100]);
        assert_eq!(encode_oracle_number("100").unwrap(), vec![0xC2, 2]);
        assert_eq!(encode_oracle_number("1234").unwrap(), vec![0xC2, 13, 35]);
    }
}
