//! Oracle INTERVAL encoding and decoding
//!
//! INTERVAL DAY TO SECOND (11 bytes):
//! - Bytes 0-3: Days + 0x80000000 (big-endian u32)
//! - Byte 4: Hours + 60
//! - Byte 5: Minutes + 60
//! - Byte 6: Seconds + 60
//! - Bytes 7-10: Fractional seconds in nanoseconds + 0x80000000 (big-endian u32)
//!
//! INTERVAL YEAR TO MONTH (5 bytes):
//! - Bytes 0-3: Years + 0x80000000 (big-endian u32)
//! - Byte 4: Months + 60

use crate::error::{Error, Result};

const INTERVAL_OFFSET: i64 = 0x8000_0000;
const FIELD_OFFSET: i32 = 60;

/// Interval day to second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntervalDs {
    /// Days
    pub days: i32,
    /// Hours (-23 to 23)
    pub hours: i32,
    /// Minutes (-59 to 59)
    pub minutes: i32,
    /// Seconds (-59 to 59)
    pub seconds: i32,
    /// Fractional seconds in nanoseconds
    pub fseconds: i32,
}

impl IntervalDs {
    /// Create a day-to-second interval
    pub fn new(days: i32, hours: i32, minutes: i32, seconds: i32, fseconds: i32) -> Self {
        Self {
            days,
            hours,
            minutes,
            seconds,
            fseconds,
        }
    }

    fn validate(&self) -> Result<()> {
        let fields = [self.days, self.hours, self.minutes, self.seconds, self.fseconds];
        let mixed_signs = fields.iter().any(|f| *f > 0) && fields.iter().any(|f| *f < 0);
        if mixed_signs
            || self.hours.abs() > 23
            || self.minutes.abs() > 59
            || self.seconds.abs() > 59
            || self.fseconds.abs() > 999_999_999
        {
            return Err(Error::InvalidDate(format!("invalid day to second interval {self:?}")));
        }
        Ok(())
    }
}

/// Interval year to month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntervalYm {
    /// Years
    pub years: i32,
    /// Months (-11 to 11)
    pub months: i32,
}

impl IntervalYm {
    /// Create a year-to-month interval
    pub fn new(years: i32, months: i32) -> Self {
        Self { years, months }
    }
}

fn offset_u32(value: i32) -> [u8; 4] {
    ((value as i64 + INTERVAL_OFFSET) as u32).to_be_bytes()
}

fn from_offset_u32(bytes: [u8; 4]) -> i32 {
    (u32::from_be_bytes(bytes) as i64 - INTERVAL_OFFSET) as i32
}

/// Encode an INTERVAL DAY TO SECOND (11 bytes)
pub fn encode_interval_ds(value: &IntervalDs) -> Result<[u8; 11]> {
    value.validate()?;
    let mut out = [0u8; 11];
    out[..4].copy_from_slice(&offset_u32(value.days));
    out[4] = (value.hours + FIELD_OFFSET) as u8;
    out[5] = (value.minutes + FIELD_OFFSET) as u8;
    out[6] = (value.seconds + FIELD_OFFSET) as u8;
    out[7..].copy_from_slice(&offset_u32(value.fseconds));
    Ok(out)
}

/// Decode an INTERVAL DAY TO SECOND
pub fn decode_interval_ds(data: &[u8]) -> Result<IntervalDs> {
    if data.len() < 11 {
        return Err(Error::InvalidDate(format!(
            "INTERVAL DAY TO SECOND requires 11 bytes, got {}",
            data.len()
        )));
    }
    Ok(IntervalDs {
        days: from_offset_u32([data[0], data[1], data[2], data[3]]),
        hours: data[4] as i32 - FIELD_OFFSET,
        minutes: data[5] as i32 - FIELD_OFFSET,
        seconds: data[6] as i32 - FIELD_OFFSET,
        fseconds: from_offset_u32([data[7], data[8], data[9], data[10]]),
    })
}

/// Encode an INTERVAL YEAR TO MONTH (5 bytes)
pub fn encode_interval_ym(value: &IntervalYm) -> Result<[u8; 5]> {
    let mixed_signs = (value.years > 0 && value.months < 0) || (value.years < 0 && value.months > 0);
    if mixed_signs || value.months.abs() > 11 {
        return Err(Error::InvalidDate(format!("invalid year to month interval {value:?}")));
    }
    let mut out = [0u8; 5];
    out[..4].copy_from_slice(&offset_u32(value.years));
    out[4] = (value.months + FIELD_OFFSET) as u8;
    Ok(out)
}

/// Decode an INTERVAL YEAR TO MONTH
pub fn decode_interval_ym(data: &[u8]) -> Result<IntervalYm> {
    if data.len() < 5 {
        return Err(Error::InvalidDate(format!(
            "INTERVAL YEAR TO MONTH requires 5 bytes, got {}",
            data.len()
        )));
    }
    Ok(IntervalYm {
        years: from_offset_u32([data[0], data[1], data[2], data[3]]),
        months: data[4] as i32 - FIELD_OFFSET,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_ds_wire_layout() {
        let bytes = encode_interval_ds(&IntervalDs::new(1, 2, 3, 4, 5)).unwrap();
        assert_eq!(bytes, [0x80, 0, 0, 1, 62, 63, 64, 0x80, 0, 0, 5]);
    }

    #[test]
    fn test_interval_ds_roundtrip() {
        for value in [
            IntervalDs::new(0, 0, 0, 0, 0),
            IntervalDs::new(-5, -23, -59, -59, -999_999_999),
            IntervalDs::new(123_456, 12, 0, 30, 250_000_000),
        ] {
            assert_eq!(decode_interval_ds(&encode_interval_ds(&value).unwrap()).unwrap(), value);
        }
    }

    #[test]
    fn test_interval_ym_roundtrip() {
        let bytes = encode_interval_ym(&IntervalYm::new(3, 7)).unwrap();
        assert_eq!(bytes, [0x80, 0, 0, 3, 67]);
        assert_eq!(decode_interval_ym(&bytes).unwrap(), IntervalYm::new(3, 7));
        let neg = IntervalYm::new(-2, -11);
        assert_eq!(decode_interval_ym(&encode_interval_ym(&neg).unwrap()).unwrap(), neg);
    }

    #[test]
    fn test_invalid_intervals() {
        assert!(encode_interval_ds(&IntervalDs::new(0, 24, 0, 0, 0)).is_err());
        assert!(encode_interval_ds(&IntervalDs::new(1, -1, 0, 0, 0)).is_err());
        assert!(encode_interval_ym(&IntervalYm::new(1, 12)).is_err());
        assert!(decode_interval_ym(&[0x80, 0]).is_err());
    }
}
