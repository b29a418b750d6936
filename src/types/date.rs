//! Oracle DATE and TIMESTAMP encoding and decoding
//!
//! Oracle DATE format (7 bytes):
//! - Byte 0: Century (value + 100)
//! - Byte 1: Year in century (value + 100)
//! - Byte 2: Month (1-12)
//! - Byte 3: Day (1-31)
//! - Byte 4: Hour + 1 (1-24)
//! - Byte 5: Minute + 1 (1-60)
//! - Byte 6: Second + 1 (1-60)
//!
//! Oracle TIMESTAMP adds (4 more bytes):
//! - Bytes 7-10: Fractional seconds (nanoseconds as big-endian u32)
//!
//! Oracle TIMESTAMP WITH TIME ZONE adds (2 more bytes):
//! - Byte 11: Time zone hour offset + 20
//! - Byte 12: Time zone minute offset + 60
//!
//! The calendar bytes of a TIMESTAMP WITH TIME ZONE hold the instant in UTC;
//! the offset bytes say how to get back to local time.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Error, Result};

/// Timezone hour offset constant
const TZ_HOUR_OFFSET: i32 = 20;
/// Timezone minute offset constant
const TZ_MINUTE_OFFSET: i32 = 60;
/// Flag indicating named timezone (not supported)
const HAS_REGION_ID: u8 = 0x80;

/// Earliest year Oracle accepts
const MIN_YEAR: i32 = -4712;
/// Latest year Oracle accepts
const MAX_YEAR: i32 = 9999;

/// chrono's year for an Oracle year; Oracle goes from 1 BC (-1) straight to AD 1
fn chrono_year(oracle_year: i32) -> i32 {
    if oracle_year < 0 {
        oracle_year + 1
    } else {
        oracle_year
    }
}

fn oracle_year(chrono_year: i32) -> i32 {
    if chrono_year <= 0 {
        chrono_year - 1
    } else {
        chrono_year
    }
}

/// Calendar timestamp with optional time zone offset
///
/// Comparison is field-wise: two timestamps for the same instant in different
/// offsets are not equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    /// Year (-4712 to 9999, never 0)
    pub year: i16,
    /// Month (1-12)
    pub month: u8,
    /// Day (1-31)
    pub day: u8,
    /// Hour (0-23)
    pub hour: u8,
    /// Minute (0-59)
    pub minute: u8,
    /// Second (0-59)
    pub second: u8,
    /// Fractional seconds in nanoseconds (0-999999999)
    pub fsecond: u32,
    /// Timezone hour offset (-12 to +14)
    pub tz_hour_offset: i8,
    /// Timezone minute offset (-59 to +59)
    pub tz_minute_offset: i8,
}

impl Timestamp {
    /// Create a new timestamp without timezone
    pub fn new(
        year: i16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        fsecond: u32,
    ) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            fsecond,
            tz_hour_offset: 0,
            tz_minute_offset: 0,
        }
    }

    /// Create a date-only value (time set to 00:00:00)
    pub fn date(year: i16, month: u8, day: u8) -> Self {
        Self::new(year, month, day, 0, 0, 0, 0)
    }

    /// Set the timezone offset
    pub fn with_timezone(mut self, tz_hour_offset: i8, tz_minute_offset: i8) -> Self {
        self.tz_hour_offset = tz_hour_offset;
        self.tz_minute_offset = tz_minute_offset;
        self
    }

    /// Check if this timestamp has a non-zero timezone offset
    pub fn has_timezone(&self) -> bool {
        self.tz_hour_offset != 0 || self.tz_minute_offset != 0
    }

    /// Copy of this timestamp with the timezone fields cleared
    pub fn without_timezone(&self) -> Self {
        self.with_timezone(0, 0)
    }

    /// Total offset from UTC in seconds
    pub fn offset_seconds(&self) -> i32 {
        self.tz_hour_offset as i32 * 3600 + self.tz_minute_offset as i32 * 60
    }

    /// Validate the calendar fields and convert to a chrono date-time (offset ignored)
    pub fn to_naive(&self) -> Result<NaiveDateTime> {
        let year = self.year as i32;
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(Error::InvalidDate(format!("year {year} is out of range")));
        }
        self.calendar()
    }

    /// Calendar validation without the year range check
    fn calendar(&self) -> Result<NaiveDateTime> {
        let year = self.year as i32;
        if year == 0 {
            return Err(Error::InvalidDate("year 0 does not exist".to_string()));
        }
        let date = NaiveDate::from_ymd_opt(chrono_year(year), self.month as u32, self.day as u32)
            .ok_or_else(|| {
                Error::InvalidDate(format!(
                    "{}-{:02}-{:02} is not a calendar date",
                    year, self.month, self.day
                ))
            })?;
        date.and_hms_nano_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
            self.fsecond,
        )
        .ok_or_else(|| {
            Error::InvalidDate(format!(
                "{:02}:{:02}:{:02}.{:09} is not a time of day",
                self.hour, self.minute, self.second, self.fsecond
            ))
        })
    }

    /// Convert to a chrono date-time carrying this timestamp's offset
    pub fn to_date_time(&self) -> Result<DateTime<FixedOffset>> {
        self.check_offset()?;
        let offset = FixedOffset::east_opt(self.offset_seconds())
            .ok_or_else(|| Error::InvalidDate("timezone offset out of range".to_string()))?;
        self.to_naive()?
            .and_local_timezone(offset)
            .single()
            .ok_or_else(|| Error::InvalidDate("ambiguous local time".to_string()))
    }

    fn check_offset(&self) -> Result<()> {
        let h = self.tz_hour_offset;
        let m = self.tz_minute_offset;
        if !(-12..=14).contains(&h) || !(-59..=59).contains(&m) || (h != 0 && m != 0 && h.signum() != m.signum()) {
            return Err(Error::InvalidDate(format!(
                "timezone offset {h:+}:{m:02} is out of range"
            )));
        }
        Ok(())
    }

    fn from_naive(value: &NaiveDateTime) -> Self {
        Self::new(
            oracle_year(value.year()) as i16,
            value.month() as u8,
            value.day() as u8,
            value.hour() as u8,
            value.minute() as u8,
            value.second() as u8,
            value.nanosecond(),
        )
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::date(1, 1, 1)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self::from_naive(&value)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        let offset = value.offset().local_minus_utc();
        Self::from_naive(&value.naive_local())
            .with_timezone((offset / 3600) as i8, ((offset % 3600) / 60) as i8)
    }
}

fn date_bytes(value: &NaiveDateTime) -> [u8; 7] {
    let year = oracle_year(value.year());
    [
        (year / 100 + 100) as u8,
        (year % 100 + 100) as u8,
        value.month() as u8,
        value.day() as u8,
        value.hour() as u8 + 1,
        value.minute() as u8 + 1,
        value.second() as u8 + 1,
    ]
}

/// Encode a timestamp as an Oracle DATE (7 bytes); fractional seconds and offset are ignored
pub fn encode_date(ts: &Timestamp) -> Result<[u8; 7]> {
    let naive = ts.to_naive()?;
    Ok(date_bytes(&naive))
}

/// Encode a timestamp as an Oracle TIMESTAMP (11 bytes); the offset is ignored
pub fn encode_timestamp(ts: &Timestamp) -> Result<[u8; 11]> {
    let naive = ts.to_naive()?;
    let mut out = [0u8; 11];
    out[..7].copy_from_slice(&date_bytes(&naive));
    out[7..].copy_from_slice(&ts.fsecond.to_be_bytes());
    Ok(out)
}

/// Encode a timestamp as an Oracle TIMESTAMP WITH TIME ZONE (13 bytes)
pub fn encode_timestamp_tz(ts: &Timestamp) -> Result<[u8; 13]> {
    ts.check_offset()?;
    let utc = ts.to_naive()? - Duration::seconds(ts.offset_seconds() as i64);
    let mut out = [0u8; 13];
    out[..7].copy_from_slice(&date_bytes(&utc));
    out[7..11].copy_from_slice(&ts.fsecond.to_be_bytes());
    out[11] = (ts.tz_hour_offset as i32 + TZ_HOUR_OFFSET) as u8;
    out[12] = (ts.tz_minute_offset as i32 + TZ_MINUTE_OFFSET) as u8;
    Ok(out)
}

fn fields(data: &[u8], fsecond: u32) -> Timestamp {
    let year = (data[0] as i32 - 100) * 100 + (data[1] as i32 - 100);
    Timestamp {
        year: year as i16,
        month: data[2],
        day: data[3],
        hour: data[4].wrapping_sub(1),
        minute: data[5].wrapping_sub(1),
        second: data[6].wrapping_sub(1),
        fsecond,
        tz_hour_offset: 0,
        tz_minute_offset: 0,
    }
}

fn decode_fields(data: &[u8], fsecond: u32) -> Result<Timestamp> {
    let ts = fields(data, fsecond);
    ts.to_naive()?;
    Ok(ts)
}

/// Decode an Oracle DATE from wire format bytes (7 bytes)
pub fn decode_date(data: &[u8]) -> Result<Timestamp> {
    if data.len() < 7 {
        return Err(Error::InvalidDate(format!(
            "Oracle DATE requires 7 bytes, got {}",
            data.len()
        )));
    }
    decode_fields(data, 0)
}

/// Decode an Oracle TIMESTAMP (or DATE) from wire format bytes; offset fields are reported as zero
pub fn decode_timestamp(data: &[u8]) -> Result<Timestamp> {
    if data.len() < 7 {
        return Err(Error::InvalidDate(format!(
            "Oracle TIMESTAMP requires at least 7 bytes, got {}",
            data.len()
        )));
    }
    let fsecond = if data.len() >= 11 {
        u32::from_be_bytes([data[7], data[8], data[9], data[10]])
    } else {
        0
    };
    decode_fields(data, fsecond)
}

/// Decode an Oracle TIMESTAMP WITH TIME ZONE from wire format bytes (13 bytes)
///
/// The UTC instant may fall one day outside the supported years; the range
/// applies to the local time.
pub fn decode_timestamp_tz(data: &[u8]) -> Result<Timestamp> {
    if data.len() < 13 {
        return decode_timestamp(data);
    }
    if data[11] & HAS_REGION_ID != 0 {
        return Err(Error::NotSupported(
            "named time zone regions".to_string(),
        ));
    }
    let fsecond = u32::from_be_bytes([data[7], data[8], data[9], data[10]]);
    let tz_hour = data[11] as i32 - TZ_HOUR_OFFSET;
    let tz_minute = data[12] as i32 - TZ_MINUTE_OFFSET;
    let utc = fields(data, fsecond).calendar()?;
    let local = utc + Duration::seconds((tz_hour * 3600 + tz_minute * 60) as i64);
    let ts = Timestamp::from_naive(&local).with_timezone(tz_hour as i8, tz_minute as i8);
    ts.check_offset()?;
    ts.to_naive()?;
    Ok(ts)
}
