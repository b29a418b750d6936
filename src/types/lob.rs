//! LOB (Large Object) streams
//!
//! This module provides the in-engine stream behind CLOB, NCLOB, BLOB and
//! BFILE handles. Offsets are 1-based. Sizes and amounts are measured in
//! characters for character LOBs and in bytes otherwise.

use bytes::{Bytes, BytesMut};

use crate::config::Config;
use crate::constants::OracleType;
use crate::error::{Error, Result};

/// Largest size, in characters or bytes, a LOB may grow to
pub const MAX_LOB_SIZE: u64 = u32::MAX as u64;

/// A LOB stream
#[derive(Debug, Clone, PartialEq)]
pub struct Lob {
    oracle_type: OracleType,
    data: BytesMut,
    chunk_size: u32,
    is_temporary: bool,
    resource_open: bool,
    closed: bool,
    file: Option<(String, String)>,
}

impl Lob {
    /// Create an empty LOB of the given type
    pub fn new(oracle_type: OracleType, chunk_size: u32) -> Result<Self> {
        if !oracle_type.is_lob() {
            return Err(Error::NotSupported(format!(
                "{oracle_type:?} is not a LOB type"
            )));
        }
        Ok(Self {
            oracle_type,
            data: BytesMut::new(),
            chunk_size,
            is_temporary: false,
            resource_open: false,
            closed: false,
            file: None,
        })
    }

    /// Create a temporary LOB
    pub fn temporary(oracle_type: OracleType, chunk_size: u32) -> Result<Self> {
        if oracle_type == OracleType::Bfile {
            return Err(Error::NotSupported(
                "temporary LOBs cannot be BFILEs".to_string(),
            ));
        }
        let mut lob = Self::new(oracle_type, chunk_size)?;
        lob.is_temporary = true;
        Ok(lob)
    }

    /// Create a LOB holding data received from the database
    pub fn from_wire(oracle_type: OracleType, chunk_size: u32, data: &[u8]) -> Result<Self> {
        let mut lob = Self::new(oracle_type, chunk_size)?;
        lob.data.extend_from_slice(data);
        Ok(lob)
    }

    fn check(&self) -> Result<()> {
        if self.closed {
            return Err(Error::LobClosed);
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        self.check()?;
        if self.oracle_type == OracleType::Bfile {
            return Err(Error::NotSupported("BFILEs are read-only".to_string()));
        }
        Ok(())
    }

    fn check_text(&self, value: &[u8]) -> Result<()> {
        if self.oracle_type.is_character_data() && std::str::from_utf8(value).is_err() {
            return Err(Error::NotSupported(
                "character LOB data must be valid UTF-8".to_string(),
            ));
        }
        Ok(())
    }

    fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.data)
            .map_err(|_| Error::NotSupported("character LOB holds invalid UTF-8".to_string()))
    }

    /// Convert a 1-based position in LOB units to a byte index
    fn byte_index(&self, position: u64) -> Result<usize> {
        if !self.oracle_type.is_character_data() {
            return Ok(position as usize);
        }
        let text = self.text()?;
        Ok(text
            .char_indices()
            .nth(position as usize)
            .map(|(i, _)| i)
            .unwrap_or(text.len()))
    }

    /// Oracle type of the LOB
    pub fn oracle_type(&self) -> OracleType {
        self.oracle_type
    }

    /// Check if the LOB is temporary
    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }

    /// Check if the LOB was closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Size in characters (character LOBs) or bytes
    pub fn size(&self) -> Result<u64> {
        self.check()?;
        if self.oracle_type.is_character_data() {
            Ok(self.text()?.chars().count() as u64)
        } else {
            Ok(self.data.len() as u64)
        }
    }

    /// Chunk size used for efficient reads and writes
    pub fn chunk_size(&self) -> Result<u32> {
        self.check()?;
        Ok(self.chunk_size)
    }

    /// Bytes needed to hold `size_in_chars` characters of this LOB
    pub fn buffer_size(&self, size_in_chars: u64, config: &Config) -> Result<u64> {
        self.check()?;
        Ok(match self.oracle_type {
            OracleType::Clob => size_in_chars * config.max_bytes_per_character as u64,
            OracleType::NClob => size_in_chars * config.max_bytes_per_nchar as u64,
            _ => size_in_chars,
        })
    }

    /// Read up to `amount` units starting at the 1-based `offset`
    pub fn read(&self, offset: u64, amount: u64) -> Result<Bytes> {
        self.check()?;
        if offset == 0 {
            return Err(Error::InvalidIndex(0));
        }
        let start = self.byte_index(offset - 1)?;
        let end = self.byte_index((offset - 1).saturating_add(amount))?;
        let end = end.min(self.data.len());
        if start >= end {
            return Ok(Bytes::new());
        }
        Ok(Bytes::copy_from_slice(&self.data[start..end]))
    }

    /// Write `value` starting at the 1-based `offset`
    ///
    /// Writing past the end pads the gap with zero bytes (BLOB) or spaces
    /// (character LOBs). The result may not exceed [`MAX_LOB_SIZE`].
    pub fn write(&mut self, offset: u64, value: &[u8]) -> Result<()> {
        self.check_writable()?;
        if offset == 0 {
            return Err(Error::InvalidIndex(0));
        }
        if (offset - 1).saturating_add(value.len() as u64) > MAX_LOB_SIZE {
            return Err(Error::InvalidIndex(i64::try_from(offset).unwrap_or(i64::MAX)));
        }
        self.check_text(value)?;
        let size = self.size()?;
        if offset - 1 > size {
            let fill = if self.oracle_type.is_character_data() {
                b' '
            } else {
                0
            };
            let gap = (offset - 1 - size) as usize;
            self.data.resize(self.data.len() + gap, fill);
        }
        let start = self.byte_index(offset - 1)?;
        let replaced_units = if self.oracle_type.is_character_data() {
            self.text()?
                .get(start..)
                .map(|rest| {
                    let written = String::from_utf8_lossy(value).chars().count();
                    rest.char_indices()
                        .nth(written)
                        .map(|(i, _)| i)
                        .unwrap_or(rest.len())
                })
                .unwrap_or(0)
        } else {
            value.len().min(self.data.len() - start)
        };
        let tail = self.data.split_off(start + replaced_units);
        self.data.truncate(start);
        self.data.extend_from_slice(value);
        self.data.extend_from_slice(&tail);
        tracing::trace!(offset, len = value.len(), "LOB write");
        Ok(())
    }

    /// Replace the whole content of the LOB
    pub fn set_from_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.check_writable()?;
        self.check_text(value)?;
        self.data.clear();
        self.data.extend_from_slice(value);
        Ok(())
    }

    /// Trim the LOB to `new_size` units
    pub fn trim(&mut self, new_size: u64) -> Result<()> {
        self.check_writable()?;
        if new_size > self.size()? {
            return Err(Error::InvalidIndex(new_size as i64));
        }
        let end = self.byte_index(new_size)?;
        self.data.truncate(end);
        Ok(())
    }

    /// Open the LOB resource for a series of writes
    pub fn open_resource(&mut self) -> Result<()> {
        self.check()?;
        self.resource_open = true;
        Ok(())
    }

    /// Close the LOB resource
    pub fn close_resource(&mut self) -> Result<()> {
        self.check()?;
        self.resource_open = false;
        Ok(())
    }

    /// Check if the LOB resource is open
    pub fn is_resource_open(&self) -> Result<bool> {
        self.check()?;
        Ok(self.resource_open)
    }

    /// Close the LOB; every later operation fails with [`Error::LobClosed`]
    pub fn close(&mut self) {
        self.closed = true;
        self.resource_open = false;
        self.data = BytesMut::new();
    }

    /// Independent copy of the LOB content
    pub fn copy(&self) -> Result<Self> {
        self.check()?;
        let mut lob = self.clone();
        lob.resource_open = false;
        Ok(lob)
    }

    /// Directory alias and file name of a BFILE
    pub fn directory_and_file_name(&self) -> Result<(&str, &str)> {
        self.check()?;
        if self.oracle_type != OracleType::Bfile {
            return Err(Error::NotSupported(format!(
                "{:?} LOBs have no file name",
                self.oracle_type
            )));
        }
        Ok(self
            .file
            .as_ref()
            .map(|(dir, file)| (dir.as_str(), file.as_str()))
            .unwrap_or(("", "")))
    }

    /// Set the directory alias and file name of a BFILE
    pub fn set_directory_and_file_name(
        &mut self,
        directory_alias: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<()> {
        self.check()?;
        if self.oracle_type != OracleType::Bfile {
            return Err(Error::NotSupported(format!(
                "{:?} LOBs have no file name",
                self.oracle_type
            )));
        }
        self.file = Some((directory_alias.into(), file_name.into()));
        Ok(())
    }

    /// Raw content as sent to the database
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob() -> Lob {
        Lob::temporary(OracleType::Blob, 8132).unwrap()
    }

    #[test]
    fn test_blob_write_read() {
        let mut lob = blob();
        lob.set_from_bytes(b"hello world").unwrap();
        assert_eq!(lob.size().unwrap(), 11);
        assert_eq!(&lob.read(7, 5).unwrap()[..], b"world");
        assert_eq!(&lob.read(7, 100).unwrap()[..], b"world");
        assert!(lob.read(20, 5).unwrap().is_empty());
    }

    #[test]
    fn test_blob_write_past_end_pads() {
        let mut lob = blob();
        lob.write(4, b"ab").unwrap();
        assert_eq!(&lob.read(1, 10).unwrap()[..], &[0, 0, 0, b'a', b'b']);
        lob.write(1, b"XY").unwrap();
        assert_eq!(&lob.read(1, 10).unwrap()[..], &[b'X', b'Y', 0, b'a', b'b']);
    }

    #[test]
    fn test_write_beyond_max_size_fails() {
        let mut lob = blob();
        lob.set_from_bytes(b"abc").unwrap();
        assert!(matches!(
            lob.write(u64::MAX, b"x"),
            Err(Error::InvalidIndex(i64::MAX))
        ));
        assert!(matches!(
            lob.write(MAX_LOB_SIZE, b"xy"),
            Err(Error::InvalidIndex(_))
        ));
        assert_eq!(&lob.read(1, 10).unwrap()[..], b"abc");
    }

    #[test]
    fn test_clob_sizes_in_characters() {
        let mut lob = Lob::temporary(OracleType::Clob, 8132).unwrap();
        lob.set_from_bytes("héllo".as_bytes()).unwrap();
        assert_eq!(lob.size().unwrap(), 5);
        assert_eq!(&lob.read(2, 2).unwrap()[..], "él".as_bytes());
        lob.trim(2).unwrap();
        assert_eq!(&lob.read(1, 10).unwrap()[..], "hé".as_bytes());
        assert_eq!(lob.buffer_size(10, &Config::default()).unwrap(), 40);
    }

    #[test]
    fn test_nclob_buffer_size() {
        let lob = Lob::temporary(OracleType::NClob, 8132).unwrap();
        assert_eq!(lob.buffer_size(10, &Config::default()).unwrap(), 20);
        assert_eq!(blob().buffer_size(10, &Config::default()).unwrap(), 10);
    }

    #[test]
    fn test_closed_lob_rejects_operations() {
        let mut lob = blob();
        lob.close();
        assert!(matches!(lob.size(), Err(Error::LobClosed)));
        assert!(matches!(lob.write(1, b"x"), Err(Error::LobClosed)));
        assert!(matches!(lob.copy(), Err(Error::LobClosed)));
    }

    #[test]
    fn test_resource_open_close() {
        let mut lob = blob();
        assert!(!lob.is_resource_open().unwrap());
        lob.open_resource().unwrap();
        assert!(lob.is_resource_open().unwrap());
        lob.close_resource().unwrap();
        assert!(!lob.is_resource_open().unwrap());
    }

    #[test]
    fn test_bfile_names() {
        let mut lob = Lob::new(OracleType::Bfile, 8132).unwrap();
        assert_eq!(lob.directory_and_file_name().unwrap(), ("", ""));
        lob.set_directory_and_file_name("TEST_DIR", "test.txt").unwrap();
        assert_eq!(lob.directory_and_file_name().unwrap(), ("TEST_DIR", "test.txt"));
        assert!(lob.write(1, b"x").is_err());
        assert!(blob().directory_and_file_name().is_err());
    }

    #[test]
    fn test_trim_beyond_size_fails() {
        let mut lob = blob();
        lob.set_from_bytes(b"abc").unwrap();
        assert!(matches!(lob.trim(4), Err(Error::InvalidIndex(4))));
        lob.trim(0).unwrap();
        assert_eq!(lob.size().unwrap(), 0);
    }
}
