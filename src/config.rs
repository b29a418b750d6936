//! Engine configuration
//!
//! A [`Config`] is handed to [`Context::with_config`](crate::Context::with_config)
//! and applies to every variable and statement created through that context.
//!
//! ```
//! use oracle_vars::Config;
//!
//! let config = Config::new()
//!     .fetch_array_size(250)
//!     .lob_chunk_size(16 * 1024);
//! assert_eq!(config.fetch_array_size, 250);
//! ```

use crate::constants::{DEFAULT_FETCH_ARRAY_SIZE, MAX_BASIC_BUFFER_SIZE};

/// Default LOB chunk size in bytes
pub const DEFAULT_LOB_CHUNK_SIZE: u32 = 8132;

/// Default upper bound on `max_array_size * element size` for one variable
pub const DEFAULT_MAX_ARRAY_BYTES: u64 = i32::MAX as u64;

/// Default maximum bytes per character in the database character set (AL32UTF8)
pub const DEFAULT_MAX_BYTES_PER_CHARACTER: u32 = 4;

/// Default maximum bytes per character in the national character set (AL16UTF16)
pub const DEFAULT_MAX_BYTES_PER_NCHAR: u32 = 2;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Rows fetched per round trip for new statements
    pub fetch_array_size: u32,
    /// Element sizes above this use the dynamic byte pool
    pub max_basic_buffer_size: u32,
    /// Upper bound on the total byte size of one variable
    pub max_array_bytes: u64,
    /// Chunk size reported by LOBs
    pub lob_chunk_size: u32,
    /// Maximum bytes per character (CHAR/VARCHAR/CLOB)
    pub max_bytes_per_character: u32,
    /// Maximum bytes per national character (NCHAR/NVARCHAR/NCLOB)
    pub max_bytes_per_nchar: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_array_size: DEFAULT_FETCH_ARRAY_SIZE,
            max_basic_buffer_size: MAX_BASIC_BUFFER_SIZE,
            max_array_bytes: DEFAULT_MAX_ARRAY_BYTES,
            lob_chunk_size: DEFAULT_LOB_CHUNK_SIZE,
            max_bytes_per_character: DEFAULT_MAX_BYTES_PER_CHARACTER,
            max_bytes_per_nchar: DEFAULT_MAX_BYTES_PER_NCHAR,
        }
    }
}

impl Config {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fetch array size for new statements (0 selects the default)
    pub fn fetch_array_size(mut self, size: u32) -> Self {
        self.fetch_array_size = if size == 0 {
            DEFAULT_FETCH_ARRAY_SIZE
        } else {
            size
        };
        self
    }

    /// Set the element size threshold for the dynamic byte pool
    pub fn max_basic_buffer_size(mut self, size: u32) -> Self {
        self.max_basic_buffer_size = size;
        self
    }

    /// Set the upper bound on a variable's total byte size
    pub fn max_array_bytes(mut self, bytes: u64) -> Self {
        self.max_array_bytes = bytes;
        self
    }

    /// Set the LOB chunk size
    pub fn lob_chunk_size(mut self, size: u32) -> Self {
        self.lob_chunk_size = size;
        self
    }

    /// Set the maximum bytes per character for both character sets
    pub fn bytes_per_character(mut self, chars: u32, nchars: u32) -> Self {
        self.max_bytes_per_character = chars;
        self.max_bytes_per_nchar = nchars;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fetch_array_size, 100);
        assert_eq!(config.max_basic_buffer_size, 32767);
        assert_eq!(config.lob_chunk_size, DEFAULT_LOB_CHUNK_SIZE);
    }

    #[test]
    fn test_zero_fetch_array_size_selects_default() {
        let config = Config::new().fetch_array_size(7).fetch_array_size(0);
        assert_eq!(config.fetch_array_size, DEFAULT_FETCH_ARRAY_SIZE);
    }

    #[test]
    fn test_builder_chain() {
        let config = Config::new()
            .max_basic_buffer_size(4000)
            .max_array_bytes(1 << 20)
            .bytes_per_character(3, 2);
        assert_eq!(config.max_basic_buffer_size, 4000);
        assert_eq!(config.max_array_bytes, 1 << 20);
        assert_eq!(config.max_bytes_per_character, 3);
    }
}
