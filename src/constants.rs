//! Type tables and engine constants
//!
//! This module contains the Oracle type table (wire type numbers, default native
//! types, fixed buffer sizes and array eligibility), the host-side native type
//! list, and the enums shared by binding and execution.

// =============================================================================
// Native Types
// =============================================================================

/// Host-side kind of a value held in a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    /// 64-bit signed integer
    Int64,
    /// 64-bit unsigned integer
    Uint64,
    /// Single-precision float
    Float,
    /// Double-precision float
    Double,
    /// Byte string (character data is encoded bytes)
    Bytes,
    /// Calendar timestamp with optional time zone offset
    Timestamp,
    /// Interval day to second
    IntervalDs,
    /// Interval year to month
    IntervalYm,
    /// Handle to a LOB stream
    Lob,
    /// Handle to an object instance
    Object,
    /// Handle to a statement (ref cursor)
    Stmt,
    /// Boolean
    Boolean,
    /// Handle to a row identifier
    Rowid,
}

impl NativeType {
    /// Check if values of this kind are stored in the variable's byte store
    pub fn uses_byte_store(&self) -> bool {
        matches!(self, NativeType::Bytes)
    }

    /// Check if values of this kind are reference-counted handles
    pub fn is_handle(&self) -> bool {
        matches!(
            self,
            NativeType::Lob | NativeType::Object | NativeType::Stmt | NativeType::Rowid
        )
    }
}

// =============================================================================
// Oracle Types
// =============================================================================

/// Character set forms
#[allow(missing_docs)]
pub mod csfrm {
    pub const IMPLICIT: u8 = 1;
    pub const NCHAR: u8 = 2;
}

/// Wire data type numbers
#[allow(missing_docs)]
pub mod wire_type {
    pub const VARCHAR: u16 = 1;
    pub const NUMBER: u16 = 2;
    pub const BINARY_INTEGER: u16 = 3;
    pub const UNSIGNED_INT: u16 = 68;
    pub const LONG: u16 = 8;
    pub const ROWID: u16 = 11;
    pub const DATE: u16 = 12;
    pub const RAW: u16 = 23;
    pub const LONG_RAW: u16 = 24;
    pub const CHAR: u16 = 96;
    pub const BINARY_FLOAT: u16 = 100;
    pub const BINARY_DOUBLE: u16 = 101;
    pub const CURSOR: u16 = 102;
    pub const OBJECT: u16 = 109;
    pub const CLOB: u16 = 112;
    pub const BLOB: u16 = 113;
    pub const BFILE: u16 = 114;
    pub const TIMESTAMP: u16 = 180;
    pub const TIMESTAMP_TZ: u16 = 181;
    pub const INTERVAL_YM: u16 = 182;
    pub const INTERVAL_DS: u16 = 183;
    pub const UROWID: u16 = 208;
    pub const TIMESTAMP_LTZ: u16 = 231;
    pub const BOOLEAN: u16 = 252;
}

/// Database types a variable can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleType {
    /// VARCHAR2
    Varchar,
    /// NVARCHAR2
    NVarchar,
    /// CHAR fixed-length string
    Char,
    /// NCHAR fixed-length string
    NChar,
    /// ROWID
    Rowid,
    /// RAW binary type
    Raw,
    /// BINARY_FLOAT
    NativeFloat,
    /// BINARY_DOUBLE
    NativeDouble,
    /// PLS_INTEGER / BINARY_INTEGER
    NativeInt,
    /// Unsigned native integer
    NativeUint,
    /// NUMBER
    Number,
    /// DATE
    Date,
    /// TIMESTAMP
    Timestamp,
    /// TIMESTAMP WITH TIME ZONE
    TimestampTz,
    /// TIMESTAMP WITH LOCAL TIME ZONE
    TimestampLtz,
    /// INTERVAL DAY TO SECOND
    IntervalDs,
    /// INTERVAL YEAR TO MONTH
    IntervalYm,
    /// CLOB
    Clob,
    /// NCLOB
    NClob,
    /// BLOB
    Blob,
    /// BFILE
    Bfile,
    /// REF CURSOR
    Stmt,
    /// BOOLEAN
    Boolean,
    /// User-defined object or collection type
    Object,
    /// LONG
    LongVarchar,
    /// LONG with national character set
    LongNVarchar,
    /// LONG RAW
    LongRaw,
}

/// Size of a handle slot (index + generation)
const HANDLE_SIZE: u32 = 8;

impl OracleType {
    /// Wire data type number
    pub fn wire_type_num(&self) -> u16 {
        match self {
            OracleType::Varchar | OracleType::NVarchar => wire_type::VARCHAR,
            OracleType::Char | OracleType::NChar => wire_type::CHAR,
            OracleType::Rowid => wire_type::ROWID,
            OracleType::Raw => wire_type::RAW,
            OracleType::NativeFloat => wire_type::BINARY_FLOAT,
            OracleType::NativeDouble => wire_type::BINARY_DOUBLE,
            OracleType::NativeInt => wire_type::BINARY_INTEGER,
            OracleType::NativeUint => wire_type::UNSIGNED_INT,
            OracleType::Number => wire_type::NUMBER,
            OracleType::Date => wire_type::DATE,
            OracleType::Timestamp => wire_type::TIMESTAMP,
            OracleType::TimestampTz => wire_type::TIMESTAMP_TZ,
            OracleType::TimestampLtz => wire_type::TIMESTAMP_LTZ,
            OracleType::IntervalDs => wire_type::INTERVAL_DS,
            OracleType::IntervalYm => wire_type::INTERVAL_YM,
            OracleType::Clob | OracleType::NClob => wire_type::CLOB,
            OracleType::Blob => wire_type::BLOB,
            OracleType::Bfile => wire_type::BFILE,
            OracleType::Stmt => wire_type::CURSOR,
            OracleType::Boolean => wire_type::BOOLEAN,
            OracleType::Object => wire_type::OBJECT,
            OracleType::LongVarchar | OracleType::LongNVarchar => wire_type::LONG,
            OracleType::LongRaw => wire_type::LONG_RAW,
        }
    }

    /// Character set form used on the wire
    pub fn charset_form(&self) -> u8 {
        match self {
            OracleType::NVarchar
            | OracleType::NChar
            | OracleType::NClob
            | OracleType::LongNVarchar => csfrm::NCHAR,
            _ => csfrm::IMPLICIT,
        }
    }

    /// Native type used when a query column is fetched without an explicit define
    pub fn default_native_type(&self) -> NativeType {
        match self {
            OracleType::Varchar
            | OracleType::NVarchar
            | OracleType::Char
            | OracleType::NChar
            | OracleType::Raw
            | OracleType::LongVarchar
            | OracleType::LongNVarchar
            | OracleType::LongRaw => NativeType::Bytes,
            OracleType::Rowid => NativeType::Rowid,
            OracleType::NativeFloat => NativeType::Float,
            OracleType::NativeDouble | OracleType::Number => NativeType::Double,
            OracleType::NativeInt => NativeType::Int64,
            OracleType::NativeUint => NativeType::Uint64,
            OracleType::Date
            | OracleType::Timestamp
            | OracleType::TimestampTz
            | OracleType::TimestampLtz => NativeType::Timestamp,
            OracleType::IntervalDs => NativeType::IntervalDs,
            OracleType::IntervalYm => NativeType::IntervalYm,
            OracleType::Clob | OracleType::NClob | OracleType::Blob | OracleType::Bfile => {
                NativeType::Lob
            }
            OracleType::Stmt => NativeType::Stmt,
            OracleType::Boolean => NativeType::Boolean,
            OracleType::Object => NativeType::Object,
        }
    }

    /// Fixed per-element size in bytes, or 0 when the size is supplied by the caller
    pub fn buffer_size(&self) -> u32 {
        match self {
            OracleType::Varchar
            | OracleType::NVarchar
            | OracleType::Char
            | OracleType::NChar
            | OracleType::Raw
            | OracleType::LongVarchar
            | OracleType::LongNVarchar
            | OracleType::LongRaw => 0,
            OracleType::NativeFloat => 4,
            OracleType::NativeDouble | OracleType::NativeInt | OracleType::NativeUint => 8,
            OracleType::Number => 22,
            OracleType::Date => 7,
            OracleType::Timestamp | OracleType::TimestampLtz => 11,
            OracleType::TimestampTz => 13,
            OracleType::IntervalDs => 11,
            OracleType::IntervalYm => 5,
            OracleType::Boolean => 1,
            OracleType::Rowid
            | OracleType::Clob
            | OracleType::NClob
            | OracleType::Blob
            | OracleType::Bfile
            | OracleType::Stmt
            | OracleType::Object => HANDLE_SIZE,
        }
    }

    /// Check if this type holds character data
    pub fn is_character_data(&self) -> bool {
        matches!(
            self,
            OracleType::Varchar
                | OracleType::NVarchar
                | OracleType::Char
                | OracleType::NChar
                | OracleType::Rowid
                | OracleType::Clob
                | OracleType::NClob
                | OracleType::LongVarchar
                | OracleType::LongNVarchar
        )
    }

    /// Check if this type may be used in a PL/SQL array bind
    pub fn can_be_in_array(&self) -> bool {
        !matches!(
            self,
            OracleType::Clob
                | OracleType::NClob
                | OracleType::Blob
                | OracleType::Bfile
                | OracleType::Stmt
                | OracleType::Boolean
                | OracleType::Object
                | OracleType::LongVarchar
                | OracleType::LongNVarchar
                | OracleType::LongRaw
        )
    }

    /// Check if fetched values need per-row handle allocation before fetch
    pub fn requires_pre_fetch(&self) -> bool {
        matches!(
            self,
            OracleType::Rowid
                | OracleType::Clob
                | OracleType::NClob
                | OracleType::Blob
                | OracleType::Bfile
                | OracleType::Stmt
                | OracleType::Object
        )
    }

    /// Check if this type is a LOB type
    pub fn is_lob(&self) -> bool {
        matches!(
            self,
            OracleType::Clob | OracleType::NClob | OracleType::Blob | OracleType::Bfile
        )
    }

    /// Check if this type is a LONG type
    pub fn is_long(&self) -> bool {
        matches!(
            self,
            OracleType::LongVarchar | OracleType::LongNVarchar | OracleType::LongRaw
        )
    }

    /// Check if values of this type can be exchanged through the given native type
    pub fn accepts(&self, native: NativeType) -> bool {
        use NativeType as N;
        match self {
            OracleType::Number => matches!(
                native,
                N::Int64 | N::Uint64 | N::Float | N::Double | N::Bytes
            ),
            OracleType::NativeInt | OracleType::NativeUint => matches!(native, N::Int64 | N::Uint64),
            OracleType::NativeFloat => matches!(native, N::Float | N::Double),
            OracleType::NativeDouble => native == N::Double,
            OracleType::Varchar
            | OracleType::NVarchar
            | OracleType::Char
            | OracleType::NChar
            | OracleType::Raw
            | OracleType::LongVarchar
            | OracleType::LongNVarchar
            | OracleType::LongRaw => native == N::Bytes,
            OracleType::Rowid => matches!(native, N::Rowid | N::Bytes),
            OracleType::Date
            | OracleType::Timestamp
            | OracleType::TimestampTz
            | OracleType::TimestampLtz => native == N::Timestamp,
            OracleType::IntervalDs => native == N::IntervalDs,
            OracleType::IntervalYm => native == N::IntervalYm,
            OracleType::Clob | OracleType::NClob | OracleType::Blob | OracleType::Bfile => {
                native == N::Lob
            }
            OracleType::Stmt => native == N::Stmt,
            OracleType::Boolean => native == N::Boolean,
            OracleType::Object => native == N::Object,
        }
    }

    /// Map described column metadata (wire type number and charset form) to a type
    pub fn from_wire(type_num: u16, charset_form: u8) -> crate::error::Result<Self> {
        let nchar = charset_form == csfrm::NCHAR;
        let oracle_type = match type_num {
            wire_type::VARCHAR if nchar => OracleType::NVarchar,
            wire_type::VARCHAR => OracleType::Varchar,
            wire_type::CHAR if nchar => OracleType::NChar,
            wire_type::CHAR => OracleType::Char,
            wire_type::NUMBER => OracleType::Number,
            wire_type::BINARY_INTEGER => OracleType::NativeInt,
            wire_type::UNSIGNED_INT => OracleType::NativeUint,
            wire_type::LONG if nchar => OracleType::LongNVarchar,
            wire_type::LONG => OracleType::LongVarchar,
            wire_type::ROWID | wire_type::UROWID => OracleType::Rowid,
            wire_type::DATE => OracleType::Date,
            wire_type::RAW => OracleType::Raw,
            wire_type::LONG_RAW => OracleType::LongRaw,
            wire_type::BINARY_FLOAT => OracleType::NativeFloat,
            wire_type::BINARY_DOUBLE => OracleType::NativeDouble,
            wire_type::CURSOR => OracleType::Stmt,
            wire_type::OBJECT => OracleType::Object,
            wire_type::CLOB if nchar => OracleType::NClob,
            wire_type::CLOB => OracleType::Clob,
            wire_type::BLOB => OracleType::Blob,
            wire_type::BFILE => OracleType::Bfile,
            wire_type::TIMESTAMP => OracleType::Timestamp,
            wire_type::TIMESTAMP_TZ => OracleType::TimestampTz,
            wire_type::TIMESTAMP_LTZ => OracleType::TimestampLtz,
            wire_type::INTERVAL_YM => OracleType::IntervalYm,
            wire_type::INTERVAL_DS => OracleType::IntervalDs,
            wire_type::BOOLEAN => OracleType::Boolean,
            other => return Err(crate::error::Error::UnhandledDataType(other)),
        };
        Ok(oracle_type)
    }
}

// =============================================================================
// Binding and Execution
// =============================================================================

/// Bind direction, as declared by the statement for a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindDirection {
    /// Output only (OUT, RETURNING INTO)
    Output,
    /// Input only (IN)
    #[default]
    Input,
    /// Input and output (IN OUT)
    InputOutput,
}

impl BindDirection {
    /// Check if the engine sends this placeholder's value to the database
    pub fn is_input(&self) -> bool {
        matches!(self, BindDirection::Input | BindDirection::InputOutput)
    }

    /// Check if the engine populates this placeholder's variable after execution
    pub fn is_output(&self) -> bool {
        matches!(self, BindDirection::Output | BindDirection::InputOutput)
    }
}

/// Kind of SQL statement, as classified by the SQL-processing collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub enum StatementType {
    #[default]
    Unknown,
    Select,
    Update,
    Delete,
    Insert,
    Merge,
    Create,
    Drop,
    Alter,
    Begin,
    Declare,
    Call,
}

impl StatementType {
    /// Check if this is a query
    pub fn is_query(&self) -> bool {
        matches!(self, StatementType::Select)
    }

    /// Check if this is a PL/SQL block or call
    pub fn is_plsql(&self) -> bool {
        matches!(
            self,
            StatementType::Begin | StatementType::Declare | StatementType::Call
        )
    }

    /// Check if this is DML
    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            StatementType::Insert
                | StatementType::Update
                | StatementType::Delete
                | StatementType::Merge
        )
    }

    /// Check if this is DDL
    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            StatementType::Create | StatementType::Drop | StatementType::Alter
        )
    }
}

/// Execution flags
///
/// ```
/// use oracle_vars::ExecMode;
///
/// let mode = ExecMode::new().with_batch_errors().with_row_counts();
/// assert!(mode.batch_errors && mode.array_dml_row_counts);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecMode {
    /// Collect per-row failures instead of stopping at the first one
    pub batch_errors: bool,
    /// Keep the affected-row count of every iteration
    pub array_dml_row_counts: bool,
    /// Ask the database to commit when the call succeeds
    pub commit_on_success: bool,
    /// Describe a query without fetching or executing it
    pub describe_only: bool,
}

impl ExecMode {
    /// Default execution: fail fast, no commit
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable batch error mode
    pub fn with_batch_errors(mut self) -> Self {
        self.batch_errors = true;
        self
    }

    /// Enable per-row DML counts
    pub fn with_row_counts(mut self) -> Self {
        self.array_dml_row_counts = true;
        self
    }

    /// Commit on success
    pub fn with_commit(mut self) -> Self {
        self.commit_on_success = true;
        self
    }

    /// Describe only
    pub fn describe_only(mut self) -> Self {
        self.describe_only = true;
        self
    }
}

/// Fetch orientation for scrollable statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchOrientation {
    /// Fetch the next row
    #[default]
    Next,
    /// Fetch the prior row
    Prior,
    /// Fetch the first row
    First,
    /// Fetch the last row
    Last,
    /// Fetch an absolute row number
    Absolute,
    /// Fetch relative to the current position
    Relative,
}

// =============================================================================
// Defaults
// =============================================================================

/// Fetch array size used when none is configured
pub const DEFAULT_FETCH_ARRAY_SIZE: u32 = 100;

/// Largest element that is stored in the fixed backing store
pub const MAX_BASIC_BUFFER_SIZE: u32 = 32767;

/// Maximum significant digits of an Oracle NUMBER
pub const NUMBER_MAX_DIGITS: usize = 38;

/// Maximum length of number text accepted by the codec
pub const NUMBER_AS_TEXT_CHARS: usize = 172;

// =============================================================================
// Error Codes
// =============================================================================

/// Oracle error code constants
#[allow(missing_docs)]
pub mod error_code {
    pub const UNIQUE_CONSTRAINT: u32 = 1;
    pub const NOT_ALL_VARIABLES_BOUND: u32 = 1008;
    pub const USER_CANCELLED: u32 = 1013;
    pub const NO_DATA_FOUND: u32 = 1403;
    pub const VALUE_LARGER_THAN_PRECISION: u32 = 1438;
    pub const CALL_TIMEOUT: u32 = 3156;
    pub const ARRAY_DML_ROW_COUNTS_UNAVAILABLE: u32 = 24349;
    pub const ARRAY_DML_ERRORS: u32 = 24381;
}
