//! Error types for RowLite.

use crate::schema::FieldType;
use std::fmt;
use std::path::PathBuf;

/// The main error type for RowLite operations.
#[derive(Debug)]
pub enum Error {
    /// I/O error raised by a file operation
    Io(std::io::Error),

    /// A path or key does not exist
    NotFound(String),

    /// The target file already exists and overwriting was not requested
    AlreadyExists(PathBuf),

    /// Metadata block is structurally unreadable
    ParseFailure(String),

    /// Declared field count disagrees with the parsed field ids or types
    SchemaMismatch(String),

    /// A data line does not match the schema
    Decode(DecodeError),

    /// A caller-supplied value does not match the schema
    TypeMismatch(String),

    /// Field identifier is not part of the schema
    UnknownField(String),

    /// A key was requested from an uninitialized key generator
    InvalidGenerator,

    /// Schema change attempted on a populated store
    NotEmpty,

    /// Operation attempted on a closed store
    NotOpen,

    /// Invalid operation for the current store state
    InvalidOperation(String),

    /// Caller input rejected by validation
    InvalidInput(String),

    /// A lock was poisoned (internal error)
    LockPoisoned,
}

impl Error {
    /// Returns `true` for metadata failures a caller may attempt to repair,
    /// as opposed to I/O failures that leave the store unusable.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::ParseFailure(_) | Error::SchemaMismatch(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::NotFound(what) => write!(f, "Not found: {}", what),
            Error::AlreadyExists(path) => write!(f, "File already exists: {}", path.display()),
            Error::ParseFailure(msg) => write!(f, "Metadata parse failure: {}", msg),
            Error::SchemaMismatch(msg) => write!(f, "Schema mismatch: {}", msg),
            Error::Decode(e) => write!(f, "Decode error: {}", e),
            Error::TypeMismatch(msg) => write!(f, "Type mismatch: {}", msg),
            Error::UnknownField(field) => write!(f, "Unknown field: {}", field),
            Error::InvalidGenerator => write!(f, "Key generator is not initialized"),
            Error::NotEmpty => write!(f, "Cannot change the schema of a non-empty store"),
            Error::NotOpen => write!(f, "No store is open"),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::LockPoisoned => write!(f, "Lock poisoned"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Error::Decode(err)
    }
}

/// Why a data line could not be decoded into a row.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Token count differs from `num_fields + 1`
    FieldCount {
        /// Tokens required by the schema (key included)
        expected: usize,
        /// Tokens present on the line
        found: usize,
    },
    /// Line bytes are not valid UTF-8
    InvalidUtf8,
    /// Leading token is not a valid key
    InvalidKey(String),
    /// A value token failed to parse as its column type
    InvalidValue {
        /// The offending token
        token: String,
        /// The column's declared type
        expected: FieldType,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::FieldCount { expected, found } => {
                write!(f, "expected {} fields, found {}", expected, found)
            }
            DecodeError::InvalidUtf8 => write!(f, "line is not valid UTF-8"),
            DecodeError::InvalidKey(token) => write!(f, "invalid key {:?}", token),
            DecodeError::InvalidValue { token, expected } => {
                write!(f, "unable to parse {:?} as {}", token, expected)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// A specialized `Result` type for RowLite operations.
pub type Result<T> = std::result::Result<T, Error>;
