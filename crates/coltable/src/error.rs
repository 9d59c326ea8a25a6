//! Error types for table operations

use thiserror::Error;

use crate::types::DataType;

/// Result type for table operations
pub type Result<T> = std::result::Result<T, TableError>;

/// Errors that can occur during table operations
#[derive(Error, Debug)]
pub enum TableError {
    /// Named column, keyword or table does not exist
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// Named column, keyword or table already exists
    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: &'static str, name: String },

    /// Type tag is not a known data type
    #[error("Unknown data type tag: {tag}")]
    UnknownTypeTag { tag: i32 },

    /// Data type is known but cannot be stored in a column
    #[error("Unsupported column type: {0}")]
    UnsupportedType(DataType),

    /// Column holds a different element type than requested
    #[error("Type mismatch for column {column}: stored {stored}, requested {requested}")]
    TypeMismatch {
        column: String,
        stored: DataType,
        requested: DataType,
    },

    /// Supplied shape does not match the data or the column
    #[error("Shape mismatch: {message}")]
    ShapeMismatch { message: String },

    /// Row number outside of the table
    #[error("Row {row} out of range (table has {nrows} rows)")]
    RowOutOfRange { row: usize, nrows: usize },

    /// Mutation attempted on a read-only table
    #[error("Table {0} is not writable")]
    NotWritable(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Engine configuration was already set to something else
    #[error("Engine already initialized with a different configuration")]
    AlreadyInitialized,

    /// Malformed on-disk table
    #[error("Corrupt table {path}: {message}")]
    Format { path: String, message: String },

    /// Underlying filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Table description could not be (de)serialized
    #[error("Table description error: {0}")]
    Description(#[from] serde_json::Error),
}

impl TableError {
    pub(crate) fn column_not_found(name: &str) -> Self {
        Self::NotFound {
            kind: "column",
            name: name.to_string(),
        }
    }

    pub(crate) fn keyword_not_found(name: &str) -> Self {
        Self::NotFound {
            kind: "keyword",
            name: name.to_string(),
        }
    }

    pub(crate) fn shape(message: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            message: message.into(),
        }
    }
}
