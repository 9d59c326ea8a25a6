//! Engine enumerations: data types, byte order, storage kind, open options.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

/// Element data types known to the engine.
///
/// The discriminants are the numeric type tags used across the C boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool = 0,
    Char = 1,
    UChar = 2,
    Short = 3,
    UShort = 4,
    Int = 5,
    UInt = 6,
    Float = 7,
    Double = 8,
    Complex = 9,
    DComplex = 10,
    String = 11,
    Int64 = 29,
}

impl DataType {
    /// Look up a data type by its numeric tag.
    pub fn from_tag(tag: i32) -> Result<Self> {
        let dtype = match tag {
            0 => Self::Bool,
            1 => Self::Char,
            2 => Self::UChar,
            3 => Self::Short,
            4 => Self::UShort,
            5 => Self::Int,
            6 => Self::UInt,
            7 => Self::Float,
            8 => Self::Double,
            9 => Self::Complex,
            10 => Self::DComplex,
            11 => Self::String,
            29 => Self::Int64,
            _ => return Err(TableError::UnknownTypeTag { tag }),
        };
        Ok(dtype)
    }

    /// Numeric tag of this data type.
    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Type name as reported by column type queries.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Char => "char",
            Self::UChar => "uchar",
            Self::Short => "short",
            Self::UShort => "ushort",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::Double => "double",
            Self::Complex => "complex",
            Self::DComplex => "dcomplex",
            Self::String => "string",
            Self::Int64 => "int64",
        }
    }

    /// Whether columns of this type can be created.
    pub fn is_column_type(self) -> bool {
        matches!(self, Self::Int | Self::Double | Self::Complex)
    }

    /// Size in bytes of one stored element.
    pub(crate) fn element_size(self) -> Result<usize> {
        match self {
            Self::Int => Ok(4),
            Self::Double | Self::Complex => Ok(8),
            other => Err(TableError::UnsupportedType(other)),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte order of the column data files of a persistent table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndianFormat {
    Big,
    Little,
}

impl EndianFormat {
    /// Byte order of the running machine.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    /// Resolve an endian option string.
    ///
    /// `aipsrc` and the empty string defer to the engine configuration;
    /// everything else goes through [`FromStr`].
    pub fn resolve(option: &str) -> Result<Self> {
        if option.is_empty() || option.eq_ignore_ascii_case("aipsrc") {
            return Ok(crate::engine::config().default_endian);
        }
        option.parse()
    }
}

/// Parses a concrete byte order: `big`, `little` or `local` (the machine
/// order), ignoring case. Never consults the engine configuration.
impl FromStr for EndianFormat {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "big" => Ok(Self::Big),
            "little" => Ok(Self::Little),
            "local" => Ok(Self::native()),
            other => Err(TableError::InvalidArgument(format!(
                "unknown endian format '{other}'"
            ))),
        }
    }
}

impl fmt::Display for EndianFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Big => f.write_str("big"),
            Self::Little => f.write_str("little"),
        }
    }
}

/// Where a table lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Directory on disk, written on flush and close
    Plain,
    /// Process memory only, never written
    Memory,
}

impl StorageKind {
    /// Resolve a memory type option string; the empty string defers to the
    /// engine configuration.
    pub fn resolve(option: &str) -> Result<Self> {
        if option.is_empty() {
            return Ok(crate::engine::config().default_storage);
        }
        option.parse()
    }
}

impl FromStr for StorageKind {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "memory" => Ok(Self::Memory),
            other => Err(TableError::InvalidArgument(format!(
                "unknown memory type '{other}'"
            ))),
        }
    }
}

/// How an existing table is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOption {
    /// Read only
    Old = 1,
    /// Read and write
    Update = 5,
    /// Read and write; the table directory is removed on close
    Delete = 6,
}

impl TableOption {
    /// Decode the numeric open option.
    ///
    /// The creation options (2, 3, 4) are not valid for opening.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            1 => Ok(Self::Old),
            5 => Ok(Self::Update),
            6 => Ok(Self::Delete),
            other => Err(TableError::InvalidArgument(format!(
                "invalid open option {other}"
            ))),
        }
    }

    pub fn is_writable(self) -> bool {
        !matches!(self, Self::Old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for tag in [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 29] {
            assert_eq!(DataType::from_tag(tag).unwrap().tag(), tag);
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!(
            DataType::from_tag(12),
            Err(TableError::UnknownTypeTag { tag: 12 })
        ));
        assert!(DataType::from_tag(-1).is_err());
    }

    #[test]
    fn test_column_types() {
        assert!(DataType::Int.is_column_type());
        assert!(DataType::Double.is_column_type());
        assert!(DataType::Complex.is_column_type());
        assert!(!DataType::String.is_column_type());
        assert!(!DataType::Bool.is_column_type());
    }

    #[test]
    fn test_endian_resolve() {
        assert_eq!(EndianFormat::resolve("BIG").unwrap(), EndianFormat::Big);
        assert_eq!(EndianFormat::resolve("little").unwrap(), EndianFormat::Little);
        assert_eq!(EndianFormat::resolve("local").unwrap(), EndianFormat::native());
        assert!(EndianFormat::resolve("middle").is_err());
    }

    #[test]
    fn test_endian_defaults_follow_config() {
        let default = crate::engine::config().default_endian;
        assert_eq!(EndianFormat::resolve("").unwrap(), default);
        assert_eq!(EndianFormat::resolve("AIPSRC").unwrap(), default);
        assert!("aipsrc".parse::<EndianFormat>().is_err());
        assert!("".parse::<EndianFormat>().is_err());
    }

    #[test]
    fn test_storage_kind() {
        assert_eq!("memory".parse::<StorageKind>().unwrap(), StorageKind::Memory);
        assert_eq!("Plain".parse::<StorageKind>().unwrap(), StorageKind::Plain);
        assert!("scratch".parse::<StorageKind>().is_err());
        assert!("".parse::<StorageKind>().is_err());
    }

    #[test]
    fn test_storage_default_follows_config() {
        let default = crate::engine::config().default_storage;
        assert_eq!(StorageKind::resolve("").unwrap(), default);
        assert_eq!(StorageKind::resolve("MEMORY").unwrap(), StorageKind::Memory);
        assert!(StorageKind::resolve("scratch").is_err());
    }

    #[test]
    fn test_table_option() {
        assert_eq!(TableOption::from_code(1).unwrap(), TableOption::Old);
        assert!(TableOption::from_code(5).unwrap().is_writable());
        assert!(TableOption::from_code(2).is_err());
    }
}
