//! Table keywords.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

/// Value of a table keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum KeywordValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Complex { re: f32, im: f32 },
    String(String),
    /// Reference to a subtable by path
    Table(String),
}

impl KeywordValue {
    /// Text form used by string keyword reads.
    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for KeywordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Complex { re, im } => write!(f, "({re},{im})"),
            Self::String(v) | Self::Table(v) => f.write_str(v),
        }
    }
}

impl From<&str> for KeywordValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for KeywordValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for KeywordValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for KeywordValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for KeywordValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Ordered keyword set of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet {
    fields: IndexMap<String, KeywordValue>,
}

impl KeywordSet {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Result<&KeywordValue> {
        self.fields
            .get(name)
            .ok_or_else(|| TableError::keyword_not_found(name))
    }

    /// Insert or replace a keyword, keeping the position of a replaced one.
    pub fn put(&mut self, name: &str, value: KeywordValue) -> Result<()> {
        if name.is_empty() {
            return Err(TableError::InvalidArgument(
                "keyword name must not be empty".to_string(),
            ));
        }
        self.fields.insert(name.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<KeywordValue> {
        self.fields
            .shift_remove(name)
            .ok_or_else(|| TableError::keyword_not_found(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
