//! Column descriptors.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};
use crate::types::DataType;

/// Whether a column holds one value or one array per row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Scalar,
    /// `shape` is the fixed cell shape, or `None` for variable-shape cells
    Array { shape: Option<Vec<usize>> },
}

/// Description of a column to add to a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDesc {
    pub name: String,
    pub data_type: DataType,
    pub kind: ColumnKind,
}

impl ColumnDesc {
    /// Describe a scalar column.
    pub fn scalar(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            kind: ColumnKind::Scalar,
        }
    }

    /// Describe an array column. An empty `shape` gives variable-shape cells.
    pub fn array(name: impl Into<String>, data_type: DataType, shape: &[usize]) -> Self {
        let shape = if shape.is_empty() {
            None
        } else {
            Some(shape.to_vec())
        };
        Self {
            name: name.into(),
            data_type,
            kind: ColumnKind::Array { shape },
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, ColumnKind::Scalar)
    }

    /// Fixed cell shape of an array column.
    pub fn fixed_shape(&self) -> Option<&[usize]> {
        match &self.kind {
            ColumnKind::Array { shape: Some(shape) } => Some(shape),
            _ => None,
        }
    }

    /// Check that the descriptor can be turned into a column.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(TableError::InvalidArgument(
                "column name must not be empty".to_string(),
            ));
        }
        if !self.data_type.is_column_type() {
            return Err(TableError::UnsupportedType(self.data_type));
        }
        if let Some(shape) = self.fixed_shape() {
            if shape.contains(&0) {
                return Err(TableError::shape(format!(
                    "column {} has a zero-length axis in {shape:?}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
