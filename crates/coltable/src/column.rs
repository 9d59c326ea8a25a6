//! In-memory column storage.

use crate::array::{Array, CellData, Element};
use crate::desc::{ColumnDesc, ColumnKind};
use crate::error::{Result, TableError};

/// One defined array cell.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cell {
    pub(crate) shape: Vec<usize>,
    pub(crate) data: CellData,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColumnStore {
    /// One element per row
    Scalar(CellData),
    /// One cell per row; `None` until written for variable-shape columns
    Array(Vec<Option<Cell>>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Column {
    pub(crate) desc: ColumnDesc,
    pub(crate) store: ColumnStore,
}

impl Column {
    /// A column with `nrows` default rows.
    pub(crate) fn new(desc: ColumnDesc, nrows: usize) -> Result<Self> {
        desc.validate()?;
        let store = match &desc.kind {
            ColumnKind::Scalar => ColumnStore::Scalar(CellData::zeros(desc.data_type, nrows)?),
            ColumnKind::Array { .. } => ColumnStore::Array(Vec::with_capacity(nrows)),
        };
        let mut column = Self { desc, store };
        if let ColumnStore::Array(_) = column.store {
            column.add_rows(nrows)?;
        }
        Ok(column)
    }

    fn default_cell(&self) -> Result<Option<Cell>> {
        match self.desc.fixed_shape() {
            Some(shape) => {
                let len = shape.iter().product();
                Ok(Some(Cell {
                    shape: shape.to_vec(),
                    data: CellData::zeros(self.desc.data_type, len)?,
                }))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn add_rows(&mut self, n: usize) -> Result<()> {
        let cell = self.default_cell()?;
        match &mut self.store {
            ColumnStore::Scalar(data) => data.grow(n),
            ColumnStore::Array(cells) => cells.extend(std::iter::repeat_n(cell, n)),
        }
        Ok(())
    }

    /// Drop the rows flagged in `drop` (indexed by row number).
    pub(crate) fn remove_rows(&mut self, drop: &[bool]) {
        match &mut self.store {
            ColumnStore::Scalar(data) => data.retain_unflagged(drop),
            ColumnStore::Array(cells) => {
                let mut row = 0;
                cells.retain(|_| {
                    let keep = !drop.get(row).copied().unwrap_or(false);
                    row += 1;
                    keep
                });
            }
        }
    }

    /// Shape of the cell in `row`, `None` for scalar columns and undefined cells.
    pub(crate) fn cell_shape(&self, row: usize) -> Option<&[usize]> {
        match &self.store {
            ColumnStore::Scalar(_) => None,
            ColumnStore::Array(cells) => cells
                .get(row)
                .and_then(|cell| cell.as_ref())
                .map(|cell| cell.shape.as_slice()),
        }
    }

    fn type_mismatch<T: Element>(&self) -> TableError {
        TableError::TypeMismatch {
            column: self.desc.name.clone(),
            stored: self.desc.data_type,
            requested: T::DATA_TYPE,
        }
    }

    /// Whole column as one array of shape `[cell dims..., nrows]`.
    pub(crate) fn get<T: Element>(&self, nrows: usize) -> Result<Array<T>> {
        match &self.store {
            ColumnStore::Scalar(data) => {
                let mut out = Vec::with_capacity(data.len());
                T::extend_from(&mut out, data).ok_or_else(|| self.type_mismatch::<T>())?;
                Array::new(vec![nrows], out)
            }
            ColumnStore::Array(cells) => {
                let mut cell_shape: Option<&[usize]> = self.desc.fixed_shape();
                let mut out = Vec::new();
                for (row, cell) in cells.iter().enumerate() {
                    let cell = cell.as_ref().ok_or_else(|| {
                        TableError::shape(format!(
                            "column {} has no value in row {row}",
                            self.desc.name
                        ))
                    })?;
                    match cell_shape {
                        Some(shape) if shape != cell.shape.as_slice() => {
                            return Err(TableError::shape(format!(
                                "column {} is not uniformly shaped: row {row} has {:?}, expected {shape:?}",
                                self.desc.name, cell.shape
                            )));
                        }
                        Some(_) => {}
                        None => cell_shape = Some(cell.shape.as_slice()),
                    }
                    T::extend_from(&mut out, &cell.data).ok_or_else(|| self.type_mismatch::<T>())?;
                }
                let mut shape = cell_shape.map(<[usize]>::to_vec).unwrap_or_default();
                shape.push(nrows);
                Array::new(shape, out)
            }
        }
    }

    /// Replace the whole column from flat data of shape `[cell dims..., nrows]`.
    pub(crate) fn put<T: Element>(&mut self, shape: &[usize], data: &[T], nrows: usize) -> Result<()> {
        if T::DATA_TYPE != self.desc.data_type {
            return Err(self.type_mismatch::<T>());
        }
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TableError::shape(format!(
                "shape {shape:?} holds {expected} elements, got {}",
                data.len()
            )));
        }
        let (row_axis, cell_axes) = match shape.split_last() {
            Some(split) => split,
            None => return Err(TableError::shape("shape must have at least one axis")),
        };
        if *row_axis != nrows {
            return Err(TableError::shape(format!(
                "last axis of {shape:?} must equal the row count {nrows}"
            )));
        }
        match &mut self.store {
            ColumnStore::Scalar(store) => {
                if !cell_axes.is_empty() {
                    return Err(TableError::shape(format!(
                        "scalar column {} expects shape [{nrows}], got {shape:?}",
                        self.desc.name
                    )));
                }
                *store = T::wrap(data.to_vec());
            }
            ColumnStore::Array(cells) => {
                if let Some(fixed) = self.desc.fixed_shape() {
                    if fixed != cell_axes {
                        return Err(TableError::shape(format!(
                            "column {} has cell shape {fixed:?}, got {cell_axes:?}",
                            self.desc.name
                        )));
                    }
                }
                let cell_len: usize = cell_axes.iter().product();
                *cells = (0..nrows)
                    .map(|row| {
                        let chunk = &data[row * cell_len..(row + 1) * cell_len];
                        Some(Cell {
                            shape: cell_axes.to_vec(),
                            data: T::wrap(chunk.to_vec()),
                        })
                    })
                    .collect();
            }
        }
        Ok(())
    }
}
