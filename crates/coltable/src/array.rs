//! Typed element storage and shaped arrays.

use num_complex::Complex32;

use crate::error::{Result, TableError};
use crate::types::DataType;

/// Homogeneous run of elements of one column type.
#[derive(Debug, Clone, PartialEq)]
pub enum CellData {
    Int(Vec<i32>),
    Double(Vec<f64>),
    Complex(Vec<Complex32>),
}

impl CellData {
    /// `len` zero elements of `data_type`.
    pub fn zeros(data_type: DataType, len: usize) -> Result<Self> {
        match data_type {
            DataType::Int => Ok(Self::Int(vec![0; len])),
            DataType::Double => Ok(Self::Double(vec![0.0; len])),
            DataType::Complex => Ok(Self::Complex(vec![Complex32::new(0.0, 0.0); len])),
            other => Err(TableError::UnsupportedType(other)),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Int(_) => DataType::Int,
            Self::Double(_) => DataType::Double,
            Self::Complex(_) => DataType::Complex,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `n` zero elements.
    pub(crate) fn grow(&mut self, n: usize) {
        match self {
            Self::Int(v) => v.resize(v.len() + n, 0),
            Self::Double(v) => v.resize(v.len() + n, 0.0),
            Self::Complex(v) => v.resize(v.len() + n, Complex32::new(0.0, 0.0)),
        }
    }

    /// Keep only the elements whose position is not flagged in `drop`.
    pub(crate) fn retain_unflagged(&mut self, drop: &[bool]) {
        fn retain<T>(v: &mut Vec<T>, drop: &[bool]) {
            let mut i = 0;
            v.retain(|_| {
                let keep = !drop.get(i).copied().unwrap_or(false);
                i += 1;
                keep
            });
        }
        match self {
            Self::Int(v) => retain(v, drop),
            Self::Double(v) => retain(v, drop),
            Self::Complex(v) => retain(v, drop),
        }
    }
}

/// Rust element types that can be moved in and out of columns.
pub trait Element: Copy + Send + Sync + 'static {
    /// Column data type this element maps to
    const DATA_TYPE: DataType;

    /// Wrap owned values as column storage.
    fn wrap(values: Vec<Self>) -> CellData;

    /// Append the elements of `data` to `out`, converting where lossless.
    ///
    /// Returns `None` when `data` holds a type that cannot be read as `Self`.
    fn extend_from(out: &mut Vec<Self>, data: &CellData) -> Option<()>;
}

impl Element for i32 {
    const DATA_TYPE: DataType = DataType::Int;

    fn wrap(values: Vec<Self>) -> CellData {
        CellData::Int(values)
    }

    fn extend_from(out: &mut Vec<Self>, data: &CellData) -> Option<()> {
        match data {
            CellData::Int(v) => out.extend_from_slice(v),
            _ => return None,
        }
        Some(())
    }
}

impl Element for f64 {
    const DATA_TYPE: DataType = DataType::Double;

    fn wrap(values: Vec<Self>) -> CellData {
        CellData::Double(values)
    }

    fn extend_from(out: &mut Vec<Self>, data: &CellData) -> Option<()> {
        match data {
            CellData::Double(v) => out.extend_from_slice(v),
            CellData::Int(v) => out.extend(v.iter().map(|&x| f64::from(x))),
            CellData::Complex(_) => return None,
        }
        Some(())
    }
}

impl Element for Complex32 {
    const DATA_TYPE: DataType = DataType::Complex;

    fn wrap(values: Vec<Self>) -> CellData {
        CellData::Complex(values)
    }

    fn extend_from(out: &mut Vec<Self>, data: &CellData) -> Option<()> {
        match data {
            CellData::Complex(v) => out.extend_from_slice(v),
            _ => return None,
        }
        Some(())
    }
}

/// Flat data together with its shape.
///
/// For column data the cell axes come first and the row axis last; the flat
/// order is cell-contiguous, i.e. all elements of row 0 precede row 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Array<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T: Element> Array<T> {
    /// Create an array, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TableError::shape(format!(
                "shape {shape:?} holds {expected} elements, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
