//! Columnar table engine.
//!
//! Tables hold a fixed set of typed columns and a set of keywords. Columns
//! are either scalar (one value per row) or array-valued (one n-dimensional
//! cell per row, with fixed or variable shape). Tables live in memory or in
//! a directory on disk written in a selectable byte order.
//!
//! ```no_run
//! use coltable::{ColumnDesc, DataType, Table, TableOptions};
//!
//! let mut table = Table::create("obs.tab", TableOptions::default())?;
//! table.add_column(ColumnDesc::scalar("ID", DataType::Int))?;
//! table.add_rows(3)?;
//! table.put_column("ID", &[3], &[1, 2, 3])?;
//! assert_eq!(table.get_column::<i32>("ID")?.as_slice(), &[1, 2, 3]);
//! table.close()?;
//! # Ok::<(), coltable::TableError>(())
//! ```

mod array;
mod column;
mod desc;
pub mod engine;
mod error;
mod keyword;
mod storage;
mod table;
mod types;

pub use array::{Array, CellData, Element};
pub use desc::{ColumnDesc, ColumnKind};
pub use engine::{EngineConfig, init, is_initialized};
pub use error::{Result, TableError};
pub use keyword::{KeywordSet, KeywordValue};
pub use num_complex::Complex32;
pub use table::{Table, TableOptions};
pub use types::{DataType, EndianFormat, StorageKind, TableOption};
