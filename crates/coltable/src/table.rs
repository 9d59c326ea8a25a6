//! The table handle.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::array::{Array, Element};
use crate::column::Column;
use crate::desc::ColumnDesc;
use crate::error::{Result, TableError};
use crate::keyword::{KeywordSet, KeywordValue};
use crate::storage;
use crate::types::{DataType, EndianFormat, StorageKind, TableOption};

/// Options for creating a new table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    pub endian: EndianFormat,
    pub storage: StorageKind,
    /// Number of rows the table starts with
    pub nrows: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        let config = crate::engine::config();
        Self {
            endian: config.default_endian,
            storage: config.default_storage,
            nrows: 0,
        }
    }
}

/// An open table.
///
/// Dropping the handle closes it: a writable plain table is flushed first,
/// a table opened with [`TableOption::Delete`] is removed from disk.
/// Use [`Table::close`] to observe errors from that final step.
#[derive(Debug)]
pub struct Table {
    path: PathBuf,
    storage: StorageKind,
    endian: EndianFormat,
    writable: bool,
    delete_on_close: bool,
    nrows: usize,
    columns: IndexMap<String, Column>,
    keywords: KeywordSet,
    subtables: Vec<(String, Table)>,
    closed: bool,
}

impl Table {
    /// Create a new table at `path`.
    ///
    /// A plain table is written to disk immediately; an existing table at
    /// the same path is replaced. Any other existing file or directory there
    /// is an error.
    pub fn create(path: impl AsRef<Path>, options: TableOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if options.storage == StorageKind::Plain {
            if storage::exists(&path) {
                tracing::debug!(path = %path.display(), "replacing existing table");
                storage::remove(&path)?;
            } else if path.exists() {
                return Err(TableError::AlreadyExists {
                    kind: "file",
                    name: path.display().to_string(),
                });
            }
        }

        let mut table = Self {
            path,
            storage: options.storage,
            endian: options.endian,
            writable: true,
            delete_on_close: false,
            nrows: options.nrows,
            columns: IndexMap::new(),
            keywords: KeywordSet::default(),
            subtables: Vec::new(),
            closed: false,
        };
        table.flush(false)?;
        tracing::debug!(
            path = %table.path.display(),
            storage = ?table.storage,
            endian = %table.endian,
            nrows = table.nrows,
            "created table"
        );
        Ok(table)
    }

    /// Open an existing plain table.
    pub fn open(path: impl AsRef<Path>, option: TableOption) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let loaded = storage::read(&path)?;
        let columns = loaded
            .columns
            .into_iter()
            .map(|column| (column.desc.name.clone(), column))
            .collect();
        tracing::debug!(path = %path.display(), ?option, nrows = loaded.nrows, "opened table");
        Ok(Self {
            path,
            storage: StorageKind::Plain,
            endian: loaded.endian,
            writable: option.is_writable(),
            delete_on_close: option == TableOption::Delete,
            nrows: loaded.nrows,
            columns,
            keywords: loaded.keywords,
            subtables: Vec::new(),
            closed: false,
        })
    }

    /// Path (or name, for memory tables) of the table.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn storage(&self) -> StorageKind {
        self.storage
    }

    pub fn endian(&self) -> EndianFormat {
        self.endian
    }

    /// An open table can always be read.
    pub fn is_readable(&self) -> bool {
        true
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncolumns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(TableError::NotWritable(self.path.display().to_string()))
        }
    }

    fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| TableError::column_not_found(name))
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut Column> {
        self.columns
            .get_mut(name)
            .ok_or_else(|| TableError::column_not_found(name))
    }

    // ------------------------------------------------------------------
    // Rows
    // ------------------------------------------------------------------

    /// Append `n` default-initialized rows.
    pub fn add_rows(&mut self, n: usize) -> Result<()> {
        self.ensure_writable()?;
        for column in self.columns.values_mut() {
            column.add_rows(n)?;
        }
        self.nrows += n;
        tracing::trace!(path = %self.path.display(), added = n, nrows = self.nrows, "added rows");
        Ok(())
    }

    /// Whether rows can be removed from this table.
    pub fn can_remove_row(&self) -> bool {
        self.writable
    }

    /// Remove the given rows. Duplicates are ignored; any out-of-range row
    /// rejects the whole call.
    pub fn remove_rows(&mut self, rows: &[usize]) -> Result<()> {
        self.ensure_writable()?;
        let mut drop = vec![false; self.nrows];
        for &row in rows {
            match drop.get_mut(row) {
                Some(flag) => *flag = true,
                None => {
                    return Err(TableError::RowOutOfRange {
                        row,
                        nrows: self.nrows,
                    })
                }
            }
        }
        let removed = drop.iter().filter(|&&flag| flag).count();
        for column in self.columns.values_mut() {
            column.remove_rows(&drop);
        }
        self.nrows -= removed;
        tracing::trace!(path = %self.path.display(), removed, nrows = self.nrows, "removed rows");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    /// Add a column described by `desc`, filled with default values.
    pub fn add_column(&mut self, desc: ColumnDesc) -> Result<()> {
        self.ensure_writable()?;
        if self.columns.contains_key(&desc.name) {
            return Err(TableError::AlreadyExists {
                kind: "column",
                name: desc.name,
            });
        }
        let column = Column::new(desc, self.nrows)?;
        tracing::debug!(
            path = %self.path.display(),
            column = %column.desc.name,
            data_type = %column.desc.data_type,
            kind = ?column.desc.kind,
            "added column"
        );
        self.columns.insert(column.desc.name.clone(), column);
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Result<()> {
        self.ensure_writable()?;
        self.columns
            .shift_remove(name)
            .ok_or_else(|| TableError::column_not_found(name))?;
        tracing::debug!(path = %self.path.display(), column = name, "removed column");
        Ok(())
    }

    pub fn column_desc(&self, name: &str) -> Result<&ColumnDesc> {
        self.column(name).map(|column| &column.desc)
    }

    pub fn column_data_type(&self, name: &str) -> Result<DataType> {
        self.column(name).map(|column| column.desc.data_type)
    }

    pub fn is_scalar_column(&self, name: &str) -> Result<bool> {
        self.column(name).map(|column| column.desc.is_scalar())
    }

    /// Cell shape of `row` in an array column; `None` for undefined cells.
    pub fn cell_shape(&self, name: &str, row: usize) -> Result<Option<Vec<usize>>> {
        let column = self.column(name)?;
        if row >= self.nrows {
            return Err(TableError::RowOutOfRange {
                row,
                nrows: self.nrows,
            });
        }
        Ok(column.cell_shape(row).map(<[usize]>::to_vec))
    }

    /// Read a whole column. The result has shape `[nrows]` for scalar
    /// columns and `[cell dims..., nrows]` for array columns.
    pub fn get_column<T: Element>(&self, name: &str) -> Result<Array<T>> {
        let array = self.column(name)?.get::<T>(self.nrows)?;
        tracing::trace!(column = name, shape = ?array.shape(), "read column");
        Ok(array)
    }

    /// Overwrite a whole column from flat data of the given shape.
    pub fn put_column<T: Element>(&mut self, name: &str, shape: &[usize], data: &[T]) -> Result<()> {
        self.ensure_writable()?;
        let nrows = self.nrows;
        self.column_mut(name)?.put(shape, data, nrows)?;
        tracing::trace!(column = name, ?shape, "wrote column");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Keywords and subtables
    // ------------------------------------------------------------------

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn keyword(&self, name: &str) -> Result<&KeywordValue> {
        self.keywords.get(name)
    }

    pub fn put_keyword(&mut self, name: &str, value: impl Into<KeywordValue>) -> Result<()> {
        self.ensure_writable()?;
        self.keywords.put(name, value.into())?;
        self.subtables.retain(|(keyword, _)| keyword != name);
        Ok(())
    }

    pub fn remove_keyword(&mut self, name: &str) -> Result<()> {
        self.ensure_writable()?;
        self.keywords.remove(name)?;
        self.subtables.retain(|(keyword, _)| keyword != name);
        Ok(())
    }

    /// Attach `child` under keyword `name`.
    ///
    /// The keyword records the child's path and the handle stays attached,
    /// so a recursive flush reaches it.
    pub fn define_subtable(&mut self, name: &str, child: Table) -> Result<()> {
        self.ensure_writable()?;
        let reference = KeywordValue::Table(child.path.display().to_string());
        self.put_keyword(name, reference)?;
        self.subtables.push((name.to_string(), child));
        Ok(())
    }

    /// Attached subtable under keyword `name`.
    pub fn subtable(&self, name: &str) -> Option<&Table> {
        self.subtables
            .iter()
            .find(|(keyword, _)| keyword == name)
            .map(|(_, table)| table)
    }

    pub fn subtable_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.subtables
            .iter_mut()
            .find(|(keyword, _)| keyword == name)
            .map(|(_, table)| table)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the table to disk. `recursive` also flushes attached subtables.
    ///
    /// Read-only and memory tables have nothing to write.
    pub fn flush(&mut self, recursive: bool) -> Result<()> {
        if self.writable && self.storage == StorageKind::Plain {
            let columns: Vec<&Column> = self.columns.values().collect();
            storage::write(&self.path, self.endian, self.nrows, &columns, &self.keywords)?;
            tracing::debug!(path = %self.path.display(), nrows = self.nrows, "flushed table");
        }
        if recursive {
            for (_, child) in &mut self.subtables {
                child.flush(true)?;
            }
        }
        Ok(())
    }

    /// Close the table and its subtables, reporting the first error from a
    /// final flush or removal.
    pub fn close(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Every subtable and the table itself get closed; the first error wins
        let mut first_err = None;
        for (keyword, mut child) in std::mem::take(&mut self.subtables) {
            if let Err(err) = child.finish() {
                tracing::warn!(
                    path = %self.path.display(),
                    subtable = %keyword,
                    error = %err,
                    "closing subtable failed"
                );
                first_err.get_or_insert(err);
            }
        }
        let own = if self.delete_on_close {
            storage::remove(&self.path).inspect(|()| {
                tracing::debug!(path = %self.path.display(), "deleted table");
            })
        } else {
            self.flush(false).inspect(|()| {
                tracing::debug!(path = %self.path.display(), "closed table");
            })
        };
        if let Err(err) = own {
            first_err.get_or_insert(err);
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            tracing::warn!(path = %self.path.display(), error = %err, "closing table failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use num_complex::Complex32;

    fn memory_table(nrows: usize) -> Table {
        Table::create(
            "scratch",
            TableOptions {
                endian: EndianFormat::Little,
                storage: StorageKind::Memory,
                nrows,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_add_rows_and_scalar_roundtrip() {
        let mut table = memory_table(0);
        table.add_column(ColumnDesc::scalar("ID", DataType::Int)).unwrap();
        table.add_rows(5).unwrap();
        assert_eq!(table.nrows(), 5);

        table.put_column("ID", &[5], &[1, 2, 3, 4, 5]).unwrap();
        let ids = table.get_column::<i32>("ID").unwrap();
        assert_eq!(ids.as_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_add_rows_zero() {
        let mut table = memory_table(3);
        table.add_rows(0).unwrap();
        assert_eq!(table.nrows(), 3);
    }

    #[test]
    fn test_unsupported_column_type() {
        let mut table = memory_table(1);
        let err = table
            .add_column(ColumnDesc::scalar("NAME", DataType::String))
            .unwrap_err();
        assert!(matches!(err, TableError::UnsupportedType(DataType::String)));
        assert_eq!(table.ncolumns(), 0);
    }

    #[test]
    fn test_duplicate_column() {
        let mut table = memory_table(1);
        table.add_column(ColumnDesc::scalar("ID", DataType::Int)).unwrap();
        assert!(matches!(
            table.add_column(ColumnDesc::scalar("ID", DataType::Double)),
            Err(TableError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_remove_rows_keeps_order() {
        let mut table = memory_table(5);
        table.add_column(ColumnDesc::scalar("ID", DataType::Int)).unwrap();
        table.put_column("ID", &[5], &[10, 11, 12, 13, 14]).unwrap();

        table.remove_rows(&[3, 0, 3]).unwrap();
        assert_eq!(table.nrows(), 3);
        assert_eq!(table.get_column::<i32>("ID").unwrap().as_slice(), &[11, 12, 14]);

        assert!(matches!(
            table.remove_rows(&[1, 7]),
            Err(TableError::RowOutOfRange { row: 7, nrows: 3 })
        ));
        assert_eq!(table.nrows(), 3);
    }

    #[test]
    fn test_array_column_shape() {
        let mut table = memory_table(2);
        table
            .add_column(ColumnDesc::array("UVW", DataType::Double, &[3]))
            .unwrap();
        assert_eq!(table.cell_shape("UVW", 0).unwrap(), Some(vec![3]));

        let data: Vec<f64> = (0..6).map(|i| i as f64 * 0.5).collect();
        table.put_column("UVW", &[3, 2], &data).unwrap();
        let uvw = table.get_column::<f64>("UVW").unwrap();
        assert_eq!(uvw.shape(), &[3, 2]);
        for (a, b) in uvw.as_slice().iter().zip(&data) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_complex_column_and_int_as_double() {
        let mut table = memory_table(2);
        table.add_column(ColumnDesc::scalar("WEIGHT", DataType::Complex)).unwrap();
        table.add_column(ColumnDesc::scalar("ANT", DataType::Int)).unwrap();
        let values = [Complex32::new(1.0, 2.0), Complex32::new(-1.0, 0.5)];
        table.put_column("WEIGHT", &[2], &values).unwrap();
        table.put_column("ANT", &[2], &[4, 9]).unwrap();

        assert_eq!(table.get_column::<Complex32>("WEIGHT").unwrap().as_slice(), &values);
        assert_eq!(table.get_column::<f64>("ANT").unwrap().as_slice(), &[4.0, 9.0]);
        assert!(matches!(
            table.get_column::<i32>("WEIGHT"),
            Err(TableError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_keywords() {
        let mut table = memory_table(0);
        table.put_keyword("TELESCOPE", "ALMA").unwrap();
        table.put_keyword("NCHAN", 64i64).unwrap();
        assert_eq!(table.keywords().len(), 2);
        assert_eq!(table.keyword("TELESCOPE").unwrap().as_string(), "ALMA");
        table.remove_keyword("NCHAN").unwrap();
        assert!(table.keyword("NCHAN").is_err());
    }

    #[test]
    fn test_subtable_keyword() {
        let mut table = memory_table(0);
        let child = Table::create(
            "scratch/ANTENNA",
            TableOptions {
                endian: EndianFormat::Little,
                storage: StorageKind::Memory,
                nrows: 4,
            },
        )
        .unwrap();
        table.define_subtable("ANTENNA", child).unwrap();
        assert_eq!(table.keyword("ANTENNA").unwrap().as_string(), "scratch/ANTENNA");
        assert_eq!(table.subtable("ANTENNA").unwrap().nrows(), 4);
        table.flush(true).unwrap();

        table.put_keyword("ANTENNA", "detached").unwrap();
        assert!(table.subtable("ANTENNA").is_none());
    }
}
