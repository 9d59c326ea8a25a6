//! On-disk table format.
//!
//! A persistent table is a directory holding
//! - `table.dat`: JSON description (row count, byte order, columns, keywords,
//!   data generation)
//! - `table.f<i>.g<n>`: binary data of column `i`, generation `n`, in the
//!   table's byte order
//!
//! A write puts every column file of a new generation in place first and
//! only then replaces `table.dat`, so the description always names a
//! complete set of column files. Files of other generations are removed
//! afterwards.
//!
//! Scalar column files are `nrows` packed elements. Array column files hold,
//! per row, a `u8` defined flag followed (when set) by a `u32` rank, the
//! `u64` axis lengths and the packed elements. Complex elements are stored
//! as `(re, im)` `f32` pairs.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use crate::array::CellData;
use crate::column::{Cell, Column, ColumnStore};
use crate::desc::ColumnDesc;
use crate::error::{Result, TableError};
use crate::keyword::KeywordSet;
use crate::types::{DataType, EndianFormat};

pub(crate) const DESC_FILE: &str = "table.dat";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct TableMeta {
    version: u32,
    generation: u64,
    endian: EndianFormat,
    nrows: usize,
    columns: Vec<ColumnDesc>,
    keywords: KeywordSet,
}

/// Table contents as read back from disk.
#[derive(Debug)]
pub(crate) struct Loaded {
    pub(crate) endian: EndianFormat,
    pub(crate) nrows: usize,
    pub(crate) columns: Vec<Column>,
    pub(crate) keywords: KeywordSet,
}

fn column_file(dir: &Path, index: usize, generation: u64) -> PathBuf {
    dir.join(format!("table.f{index}.g{generation}"))
}

/// Generation of a column file name, `None` for other files.
fn file_generation(name: &str) -> Option<u64> {
    let rest = name.strip_prefix("table.f")?;
    let (index, generation) = rest.split_once(".g")?;
    index.parse::<usize>().ok()?;
    generation.parse().ok()
}

/// Column files in `dir` with their generation.
fn column_files(dir: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(generation) = entry.file_name().to_str().and_then(file_generation) {
            files.push((entry.path(), generation));
        }
    }
    Ok(files)
}

/// Whether `dir` looks like a table directory.
pub(crate) fn exists(dir: &Path) -> bool {
    dir.join(DESC_FILE).is_file()
}

/// Write a complete table to `dir`, replacing what was there.
///
/// On error the previously written table is left readable.
pub(crate) fn write(
    dir: &Path,
    endian: EndianFormat,
    nrows: usize,
    columns: &[&Column],
    keywords: &KeywordSet,
) -> Result<()> {
    fs::create_dir_all(dir)?;
    let existing = column_files(dir)?;
    let generation = existing.iter().map(|(_, g)| *g).max().unwrap_or(0) + 1;

    let mut written = Vec::with_capacity(columns.len());
    let staged = columns.iter().enumerate().try_for_each(|(index, column)| {
        let bytes = match endian {
            EndianFormat::Big => encode_column::<BigEndian>(column)?,
            EndianFormat::Little => encode_column::<LittleEndian>(column)?,
        };
        let path = column_file(dir, index, generation);
        fs::write(&path, bytes)?;
        written.push(path);
        Ok::<(), TableError>(())
    });

    let meta = TableMeta {
        version: FORMAT_VERSION,
        generation,
        endian,
        nrows,
        columns: columns.iter().map(|c| c.desc.clone()).collect(),
        keywords: keywords.clone(),
    };
    if let Err(err) = staged.and_then(|()| write_meta(dir, &meta)) {
        for path in written {
            let _ = fs::remove_file(path);
        }
        return Err(err);
    }

    for (path, _) in existing {
        if let Err(err) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %err, "could not remove old column file");
        }
    }
    Ok(())
}

/// Atomically replace `table.dat`.
fn write_meta(dir: &Path, meta: &TableMeta) -> Result<()> {
    let tmp = dir.join(format!("{DESC_FILE}.tmp"));
    {
        let mut file = fs::File::create(&tmp)?;
        serde_json::to_writer_pretty(&mut file, meta)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
    }
    fs::rename(&tmp, dir.join(DESC_FILE))?;
    Ok(())
}

/// Read a complete table from `dir`.
pub(crate) fn read(dir: &Path) -> Result<Loaded> {
    let file = fs::File::open(dir.join(DESC_FILE)).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            TableError::NotFound {
                kind: "table",
                name: dir.display().to_string(),
            }
        } else {
            TableError::Io(err)
        }
    })?;
    let meta: TableMeta = serde_json::from_reader(std::io::BufReader::new(file))?;
    if meta.version != FORMAT_VERSION {
        return Err(format_error(dir, format!("unsupported format version {}", meta.version)));
    }

    let mut columns = Vec::with_capacity(meta.columns.len());
    for (index, desc) in meta.columns.into_iter().enumerate() {
        let bytes = fs::read(column_file(dir, index, meta.generation))?;
        let decoded = match meta.endian {
            EndianFormat::Big => decode_column::<BigEndian>(&desc, meta.nrows, &bytes),
            EndianFormat::Little => decode_column::<LittleEndian>(&desc, meta.nrows, &bytes),
        };
        let store = decoded.map_err(|message| {
            format_error(dir, format!("column {}: {message}", desc.name))
        })?;
        columns.push(Column { desc, store });
    }

    Ok(Loaded {
        endian: meta.endian,
        nrows: meta.nrows,
        columns,
        keywords: meta.keywords,
    })
}

fn format_error(dir: &Path, message: String) -> TableError {
    TableError::Format {
        path: dir.display().to_string(),
        message,
    }
}

fn encode_column<B: ByteOrder>(column: &Column) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match &column.store {
        ColumnStore::Scalar(data) => encode_data::<B>(&mut out, data)?,
        ColumnStore::Array(cells) => {
            for cell in cells {
                match cell {
                    None => out.write_u8(0)?,
                    Some(cell) => {
                        out.write_u8(1)?;
                        out.write_u32::<B>(cell.shape.len() as u32)?;
                        for &axis in &cell.shape {
                            out.write_u64::<B>(axis as u64)?;
                        }
                        encode_data::<B>(&mut out, &cell.data)?;
                    }
                }
            }
        }
    }
    Ok(out)
}

fn encode_data<B: ByteOrder>(out: &mut Vec<u8>, data: &CellData) -> std::io::Result<()> {
    match data {
        CellData::Int(values) => {
            for &v in values {
                out.write_i32::<B>(v)?;
            }
        }
        CellData::Double(values) => {
            for &v in values {
                out.write_f64::<B>(v)?;
            }
        }
        CellData::Complex(values) => {
            for v in values {
                out.write_f32::<B>(v.re)?;
                out.write_f32::<B>(v.im)?;
            }
        }
    }
    Ok(())
}

type DecodeResult<T> = std::result::Result<T, String>;

fn decode_column<B: ByteOrder>(
    desc: &ColumnDesc,
    nrows: usize,
    bytes: &[u8],
) -> DecodeResult<ColumnStore> {
    let mut cursor = Cursor::new(bytes);
    let store = if desc.is_scalar() {
        ColumnStore::Scalar(decode_data::<B>(&mut cursor, desc.data_type, nrows)?)
    } else {
        let mut cells = Vec::new();
        for row in 0..nrows {
            let flag = cursor.read_u8().map_err(|e| format!("row {row}: {e}"))?;
            if flag == 0 {
                cells.push(None);
                continue;
            }
            let rank = cursor.read_u32::<B>().map_err(|e| format!("row {row}: {e}"))?;
            let mut shape = Vec::new();
            for _ in 0..rank {
                let axis = cursor.read_u64::<B>().map_err(|e| format!("row {row}: {e}"))?;
                shape.push(usize::try_from(axis).map_err(|e| format!("row {row}: {e}"))?);
            }
            let len = shape
                .iter()
                .try_fold(1usize, |acc, &axis| acc.checked_mul(axis))
                .ok_or_else(|| format!("row {row}: cell shape {shape:?} overflows"))?;
            let data = decode_data::<B>(&mut cursor, desc.data_type, len)?;
            cells.push(Some(Cell { shape, data }));
        }
        ColumnStore::Array(cells)
    };
    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(format!("{} trailing bytes", bytes.len() - consumed));
    }
    Ok(store)
}

fn decode_data<B: ByteOrder>(
    cursor: &mut Cursor<&[u8]>,
    data_type: DataType,
    len: usize,
) -> DecodeResult<CellData> {
    let element_size = data_type.element_size().map_err(|e| e.to_string())?;
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if len.checked_mul(element_size).is_none_or(|needed| needed > remaining) {
        return Err(format!("expected {len} {data_type} elements, file is truncated"));
    }
    let data = match data_type {
        DataType::Int => {
            let mut values = vec![0i32; len];
            cursor.read_i32_into::<B>(&mut values).map_err(|e| e.to_string())?;
            CellData::Int(values)
        }
        DataType::Double => {
            let mut values = vec![0f64; len];
            cursor.read_f64_into::<B>(&mut values).map_err(|e| e.to_string())?;
            CellData::Double(values)
        }
        DataType::Complex => {
            let mut raw = vec![0f32; len * 2];
            cursor.read_f32_into::<B>(&mut raw).map_err(|e| e.to_string())?;
            CellData::Complex(
                raw.chunks_exact(2)
                    .map(|pair| Complex32::new(pair[0], pair[1]))
                    .collect(),
            )
        }
        other => return Err(format!("unsupported column type {other}")),
    };
    Ok(data)
}

/// Remove a table directory written by [`write`].
pub(crate) fn remove(dir: &Path) -> Result<()> {
    if exists(dir) {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}
