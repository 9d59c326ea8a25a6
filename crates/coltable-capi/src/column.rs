//! C API for column definition and column data

use coltable::{ColumnDesc, DataType};

use crate::types::with_table;
use crate::{
    CTB_SUCCESS, StatusCode, ctb_complex32, ctb_table, cstr_to_str_checked, slice_from_raw,
    write_slice, write_text,
};

/// Sentinel closing every shape written by `ctb_table_get_column_shape`
pub const CTB_SHAPE_END: i64 = -1;

/// Add a scalar column, filled with zeros for existing rows.
///
/// # Arguments
/// * `ptr` - Table handle
/// * `name` - Column name (UTF-8, null-terminated)
/// * `type_tag` - Element type code: 5 = int, 8 = double, 9 = complex
///
/// # Returns
/// * `CTB_SUCCESS` - Column added
/// * `CTB_UNSUPPORTED_TYPE` - Any other type code; no column is created
/// * `CTB_ALREADY_EXISTS` - A column with that name exists
/// * `CTB_NOT_WRITABLE` - The table is read only
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_add_scalar_column(
    ptr: *mut ctb_table,
    name: *const libc::c_char,
    type_tag: libc::c_int,
) -> StatusCode {
    let name = match cstr_to_str_checked(name) {
        Ok(s) => s,
        Err(code) => return code,
    };

    with_table(ptr, |table| {
        let data_type = DataType::from_tag(type_tag)?;
        table.add_column(ColumnDesc::scalar(name, data_type))?;
        Ok(CTB_SUCCESS)
    })
}

/// Add an array column.
///
/// With `ndim > 0` every cell has the shape `dims[0..ndim]` and existing
/// rows are zero-filled. With `ndim == 0` cells may differ in shape and
/// existing rows start undefined.
///
/// # Arguments
/// * `ptr` - Table handle
/// * `name` - Column name (UTF-8, null-terminated)
/// * `type_tag` - Element type code: 5 = int, 8 = double, 9 = complex
/// * `dims` - Cell shape (may be null when `ndim` is 0)
/// * `ndim` - Number of cell axes
///
/// # Returns
/// * `CTB_SUCCESS` - Column added
/// * `CTB_UNSUPPORTED_TYPE` - Any other type code; no column is created
/// * `CTB_INVALID_ARGUMENT` - A cell axis has length zero
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_add_array_column(
    ptr: *mut ctb_table,
    name: *const libc::c_char,
    type_tag: libc::c_int,
    dims: *const libc::size_t,
    ndim: libc::size_t,
) -> StatusCode {
    let name = match cstr_to_str_checked(name) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let dims = match slice_from_raw(dims, ndim) {
        Ok(s) => s,
        Err(code) => return code,
    };

    with_table(ptr, |table| {
        let data_type = DataType::from_tag(type_tag)?;
        table.add_column(ColumnDesc::array(name, data_type, dims))?;
        Ok(CTB_SUCCESS)
    })
}

/// Remove a column and its data.
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_remove_column(
    ptr: *mut ctb_table,
    name: *const libc::c_char,
) -> StatusCode {
    let name = match cstr_to_str_checked(name) {
        Ok(s) => s,
        Err(code) => return code,
    };

    with_table(ptr, |table| {
        table.remove_column(name)?;
        Ok(CTB_SUCCESS)
    })
}

/// Get the element type name of a column (`int`, `double`, `complex`).
///
/// # Arguments
/// * `ptr` - Table handle
/// * `name` - Column name (UTF-8, null-terminated)
/// * `buf` - Output buffer, or null to query the length
/// * `buf_len` - Size of the buffer in bytes
/// * `out_len` - Output: required buffer length including null terminator
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_get_column_type(
    ptr: *const ctb_table,
    name: *const libc::c_char,
    buf: *mut u8,
    buf_len: libc::size_t,
    out_len: *mut libc::size_t,
) -> StatusCode {
    if out_len.is_null() {
        return crate::CTB_NULL_POINTER;
    }
    let name = match cstr_to_str_checked(name) {
        Ok(s) => s,
        Err(code) => return code,
    };

    with_table(ptr, |table| {
        let data_type = table.column_data_type(name)?;
        Ok(write_text(data_type.name(), buf, buf_len, out_len))
    })
}

/// Describe the shape of a whole column.
///
/// Scalar columns report `[nrows, -1]`. Array columns report the cell shape
/// of row 0 followed by `nrows, -1`. When row 0 is undefined (or there are
/// no rows) the declared fixed shape is used, and a variable-shape column
/// falls back to `[nrows, -1]`. Only row 0 is inspected.
///
/// # Arguments
/// * `ptr` - Table handle
/// * `name` - Column name (UTF-8, null-terminated)
/// * `buf` - Output buffer, or null to query the element count
/// * `buf_len` - Capacity of `buf` in elements
/// * `out_len` - Output: number of elements in the shape, sentinel included
///
/// # Returns
/// * `CTB_SUCCESS` - Shape written (or count query succeeded)
/// * `CTB_BUFFER_TOO_SMALL` - `buf_len < *out_len`; nothing was written
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_get_column_shape(
    ptr: *const ctb_table,
    name: *const libc::c_char,
    buf: *mut i64,
    buf_len: libc::size_t,
    out_len: *mut libc::size_t,
) -> StatusCode {
    if out_len.is_null() {
        return crate::CTB_NULL_POINTER;
    }
    let name = match cstr_to_str_checked(name) {
        Ok(s) => s,
        Err(code) => return code,
    };

    with_table(ptr, |table| {
        let desc = table.column_desc(name)?;
        let cell = if desc.is_scalar() {
            Vec::new()
        } else {
            let first = match table.nrows() {
                0 => None,
                _ => table.cell_shape(name, 0)?,
            };
            first
                .or_else(|| desc.fixed_shape().map(<[usize]>::to_vec))
                .unwrap_or_default()
        };

        let mut shape: Vec<i64> = cell.into_iter().map(|axis| axis as i64).collect();
        shape.push(table.nrows() as i64);
        shape.push(CTB_SHAPE_END);
        Ok(write_slice(&shape, buf, buf_len, out_len))
    })
}

impl_column_access!(int, i32);
impl_column_access!(double, f64);
impl_column_access!(complex, ctb_complex32);
