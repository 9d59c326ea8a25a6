//! C API for table lifecycle, introspection and row operations

use std::panic::{AssertUnwindSafe, catch_unwind};

use coltable::{EndianFormat, StorageKind, Table, TableOption, TableOptions};

use crate::types::{into_handle, with_table};
use crate::{
    CTB_INVALID_ARGUMENT, CTB_NULL_POINTER, CTB_SUCCESS, StatusCode, ctb_table,
    cstr_to_opt_str, cstr_to_str_checked, err_status, slice_from_raw, table_err, unwrap_catch,
    write_text,
};

// Generate common opaque type functions
impl_opaque_type_common!(table);

// ============================================================================
// Lifecycle
// ============================================================================

/// Create a new table.
///
/// # Arguments
/// * `name` - Table path (UTF-8, null-terminated)
/// * `endian` - `big`, `little`, `local` or `aipsrc`; null for the configured default
/// * `memtype` - `plain` (directory on disk) or `memory`; null for the configured default
/// * `nrow` - Number of rows the table starts with
/// * `out` - Output: new table handle, to be closed with `ctb_table_close`
///
/// # Returns
/// * `CTB_SUCCESS` - Table created
/// * `CTB_INVALID_ARGUMENT` - Unknown endian or memory type
/// * `CTB_ALREADY_EXISTS` - `name` exists and is not a table
/// * `CTB_IO_ERROR` - The table directory could not be written
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_new(
    name: *const libc::c_char,
    endian: *const libc::c_char,
    memtype: *const libc::c_char,
    nrow: libc::size_t,
    out: *mut *mut ctb_table,
) -> StatusCode {
    if out.is_null() {
        return CTB_NULL_POINTER;
    }
    let name = match cstr_to_str_checked(name) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let endian = match cstr_to_opt_str(endian) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let memtype = match cstr_to_opt_str(memtype) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut options = TableOptions {
            nrows: nrow,
            ..TableOptions::default()
        };
        if let Some(endian) = endian {
            options.endian = match EndianFormat::resolve(endian) {
                Ok(e) => e,
                Err(err) => return table_err(err),
            };
        }
        if let Some(memtype) = memtype {
            options.storage = match StorageKind::resolve(memtype) {
                Ok(kind) => kind,
                Err(err) => return table_err(err),
            };
        }

        match Table::create(name, options) {
            Ok(table) => {
                into_handle(table, out);
                CTB_SUCCESS
            }
            Err(err) => table_err(err),
        }
    }));

    unwrap_catch(result)
}

/// Open an existing table.
///
/// # Arguments
/// * `name` - Table path (UTF-8, null-terminated)
/// * `option` - 1 = read only, 5 = update, 6 = update and delete on close
/// * `out` - Output: table handle, to be closed with `ctb_table_close`
///
/// # Returns
/// * `CTB_SUCCESS` - Table opened
/// * `CTB_INVALID_ARGUMENT` - Unknown option
/// * `CTB_NOT_FOUND` - No table at `name`
/// * `CTB_IO_ERROR` - The table files are unreadable or corrupt
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_open(
    name: *const libc::c_char,
    option: libc::c_int,
    out: *mut *mut ctb_table,
) -> StatusCode {
    if out.is_null() {
        return CTB_NULL_POINTER;
    }
    let name = match cstr_to_str_checked(name) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let result = catch_unwind(AssertUnwindSafe(|| {
        let table = TableOption::from_code(option).and_then(|option| Table::open(name, option));
        match table {
            Ok(table) => {
                into_handle(table, out);
                CTB_SUCCESS
            }
            Err(err) => table_err(err),
        }
    }));

    unwrap_catch(result)
}

/// Close a table and release its handle.
///
/// A writable persistent table is flushed first; a table opened with the
/// delete option is removed from disk. The handle is released even when
/// that final step fails. Null is a no-op.
///
/// # Returns
/// * `CTB_SUCCESS` - Closed
/// * `CTB_IO_ERROR` - The final flush or removal failed
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_close(ptr: *mut ctb_table) -> StatusCode {
    if ptr.is_null() {
        return CTB_SUCCESS;
    }

    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut handle = unsafe { Box::from_raw(ptr) };
        match handle.take().map(Table::close) {
            Some(Err(err)) => table_err(err),
            Some(Ok(())) | None => CTB_SUCCESS,
        }
    }));

    unwrap_catch(result)
}

/// Write pending changes to disk.
///
/// # Arguments
/// * `ptr` - Table handle
/// * `recursive` - Non-zero to also flush attached subtables
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_flush(ptr: *mut ctb_table, recursive: libc::c_int) -> StatusCode {
    with_table(ptr, |table| {
        table.flush(recursive != 0)?;
        Ok(CTB_SUCCESS)
    })
}

// ============================================================================
// Introspection
// ============================================================================

fn flag(ptr: *const ctb_table, f: impl FnOnce(&Table) -> bool) -> libc::c_int {
    if ptr.is_null() {
        return -1;
    }
    let result = catch_unwind(AssertUnwindSafe(|| {
        let handle = unsafe { &*ptr };
        libc::c_int::from(f(&handle.lock()))
    }));
    result.unwrap_or(-1)
}

/// Check whether the table can be read.
///
/// # Returns
/// 1 if readable, 0 if not, -1 if the handle is null
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_is_readable(ptr: *const ctb_table) -> libc::c_int {
    flag(ptr, Table::is_readable)
}

/// Check whether the table can be modified.
///
/// # Returns
/// 1 if writable, 0 if read only, -1 if the handle is null
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_is_writable(ptr: *const ctb_table) -> libc::c_int {
    flag(ptr, Table::is_writable)
}

/// Check whether rows can be removed from the table.
///
/// # Returns
/// 1 if rows can be removed, 0 if not, -1 if the handle is null
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_can_remove_row(ptr: *const ctb_table) -> libc::c_int {
    flag(ptr, Table::can_remove_row)
}

/// Get the number of rows.
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_nrows(ptr: *const ctb_table, out: *mut libc::size_t) -> StatusCode {
    if out.is_null() {
        return CTB_NULL_POINTER;
    }
    with_table(ptr, |table| {
        unsafe { *out = table.nrows() };
        Ok(CTB_SUCCESS)
    })
}

/// Get the number of columns.
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_ncolumns(ptr: *const ctb_table, out: *mut libc::size_t) -> StatusCode {
    if out.is_null() {
        return CTB_NULL_POINTER;
    }
    with_table(ptr, |table| {
        unsafe { *out = table.ncolumns() };
        Ok(CTB_SUCCESS)
    })
}

/// Get the number of table keywords.
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_nkeywords(ptr: *const ctb_table, out: *mut libc::size_t) -> StatusCode {
    if out.is_null() {
        return CTB_NULL_POINTER;
    }
    with_table(ptr, |table| {
        unsafe { *out = table.keywords().len() };
        Ok(CTB_SUCCESS)
    })
}

/// Get the table path.
///
/// # Arguments
/// * `ptr` - Table handle
/// * `buf` - Output buffer (UTF-8, null-terminated), or null to query the length
/// * `buf_len` - Size of the buffer in bytes
/// * `out_len` - Output: required buffer length including null terminator
///
/// # Returns
/// * `CTB_SUCCESS` - Name written (or length query succeeded)
/// * `CTB_BUFFER_TOO_SMALL` - Buffer too small; the name was truncated
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_name(
    ptr: *const ctb_table,
    buf: *mut u8,
    buf_len: libc::size_t,
    out_len: *mut libc::size_t,
) -> StatusCode {
    if out_len.is_null() {
        return CTB_NULL_POINTER;
    }
    with_table(ptr, |table| {
        let name = table.path().to_string_lossy();
        Ok(write_text(&name, buf, buf_len, out_len))
    })
}

// ============================================================================
// Rows
// ============================================================================

/// Append `count` default-initialized rows.
///
/// # Returns
/// * `CTB_SUCCESS` - Rows added
/// * `CTB_NOT_WRITABLE` - The table is read only
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_add_rows(ptr: *mut ctb_table, count: libc::size_t) -> StatusCode {
    with_table(ptr, |table| {
        table.add_rows(count)?;
        Ok(CTB_SUCCESS)
    })
}

/// Remove rows by index.
///
/// Duplicate indices are removed once. If any index is negative or not
/// below the row count, no row is removed.
///
/// # Arguments
/// * `ptr` - Table handle
/// * `rows` - Row indices (may be null when `n` is 0)
/// * `n` - Number of indices
///
/// # Returns
/// * `CTB_SUCCESS` - Rows removed
/// * `CTB_INVALID_ARGUMENT` - An index is out of range
/// * `CTB_NOT_WRITABLE` - The table is read only
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_remove_rows(
    ptr: *mut ctb_table,
    rows: *const libc::c_int,
    n: libc::size_t,
) -> StatusCode {
    let rows = match slice_from_raw(rows, n) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let rows: Vec<usize> = match rows.iter().map(|&r| usize::try_from(r)).collect() {
        Ok(rows) => rows,
        Err(_) => return err_status("row index must not be negative", CTB_INVALID_ARGUMENT),
    };

    with_table(ptr, |table| {
        table.remove_rows(&rows)?;
        Ok(CTB_SUCCESS)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CTB_ALREADY_EXISTS, CTB_BUFFER_TOO_SMALL, CTB_NOT_FOUND, CTB_NOT_WRITABLE};
    use std::ffi::{CStr, CString};

    fn new_memory_table(nrow: usize) -> *mut ctb_table {
        let name = CString::new("memory.tab").unwrap();
        let memtype = CString::new("memory").unwrap();
        let mut out = std::ptr::null_mut();
        let status = ctb_table_new(name.as_ptr(), std::ptr::null(), memtype.as_ptr(), nrow, &mut out);
        assert_eq!(status, CTB_SUCCESS);
        assert!(!out.is_null());
        out
    }

    fn nrows(ptr: *const ctb_table) -> usize {
        let mut n = usize::MAX;
        assert_eq!(ctb_table_nrows(ptr, &mut n), CTB_SUCCESS);
        n
    }

    #[test]
    fn test_new_and_close() {
        let ptr = new_memory_table(3);
        assert_eq!(ctb_table_is_assigned(ptr), 1);
        assert_eq!(ctb_table_is_readable(ptr), 1);
        assert_eq!(ctb_table_is_writable(ptr), 1);
        assert_eq!(nrows(ptr), 3);

        let mut ncol = usize::MAX;
        assert_eq!(ctb_table_ncolumns(ptr, &mut ncol), CTB_SUCCESS);
        assert_eq!(ncol, 0);
        let mut nkw = usize::MAX;
        assert_eq!(ctb_table_nkeywords(ptr, &mut nkw), CTB_SUCCESS);
        assert_eq!(nkw, 0);

        assert_eq!(ctb_table_close(ptr), CTB_SUCCESS);
    }

    #[test]
    fn test_null_handles() {
        let mut n = 0usize;
        assert_eq!(ctb_table_close(std::ptr::null_mut()), CTB_SUCCESS);
        assert_eq!(ctb_table_is_readable(std::ptr::null()), -1);
        assert_eq!(ctb_table_is_writable(std::ptr::null()), -1);
        assert_eq!(ctb_table_can_remove_row(std::ptr::null()), -1);
        assert_eq!(ctb_table_is_assigned(std::ptr::null()), 0);
        assert_eq!(ctb_table_nrows(std::ptr::null(), &mut n), CTB_NULL_POINTER);
        assert_eq!(ctb_table_add_rows(std::ptr::null_mut(), 1), CTB_NULL_POINTER);
        assert_eq!(ctb_table_flush(std::ptr::null_mut(), 0), CTB_NULL_POINTER);
        ctb_table_release(std::ptr::null_mut());
    }

    #[test]
    fn test_add_rows_accumulates() {
        let ptr = new_memory_table(0);
        for (add, expected) in [(0, 0), (5, 5), (2, 7)] {
            assert_eq!(ctb_table_add_rows(ptr, add), CTB_SUCCESS);
            assert_eq!(nrows(ptr), expected);
        }
        ctb_table_release(ptr);
    }

    #[test]
    fn test_remove_rows() {
        let ptr = new_memory_table(6);
        assert_eq!(ctb_table_can_remove_row(ptr), 1);

        let rows = [4, 1, 4];
        assert_eq!(ctb_table_remove_rows(ptr, rows.as_ptr(), rows.len()), CTB_SUCCESS);
        assert_eq!(nrows(ptr), 4);

        let bad = [0, 9];
        assert_eq!(
            ctb_table_remove_rows(ptr, bad.as_ptr(), bad.len()),
            CTB_INVALID_ARGUMENT
        );
        let negative = [-1];
        assert_eq!(
            ctb_table_remove_rows(ptr, negative.as_ptr(), 1),
            CTB_INVALID_ARGUMENT
        );
        assert_eq!(nrows(ptr), 4);

        assert_eq!(ctb_table_remove_rows(ptr, std::ptr::null(), 0), CTB_SUCCESS);
        assert_eq!(nrows(ptr), 4);
        ctb_table_release(ptr);
    }

    #[test]
    fn test_new_rejects_bad_options() {
        let name = CString::new("bad.tab").unwrap();
        let endian = CString::new("middle").unwrap();
        let memtype = CString::new("tape").unwrap();
        let mut out = std::ptr::null_mut();
        assert_eq!(
            ctb_table_new(name.as_ptr(), endian.as_ptr(), std::ptr::null(), 0, &mut out),
            CTB_INVALID_ARGUMENT
        );
        assert_eq!(
            ctb_table_new(name.as_ptr(), std::ptr::null(), memtype.as_ptr(), 0, &mut out),
            CTB_INVALID_ARGUMENT
        );
        assert!(out.is_null());
        assert_eq!(
            ctb_table_new(std::ptr::null(), std::ptr::null(), std::ptr::null(), 0, &mut out),
            CTB_NULL_POINTER
        );
    }

    #[test]
    fn test_empty_memtype_uses_default_storage() {
        let dir = tempfile::tempdir().unwrap();
        let default = coltable::engine::config().default_storage;
        let empty = CString::new("").unwrap();
        for (file, memtype) in [("empty.tab", empty.as_ptr()), ("null.tab", std::ptr::null())] {
            let name = CString::new(dir.path().join(file).to_str().unwrap()).unwrap();
            let mut out = std::ptr::null_mut();
            assert_eq!(
                ctb_table_new(name.as_ptr(), std::ptr::null(), memtype, 0, &mut out),
                CTB_SUCCESS
            );
            let mut storage = None;
            with_table(out, |table| {
                storage = Some(table.storage());
                Ok(CTB_SUCCESS)
            });
            assert_eq!(storage, Some(default));
            assert_eq!(ctb_table_close(out), CTB_SUCCESS);
        }
    }

    #[test]
    fn test_open_errors() {
        let dir = tempfile::tempdir().unwrap();
        let name = CString::new(dir.path().join("absent.tab").to_str().unwrap()).unwrap();
        let mut out = std::ptr::null_mut();
        assert_eq!(ctb_table_open(name.as_ptr(), 1, &mut out), CTB_NOT_FOUND);
        assert_eq!(ctb_table_open(name.as_ptr(), 2, &mut out), CTB_INVALID_ARGUMENT);
        assert!(out.is_null());

        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        let file = CString::new(file.to_str().unwrap()).unwrap();
        let plain = CString::new("plain").unwrap();
        assert_eq!(
            ctb_table_new(file.as_ptr(), std::ptr::null(), plain.as_ptr(), 0, &mut out),
            CTB_ALREADY_EXISTS
        );
    }

    #[test]
    fn test_read_only_handle() {
        let dir = tempfile::tempdir().unwrap();
        let name = CString::new(dir.path().join("ro.tab").to_str().unwrap()).unwrap();
        let plain = CString::new("plain").unwrap();
        let mut out = std::ptr::null_mut();
        assert_eq!(
            ctb_table_new(name.as_ptr(), std::ptr::null(), plain.as_ptr(), 2, &mut out),
            CTB_SUCCESS
        );
        assert_eq!(ctb_table_close(out), CTB_SUCCESS);

        assert_eq!(ctb_table_open(name.as_ptr(), 1, &mut out), CTB_SUCCESS);
        assert_eq!(ctb_table_is_writable(out), 0);
        assert_eq!(ctb_table_can_remove_row(out), 0);
        assert_eq!(ctb_table_add_rows(out, 1), CTB_NOT_WRITABLE);
        assert_eq!(nrows(out), 2);
        assert_eq!(ctb_table_close(out), CTB_SUCCESS);
    }

    #[test]
    fn test_table_name() {
        let ptr = new_memory_table(0);
        let mut len = 0usize;
        assert_eq!(ctb_table_name(ptr, std::ptr::null_mut(), 0, &mut len), CTB_SUCCESS);
        assert_eq!(len, "memory.tab".len() + 1);

        let mut buf = vec![0u8; len];
        assert_eq!(ctb_table_name(ptr, buf.as_mut_ptr(), len, &mut len), CTB_SUCCESS);
        let name = CStr::from_bytes_until_nul(&buf).unwrap().to_str().unwrap();
        assert_eq!(name, "memory.tab");

        let mut small = [0u8; 4];
        assert_eq!(
            ctb_table_name(ptr, small.as_mut_ptr(), small.len(), &mut len),
            CTB_BUFFER_TOO_SMALL
        );
        assert_eq!(&small, b"mem\0");
        ctb_table_release(ptr);
    }
}
