#![warn(missing_docs)]
//! C API for the coltable engine
//!
//! This crate provides a C-compatible interface to `coltable`, for callers
//! that cannot link against the Rust types directly (Julia, Python, C++).
//! Every function forwards to exactly one engine operation after converting
//! its arguments.
//!
//! ## Design patterns
//!
//! - Opaque table handle with `_private: *const c_void`
//! - Explicit lifecycle: `ctb_table_new` / `ctb_table_open` / `ctb_table_close`
//! - Status codes for error handling, message via `ctb_last_error_message`
//! - Query-then-fill for every variable-length output: the required length
//!   is reported through `out_len`, a null buffer only queries, an undersized
//!   buffer is rejected with `CTB_BUFFER_TOO_SMALL` (text is truncated and
//!   null terminated within the buffer, numeric arrays are left untouched)
//! - `catch_unwind` to prevent Rust panics from crossing FFI boundary

// C API requires unsafe operations with raw pointers
#![allow(clippy::not_unsafe_ptr_arg_deref)]

#[macro_use]
mod macros;

mod column;
mod init;
mod keyword;
mod table;
mod types;

pub use column::*;
pub use init::*;
pub use keyword::*;
pub use table::*;
pub use types::*;

use std::ffi::CStr;

use coltable::TableError;

/// Status code type for C API
pub type StatusCode = libc::c_int;

/// Operation completed successfully.
pub const CTB_SUCCESS: StatusCode = 0;
/// A null pointer was passed where a valid pointer was required.
pub const CTB_NULL_POINTER: StatusCode = -1;
/// An invalid argument was provided (bad shape, row number, option, UTF-8).
pub const CTB_INVALID_ARGUMENT: StatusCode = -2;
/// The type tag is unknown or cannot be used for a column.
pub const CTB_UNSUPPORTED_TYPE: StatusCode = -3;
/// The named table, column or keyword does not exist.
pub const CTB_NOT_FOUND: StatusCode = -4;
/// The provided output buffer is too small for the result.
pub const CTB_BUFFER_TOO_SMALL: StatusCode = -5;
/// An internal error occurred (e.g., a panic was caught).
pub const CTB_INTERNAL_ERROR: StatusCode = -6;
/// Reading or writing the table on disk failed.
pub const CTB_IO_ERROR: StatusCode = -7;
/// The table was opened read only.
pub const CTB_NOT_WRITABLE: StatusCode = -8;
/// The column holds a different element type than requested.
pub const CTB_TYPE_MISMATCH: StatusCode = -9;
/// A column or file with that name already exists.
pub const CTB_ALREADY_EXISTS: StatusCode = -10;
/// The engine was already initialized with a different configuration.
pub const CTB_ALREADY_INITIALIZED: StatusCode = -11;

// ============================================================================
// Thread-local error message storage
// ============================================================================

use std::cell::RefCell;

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Store an error message in thread-local storage.
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = msg.to_string();
    });
}

/// Store an error and return a status code.
pub(crate) fn err_status<E: std::fmt::Display>(err: E, code: StatusCode) -> StatusCode {
    set_last_error(&err.to_string());
    code
}

/// Status code for an engine error.
pub(crate) fn status_of(err: &TableError) -> StatusCode {
    match err {
        TableError::NotFound { .. } => CTB_NOT_FOUND,
        TableError::AlreadyExists { .. } => CTB_ALREADY_EXISTS,
        TableError::UnknownTypeTag { .. } | TableError::UnsupportedType(_) => CTB_UNSUPPORTED_TYPE,
        TableError::TypeMismatch { .. } => CTB_TYPE_MISMATCH,
        TableError::ShapeMismatch { .. }
        | TableError::RowOutOfRange { .. }
        | TableError::InvalidArgument(_) => CTB_INVALID_ARGUMENT,
        TableError::NotWritable(_) => CTB_NOT_WRITABLE,
        TableError::AlreadyInitialized => CTB_ALREADY_INITIALIZED,
        TableError::Format { .. } | TableError::Io(_) | TableError::Description(_) => CTB_IO_ERROR,
    }
}

/// Store an engine error and return its status code.
pub(crate) fn table_err(err: TableError) -> StatusCode {
    tracing::debug!(error = %err, "call failed");
    let code = status_of(&err);
    err_status(err, code)
}

/// Unwrap a `catch_unwind` result, storing any panic message.
pub(crate) fn unwrap_catch(result: std::thread::Result<StatusCode>) -> StatusCode {
    match result {
        Ok(code) => code,
        Err(panic) => {
            let msg = panic_message(&panic);
            set_last_error(&msg);
            CTB_INTERNAL_ERROR
        }
    }
}

fn panic_message(info: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Convert a C string pointer to a Rust `&str`, distinguishing null from invalid UTF-8.
pub(crate) fn cstr_to_str_checked<'a>(ptr: *const libc::c_char) -> Result<&'a str, StatusCode> {
    if ptr.is_null() {
        return Err(CTB_NULL_POINTER);
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| err_status("string argument is not valid UTF-8", CTB_INVALID_ARGUMENT))
}

/// Like [`cstr_to_str_checked`], but null maps to `None`.
pub(crate) fn cstr_to_opt_str<'a>(ptr: *const libc::c_char) -> Result<Option<&'a str>, StatusCode> {
    if ptr.is_null() {
        Ok(None)
    } else {
        cstr_to_str_checked(ptr).map(Some)
    }
}

/// Copy `text` into a caller buffer as a null-terminated string.
///
/// `out_len` always receives the required length including the terminator.
/// A null `buf` only queries. If the buffer is too small the text is
/// truncated at a character boundary to fit `buf_len - 1` bytes, terminated,
/// and `CTB_BUFFER_TOO_SMALL` is returned. Nothing is written past `buf_len`.
pub(crate) fn write_text(
    text: &str,
    buf: *mut u8,
    buf_len: libc::size_t,
    out_len: *mut libc::size_t,
) -> StatusCode {
    let required_len = text.len() + 1; // +1 for null terminator
    unsafe { *out_len = required_len };

    if buf.is_null() {
        return CTB_SUCCESS;
    }
    if buf_len == 0 {
        return CTB_BUFFER_TOO_SMALL;
    }

    let mut n = text.len().min(buf_len - 1);
    while !text.is_char_boundary(n) {
        n -= 1;
    }
    unsafe {
        std::ptr::copy_nonoverlapping(text.as_ptr(), buf, n);
        *buf.add(n) = 0; // null terminator
    }

    if n < text.len() {
        CTB_BUFFER_TOO_SMALL
    } else {
        CTB_SUCCESS
    }
}

/// Copy `data` into a caller buffer using the query-then-fill pattern.
///
/// `out_len` always receives `data.len()`. A null `buf` only queries; an
/// undersized buffer is left untouched and `CTB_BUFFER_TOO_SMALL` returned.
pub(crate) fn write_slice<T: Copy>(
    data: &[T],
    buf: *mut T,
    buf_len: libc::size_t,
    out_len: *mut libc::size_t,
) -> StatusCode {
    unsafe { *out_len = data.len() };

    if buf.is_null() {
        return CTB_SUCCESS;
    }
    if buf_len < data.len() {
        return err_status(
            format!("buffer holds {buf_len} elements, {} required", data.len()),
            CTB_BUFFER_TOO_SMALL,
        );
    }

    unsafe {
        std::ptr::copy_nonoverlapping(data.as_ptr(), buf, data.len());
    }
    CTB_SUCCESS
}

/// View a caller array as a slice; null is accepted only for `len == 0`.
pub(crate) fn slice_from_raw<'a, T>(ptr: *const T, len: usize) -> Result<&'a [T], StatusCode> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(CTB_NULL_POINTER);
    }
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// Retrieve the last error message.
///
/// # Arguments
/// * `buf` - Output buffer for the error message (UTF-8, null-terminated).
///   Pass null to query required length only.
/// * `buf_len` - Size of the buffer in bytes.
/// * `out_len` - Output: required buffer length including null terminator.
///
/// # Returns
/// * `CTB_SUCCESS` - Message written (or length query succeeded).
/// * `CTB_NULL_POINTER` - `out_len` is null.
/// * `CTB_BUFFER_TOO_SMALL` - Buffer too small; the message was truncated.
#[unsafe(no_mangle)]
pub extern "C" fn ctb_last_error_message(
    buf: *mut u8,
    buf_len: libc::size_t,
    out_len: *mut libc::size_t,
) -> StatusCode {
    if out_len.is_null() {
        return CTB_NULL_POINTER;
    }

    LAST_ERROR.with(|cell| {
        let msg = cell.borrow();
        write_text(&msg, buf, buf_len, out_len)
    })
}
