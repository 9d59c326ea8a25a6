//! C API for table keywords and subtables

use crate::types::with_table;
use crate::{
    CTB_INVALID_ARGUMENT, CTB_NULL_POINTER, CTB_SUCCESS, StatusCode, ctb_table,
    cstr_to_str_checked, err_status, write_text,
};

/// Get a keyword value rendered as text.
///
/// Numbers use their shortest round-trip form, complex values render as
/// `(re,im)` and subtable keywords as the subtable path.
///
/// # Arguments
/// * `ptr` - Table handle
/// * `keyword` - Keyword name (UTF-8, null-terminated)
/// * `buf` - Output buffer, or null to query the length
/// * `buf_len` - Size of the buffer in bytes
/// * `out_len` - Output: required buffer length including null terminator
///
/// # Returns
/// * `CTB_SUCCESS` - Value written (or length query succeeded)
/// * `CTB_BUFFER_TOO_SMALL` - Buffer too small; the value was truncated
/// * `CTB_NOT_FOUND` - No such keyword
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_get_keyword_string(
    ptr: *const ctb_table,
    keyword: *const libc::c_char,
    buf: *mut u8,
    buf_len: libc::size_t,
    out_len: *mut libc::size_t,
) -> StatusCode {
    if out_len.is_null() {
        return CTB_NULL_POINTER;
    }
    let keyword = match cstr_to_str_checked(keyword) {
        Ok(s) => s,
        Err(code) => return code,
    };

    with_table(ptr, |table| {
        let value = table.keyword(keyword)?.as_string();
        Ok(write_text(&value, buf, buf_len, out_len))
    })
}

/// Set a text keyword, replacing any previous value.
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_put_keyword_string(
    ptr: *mut ctb_table,
    keyword: *const libc::c_char,
    value: *const libc::c_char,
) -> StatusCode {
    let keyword = match cstr_to_str_checked(keyword) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let value = match cstr_to_str_checked(value) {
        Ok(s) => s,
        Err(code) => return code,
    };

    with_table(ptr, |table| {
        table.put_keyword(keyword, value)?;
        Ok(CTB_SUCCESS)
    })
}

/// Set an integer keyword, replacing any previous value.
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_put_keyword_int(
    ptr: *mut ctb_table,
    keyword: *const libc::c_char,
    value: i64,
) -> StatusCode {
    let keyword = match cstr_to_str_checked(keyword) {
        Ok(s) => s,
        Err(code) => return code,
    };

    with_table(ptr, |table| {
        table.put_keyword(keyword, value)?;
        Ok(CTB_SUCCESS)
    })
}

/// Set a floating point keyword, replacing any previous value.
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_put_keyword_double(
    ptr: *mut ctb_table,
    keyword: *const libc::c_char,
    value: libc::c_double,
) -> StatusCode {
    let keyword = match cstr_to_str_checked(keyword) {
        Ok(s) => s,
        Err(code) => return code,
    };

    with_table(ptr, |table| {
        table.put_keyword(keyword, value)?;
        Ok(CTB_SUCCESS)
    })
}

/// Remove a keyword. A subtable attached under it is detached and closed.
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_remove_keyword(
    ptr: *mut ctb_table,
    keyword: *const libc::c_char,
) -> StatusCode {
    let keyword = match cstr_to_str_checked(keyword) {
        Ok(s) => s,
        Err(code) => return code,
    };

    with_table(ptr, |table| {
        table.remove_keyword(keyword)?;
        Ok(CTB_SUCCESS)
    })
}

/// Attach `child` to `parent` as a subtable under `keyword`.
///
/// The keyword records the child's path. Unless a handle is null or
/// `child` is `parent`, ownership of `child` passes to this call: on success
/// it lives as long as the parent and is flushed by
/// `ctb_table_flush(parent, 1)`; on failure it is closed. Do not use or
/// close `child` afterwards.
///
/// # Returns
/// * `CTB_SUCCESS` - Subtable attached
/// * `CTB_INVALID_ARGUMENT` - `child` is `parent`
/// * `CTB_NOT_WRITABLE` - The parent is read only
#[unsafe(no_mangle)]
pub extern "C" fn ctb_table_define_subtable(
    parent: *mut ctb_table,
    keyword: *const libc::c_char,
    child: *mut ctb_table,
) -> StatusCode {
    if parent.is_null() || child.is_null() {
        return CTB_NULL_POINTER;
    }
    if std::ptr::eq(parent, child) {
        return err_status("a table cannot be its own subtable", CTB_INVALID_ARGUMENT);
    }
    let mut child = unsafe { Box::from_raw(child) };
    let keyword = match cstr_to_str_checked(keyword) {
        Ok(s) => s,
        Err(code) => return code,
    };

    with_table(parent, |table| {
        let Some(child) = child.take() else {
            return Err(coltable::TableError::InvalidArgument(
                "subtable handle was already released".to_string(),
            ));
        };
        table.define_subtable(keyword, child)?;
        Ok(CTB_SUCCESS)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CTB_BUFFER_TOO_SMALL, CTB_NOT_FOUND, ctb_table_close, ctb_table_new, ctb_table_nkeywords,
        ctb_table_release,
    };
    use std::ffi::{CStr, CString};

    fn memory_table(name: &str) -> *mut ctb_table {
        let name = CString::new(name).unwrap();
        let memtype = CString::new("memory").unwrap();
        let mut out = std::ptr::null_mut();
        assert_eq!(
            ctb_table_new(name.as_ptr(), std::ptr::null(), memtype.as_ptr(), 0, &mut out),
            CTB_SUCCESS
        );
        out
    }

    fn keyword_text(ptr: *const ctb_table, keyword: &CStr) -> String {
        let mut len = 0usize;
        assert_eq!(
            ctb_table_get_keyword_string(ptr, keyword.as_ptr(), std::ptr::null_mut(), 0, &mut len),
            CTB_SUCCESS
        );
        let mut buf = vec![0u8; len];
        assert_eq!(
            ctb_table_get_keyword_string(ptr, keyword.as_ptr(), buf.as_mut_ptr(), len, &mut len),
            CTB_SUCCESS
        );
        CStr::from_bytes_until_nul(&buf).unwrap().to_str().unwrap().to_string()
    }

    #[test]
    fn test_keywords_render_as_text() {
        let ptr = memory_table("kw.tab");
        let telescope = CString::new("TELESCOPE").unwrap();
        let nchan = CString::new("NCHAN").unwrap();
        let freq = CString::new("FREQ").unwrap();
        let value = CString::new("ALMA").unwrap();

        assert_eq!(
            ctb_table_put_keyword_string(ptr, telescope.as_ptr(), value.as_ptr()),
            CTB_SUCCESS
        );
        assert_eq!(ctb_table_put_keyword_int(ptr, nchan.as_ptr(), 64), CTB_SUCCESS);
        assert_eq!(ctb_table_put_keyword_double(ptr, freq.as_ptr(), 1.5), CTB_SUCCESS);

        assert_eq!(keyword_text(ptr, &telescope), "ALMA");
        assert_eq!(keyword_text(ptr, &nchan), "64");
        assert_eq!(keyword_text(ptr, &freq), "1.5");

        let mut n = 0usize;
        ctb_table_nkeywords(ptr, &mut n);
        assert_eq!(n, 3);

        assert_eq!(ctb_table_remove_keyword(ptr, nchan.as_ptr()), CTB_SUCCESS);
        assert_eq!(ctb_table_remove_keyword(ptr, nchan.as_ptr()), CTB_NOT_FOUND);
        ctb_table_nkeywords(ptr, &mut n);
        assert_eq!(n, 2);
        ctb_table_release(ptr);
    }

    #[test]
    fn test_keyword_truncation() {
        let ptr = memory_table("kw.tab");
        let key = CString::new("OBSERVER").unwrap();
        let value = CString::new("Jocelyn Bell Burnell").unwrap();
        ctb_table_put_keyword_string(ptr, key.as_ptr(), value.as_ptr());

        let mut len = 0usize;
        let mut buf = [0xAAu8; 8];
        assert_eq!(
            ctb_table_get_keyword_string(ptr, key.as_ptr(), buf.as_mut_ptr(), 6, &mut len),
            CTB_BUFFER_TOO_SMALL
        );
        assert_eq!(len, 21);
        assert_eq!(&buf[..6], b"Jocel\0");
        assert_eq!(&buf[6..], &[0xAA, 0xAA]);
        ctb_table_release(ptr);
    }

    #[test]
    fn test_missing_keyword() {
        let ptr = memory_table("kw.tab");
        let key = CString::new("NOPE").unwrap();
        let mut len = 0usize;
        assert_eq!(
            ctb_table_get_keyword_string(ptr, key.as_ptr(), std::ptr::null_mut(), 0, &mut len),
            CTB_NOT_FOUND
        );
        ctb_table_release(ptr);
    }

    #[test]
    fn test_define_subtable() {
        let parent = memory_table("main.tab");
        let child = memory_table("main.tab/ANTENNA");
        let key = CString::new("ANTENNA").unwrap();

        assert_eq!(
            ctb_table_define_subtable(parent, key.as_ptr(), parent),
            CTB_INVALID_ARGUMENT
        );
        assert_eq!(ctb_table_define_subtable(parent, key.as_ptr(), child), CTB_SUCCESS);
        assert_eq!(keyword_text(parent, &key), "main.tab/ANTENNA");
        assert_eq!(ctb_table_close(parent), CTB_SUCCESS);
    }
}
