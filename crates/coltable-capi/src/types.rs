//! Opaque types for C API
//!
//! All Rust objects are wrapped in opaque pointers to hide implementation
//! details from C code.

use std::ffi::c_void;
use std::panic::{AssertUnwindSafe, catch_unwind};

use coltable::Table;
use parking_lot::{Mutex, MutexGuard};

use crate::{CTB_NULL_POINTER, StatusCode};

/// The internal value behind a `ctb_table` pointer
pub(crate) type InternalTable = Mutex<Table>;

/// Single precision complex element, layout-compatible with `float _Complex`
/// and `std::complex<float>`.
#[allow(non_camel_case_types)]
pub type ctb_complex32 = coltable::Complex32;

/// Opaque table handle for C API
///
/// Wraps an open `coltable::Table`. Calls on one handle from several threads
/// are serialized by an internal lock.
///
/// The internal structure is hidden using a void pointer.
#[repr(C)]
#[allow(non_camel_case_types)]
pub struct ctb_table {
    pub(crate) _private: *const c_void,
}

impl ctb_table {
    /// Create a new ctb_table from an open Table
    pub(crate) fn new(table: Table) -> Self {
        Self {
            _private: Box::into_raw(Box::new(Mutex::new(table))) as *const c_void,
        }
    }

    /// Get a reference to the inner lock
    pub(crate) fn inner(&self) -> &InternalTable {
        unsafe { &*(self._private as *const InternalTable) }
    }

    /// Lock the table for the duration of one call
    pub(crate) fn lock(&self) -> MutexGuard<'_, Table> {
        self.inner().lock()
    }

    /// Move the table out, leaving the handle empty
    pub(crate) fn take(&mut self) -> Option<Table> {
        let ptr = std::mem::replace(&mut self._private, std::ptr::null());
        if ptr.is_null() {
            return None;
        }
        let boxed = unsafe { Box::from_raw(ptr as *mut InternalTable) };
        Some(boxed.into_inner())
    }
}

impl Drop for ctb_table {
    fn drop(&mut self) {
        // Dropping the Table flushes or deletes it
        drop(self.take());
    }
}

// Safety: ctb_table is Send + Sync because the Table sits behind a Mutex
unsafe impl Send for ctb_table {}
unsafe impl Sync for ctb_table {}

/// Box a table and hand it to C through `out`.
pub(crate) fn into_handle(table: Table, out: *mut *mut ctb_table) {
    unsafe { *out = Box::into_raw(Box::new(ctb_table::new(table))) };
}

/// Run `f` against the locked table behind `ptr`.
///
/// Null handles give `CTB_NULL_POINTER`, engine errors are recorded as the
/// last error and mapped to their status code, panics become
/// `CTB_INTERNAL_ERROR`.
pub(crate) fn with_table<F>(ptr: *const ctb_table, f: F) -> StatusCode
where
    F: FnOnce(&mut Table) -> coltable::Result<StatusCode>,
{
    if ptr.is_null() {
        return CTB_NULL_POINTER;
    }

    let result = catch_unwind(AssertUnwindSafe(|| {
        let handle = unsafe { &*ptr };
        let mut table = handle.lock();
        match f(&mut table) {
            Ok(code) => code,
            Err(err) => crate::table_err(err),
        }
    }));

    crate::unwrap_catch(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coltable::{StorageKind, TableOptions};

    fn memory_table() -> Table {
        Table::create(
            "scratch.tab",
            TableOptions {
                storage: StorageKind::Memory,
                nrows: 2,
                ..TableOptions::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_take_empties_handle() {
        let mut handle = ctb_table::new(memory_table());
        assert_eq!(handle.lock().nrows(), 2);
        let table = handle.take().unwrap();
        assert_eq!(table.nrows(), 2);
        assert!(handle._private.is_null());
        assert!(handle.take().is_none());
    }

    #[test]
    fn test_with_table_null() {
        assert_eq!(with_table(std::ptr::null(), |_| Ok(0)), CTB_NULL_POINTER);
    }

    #[test]
    fn test_with_table_catches_panic() {
        let handle = ctb_table::new(memory_table());
        let status = with_table(&handle, |_| panic!("boom"));
        assert_eq!(status, crate::CTB_INTERNAL_ERROR);
        // Lock is released after the unwind
        assert_eq!(handle.lock().nrows(), 2);
    }

    #[test]
    fn test_complex_layout() {
        assert_eq!(std::mem::size_of::<ctb_complex32>(), 8);
        assert_eq!(std::mem::align_of::<ctb_complex32>(), 4);
    }
}
