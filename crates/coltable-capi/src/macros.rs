//! Macros generating repetitive C API functions
//!
//! One set per opaque type (lifecycle helpers) and one set per element type
//! (column read and write).

/// Generate common opaque type functions: release, is_assigned
///
/// # Generated functions
/// - `ctb_<TYPE>_release()` - Drops the object, ignoring errors from the final flush
/// - `ctb_<TYPE>_is_assigned()` - Checks if pointer is valid
///
/// # Example
/// ```ignore
/// impl_opaque_type_common!(table);
/// // Generates: ctb_table_release, ctb_table_is_assigned
/// ```
macro_rules! impl_opaque_type_common {
    ($type_name:ident) => {
        paste::paste! {
            /// Release the object by dropping it
            ///
            /// Prefer the type's `close` function when the outcome matters.
            ///
            /// # Safety
            /// The caller must ensure that the pointer is valid and not used after this call.
            #[unsafe(no_mangle)]
            pub extern "C" fn [<ctb_ $type_name _release>](obj: *mut [<ctb_ $type_name>]) {
                if obj.is_null() {
                    return;
                }
                let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
                    drop(Box::from_raw(obj));
                }));
            }

            /// Check if the object pointer is valid (non-null and not yet emptied)
            ///
            /// # Returns
            /// 1 if the object is valid, 0 otherwise
            #[unsafe(no_mangle)]
            pub extern "C" fn [<ctb_ $type_name _is_assigned>](
                obj: *const [<ctb_ $type_name>]
            ) -> i32 {
                if obj.is_null() {
                    return 0;
                }

                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
                    i32::from(!(*obj)._private.is_null())
                }));

                result.unwrap_or(0)
            }
        }
    };
}

/// Generate the typed column accessors for one element type
///
/// # Generated functions
/// - `ctb_table_get_column_<SUFFIX>()` - Two-phase read of a whole column
/// - `ctb_table_put_column_<SUFFIX>()` - Write a whole column
///
/// # Example
/// ```ignore
/// impl_column_access!(double, f64);
/// // Generates: ctb_table_get_column_double, ctb_table_put_column_double
/// ```
macro_rules! impl_column_access {
    ($suffix:ident, $elem:ty) => {
        paste::paste! {
            #[doc = concat!("Read a whole column as `", stringify!($elem), "` elements.")]
            ///
            /// Elements are flattened with the cell axes first and the row axis
            /// last; see `ctb_table_get_column_shape` for the axis lengths.
            ///
            /// # Arguments
            /// * `ptr` - Table handle
            /// * `column` - Column name (UTF-8, null-terminated)
            /// * `buf` - Output buffer, or null to query the element count
            /// * `buf_len` - Capacity of `buf` in elements
            /// * `out_len` - Output: number of elements in the column
            ///
            /// # Returns
            /// * `CTB_SUCCESS` - Data written (or count query succeeded)
            /// * `CTB_BUFFER_TOO_SMALL` - `buf_len < *out_len`; nothing was written
            /// * `CTB_TYPE_MISMATCH` - The column holds another element type
            /// * `CTB_NOT_FOUND` - No such column
            #[unsafe(no_mangle)]
            pub extern "C" fn [<ctb_table_get_column_ $suffix>](
                ptr: *const $crate::ctb_table,
                column: *const libc::c_char,
                buf: *mut $elem,
                buf_len: libc::size_t,
                out_len: *mut libc::size_t,
            ) -> $crate::StatusCode {
                if out_len.is_null() {
                    return $crate::CTB_NULL_POINTER;
                }
                let column = match $crate::cstr_to_str_checked(column) {
                    Ok(s) => s,
                    Err(code) => return code,
                };

                $crate::types::with_table(ptr, |table| {
                    let array = table.get_column::<$elem>(column)?;
                    Ok($crate::write_slice(array.as_slice(), buf, buf_len, out_len))
                })
            }

            #[doc = concat!("Write a whole column from `", stringify!($elem), "` elements.")]
            ///
            /// # Arguments
            /// * `ptr` - Table handle
            /// * `column` - Column name (UTF-8, null-terminated)
            /// * `data` - Flattened elements, cell axes first and row axis last
            /// * `shape` - Axis lengths of `data`; the last one must equal the row count
            /// * `ndim` - Number of axes in `shape` (at least 1)
            ///
            /// # Returns
            /// * `CTB_SUCCESS` - Column replaced
            /// * `CTB_INVALID_ARGUMENT` - Shape does not fit the column or table
            /// * `CTB_TYPE_MISMATCH` - The column holds another element type
            /// * `CTB_NOT_WRITABLE` - The table is read only
            #[unsafe(no_mangle)]
            pub extern "C" fn [<ctb_table_put_column_ $suffix>](
                ptr: *mut $crate::ctb_table,
                column: *const libc::c_char,
                data: *const $elem,
                shape: *const libc::size_t,
                ndim: libc::size_t,
            ) -> $crate::StatusCode {
                let column = match $crate::cstr_to_str_checked(column) {
                    Ok(s) => s,
                    Err(code) => return code,
                };
                let shape = match $crate::slice_from_raw(shape, ndim) {
                    Ok(s) => s,
                    Err(code) => return code,
                };
                if shape.is_empty() {
                    return $crate::err_status(
                        "shape must have at least one axis",
                        $crate::CTB_INVALID_ARGUMENT,
                    );
                }
                let Some(len) = shape.iter().try_fold(1usize, |acc, &axis| acc.checked_mul(axis))
                else {
                    return $crate::err_status(
                        format!("shape {shape:?} overflows"),
                        $crate::CTB_INVALID_ARGUMENT,
                    );
                };
                let data = match $crate::slice_from_raw(data, len) {
                    Ok(s) => s,
                    Err(code) => return code,
                };

                $crate::types::with_table(ptr, |table| {
                    table.put_column::<$elem>(column, shape, data)?;
                    Ok($crate::CTB_SUCCESS)
                })
            }
        }
    };
}
