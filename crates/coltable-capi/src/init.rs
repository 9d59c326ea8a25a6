//! Process-wide initialization
//!
//! `ctb_init` is optional. Without it the engine configures itself from the
//! `COLTABLE_*` environment variables on first use.

use std::panic::{AssertUnwindSafe, catch_unwind};

use coltable::{EndianFormat, EngineConfig, StorageKind};
use tracing_subscriber::EnvFilter;

use crate::{
    CTB_INVALID_ARGUMENT, CTB_SUCCESS, StatusCode, cstr_to_opt_str, err_status, table_err,
    unwrap_catch,
};

/// Install a stderr log subscriber unless the host already set one.
fn install_subscriber(filter: EnvFilter) {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();
    tracing::debug!(installed, "log subscriber");
}

/// Initialize the engine configuration.
///
/// Each argument may be null or empty to keep the value from the
/// environment (`COLTABLE_ENDIAN`, `COLTABLE_STORAGE`, `COLTABLE_LOG`) or the
/// built-in default. The log subscriber is installed only once the
/// configuration has been accepted.
///
/// # Arguments
/// * `default_endian` - `big`, `little` or `local`; used for `aipsrc` and null endian options
/// * `default_storage` - `plain` or `memory`; used when `ctb_table_new` gets a null memory type
/// * `log_filter` - `tracing` filter directive, e.g. `coltable=debug`. Logs go to stderr
///
/// # Returns
/// * `CTB_SUCCESS` - Initialized, or already initialized with the same settings
/// * `CTB_ALREADY_INITIALIZED` - The engine already runs with other settings
/// * `CTB_INVALID_ARGUMENT` - Unknown endian or storage name, bad log filter, or invalid UTF-8
#[unsafe(no_mangle)]
pub extern "C" fn ctb_init(
    default_endian: *const libc::c_char,
    default_storage: *const libc::c_char,
    log_filter: *const libc::c_char,
) -> StatusCode {
    let endian = match cstr_to_opt_str(default_endian) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let storage = match cstr_to_opt_str(default_storage) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let log_filter = match cstr_to_opt_str(log_filter) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut config = EngineConfig::from_env();
        if let Some(endian) = endian.filter(|s| !s.is_empty()) {
            config.default_endian = match endian.parse::<EndianFormat>() {
                Ok(e) => e,
                Err(err) => return table_err(err),
            };
        }
        if let Some(storage) = storage.filter(|s| !s.is_empty()) {
            config.default_storage = match storage.parse::<StorageKind>() {
                Ok(kind) => kind,
                Err(err) => return table_err(err),
            };
        }
        if let Some(filter) = log_filter.filter(|s| !s.is_empty()) {
            config.log_filter = Some(filter.to_string());
        }

        let filter = match config.log_filter.as_deref().map(EnvFilter::try_new).transpose() {
            Ok(filter) => filter,
            Err(err) => {
                return err_status(format!("invalid log filter: {err}"), CTB_INVALID_ARGUMENT);
            }
        };

        match coltable::init(config) {
            Ok(()) => {
                if let Some(filter) = filter {
                    install_subscriber(filter);
                }
                CTB_SUCCESS
            }
            Err(err) => table_err(err),
        }
    }));

    unwrap_catch(result)
}

/// Check whether the engine configuration has been set.
///
/// # Returns
/// 1 after `ctb_init` or the first table operation, 0 before
#[unsafe(no_mangle)]
pub extern "C" fn ctb_is_initialized() -> i32 {
    i32::from(coltable::is_initialized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_init_rejects_bad_endian() {
        for endian in ["middle", "aipsrc"] {
            let endian = CString::new(endian).unwrap();
            let status = ctb_init(endian.as_ptr(), std::ptr::null(), std::ptr::null());
            assert_eq!(status, CTB_INVALID_ARGUMENT);
        }
    }

    #[test]
    fn test_init_rejects_bad_log_filter() {
        let filter = CString::new("coltable=loud").unwrap();
        let status = ctb_init(std::ptr::null(), std::ptr::null(), filter.as_ptr());
        assert_eq!(status, CTB_INVALID_ARGUMENT);
        let message = crate::LAST_ERROR.with(|cell| cell.borrow().clone());
        assert!(message.contains("log filter"));
    }

    #[test]
    fn test_init_rejects_bad_storage_before_initializing() {
        let storage = CString::new("tape").unwrap();
        let status = ctb_init(std::ptr::null(), storage.as_ptr(), std::ptr::null());
        assert_eq!(status, CTB_INVALID_ARGUMENT);
    }

    #[test]
    fn test_init_same_config_twice() {
        // Whatever the first call settles on, repeating it must succeed
        let first = ctb_init(std::ptr::null(), std::ptr::null(), std::ptr::null());
        assert!(first == CTB_SUCCESS || first == crate::CTB_ALREADY_INITIALIZED);
        assert_eq!(ctb_is_initialized(), 1);
        let current = coltable::engine::config().clone();
        let endian = CString::new(current.default_endian.to_string()).unwrap();
        let storage = CString::new(match current.default_storage {
            coltable::StorageKind::Plain => "plain",
            coltable::StorageKind::Memory => "memory",
        })
        .unwrap();
        let filter = current.log_filter.as_deref().map(|f| CString::new(f).unwrap());
        let status = ctb_init(
            endian.as_ptr(),
            storage.as_ptr(),
            filter.as_ref().map_or(std::ptr::null(), |f| f.as_ptr()),
        );
        assert_eq!(status, CTB_SUCCESS);
    }

    #[test]
    fn test_init_conflicting_config() {
        let _ = ctb_init(std::ptr::null(), std::ptr::null(), std::ptr::null());
        let other = match coltable::engine::config().default_endian {
            EndianFormat::Big => "little",
            EndianFormat::Little => "big",
        };
        let other = CString::new(other).unwrap();
        let filter = CString::new("coltable=trace").unwrap();
        assert_eq!(
            ctb_init(other.as_ptr(), std::ptr::null(), filter.as_ptr()),
            crate::CTB_ALREADY_INITIALIZED
        );
        // A refused configuration leaves logging to the host
        if std::env::var_os("COLTABLE_LOG").is_none() {
            assert!(!tracing::dispatcher::has_been_set());
        }
    }
}
