//! Process-wide engine state.
//!
//! The engine keeps one [`EngineConfig`] per process. It is set either
//! explicitly through [`init`] or lazily from the environment the first time
//! any table operation needs it. Once set it never changes; there is no
//! teardown.

use std::sync::OnceLock;

use crate::error::{Result, TableError};
use crate::types::{EndianFormat, StorageKind};

static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Engine-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Byte order used for `aipsrc` and unspecified endian options
    pub default_endian: EndianFormat,
    /// Storage used when a create call does not name one
    pub default_storage: StorageKind,
    /// `EnvFilter` directive for the adapter's log subscriber, if any
    pub log_filter: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_endian: EndianFormat::native(),
            default_storage: StorageKind::Plain,
            log_filter: None,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from `COLTABLE_ENDIAN`, `COLTABLE_STORAGE` and
    /// `COLTABLE_LOG`. Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        // Parse only concrete values here: `resolve` would recurse into `config()`
        if let Ok(value) = std::env::var("COLTABLE_ENDIAN") {
            match value.parse::<EndianFormat>() {
                Ok(endian) => config.default_endian = endian,
                Err(_) => tracing::warn!(value = %value, "ignoring COLTABLE_ENDIAN"),
            }
        }
        if let Some(value) = std::env::var("COLTABLE_STORAGE").ok().filter(|s| !s.is_empty()) {
            match value.parse::<StorageKind>() {
                Ok(kind) => config.default_storage = kind,
                Err(_) => tracing::warn!(value = %value, "ignoring COLTABLE_STORAGE"),
            }
        }
        config.log_filter = std::env::var("COLTABLE_LOG").ok().filter(|s| !s.is_empty());
        config
    }
}

/// Set the engine configuration.
///
/// Succeeds if the engine is uninitialized or already holds an equal
/// configuration; fails with [`TableError::AlreadyInitialized`] otherwise.
pub fn init(config: EngineConfig) -> Result<()> {
    let mut fresh = false;
    let current = CONFIG.get_or_init(|| {
        fresh = true;
        config.clone()
    });
    if fresh {
        tracing::debug!(?current, "engine initialized");
        return Ok(());
    }
    if *current == config {
        Ok(())
    } else {
        Err(TableError::AlreadyInitialized)
    }
}

/// Whether a configuration has been set, explicitly or lazily.
pub fn is_initialized() -> bool {
    CONFIG.get().is_some()
}

/// The active configuration, initializing from the environment if needed.
pub fn config() -> &'static EngineConfig {
    CONFIG.get_or_init(EngineConfig::from_env)
}
