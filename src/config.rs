//! Process-level configuration for dataset access.
//!
//! [`DatasetConfig`] controls where cache artifacts live, which cache
//! encoding is requested by default, and the pre-flight size guard applied
//! before decoding a raw file.
//!
//! ```
//! use openml_dataset::{CacheFormat, DatasetConfig};
//!
//! let config = DatasetConfig::default()
//!     .with_cache_dir("/tmp/openml-cache")
//!     .with_cache_format(CacheFormat::Blob);
//! assert_eq!(config.default_cache_format, CacheFormat::Blob);
//! ```

use crate::cache::CacheFormat;
use std::path::PathBuf;

/// Environment variable overriding [`DatasetConfig::cache_dir`].
pub const CACHE_DIR_ENV: &str = "OPENML_DATASET_CACHE_DIR";

/// Environment variable overriding [`DatasetConfig::default_cache_format`].
pub const CACHE_FORMAT_ENV: &str = "OPENML_DATASET_CACHE_FORMAT";

/// Raw files above this size are refused on narrow-pointer targets.
pub const NARROW_POINTER_SIZE_LIMIT: u64 = 120_000_000;

/// Configuration shared by every dataset accessor of a process.
#[derive(Clone, Debug)]
pub struct DatasetConfig {
    /// Directory receiving cache artifacts. `None` keeps them next to the raw file.
    pub cache_dir: Option<PathBuf>,
    /// Cache encoding requested for new datasets.
    pub default_cache_format: CacheFormat,
    /// Size limit (bytes) for raw files on targets narrower than 64 bits.
    pub narrow_pointer_size_limit: u64,
    /// Pointer width of the running environment, in bits.
    pub pointer_width: u32,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            default_cache_format: CacheFormat::Snapshot,
            narrow_pointer_size_limit: NARROW_POINTER_SIZE_LIMIT,
            pointer_width: usize::BITS,
        }
    }
}

impl DatasetConfig {
    /// Defaults overlaid with [`CACHE_DIR_ENV`] and [`CACHE_FORMAT_ENV`].
    ///
    /// Unparseable cache-format values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV)
            && !dir.is_empty()
        {
            config.cache_dir = Some(PathBuf::from(dir));
        }
        if let Ok(raw) = std::env::var(CACHE_FORMAT_ENV) {
            match raw.parse::<CacheFormat>() {
                Ok(format) => config.default_cache_format = format,
                Err(e) => tracing::warn!("ignoring {CACHE_FORMAT_ENV}={raw:?}: {e}"),
            }
        }
        config
    }

    /// Place cache artifacts under `dir`.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set the cache encoding requested for new datasets.
    #[must_use]
    pub fn with_cache_format(mut self, format: CacheFormat) -> Self {
        self.default_cache_format = format;
        self
    }

    /// Pretend to run on a target with the given pointer width.
    #[must_use]
    pub fn with_pointer_width(mut self, bits: u32) -> Self {
        self.pointer_width = bits;
        self
    }

    /// Set the narrow-pointer size limit in bytes.
    #[must_use]
    pub fn with_size_limit(mut self, bytes: u64) -> Self {
        self.narrow_pointer_size_limit = bytes;
        self
    }

    /// Whether a file of `size` bytes exceeds what this environment may decode.
    #[must_use]
    pub fn exceeds_size_limit(&self, size: u64) -> bool {
        self.pointer_width < 64 && size > self.narrow_pointer_size_limit
    }
}
