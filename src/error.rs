//! Error types for dataset access.
//!
//! Every fallible operation in the crate returns [`DatasetError`]. Most kinds
//! are fatal to the call that raised them; only [`DatasetError::CacheCorruption`]
//! is recovered internally (by re-parsing the raw file).

use std::path::PathBuf;
use thiserror::Error;

/// Dataset operation error.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Malformed descriptor fields, raised at construction.
    #[error("invalid dataset description: {0}")]
    Validation(String),

    /// Unsupported or contradictory storage-format request, or malformed raw data.
    #[error("format error: {0}")]
    Format(String),

    /// The raw file is too large for the running environment.
    #[error("file {} too big for {bits}-bit system ({size} bytes)", path.display())]
    Resource { path: PathBuf, size: u64, bits: u32 },

    /// A cache artifact is truncated, has an unknown layout, or is otherwise unreadable.
    #[error("corrupt cache file {}: {reason}", path.display())]
    CacheCorruption { path: PathBuf, reason: String },

    /// A cache artifact was expected on disk but is absent.
    #[error("cannot find a cache file for dataset {dataset} at location {}", path.display())]
    CacheMissing { dataset: String, path: PathBuf },

    /// Numeric conversion requested on irreducibly non-numeric data.
    #[error("{0}")]
    TypeMismatch(String),

    /// Requested behavior that is not supported yet.
    #[error("{0}")]
    NotImplemented(String),

    /// The requested target does not name any present column.
    #[error("target attribute {target:?} is not present in the dataset")]
    UnknownTarget { target: String },

    /// File I/O error.
    #[error("failed to {operation} {}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache payload could not be serialized.
    #[error("cache serialization failed")]
    Serialization(#[source] postcard::Error),

    /// Columnar snapshot encoding error.
    #[error("snapshot encoding failed")]
    Snapshot(#[from] arrow::error::ArrowError),

    /// The raw file could not be obtained from the retrieval collaborator.
    #[error("failed to retrieve raw data file")]
    Retrieval(#[source] anyhow::Error),
}

impl DatasetError {
    /// Build an [`DatasetError::Io`] from an operation name, a path and the source error.
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Build a [`DatasetError::CacheCorruption`].
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CacheCorruption {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the accessor can recover from this error on its own.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CacheCorruption { .. })
    }

    /// Whether this is an I/O error for a file that does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result type alias for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
