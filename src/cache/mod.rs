//! Cache artifacts for parsed datasets.
//!
//! A cache is a pair of files sharing the raw file's base name: a metadata
//! side-file (`.meta`) plus either an Arrow snapshot (`.feather`) for dense
//! tables or a serialized blob (`.blob`) for sparse or legacy ones. The
//! [`CacheManager`] decides whether an existing pair can be reused, rebuilds
//! it from the raw file when needed, and loads it back, re-parsing the raw
//! file for the current call when an artifact turns out to be corrupt.
//!
//! Cache files are never deleted here; corrupt pairs stay on disk until an
//! operator removes them.

pub mod blob;
pub mod snapshot;

use crate::decoder::{ParsedData, RawDecoder};
use crate::error::{DatasetError, Result};
use crate::schema::StorageFormat;
use crate::table::Table;
use blob::{BlobContents, ColumnMetadata};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Encoding of the data half of a cache pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheFormat {
    /// Arrow IPC snapshot plus metadata side-file. Dense tables only.
    #[default]
    #[serde(alias = "feather")]
    Snapshot,
    /// Serialized `(table, flags, names)` blob.
    #[serde(alias = "pickle")]
    Blob,
}

impl CacheFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Blob => "blob",
        }
    }
}

impl fmt::Display for CacheFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheFormat {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snapshot" | "feather" => Ok(Self::Snapshot),
            "blob" | "pickle" => Ok(Self::Blob),
            _ => Err(DatasetError::Format(format!("unknown cache format {s:?}"))),
        }
    }
}

/// Locations of every artifact a raw file can have.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachePaths {
    pub metadata: PathBuf,
    pub snapshot: PathBuf,
    pub blob: PathBuf,
}

impl CachePaths {
    /// Derive artifact paths from a raw file path.
    ///
    /// `.gz` and `.arff` suffixes are stripped from the file name. With a
    /// `cache_dir` the artifacts live there, otherwise next to the raw file.
    #[must_use]
    pub fn for_raw(raw: &Path, cache_dir: Option<&Path>) -> Self {
        let file_name = raw
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut base = file_name.as_str();
        for suffix in [".gz", ".arff"] {
            if let Some(stripped) = base.strip_suffix(suffix) {
                base = stripped;
            }
        }
        let dir = cache_dir
            .map(Path::to_path_buf)
            .or_else(|| raw.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        Self {
            metadata: dir.join(format!("{base}.meta")),
            snapshot: dir.join(format!("{base}.feather")),
            blob: dir.join(format!("{base}.blob")),
        }
    }

    /// Data file of the given encoding.
    #[must_use]
    pub fn data(&self, format: CacheFormat) -> &Path {
        match format {
            CacheFormat::Snapshot => &self.snapshot,
            CacheFormat::Blob => &self.blob,
        }
    }

    /// Whether both halves of the pair exist.
    #[must_use]
    pub fn pair_exists(&self, format: CacheFormat) -> bool {
        self.metadata.is_file() && self.data(format).is_file()
    }
}

/// Outcome of [`CacheManager::ensure_cache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    /// An existing pair was found and is readable.
    Valid,
    /// An existing pair is unreadable; loading will re-parse the raw file.
    Corrupt,
    /// The pair was (re)written from the raw file.
    Rebuilt,
}

/// A cache pair ready for [`CacheManager::load`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnsuredCache {
    pub paths: CachePaths,
    /// Actual encoding, which may differ from the requested one.
    pub format: CacheFormat,
    pub state: CacheState,
}

impl EnsuredCache {
    /// Data file of this pair.
    #[must_use]
    pub fn data_path(&self) -> &Path {
        self.paths.data(self.format)
    }
}

/// Builds, validates and loads cache pairs.
#[derive(Clone)]
pub struct CacheManager {
    decoder: Arc<dyn RawDecoder>,
    cache_dir: Option<PathBuf>,
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl CacheManager {
    #[must_use]
    pub fn new(decoder: Arc<dyn RawDecoder>, cache_dir: Option<PathBuf>) -> Self {
        Self { decoder, cache_dir }
    }

    /// Artifact paths for `raw` under this manager's cache directory.
    #[must_use]
    pub fn paths_for(&self, raw: &Path) -> CachePaths {
        CachePaths::for_raw(raw, self.cache_dir.as_deref())
    }

    /// Make sure a cache pair exists for `raw`.
    ///
    /// An existing snapshot pair is checked by reading its metadata; an
    /// existing blob is read fully so legacy payloads get migrated. A
    /// corrupt pair is reported as [`CacheState::Corrupt`] and left alone.
    /// Otherwise the raw file is decoded and a new pair written; sparse
    /// tables always go to a blob.
    ///
    /// # Errors
    /// Decoder errors, and [`DatasetError::Io`] when the pair cannot be written.
    pub fn ensure_cache(
        &self,
        raw: &Path,
        storage: StorageFormat,
        requested: CacheFormat,
    ) -> Result<EnsuredCache> {
        let paths = self.paths_for(raw);

        if requested == CacheFormat::Snapshot && paths.pair_exists(CacheFormat::Snapshot) {
            return match blob::read_metadata(&paths.metadata) {
                Ok(_) => {
                    debug!(path = %paths.snapshot.display(), "snapshot cache is up to date");
                    Ok(ensured(paths, CacheFormat::Snapshot, CacheState::Valid))
                }
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "snapshot cache metadata is corrupt");
                    Ok(ensured(paths, CacheFormat::Snapshot, CacheState::Corrupt))
                }
                Err(e) => Err(e),
            };
        }

        if paths.pair_exists(CacheFormat::Blob) {
            match blob::read_blob(&paths.blob) {
                Ok(BlobContents::Current(_)) => {
                    debug!(path = %paths.blob.display(), "blob cache is up to date");
                    return Ok(ensured(paths, CacheFormat::Blob, CacheState::Valid));
                }
                Ok(BlobContents::Legacy(_)) => {
                    info!(path = %paths.blob.display(), "migrating legacy blob cache");
                }
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "blob cache is corrupt");
                    return Ok(ensured(paths, CacheFormat::Blob, CacheState::Corrupt));
                }
                Err(e) => return Err(e),
            }
        }

        let parsed = self.decoder.decode(raw, storage)?;
        let format = self.persist(&paths, &parsed, requested)?;
        Ok(ensured(paths, format, CacheState::Rebuilt))
    }

    /// Write `parsed` as a pair, returning the encoding actually used.
    ///
    /// # Errors
    /// [`DatasetError::Io`] or encoding errors.
    pub fn persist(
        &self,
        paths: &CachePaths,
        parsed: &ParsedData,
        requested: CacheFormat,
    ) -> Result<CacheFormat> {
        let meta = blob::encode_metadata(&ColumnMetadata {
            categorical: parsed.categorical.clone(),
            attribute_names: parsed.attribute_names.clone(),
        })?;

        let format = match (&parsed.table, requested) {
            (Table::Dense(table), CacheFormat::Snapshot) => {
                write_atomic(&paths.snapshot, |file| snapshot::write_snapshot(table, file))?;
                info!(path = %paths.snapshot.display(), "wrote snapshot cache");
                CacheFormat::Snapshot
            }
            (table, requested) => {
                if table.is_sparse() && requested == CacheFormat::Snapshot {
                    info!("sparse data cannot be snapshotted, caching as blob");
                }
                let bytes = blob::encode_blob(parsed)?;
                write_atomic(&paths.blob, |file| {
                    file.write_all(&bytes)
                        .map_err(|e| DatasetError::io("write", &paths.blob, e))
                })?;
                info!(path = %paths.blob.display(), "wrote blob cache");
                CacheFormat::Blob
            }
        };

        write_atomic(&paths.metadata, |file| {
            file.write_all(&meta)
                .map_err(|e| DatasetError::io("write", &paths.metadata, e))
        })?;
        Ok(format)
    }

    /// Load the pair described by `cache`.
    ///
    /// A corrupt artifact is logged and the raw file is decoded directly for
    /// this call; the artifacts stay on disk untouched.
    ///
    /// # Errors
    /// [`DatasetError::CacheMissing`] when an artifact of the pair is absent,
    /// decoder errors during the fallback re-parse.
    pub fn load(
        &self,
        cache: &EnsuredCache,
        raw: &Path,
        storage: StorageFormat,
        dataset: &str,
    ) -> Result<ParsedData> {
        match read_pair(cache) {
            Ok(parsed) => Ok(parsed),
            Err(e) if e.is_recoverable() => {
                warn!(
                    dataset,
                    error = %e,
                    "cache is corrupt, parsing the raw file instead; delete the cache files to rebuild them"
                );
                self.decoder.decode(raw, storage)
            }
            Err(DatasetError::Io { path, source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Err(DatasetError::CacheMissing {
                    dataset: dataset.to_string(),
                    path,
                })
            }
            Err(e) => Err(e),
        }
    }
}

fn ensured(paths: CachePaths, format: CacheFormat, state: CacheState) -> EnsuredCache {
    EnsuredCache {
        paths,
        format,
        state,
    }
}

fn read_pair(cache: &EnsuredCache) -> Result<ParsedData> {
    match cache.format {
        CacheFormat::Snapshot => {
            let table = snapshot::read_snapshot(&cache.paths.snapshot)?;
            let meta = blob::read_metadata(&cache.paths.metadata)?;
            if meta.attribute_names.len() != table.n_cols()
                || meta.categorical.len() != table.n_cols()
            {
                return Err(DatasetError::corrupt(
                    &cache.paths.metadata,
                    format!(
                        "metadata describes {} columns, snapshot has {}",
                        meta.attribute_names.len(),
                        table.n_cols()
                    ),
                ));
            }
            Ok(ParsedData {
                table: Table::Dense(table),
                categorical: meta.categorical,
                attribute_names: meta.attribute_names,
            })
        }
        CacheFormat::Blob => match blob::read_blob(&cache.paths.blob)? {
            BlobContents::Current(parsed) => Ok(parsed),
            BlobContents::Legacy(_) => Err(DatasetError::corrupt(
                &cache.paths.blob,
                "legacy blob was not migrated",
            )),
        },
    }
}

/// Write `path` through a temporary file in the same directory, then rename.
fn write_atomic(path: &Path, write: impl FnOnce(&mut File) -> Result<()>) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| DatasetError::io("create directory", dir, e))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| DatasetError::io("create temporary file in", dir, e))?;
    write(temp.as_file_mut())?;
    temp.as_file()
        .sync_all()
        .map_err(|e| DatasetError::io("sync", temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| DatasetError::io("rename into", path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_strip_raw_suffixes() {
        let paths = CachePaths::for_raw(Path::new("/data/61/dataset.arff.gz"), None);
        assert_eq!(paths.metadata, Path::new("/data/61/dataset.meta"));
        assert_eq!(paths.snapshot, Path::new("/data/61/dataset.feather"));
        assert_eq!(paths.blob, Path::new("/data/61/dataset.blob"));
    }

    #[test]
    fn paths_relocate_into_cache_dir() {
        let paths = CachePaths::for_raw(Path::new("/data/iris.arff"), Some(Path::new("/cache")));
        assert_eq!(paths.data(CacheFormat::Blob), Path::new("/cache/iris.blob"));
    }

    #[test]
    fn cache_format_names() {
        assert_eq!("feather".parse::<CacheFormat>().unwrap(), CacheFormat::Snapshot);
        assert_eq!("Pickle".parse::<CacheFormat>().unwrap(), CacheFormat::Blob);
        assert_eq!(CacheFormat::Blob.to_string(), "blob");
        assert!("parquet".parse::<CacheFormat>().is_err());
    }

    #[test]
    fn one_half_of_a_pair_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let paths = CachePaths::for_raw(&dir.path().join("d.arff"), None);
        std::fs::write(&paths.metadata, b"").unwrap();
        assert!(!paths.pair_exists(CacheFormat::Snapshot));
        std::fs::write(&paths.snapshot, b"").unwrap();
        assert!(paths.pair_exists(CacheFormat::Snapshot));
    }
}
