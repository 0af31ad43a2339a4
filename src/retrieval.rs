//! Raw file retrieval collaborator.
//!
//! Downloading from the repository is outside this crate. The accessor only
//! asks a [`RawFileRetriever`] for a local path and trusts the returned file
//! to be complete and readable.

use crate::dataset::DatasetDescriptor;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;

/// Provides a readable local copy of a dataset's raw file.
pub trait RawFileRetriever: Send + Sync {
    /// Return the path of the raw file, fetching it first if needed.
    ///
    /// # Errors
    /// Any failure to obtain the file.
    fn ensure_local_file(&self, descriptor: &DatasetDescriptor) -> Result<PathBuf>;
}

/// Retriever for datasets whose raw file is already on disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileRetriever;

impl RawFileRetriever for LocalFileRetriever {
    fn ensure_local_file(&self, descriptor: &DatasetDescriptor) -> Result<PathBuf> {
        let Some(path) = &descriptor.data_file else {
            bail!("dataset {} has no local data file", descriptor.name);
        };
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("data file {} of dataset {}", path.display(), descriptor.name))?;
        if !metadata.is_file() {
            bail!("data file {} is not a regular file", path.display());
        }
        Ok(path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_file_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.arff");
        std::fs::write(&path, "@relation d\n@data\n").unwrap();
        let descriptor = DatasetDescriptor::new("d").with_data_file(&path);
        assert_eq!(LocalFileRetriever.ensure_local_file(&descriptor).unwrap(), path);
    }

    #[test]
    fn missing_file_is_an_error() {
        let descriptor = DatasetDescriptor::new("d");
        let err = LocalFileRetriever.ensure_local_file(&descriptor).unwrap_err();
        assert!(err.to_string().contains("no local data file"));

        let descriptor = DatasetDescriptor::new("d").with_data_file("/nonexistent/d.arff");
        assert!(LocalFileRetriever.ensure_local_file(&descriptor).is_err());
    }
}
