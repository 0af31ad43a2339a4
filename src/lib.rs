//! # openml-dataset
//!
//! Client-side access to datasets of a machine-learning dataset repository.
//! A [`Dataset`] represents one dataset's metadata and content: on first
//! access its raw ARFF file is parsed into a typed table (dense) or a CSR
//! matrix (sparse) and cached locally; later accesses load the cache, and a
//! corrupt cache is bypassed by re-parsing the raw file.
//!
//! ## Key Features
//!
//! - **ARFF decoding** of dense and sparse files, plain or compressed
//! - **Two cache encodings**: an Arrow IPC snapshot for dense tables and a
//!   versioned `postcard` blob for sparse ones, with legacy-blob migration
//! - **Self-healing**: truncated or unreadable caches never fail a read
//! - **Typed accessors**: target/feature split, row-id and ignore-attribute
//!   exclusion, numeric array or frame output
//!
//! ## Quick Start
//!
//! ```no_run
//! use openml_dataset::*;
//!
//! # fn main() -> Result<()> {
//! init_logging(&LogConfig::default());
//!
//! let descriptor = DatasetDescriptor::new("anneal")
//!     .with_data_file("anneal.arff")
//!     .with_row_id_attribute("id");
//! let mut dataset = Dataset::new(descriptor, DatasetConfig::from_env())?;
//!
//! let split = dataset.get_data(&GetDataOptions::default().with_target("class"))?;
//! println!("{} features", split.attribute_names.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`io`] - decompression and the ARFF reader
//! - [`schema`] - column type inference
//! - [`table`] - dense tables, categorical columns and the CSR matrix
//! - [`decoder`] - raw file to [`Table`]
//! - [`cache`] - cache pairs: paths, encodings, reuse and repair
//! - [`convert`] - output-format conversion
//! - [`dataset`] - descriptor, features and the [`Dataset`] accessor
//! - [`publish`] - upload document serialization (feature `publish-xml`)
//! - [`testing`] - fixtures and instrumented decoders

pub mod cache;
pub mod config;
pub mod convert;
pub mod dataset;
pub mod decoder;
pub mod error;
pub mod io;
pub mod logging;
#[cfg_attr(docsrs, doc(cfg(feature = "publish-xml")))]
#[cfg(feature = "publish-xml")]
pub mod publish;
pub mod retrieval;
pub mod schema;
pub mod table;
pub mod testing;

// General re-exports
pub use cache::{CacheFormat, CacheManager, CachePaths, CacheState, EnsuredCache};
pub use config::DatasetConfig;
pub use convert::{ArrayValues, Data, NumericArray, OutputFormat, SparseFrame, TargetDtype};
pub use dataset::{
    DataFeature, DataSplit, Dataset, DatasetDescriptor, FeatureMap, FeatureType, GetDataOptions,
    Qualities,
};
pub use decoder::{ArffDecoder, ParsedData, RawDecoder};
pub use error::{DatasetError, Result};
pub use logging::{LogConfig, LogFormat, init_logging};
pub use retrieval::{LocalFileRetriever, RawFileRetriever};
pub use schema::{ColumnSchema, SemanticType, StorageFormat};
pub use table::{CategoricalColumn, Categories, Column, ColumnData, CsrMatrix, DenseTable, Table};
