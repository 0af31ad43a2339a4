//! Testing utilities for dataset accessors.
//!
//! - **Fixtures**: canned ARFF documents covering dense, sparse, boolean and
//!   rejected layouts, plus helpers writing them (optionally gzipped) to disk
//! - **Counting decoder**: a [`RawDecoder`](crate::RawDecoder) wrapper that
//!   records how often the raw file was parsed, to observe cache reuse
//!
//! ```
//! use openml_dataset::testing::{DENSE_ARFF, CountingDecoder, write_fixture};
//! use openml_dataset::{Dataset, DatasetConfig, DatasetDescriptor, GetDataOptions};
//! use std::sync::Arc;
//!
//! # fn main() -> openml_dataset::Result<()> {
//! let dir = tempfile::tempdir().unwrap();
//! let path = write_fixture(dir.path(), "dense.arff", DENSE_ARFF);
//! let counter = Arc::new(CountingDecoder::default());
//! let mut dataset = Dataset::new(
//!     DatasetDescriptor::new("dense").with_data_file(&path),
//!     DatasetConfig::default(),
//! )?
//! .with_decoder(counter.clone());
//!
//! dataset.get_data(&GetDataOptions::default())?;
//! dataset.get_data(&GetDataOptions::default())?;
//! assert_eq!(counter.calls(), 1);
//! # Ok(())
//! # }
//! ```

pub mod decoders;
pub mod fixtures;

pub use decoders::*;
pub use fixtures::*;
