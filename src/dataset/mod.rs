//! The dataset accessor.
//!
//! A [`Dataset`] couples a [`DatasetDescriptor`] with optional feature and
//! quality metadata and gives typed access to the content. The first
//! [`Dataset::get_data`] call obtains the raw file, builds or validates the
//! cache pair and remembers it; later calls load straight from the cache.
//!
//! ```no_run
//! use openml_dataset::{Dataset, DatasetConfig, DatasetDescriptor, GetDataOptions, OutputFormat};
//!
//! # fn main() -> openml_dataset::Result<()> {
//! let descriptor = DatasetDescriptor::new("iris").with_data_file("iris.arff");
//! let mut dataset = Dataset::new(descriptor, DatasetConfig::from_env())?;
//! let split = dataset.get_data(
//!     &GetDataOptions::default()
//!         .with_target("class")
//!         .with_output_format(OutputFormat::Array),
//! )?;
//! assert_eq!(split.attribute_names.len(), split.categorical.len());
//! # Ok(())
//! # }
//! ```

mod descriptor;
mod features;

pub use descriptor::{DatasetDescriptor, NAME_PATTERN};
pub use features::{DataFeature, FeatureMap, FeatureType, Qualities, RawQuality, check_qualities};

use crate::cache::{CacheFormat, CacheManager, EnsuredCache};
use crate::config::DatasetConfig;
use crate::convert::{ArrayValues, Data, NumericArray, OutputFormat, TargetDtype, coerce, convert};
use crate::decoder::{ArffDecoder, ParsedData, RawDecoder};
use crate::error::{DatasetError, Result};
use crate::retrieval::{LocalFileRetriever, RawFileRetriever};
use crate::table::Table;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Arguments of [`Dataset::get_data`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetDataOptions {
    /// Target column name(s) to split off.
    pub target: Option<Vec<String>>,
    pub include_row_id: bool,
    pub include_ignore_attribute: bool,
    pub output_format: OutputFormat,
}

impl GetDataOptions {
    /// Split off `target`; comma-joined names are split into a list.
    #[must_use]
    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.split(',').map(str::to_string).collect());
        self
    }

    #[must_use]
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_row_id(mut self, include: bool) -> Self {
        self.include_row_id = include;
        self
    }

    #[must_use]
    pub fn with_ignore_attribute(mut self, include: bool) -> Self {
        self.include_ignore_attribute = include;
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
}

/// Result of [`Dataset::get_data`].
#[derive(Clone, Debug, PartialEq)]
pub struct DataSplit {
    pub x: Data,
    pub y: Option<Data>,
    /// Per column of `x`, whether it is categorical.
    pub categorical: Vec<bool>,
    /// Column names of `x`.
    pub attribute_names: Vec<String>,
}

/// A dataset with lazily built cache.
pub struct Dataset {
    descriptor: DatasetDescriptor,
    features: Option<FeatureMap>,
    qualities: Option<Qualities>,
    config: DatasetConfig,
    manager: CacheManager,
    retriever: Arc<dyn RawFileRetriever>,
    cache: Option<EnsuredCache>,
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("descriptor", &self.descriptor)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Dataset {
    /// Validate `descriptor` and wrap it with the default ARFF decoder and
    /// local-file retriever.
    ///
    /// # Errors
    /// [`DatasetError::Validation`] from [`DatasetDescriptor::validate`].
    pub fn new(mut descriptor: DatasetDescriptor, config: DatasetConfig) -> Result<Self> {
        descriptor.validate()?;
        if descriptor.cache_format.is_none() {
            descriptor.cache_format = Some(config.default_cache_format);
        }
        let decoder: Arc<dyn RawDecoder> = Arc::new(ArffDecoder::new(config.clone()));
        Ok(Self {
            manager: CacheManager::new(decoder, config.cache_dir.clone()),
            descriptor,
            features: None,
            qualities: None,
            config,
            retriever: Arc::new(LocalFileRetriever),
            cache: None,
        })
    }

    /// Parse raw files with `decoder` instead of the default ARFF decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn RawDecoder>) -> Self {
        self.manager = CacheManager::new(decoder, self.config.cache_dir.clone());
        self.cache = None;
        self
    }

    #[must_use]
    pub fn with_retriever(mut self, retriever: Arc<dyn RawFileRetriever>) -> Self {
        self.retriever = retriever;
        self
    }

    #[must_use]
    pub fn with_features(mut self, features: FeatureMap) -> Self {
        self.features = Some(features);
        self
    }

    #[must_use]
    pub fn with_qualities(mut self, qualities: Qualities) -> Self {
        self.qualities = Some(qualities);
        self
    }

    #[must_use]
    pub fn descriptor(&self) -> &DatasetDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.descriptor.id
    }

    #[must_use]
    pub fn features(&self) -> Option<&FeatureMap> {
        self.features.as_ref()
    }

    #[must_use]
    pub fn qualities(&self) -> Option<&Qualities> {
        self.qualities.as_ref()
    }

    /// The cache pair, once [`get_data`](Self::get_data) has run.
    #[must_use]
    pub fn cache(&self) -> Option<&EnsuredCache> {
        self.cache.as_ref()
    }

    /// Cache encoding in effect; may have been downgraded to a blob.
    #[must_use]
    pub fn cache_format(&self) -> CacheFormat {
        self.descriptor
            .cache_format
            .unwrap_or(self.config.default_cache_format)
    }

    #[cfg(feature = "publish-xml")]
    pub(crate) fn set_id(&mut self, id: u64) {
        self.descriptor.id = Some(id);
    }

    fn raw_file(&mut self) -> Result<PathBuf> {
        if let Some(path) = &self.descriptor.data_file
            && path.is_file()
        {
            return Ok(path.clone());
        }
        let path = self
            .retriever
            .ensure_local_file(&self.descriptor)
            .map_err(DatasetError::Retrieval)?;
        self.descriptor.data_file = Some(path.clone());
        Ok(path)
    }

    fn load_data(&mut self) -> Result<ParsedData> {
        let raw = self.raw_file()?;
        let storage = self.descriptor.format;
        let cache = match &self.cache {
            Some(cache) => cache.clone(),
            None => {
                let cache = self
                    .manager
                    .ensure_cache(&raw, storage, self.cache_format())?;
                self.descriptor.cache_format = Some(cache.format);
                self.cache = Some(cache.clone());
                cache
            }
        };
        let mut parsed = self
            .manager
            .load(&cache, &raw, storage, &self.descriptor.name)?;
        let width = parsed.attribute_names.len();
        parsed.table = match parsed.table {
            Table::Sparse(m) => Table::Sparse(m.widen_cols(width)),
            dense => dense,
        };
        Ok(parsed)
    }

    /// Load the content, drop excluded columns and optionally split off a target.
    ///
    /// # Errors
    /// [`DatasetError::NotImplemented`] for more than one target column,
    /// [`DatasetError::UnknownTarget`] when no target column is present,
    /// [`DatasetError::TypeMismatch`] for failed numeric conversions, and
    /// any cache or decoder error.
    pub fn get_data(&mut self, options: &GetDataOptions) -> Result<DataSplit> {
        let ParsedData {
            mut table,
            mut categorical,
            mut attribute_names,
        } = self.load_data()?;

        let mut to_exclude: Vec<&str> = Vec::new();
        if !options.include_row_id
            && let Some(row_id) = &self.descriptor.row_id_attribute
        {
            to_exclude.push(row_id);
        }
        if !options.include_ignore_attribute
            && let Some(ignore) = &self.descriptor.ignore_attribute
        {
            to_exclude.extend(ignore.iter().map(String::as_str));
        }
        if !to_exclude.is_empty() {
            info!(attributes = ?to_exclude, "removing excluded attributes");
            let keep: Vec<bool> = attribute_names
                .iter()
                .map(|name| !to_exclude.contains(&name.as_str()))
                .collect();
            table = table.select_columns(&keep)?;
            categorical = retain(categorical, &keep);
            attribute_names = retain(attribute_names, &keep);
        }

        let format = &options.output_format;
        let Some(target) = &options.target else {
            let x = convert(table_to_data(table), format, &attribute_names)?;
            return Ok(DataSplit {
                x,
                y: None,
                categorical,
                attribute_names,
            });
        };

        let is_target: Vec<bool> = attribute_names.iter().map(|n| target.contains(n)).collect();
        let n_targets = is_target.iter().filter(|t| **t).count();
        if n_targets > 1 {
            return Err(DatasetError::NotImplemented(format!(
                "number of requested targets {n_targets} is not implemented"
            )));
        }
        let Some(target_index) = is_target.iter().position(|t| *t) else {
            return Err(DatasetError::UnknownTarget {
                target: target.join(","),
            });
        };
        let dtype = TargetDtype::for_target(categorical[target_index]);

        let keep: Vec<bool> = is_target.iter().map(|t| !t).collect();
        let x_table = table.select_columns(&keep)?;
        let y = match &table {
            Table::Dense(t) => Data::Series(t.columns()[target_index].clone()),
            Table::Sparse(m) => {
                let column = m.select_columns(&is_target)?;
                coerce(
                    Data::Array(NumericArray::vector(ArrayValues::F32(column.to_dense()))),
                    dtype,
                )?
            }
        };
        categorical = retain(categorical, &keep);
        attribute_names = retain(attribute_names, &keep);

        let x = convert(table_to_data(x_table), format, &attribute_names)?;
        let mut y = convert(y, format, &attribute_names)?;
        if *format == OutputFormat::Array {
            y = coerce(y, dtype)?;
        }

        Ok(DataSplit {
            x,
            y: Some(y),
            categorical,
            attribute_names,
        })
    }

    /// Labels of a nominal target, `None` for other features.
    #[must_use]
    pub fn retrieve_class_labels(&self, target_name: &str) -> Option<Vec<String>> {
        self.features
            .as_ref()?
            .iter()
            .find(|f| f.name == target_name && f.data_type == FeatureType::Nominal)
            .and_then(|f| f.nominal_values.clone())
    }

    /// Indices of features of `data_type`, renumbered as if the excluded
    /// features were absent.
    ///
    /// # Errors
    /// [`DatasetError::Validation`] for an illegal data type or a dataset
    /// without feature metadata.
    pub fn get_features_by_type(
        &self,
        data_type: &str,
        exclude: &[String],
        exclude_ignore_attribute: bool,
        exclude_row_id_attribute: bool,
    ) -> Result<Vec<usize>> {
        let data_type: FeatureType = data_type.parse()?;
        let features = self
            .features
            .as_ref()
            .ok_or_else(|| DatasetError::Validation("dataset has no feature metadata".into()))?;

        let mut to_exclude: Vec<&str> = exclude.iter().map(String::as_str).collect();
        if exclude_ignore_attribute && let Some(ignore) = &self.descriptor.ignore_attribute {
            to_exclude.extend(ignore.iter().map(String::as_str));
        }
        if exclude_row_id_attribute && let Some(row_id) = &self.descriptor.row_id_attribute {
            to_exclude.push(row_id);
        }

        let mut offset = 0;
        let mut result = Vec::new();
        for feature in features.iter() {
            if to_exclude.contains(&feature.name.as_str()) {
                offset += 1;
            } else if feature.data_type == data_type {
                result.push(feature.index - offset);
            }
        }
        Ok(result)
    }
}

fn table_to_data(table: Table) -> Data {
    match table {
        Table::Dense(t) => Data::Frame(t),
        Table::Sparse(m) => Data::Sparse(m),
    }
}

fn retain<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, k)| k.then_some(item))
        .collect()
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.descriptor;
        let mut fields: Vec<(&str, String)> = vec![("Name", d.name.clone())];
        if let Some(version) = d.version {
            fields.push(("Version", version.to_string()));
        }
        fields.push(("Format", d.format.to_string()));
        if let Some(date) = &d.upload_date {
            fields.push(("Upload Date", date.replace('T', " ")));
        }
        if let Some(licence) = &d.licence {
            fields.push(("Licence", licence.clone()));
        }
        if let Some(url) = &d.url {
            fields.push(("Download URL", url.clone()));
        }
        if let Some(url) = d.openml_url() {
            fields.push(("OpenML URL", url));
        }
        if let Some(file) = &d.data_file {
            fields.push(("Data file", file.display().to_string()));
        }
        if let Some(cache) = &self.cache {
            fields.push(("Cache file", cache.data_path().display().to_string()));
        }
        if let Some(features) = &self.features {
            fields.push(("# of features", features.len().to_string()));
        }
        if let Some(n) = self
            .qualities
            .as_ref()
            .and_then(|q| q.get("NumberOfInstances"))
            .filter(|n| n.is_finite())
        {
            fields.push(("# of instances", format!("{n:.0}")));
        }

        writeln!(f, "OpenML Dataset")?;
        writeln!(f, "==============")?;
        let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0) + 2;
        for (key, value) in fields {
            writeln!(f, "{key:.<width$}: {value}")?;
        }
        Ok(())
    }
}
