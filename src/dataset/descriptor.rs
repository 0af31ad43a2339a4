//! Dataset metadata as published by the repository.

use crate::cache::CacheFormat;
use crate::error::{DatasetError, Result};
use crate::schema::StorageFormat;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;

/// Characters the repository accepts in dataset names.
pub const NAME_PATTERN: &str = r"^[a-zA-Z0-9_\-\.\(\),]+$";

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NAME_PATTERN).expect("invalid dataset name pattern"));

/// Identity, provenance and storage metadata of one dataset.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetDescriptor {
    /// Server-assigned id; `None` for datasets not yet published.
    #[serde(alias = "dataset_id")]
    pub id: Option<u64>,
    pub name: String,
    pub version: Option<u32>,
    pub description: Option<String>,
    /// Storage layout of the raw file.
    #[serde(alias = "data_format")]
    pub format: StorageFormat,
    /// Requested cache encoding; `None` defers to the process configuration.
    pub cache_format: Option<CacheFormat>,
    pub creator: Option<String>,
    pub contributor: Option<String>,
    pub collection_date: Option<String>,
    pub upload_date: Option<String>,
    pub language: Option<String>,
    pub licence: Option<String>,
    pub url: Option<String>,
    pub default_target_attribute: Option<String>,
    pub row_id_attribute: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub ignore_attribute: Option<Vec<String>>,
    pub version_label: Option<String>,
    pub citation: Option<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub tag: Option<Vec<String>>,
    pub visibility: Option<String>,
    pub original_data_url: Option<String>,
    pub paper_url: Option<String>,
    pub update_comment: Option<String>,
    pub md5_checksum: Option<String>,
    /// Local raw file, once known.
    pub data_file: Option<PathBuf>,
    /// Inline ARFF document to upload instead of `data_file`.
    pub dataset: Option<String>,
}

fn string_or_list<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<Vec<String>>, D::Error> {
    match Option::<serde_json::Value>::deserialize(d)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(vec![s])),
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Ok(s),
                other => Err(D::Error::custom(format!(
                    "expected a string in list, found {other}"
                ))),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Some),
        Some(other) => Err(D::Error::custom(format!(
            "wrong data type {other}, should be a string or a list of strings"
        ))),
    }
}

impl DatasetDescriptor {
    /// Descriptor with only a name set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON descriptor and validate it.
    ///
    /// # Errors
    /// [`DatasetError::Validation`] for malformed JSON, wrongly typed
    /// fields or failed [`validate`](Self::validate) checks.
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptor: Self =
            serde_json::from_str(json).map_err(|e| DatasetError::Validation(e.to_string()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check the fields the server would reject on upload.
    ///
    /// Only descriptors without an id are checked: published datasets are
    /// trusted as the server returned them.
    ///
    /// # Errors
    /// [`DatasetError::Validation`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_some() {
            return Ok(());
        }
        if let Some(description) = &self.description
            && !description.is_ascii()
        {
            return Err(DatasetError::Validation(format!(
                "invalid symbols in description: {description}"
            )));
        }
        if let Some(citation) = &self.citation
            && !citation.is_ascii()
        {
            return Err(DatasetError::Validation(format!(
                "invalid symbols in citation: {citation}"
            )));
        }
        if !NAME_REGEX.is_match(&self.name) {
            return Err(DatasetError::Validation(format!(
                "invalid symbols in name: {}",
                self.name
            )));
        }
        Ok(())
    }

    /// Builder-style setter for the local raw file.
    #[must_use]
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: StorageFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_row_id_attribute(mut self, name: impl Into<String>) -> Self {
        self.row_id_attribute = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_ignore_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_attribute = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Web page of a published dataset.
    #[must_use]
    pub fn openml_url(&self) -> Option<String> {
        self.id.map(|id| format!("https://www.openml.org/d/{id}"))
    }
}

/// Equality over user-supplied fields; server-assigned ones are ignored.
impl PartialEq for DatasetDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.format == other.format
            && self.cache_format == other.cache_format
            && self.creator == other.creator
            && self.contributor == other.contributor
            && self.collection_date == other.collection_date
            && self.language == other.language
            && self.licence == other.licence
            && self.default_target_attribute == other.default_target_attribute
            && self.row_id_attribute == other.row_id_attribute
            && self.ignore_attribute == other.ignore_attribute
            && self.version_label == other.version_label
            && self.citation == other.citation
            && self.tag == other.tag
            && self.visibility == other.visibility
            && self.original_data_url == other.original_data_url
            && self.paper_url == other.paper_url
            && self.update_comment == other.update_comment
            && self.md5_checksum == other.md5_checksum
    }
}
