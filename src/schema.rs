//! Column type inference from the raw attribute schema.
//!
//! Maps each declared ARFF type to the semantic type used by the in-memory
//! table, and enforces the extra constraints of sparse storage.

use crate::error::{DatasetError, Result};
use crate::io::arff::{Attribute, AttributeType};
use crate::table::Categories;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage layout of the raw data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageFormat {
    /// One value per attribute per row (`arff`).
    #[default]
    #[serde(rename = "arff", alias = "dense")]
    Dense,
    /// Coordinate rows (`sparse_arff`).
    #[serde(rename = "sparse_arff", alias = "sparse")]
    Sparse,
}

impl StorageFormat {
    /// Repository spelling of the format tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dense => "arff",
            Self::Sparse => "sparse_arff",
        }
    }
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageFormat {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "arff" | "dense" => Ok(Self::Dense),
            "sparse_arff" | "sparse" => Ok(Self::Sparse),
            _ => Err(DatasetError::Format(format!("unknown data format {s}"))),
        }
    }
}

/// Semantic type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticType {
    Integer,
    Real,
    String,
    Categorical,
    Boolean,
}

/// One schema entry, in raw-file column order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub declared: AttributeType,
    pub semantic: SemanticType,
    /// Canonical categories for categorical and boolean columns.
    pub categories: Option<Categories>,
    /// Missing cells seen while decoding. Zero until the data is read.
    pub missing_count: usize,
}

impl ColumnSchema {
    /// Whether the column is reported as categorical to callers.
    ///
    /// Boolean columns count as categorical: they come from a label list.
    #[must_use]
    pub fn is_categorical(&self) -> bool {
        matches!(self.semantic, SemanticType::Categorical | SemanticType::Boolean)
    }
}

/// Whether a two-label list spells `true`/`false` in any case.
#[must_use]
pub fn is_boolean_labels(labels: &[String]) -> bool {
    if labels.len() != 2 {
        return false;
    }
    let a = labels[0].to_ascii_lowercase();
    let b = labels[1].to_ascii_lowercase();
    (a == "true" && b == "false") || (a == "false" && b == "true")
}

/// Derive the semantic schema for `attributes` stored as `storage`.
///
/// # Errors
/// [`DatasetError::Format`] when `storage` is sparse and a column is a
/// string, or a categorical column has non-numeric labels.
pub fn infer_schema(attributes: &[Attribute], storage: StorageFormat) -> Result<Vec<ColumnSchema>> {
    attributes
        .iter()
        .map(|attribute| infer_column(attribute, storage))
        .collect()
}

fn infer_column(attribute: &Attribute, storage: StorageFormat) -> Result<ColumnSchema> {
    let (semantic, categories) = match &attribute.kind {
        AttributeType::Nominal(labels) => {
            if storage == StorageFormat::Sparse
                && let Some(bad) = labels.iter().find(|l| l.trim().parse::<f64>().is_err())
            {
                return Err(DatasetError::Format(format!(
                    "categorical data needs to be numeric when using sparse ARFF \
                     (attribute {} has label {bad:?})",
                    attribute.name
                )));
            }
            if is_boolean_labels(labels) {
                (SemanticType::Boolean, Some(Categories::Boolean))
            } else {
                (
                    SemanticType::Categorical,
                    Some(Categories::Labels(labels.clone())),
                )
            }
        }
        AttributeType::String => {
            if storage == StorageFormat::Sparse {
                return Err(DatasetError::Format(format!(
                    "dataset containing strings is not supported with sparse ARFF \
                     (attribute {})",
                    attribute.name
                )));
            }
            (SemanticType::String, None)
        }
        AttributeType::Integer => (SemanticType::Integer, None),
        AttributeType::Numeric | AttributeType::Real => (SemanticType::Real, None),
    };

    Ok(ColumnSchema {
        name: attribute.name.clone(),
        declared: attribute.kind.clone(),
        semantic,
        categories,
        missing_count: 0,
    })
}
