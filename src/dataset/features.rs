//! Feature and quality metadata.

use crate::error::{DatasetError, Result};
use crate::io::arff::AttributeType;
use crate::schema::ColumnSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Repository data type of a feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Nominal,
    Numeric,
    String,
    Date,
}

impl FeatureType {
    pub const LEGAL: [&'static str; 4] = ["nominal", "numeric", "string", "date"];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nominal => "nominal",
            Self::Numeric => "numeric",
            Self::String => "string",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureType {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nominal" => Ok(Self::Nominal),
            "numeric" => Ok(Self::Numeric),
            "string" => Ok(Self::String),
            "date" => Ok(Self::Date),
            other => Err(DatasetError::Validation(format!(
                "illegal feature type {other:?}, expected one of {:?}",
                Self::LEGAL
            ))),
        }
    }
}

/// One feature of a dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFeature {
    pub index: usize,
    pub name: String,
    pub data_type: FeatureType,
    pub nominal_values: Option<Vec<String>>,
    pub number_missing_values: usize,
}

impl fmt::Display for DataFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {} ({})]", self.index, self.name, self.data_type)
    }
}

/// Features keyed by index, iterated in index order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeatureMap {
    features: Vec<DataFeature>,
}

impl FeatureMap {
    /// Build from features listed in index order.
    ///
    /// # Errors
    /// [`DatasetError::Validation`] when the indices are not exactly
    /// `0, 1, 2, ...` in order.
    pub fn new(features: Vec<DataFeature>) -> Result<Self> {
        if let Some((position, feature)) = features
            .iter()
            .enumerate()
            .find(|(position, feature)| feature.index != *position)
        {
            return Err(DatasetError::Validation(format!(
                "data features not provided in right order: feature {} has index {} at position {position}",
                feature.name, feature.index
            )));
        }
        Ok(Self { features })
    }

    /// Features derived from a decoded column schema.
    #[must_use]
    pub fn from_schema(schema: &[ColumnSchema]) -> Self {
        let features = schema
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let (data_type, nominal_values) = match &column.declared {
                    AttributeType::Nominal(labels) => (FeatureType::Nominal, Some(labels.clone())),
                    AttributeType::String => (FeatureType::String, None),
                    AttributeType::Numeric | AttributeType::Real | AttributeType::Integer => {
                        (FeatureType::Numeric, None)
                    }
                };
                DataFeature {
                    index,
                    name: column.name.clone(),
                    data_type,
                    nominal_values,
                    number_missing_values: column.missing_count,
                }
            })
            .collect();
        Self { features }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DataFeature> {
        self.features.get(index)
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&DataFeature> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataFeature> {
        self.features.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Quality name to value.
pub type Qualities = BTreeMap<String, f64>;

/// A quality as listed by the server. The value is kept as text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuality {
    pub name: String,
    pub value: Option<String>,
}

/// Parse raw qualities; absent values and the literal `null` become NaN.
///
/// # Errors
/// [`DatasetError::Validation`] for values that are not numbers.
pub fn check_qualities(raw: &[RawQuality]) -> Result<Qualities> {
    raw.iter()
        .map(|q| {
            let value = match q.value.as_deref() {
                None | Some("null") => f64::NAN,
                Some(text) => text.trim().parse().map_err(|_| {
                    DatasetError::Validation(format!("quality {} has value {text:?}", q.name))
                })?,
            };
            Ok((q.name.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(index: usize, name: &str, data_type: FeatureType) -> DataFeature {
        DataFeature {
            index,
            name: name.into(),
            data_type,
            nominal_values: None,
            number_missing_values: 0,
        }
    }

    #[test]
    fn contiguous_indices_are_required() {
        assert!(
            FeatureMap::new(vec![
                feature(0, "a", FeatureType::Numeric),
                feature(1, "b", FeatureType::Nominal)
            ])
            .is_ok()
        );
        let gap = FeatureMap::new(vec![
            feature(0, "a", FeatureType::Numeric),
            feature(2, "b", FeatureType::Nominal),
        ]);
        assert!(matches!(gap, Err(DatasetError::Validation(_))));
        let swapped = FeatureMap::new(vec![
            feature(1, "b", FeatureType::Numeric),
            feature(0, "a", FeatureType::Nominal),
        ]);
        assert!(swapped.is_err());
    }

    #[test]
    fn feature_types_parse() {
        assert_eq!("date".parse::<FeatureType>().unwrap(), FeatureType::Date);
        assert!(matches!(
            "boolean".parse::<FeatureType>(),
            Err(DatasetError::Validation(_))
        ));
    }

    #[test]
    fn null_qualities_are_nan() {
        let q = check_qualities(&[
            RawQuality {
                name: "NumberOfInstances".into(),
                value: Some("150.0".into()),
            },
            RawQuality {
                name: "MajorityClassSize".into(),
                value: Some("null".into()),
            },
            RawQuality {
                name: "Dimensionality".into(),
                value: None,
            },
        ])
        .unwrap();
        approx::assert_relative_eq!(q["NumberOfInstances"], 150.0);
        assert!(q["MajorityClassSize"].is_nan());
        assert!(q["Dimensionality"].is_nan());
    }

    #[test]
    fn bad_quality_value() {
        let err = check_qualities(&[RawQuality {
            name: "x".into(),
            value: Some("many".into()),
        }])
        .unwrap_err();
        assert!(matches!(err, DatasetError::Validation(_)));
    }
}
