//! Categorical columns and the unpacker that builds them from raw codes.

use crate::io::arff::ArffValue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ordered category set of a categorical column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Categories {
    /// Labels in declaration order; the order is the categorical ordering.
    Labels(Vec<String>),
    /// The ordered pair `[false, true]`.
    Boolean,
}

impl Categories {
    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Labels(labels) => labels.len(),
            Self::Boolean => 2,
        }
    }

    /// Whether there are no categories at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Display label of `code`.
    #[must_use]
    pub fn label(&self, code: u32) -> Option<&str> {
        match self {
            Self::Labels(labels) => labels.get(code as usize).map(String::as_str),
            Self::Boolean => match code {
                0 => Some("False"),
                1 => Some("True"),
                _ => None,
            },
        }
    }

    /// All labels in category order.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        match self {
            Self::Labels(labels) => labels.clone(),
            Self::Boolean => vec!["False".into(), "True".into()],
        }
    }
}

/// Integer-coded column with its category set. `None` marks a missing value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub codes: Vec<Option<u32>>,
    pub categories: Categories,
}

impl CategoricalColumn {
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Label of `row`, `None` when missing.
    #[must_use]
    pub fn label(&self, row: usize) -> Option<&str> {
        self.codes
            .get(row)
            .copied()
            .flatten()
            .and_then(|code| self.categories.label(code))
    }

    /// Boolean value of `row` for boolean columns.
    #[must_use]
    pub fn as_bool(&self, row: usize) -> Option<bool> {
        match self.categories {
            Categories::Boolean => self.codes.get(row).copied().flatten().map(|c| c == 1),
            Categories::Labels(_) => None,
        }
    }

    /// Ordinal comparison of two rows. Missing values are unordered.
    #[must_use]
    pub fn compare(&self, a: usize, b: usize) -> Option<Ordering> {
        let a = self.codes.get(a).copied().flatten()?;
        let b = self.codes.get(b).copied().flatten()?;
        Some(a.cmp(&b))
    }

    pub(crate) fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            codes: rows.iter().map(|&r| self.codes[r]).collect(),
            categories: self.categories.clone(),
        }
    }
}

/// Map raw label indices onto `categories`.
///
/// `declared` is the label list from the raw header; the raw values index
/// into it. Indices that fail to map (non-numeric, out of range, missing)
/// become `None`. For boolean categories each declared label is mapped to
/// the position of its truth value, so `{TRUE, FALSE}` decodes `0` as true.
#[must_use]
pub fn unpack_categories(
    raw: &[ArffValue],
    declared: &[String],
    categories: Categories,
) -> CategoricalColumn {
    let remap: Vec<u32> = match &categories {
        Categories::Boolean => declared
            .iter()
            .map(|label| u32::from(label.eq_ignore_ascii_case("true")))
            .collect(),
        Categories::Labels(labels) => (0..labels.len())
            .map(|i| u32::try_from(i).unwrap_or(u32::MAX))
            .collect(),
    };

    let codes = raw
        .iter()
        .map(|value| raw_index(value).and_then(|i| remap.get(i).copied()))
        .collect();

    CategoricalColumn { codes, categories }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn raw_index(value: &ArffValue) -> Option<usize> {
    match value {
        ArffValue::Nominal(i) => Some(*i),
        ArffValue::Number(x) if x.is_finite() && x.fract() == 0.0 && *x >= 0.0 => Some(*x as usize),
        ArffValue::Text(t) => t.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn unmappable_values_become_missing() {
        let declared = labels(&["low", "mid", "high"]);
        let raw = [
            ArffValue::Nominal(2),
            ArffValue::Number(0.0),
            ArffValue::Text("1".into()),
            ArffValue::Missing,
            ArffValue::Nominal(7),
            ArffValue::Number(1.5),
            ArffValue::Text("x".into()),
            ArffValue::Number(-1.0),
        ];
        let col = unpack_categories(&raw, &declared, Categories::Labels(declared.clone()));
        assert_eq!(
            col.codes,
            [Some(2), Some(0), Some(1), None, None, None, None, None]
        );
        assert_eq!(col.label(0), Some("high"));
        assert_eq!(col.label(3), None);
    }

    #[test]
    fn category_order_defines_comparison() {
        let declared = labels(&["low", "mid", "high"]);
        let raw = [ArffValue::Nominal(2), ArffValue::Nominal(0), ArffValue::Missing];
        let col = unpack_categories(&raw, &declared, Categories::Labels(declared.clone()));
        assert_eq!(col.compare(0, 1), Some(Ordering::Greater));
        assert_eq!(col.compare(0, 2), None);
    }

    #[test]
    fn boolean_codes_follow_truth_value() {
        let declared = labels(&["TRUE", "FALSE"]);
        let raw = [ArffValue::Nominal(0), ArffValue::Nominal(1), ArffValue::Missing];
        let col = unpack_categories(&raw, &declared, Categories::Boolean);
        assert_eq!(col.codes, [Some(1), Some(0), None]);
        assert_eq!(col.as_bool(0), Some(true));
        assert_eq!(col.label(1), Some("False"));
    }
}
