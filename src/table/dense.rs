//! Dense tables of named, typed columns.

use super::categorical::CategoricalColumn;
use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};

/// Column storage. `None` marks a missing value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Integer(Vec<Option<i64>>),
    Real(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Categorical(CategoricalColumn),
}

impl ColumnData {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Integer(v) => v.len(),
            Self::Real(v) => v.len(),
            Self::Text(v) => v.len(),
            Self::Categorical(c) => c.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of missing cells.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        match self {
            Self::Integer(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Real(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Text(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Categorical(c) => c.codes.iter().filter(|x| x.is_none()).count(),
        }
    }

    /// Short dtype name for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "string",
            Self::Categorical(_) => "category",
        }
    }

    fn select_rows(&self, rows: &[usize]) -> Self {
        match self {
            Self::Integer(v) => Self::Integer(rows.iter().map(|&r| v[r]).collect()),
            Self::Real(v) => Self::Real(rows.iter().map(|&r| v[r]).collect()),
            Self::Text(v) => Self::Text(rows.iter().map(|&r| v[r].clone()).collect()),
            Self::Categorical(c) => Self::Categorical(c.select_rows(rows)),
        }
    }
}

/// A named column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Columns sharing one row count.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DenseTable {
    n_rows: usize,
    columns: Vec<Column>,
}

impl DenseTable {
    /// Build a table, checking that every column has `n_rows` values.
    ///
    /// # Errors
    /// [`DatasetError::Format`] on a length mismatch.
    pub fn new(n_rows: usize, columns: Vec<Column>) -> Result<Self> {
        let table = Self { n_rows, columns };
        table.validate()?;
        Ok(table)
    }

    /// Check that every column holds `n_rows` values.
    ///
    /// # Errors
    /// [`DatasetError::Format`] on a length mismatch.
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self.columns.iter().find(|c| c.len() != self.n_rows) {
            return Err(DatasetError::Format(format!(
                "column {} has {} rows, expected {}",
                bad.name,
                bad.len(),
                self.n_rows
            )));
        }
        Ok(())
    }

    /// Build a table from columns, taking the row count from the first one.
    ///
    /// # Errors
    /// [`DatasetError::Format`] when the columns differ in length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, Column::len);
        Self::new(n_rows, columns)
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Keep the columns whose mask entry is `true`, preserving order.
    ///
    /// # Errors
    /// [`DatasetError::Format`] when the mask length differs from the column count.
    pub fn select_columns(&self, mask: &[bool]) -> Result<Self> {
        check_mask(mask, self.n_cols())?;
        Ok(Self {
            n_rows: self.n_rows,
            columns: self
                .columns
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(c, _)| c.clone())
                .collect(),
        })
    }

    /// Gather `rows` (in the given order) into a new table.
    ///
    /// # Panics
    /// Panics if a row index is out of bounds.
    #[must_use]
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            n_rows: rows.len(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.select_rows(rows)))
                .collect(),
        }
    }
}

pub(crate) fn check_mask(mask: &[bool], n_cols: usize) -> Result<()> {
    if mask.len() == n_cols {
        Ok(())
    } else {
        Err(DatasetError::Format(format!(
            "column mask has {} entries for {n_cols} columns",
            mask.len()
        )))
    }
}
