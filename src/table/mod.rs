//! In-memory tabular representations.
//!
//! A decoded dataset is either a [`DenseTable`] of typed named columns or a
//! numeric [`CsrMatrix`]. [`Table`] is the tagged union the cache and the
//! accessor pass around.

mod categorical;
mod dense;
mod sparse;

pub use categorical::{CategoricalColumn, Categories, unpack_categories};
pub use dense::{Column, ColumnData, DenseTable};
pub use sparse::CsrMatrix;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A decoded dataset in either storage layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Table {
    Dense(DenseTable),
    Sparse(CsrMatrix),
}

impl Table {
    #[must_use]
    pub fn n_rows(&self) -> usize {
        match self {
            Self::Dense(t) => t.n_rows(),
            Self::Sparse(m) => m.n_rows(),
        }
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        match self {
            Self::Dense(t) => t.n_cols(),
            Self::Sparse(m) => m.n_cols(),
        }
    }

    #[must_use]
    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    /// Check the layout invariants of either variant.
    ///
    /// # Errors
    /// [`crate::DatasetError::Format`] describing the violation.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Dense(t) => t.validate(),
            Self::Sparse(m) => m.validate(),
        }
    }

    /// Keep the columns whose mask entry is `true`.
    ///
    /// # Errors
    /// [`crate::DatasetError::Format`] when the mask length differs from the
    /// column count.
    pub fn select_columns(&self, mask: &[bool]) -> Result<Self> {
        match self {
            Self::Dense(t) => t.select_columns(mask).map(Self::Dense),
            Self::Sparse(m) => m.select_columns(mask).map(Self::Sparse),
        }
    }
}

impl From<DenseTable> for Table {
    fn from(t: DenseTable) -> Self {
        Self::Dense(t)
    }
}

impl From<CsrMatrix> for Table {
    fn from(m: CsrMatrix) -> Self {
        Self::Sparse(m)
    }
}
